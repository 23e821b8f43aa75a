use std::num::NonZeroU32;

use super::domain::{
    ConferralRecord, EnrollmentId, EnrollmentScope, EnrollmentStatus, Event, EventDiscipline,
    EventDisciplineId, EventId, Heat, HeatId, IndividualEnrollment, NewEnrollment,
    NewSubstitution, NewTeam, Person, PersonId, School, SchoolId, SubstitutionId,
    SubstitutionRequest, SubstitutionStatus, Team, TeamId, TeamMembership, TeamStatus,
};

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness or row-count constraint refused the write.
    #[error("constraint violated: {constraint}")]
    Conflict { constraint: &'static str },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub const UNIQUE_ACTIVE_ENROLLMENT: &str = "unique_active_enrollment_per_scope";
pub const ENROLLMENT_SCHOOL_CAP: &str = "enrollment_per_school_cap";
pub const UNIQUE_TEAM_MEMBER: &str = "unique_team_member";
pub const ROSTER_CAP: &str = "roster_size_cap";

/// Read side of the record store.
pub trait RegistryReader {
    fn person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError>;
    fn school(&self, id: SchoolId) -> Result<Option<School>, RepositoryError>;
    fn event(&self, id: EventId) -> Result<Option<Event>, RepositoryError>;
    fn discipline(&self, id: EventDisciplineId)
        -> Result<Option<EventDiscipline>, RepositoryError>;
    fn heat(&self, id: HeatId) -> Result<Option<Heat>, RepositoryError>;
    fn heats_of(&self, discipline: EventDisciplineId) -> Result<Vec<Heat>, RepositoryError>;

    fn enrollment(&self, id: EnrollmentId) -> Result<Option<IndividualEnrollment>, RepositoryError>;
    fn active_enrollment(
        &self,
        person: PersonId,
        scope: EnrollmentScope,
    ) -> Result<Option<IndividualEnrollment>, RepositoryError>;
    fn count_active_enrollments(
        &self,
        school: SchoolId,
        scope: EnrollmentScope,
    ) -> Result<u32, RepositoryError>;

    fn team(&self, id: TeamId) -> Result<Option<Team>, RepositoryError>;
    fn members(&self, team: TeamId) -> Result<Vec<TeamMembership>, RepositoryError>;

    fn conferral(
        &self,
        person: PersonId,
        school: SchoolId,
    ) -> Result<Option<ConferralRecord>, RepositoryError>;

    fn substitution(
        &self,
        id: SubstitutionId,
    ) -> Result<Option<SubstitutionRequest>, RepositoryError>;
    /// Requests in `status`, optionally limited to one school, oldest first.
    fn substitutions(
        &self,
        status: SubstitutionStatus,
        school: Option<SchoolId>,
    ) -> Result<Vec<SubstitutionRequest>, RepositoryError>;

    fn is_member(&self, team: TeamId, person: PersonId) -> Result<bool, RepositoryError> {
        Ok(self
            .members(team)?
            .iter()
            .any(|membership| membership.person_id == person))
    }
}

/// Write side of the record store. Constraint-bearing inserts must refuse violating rows
/// themselves, regardless of any check the caller already performed.
pub trait RegistryWriter: RegistryReader {
    fn put_school(&mut self, school: School) -> Result<(), RepositoryError>;
    fn put_person(&mut self, person: Person) -> Result<(), RepositoryError>;
    fn put_event(&mut self, event: Event) -> Result<(), RepositoryError>;
    fn put_discipline(&mut self, discipline: EventDiscipline) -> Result<(), RepositoryError>;
    fn put_heat(&mut self, heat: Heat) -> Result<(), RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the person already holds an active
    /// enrollment in the scope, or when the school's active count would exceed `cap`.
    fn insert_enrollment(
        &mut self,
        enrollment: NewEnrollment,
        cap: Option<NonZeroU32>,
    ) -> Result<IndividualEnrollment, RepositoryError>;
    fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> Result<(), RepositoryError>;

    fn insert_team(&mut self, team: NewTeam) -> Result<Team, RepositoryError>;
    fn set_team_status(&mut self, id: TeamId, status: TeamStatus) -> Result<(), RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] on a duplicate (team, person) pair or when
    /// the roster would exceed `cap`.
    fn insert_membership(
        &mut self,
        team: TeamId,
        person: PersonId,
        cap: Option<NonZeroU32>,
    ) -> Result<TeamMembership, RepositoryError>;
    /// Returns whether a membership was removed.
    fn delete_membership(&mut self, team: TeamId, person: PersonId)
        -> Result<bool, RepositoryError>;

    fn save_conferral(&mut self, record: ConferralRecord) -> Result<(), RepositoryError>;

    fn insert_substitution(
        &mut self,
        request: NewSubstitution,
    ) -> Result<SubstitutionRequest, RepositoryError>;
    fn save_substitution(&mut self, request: SubstitutionRequest) -> Result<(), RepositoryError>;
}

/// Transactional record store consumed by the registration core.
pub trait RegistryStore: Send + Sync {
    /// Runs a read-only query against a consistent snapshot.
    fn read<T, E, F>(&self, query: F) -> Result<T, E>
    where
        F: FnOnce(&dyn RegistryReader) -> Result<T, E>,
        E: From<RepositoryError>;

    /// Runs `work` atomically. Writes are committed only when `work` returns `Ok`.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RegistryWriter) -> Result<T, E>,
        E: From<RepositoryError>;
}

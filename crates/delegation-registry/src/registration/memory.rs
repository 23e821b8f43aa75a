use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    ConferralRecord, EnrollmentId, EnrollmentScope, EnrollmentStatus, Event, EventDiscipline,
    EventDisciplineId, EventId, Heat, HeatId, IndividualEnrollment, NewEnrollment,
    NewSubstitution, NewTeam, Person, PersonId, School, SchoolId, SubstitutionId,
    SubstitutionRequest, SubstitutionStatus, Team, TeamId, TeamMembership, TeamStatus,
};
use super::repository::{
    RegistryReader, RegistryStore, RegistryWriter, RepositoryError, ENROLLMENT_SCHOOL_CAP,
    ROSTER_CAP, UNIQUE_ACTIVE_ENROLLMENT, UNIQUE_TEAM_MEMBER,
};

/// In-process store with serializable transactions.
///
/// Each transaction works on a staged copy of the tables under the store lock and swaps it
/// in only on success, so a failed closure leaves no partial writes behind.
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    schools: BTreeMap<SchoolId, School>,
    persons: BTreeMap<PersonId, Person>,
    events: BTreeMap<EventId, Event>,
    disciplines: BTreeMap<EventDisciplineId, EventDiscipline>,
    heats: BTreeMap<HeatId, Heat>,
    enrollments: BTreeMap<EnrollmentId, IndividualEnrollment>,
    teams: BTreeMap<TeamId, Team>,
    memberships: BTreeMap<TeamId, Vec<TeamMembership>>,
    conferrals: BTreeMap<(PersonId, SchoolId), ConferralRecord>,
    substitutions: BTreeMap<SubstitutionId, SubstitutionRequest>,
    sequence: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("registry mutex poisoned".to_string()))
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn read<T, E, F>(&self, query: F) -> Result<T, E>
    where
        F: FnOnce(&dyn RegistryReader) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let guard = self.lock()?;
        query(&*guard)
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RegistryWriter) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let output = work(&mut staged)?;
        *guard = staged;
        Ok(output)
    }
}

impl RegistryReader for Tables {
    fn person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(self.persons.get(&id).cloned())
    }

    fn school(&self, id: SchoolId) -> Result<Option<School>, RepositoryError> {
        Ok(self.schools.get(&id).cloned())
    }

    fn event(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        Ok(self.events.get(&id).cloned())
    }

    fn discipline(
        &self,
        id: EventDisciplineId,
    ) -> Result<Option<EventDiscipline>, RepositoryError> {
        Ok(self.disciplines.get(&id).cloned())
    }

    fn heat(&self, id: HeatId) -> Result<Option<Heat>, RepositoryError> {
        Ok(self.heats.get(&id).cloned())
    }

    fn heats_of(&self, discipline: EventDisciplineId) -> Result<Vec<Heat>, RepositoryError> {
        Ok(self
            .heats
            .values()
            .filter(|heat| heat.discipline_id == discipline)
            .cloned()
            .collect())
    }

    fn enrollment(&self, id: EnrollmentId) -> Result<Option<IndividualEnrollment>, RepositoryError> {
        Ok(self.enrollments.get(&id).cloned())
    }

    fn active_enrollment(
        &self,
        person: PersonId,
        scope: EnrollmentScope,
    ) -> Result<Option<IndividualEnrollment>, RepositoryError> {
        Ok(self
            .enrollments
            .values()
            .find(|row| {
                row.person_id == person
                    && row.scope == scope
                    && row.status == EnrollmentStatus::Active
            })
            .cloned())
    }

    fn count_active_enrollments(
        &self,
        school: SchoolId,
        scope: EnrollmentScope,
    ) -> Result<u32, RepositoryError> {
        let count = self
            .enrollments
            .values()
            .filter(|row| {
                row.school_id == school
                    && row.scope == scope
                    && row.status == EnrollmentStatus::Active
            })
            .count();
        Ok(count as u32)
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, RepositoryError> {
        Ok(self.teams.get(&id).cloned())
    }

    fn members(&self, team: TeamId) -> Result<Vec<TeamMembership>, RepositoryError> {
        Ok(self.memberships.get(&team).cloned().unwrap_or_default())
    }

    fn conferral(
        &self,
        person: PersonId,
        school: SchoolId,
    ) -> Result<Option<ConferralRecord>, RepositoryError> {
        Ok(self.conferrals.get(&(person, school)).cloned())
    }

    fn substitution(
        &self,
        id: SubstitutionId,
    ) -> Result<Option<SubstitutionRequest>, RepositoryError> {
        Ok(self.substitutions.get(&id).cloned())
    }

    fn substitutions(
        &self,
        status: SubstitutionStatus,
        school: Option<SchoolId>,
    ) -> Result<Vec<SubstitutionRequest>, RepositoryError> {
        Ok(self
            .substitutions
            .values()
            .filter(|request| request.status == status)
            .filter(|request| school.map_or(true, |school| request.school_id == school))
            .cloned()
            .collect())
    }
}

impl RegistryWriter for Tables {
    fn put_school(&mut self, school: School) -> Result<(), RepositoryError> {
        self.schools.insert(school.id, school);
        Ok(())
    }

    fn put_person(&mut self, person: Person) -> Result<(), RepositoryError> {
        self.persons.insert(person.id, person);
        Ok(())
    }

    fn put_event(&mut self, event: Event) -> Result<(), RepositoryError> {
        self.events.insert(event.id, event);
        Ok(())
    }

    fn put_discipline(&mut self, discipline: EventDiscipline) -> Result<(), RepositoryError> {
        self.disciplines.insert(discipline.id, discipline);
        Ok(())
    }

    fn put_heat(&mut self, heat: Heat) -> Result<(), RepositoryError> {
        self.heats.insert(heat.id, heat);
        Ok(())
    }

    fn insert_enrollment(
        &mut self,
        enrollment: NewEnrollment,
        cap: Option<NonZeroU32>,
    ) -> Result<IndividualEnrollment, RepositoryError> {
        if self
            .active_enrollment(enrollment.person_id, enrollment.scope)?
            .is_some()
        {
            return Err(RepositoryError::Conflict {
                constraint: UNIQUE_ACTIVE_ENROLLMENT,
            });
        }

        if let Some(cap) = cap {
            let used = self.count_active_enrollments(enrollment.school_id, enrollment.scope)?;
            if used >= cap.get() {
                return Err(RepositoryError::Conflict {
                    constraint: ENROLLMENT_SCHOOL_CAP,
                });
            }
        }

        let row = IndividualEnrollment {
            id: EnrollmentId(self.next_id()),
            person_id: enrollment.person_id,
            school_id: enrollment.school_id,
            scope: enrollment.scope,
            status: EnrollmentStatus::Active,
            created_by: enrollment.created_by,
            created_at: Utc::now(),
        };
        self.enrollments.insert(row.id, row.clone());
        Ok(row)
    }

    fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> Result<(), RepositoryError> {
        let row = self
            .enrollments
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        row.status = status;
        Ok(())
    }

    fn insert_team(&mut self, team: NewTeam) -> Result<Team, RepositoryError> {
        let row = Team {
            id: TeamId(self.next_id()),
            discipline_id: team.discipline_id,
            school_id: team.school_id,
            status: TeamStatus::Pending,
            created_by: team.created_by,
            created_at: Utc::now(),
        };
        self.teams.insert(row.id, row.clone());
        Ok(row)
    }

    fn set_team_status(&mut self, id: TeamId, status: TeamStatus) -> Result<(), RepositoryError> {
        let row = self.teams.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        row.status = status;
        Ok(())
    }

    fn insert_membership(
        &mut self,
        team: TeamId,
        person: PersonId,
        cap: Option<NonZeroU32>,
    ) -> Result<TeamMembership, RepositoryError> {
        if !self.teams.contains_key(&team) {
            return Err(RepositoryError::NotFound);
        }

        let roster = self.memberships.entry(team).or_default();
        if roster.iter().any(|row| row.person_id == person) {
            return Err(RepositoryError::Conflict {
                constraint: UNIQUE_TEAM_MEMBER,
            });
        }
        if let Some(cap) = cap {
            if roster.len() as u32 >= cap.get() {
                return Err(RepositoryError::Conflict {
                    constraint: ROSTER_CAP,
                });
            }
        }

        let row = TeamMembership {
            team_id: team,
            person_id: person,
            added_at: Utc::now(),
        };
        roster.push(row.clone());
        Ok(row)
    }

    fn delete_membership(
        &mut self,
        team: TeamId,
        person: PersonId,
    ) -> Result<bool, RepositoryError> {
        let Some(roster) = self.memberships.get_mut(&team) else {
            return Ok(false);
        };
        let before = roster.len();
        roster.retain(|row| row.person_id != person);
        Ok(roster.len() != before)
    }

    fn save_conferral(&mut self, record: ConferralRecord) -> Result<(), RepositoryError> {
        self.conferrals
            .insert((record.person_id, record.school_id), record);
        Ok(())
    }

    fn insert_substitution(
        &mut self,
        request: NewSubstitution,
    ) -> Result<SubstitutionRequest, RepositoryError> {
        let row = SubstitutionRequest {
            id: SubstitutionId(self.next_id()),
            team_id: request.team_id,
            school_id: request.school_id,
            outgoing_person_id: request.outgoing_person_id,
            incoming_person_id: request.incoming_person_id,
            justification: request.justification,
            evidence_url: request.evidence_url,
            status: SubstitutionStatus::Pending,
            observation: None,
            requested_by: request.requested_by,
            requested_at: Utc::now(),
            decided_by: None,
            decided_at: None,
        };
        self.substitutions.insert(row.id, row.clone());
        Ok(row)
    }

    fn save_substitution(&mut self, request: SubstitutionRequest) -> Result<(), RepositoryError> {
        if !self.substitutions.contains_key(&request.id) {
            return Err(RepositoryError::NotFound);
        }
        self.substitutions.insert(request.id, request);
        Ok(())
    }
}

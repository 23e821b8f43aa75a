use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::conferral::{ConferralPolicies, ConferralTracker, ConferralVerdict};
use super::domain::{
    Caller, Category, ConferralRecord, ConferralStatus, DocumentKind, EnrollmentId,
    EnrollmentScope, Event, EventDisciplineId, EventId, IndividualEnrollment, PersonId, SchoolId,
    SubstitutionId, SubstitutionRequest, Team, TeamId, TeamMembership,
};
use super::eligibility;
use super::enrollment::EnrollmentManager;
use super::error::{EntityKind, RegistrationError};
use super::quota::{IndividualQuota, QuotaEnforcer, TeamQuota};
use super::repository::RegistryStore;
use super::roster::{RosterManager, TeamRoster};
use super::substitution::{DecisionNotes, SubstitutionWorkflow};

/// Facade over the registration core. Every operation takes the authenticated caller.
pub struct RegistrationService<R> {
    store: Arc<R>,
    conferral: ConferralTracker<R>,
    quotas: QuotaEnforcer<R>,
    enrollments: EnrollmentManager<R>,
    rosters: RosterManager<R>,
    substitutions: SubstitutionWorkflow<R>,
}

impl<R> RegistrationService<R>
where
    R: RegistryStore + 'static,
{
    pub fn new(store: Arc<R>, notes: DecisionNotes) -> Self {
        Self::with_policies(store, notes, ConferralPolicies::default())
    }

    pub fn with_policies(store: Arc<R>, notes: DecisionNotes, policies: ConferralPolicies) -> Self {
        Self {
            conferral: ConferralTracker::new(store.clone(), policies),
            quotas: QuotaEnforcer::new(store.clone()),
            enrollments: EnrollmentManager::new(store.clone()),
            rosters: RosterManager::new(store.clone()),
            substitutions: SubstitutionWorkflow::new(store.clone(), notes),
            store,
        }
    }

    pub fn store(&self) -> &Arc<R> {
        &self.store
    }

    pub fn resolve_category(&self, birth_date: NaiveDate, reference_date: NaiveDate) -> Option<Category> {
        eligibility::resolve_category(birth_date, reference_date)
    }

    pub fn enroll(
        &self,
        caller: &Caller,
        person_id: PersonId,
        scope: EnrollmentScope,
    ) -> Result<IndividualEnrollment, RegistrationError> {
        self.enrollments.enroll(caller, person_id, scope)
    }

    pub fn cancel_enrollment(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
    ) -> Result<IndividualEnrollment, RegistrationError> {
        self.enrollments.cancel(caller, enrollment_id)
    }

    pub fn create_team(
        &self,
        caller: &Caller,
        discipline_id: EventDisciplineId,
        school_id: SchoolId,
    ) -> Result<Team, RegistrationError> {
        self.rosters.create_team(caller, discipline_id, school_id)
    }

    pub fn add_member(
        &self,
        caller: &Caller,
        team_id: TeamId,
        person_id: PersonId,
    ) -> Result<TeamMembership, RegistrationError> {
        self.rosters.add_member(caller, team_id, person_id)
    }

    pub fn remove_member(
        &self,
        caller: &Caller,
        team_id: TeamId,
        person_id: PersonId,
    ) -> Result<(), RegistrationError> {
        self.rosters.remove_member(caller, team_id, person_id)
    }

    pub fn mark_team_complete(&self, caller: &Caller, team_id: TeamId) -> Result<Team, RegistrationError> {
        self.rosters.mark_complete(caller, team_id)
    }

    pub fn cancel_team(&self, caller: &Caller, team_id: TeamId) -> Result<Team, RegistrationError> {
        self.rosters.cancel_team(caller, team_id)
    }

    pub fn team_roster(&self, caller: &Caller, team_id: TeamId) -> Result<TeamRoster, RegistrationError> {
        self.rosters.roster(caller, team_id)
    }

    pub fn request_substitution(
        &self,
        caller: &Caller,
        team_id: TeamId,
        outgoing: PersonId,
        incoming: PersonId,
        justification: &str,
        evidence_url: Option<&str>,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        self.substitutions
            .request(caller, team_id, outgoing, incoming, justification, evidence_url)
    }

    pub fn approve_substitution(
        &self,
        caller: &Caller,
        request_id: SubstitutionId,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        self.substitutions.approve(caller, request_id)
    }

    pub fn reject_substitution(
        &self,
        caller: &Caller,
        request_id: SubstitutionId,
        observation: Option<&str>,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        self.substitutions.reject(caller, request_id, observation)
    }

    pub fn substitution(
        &self,
        caller: &Caller,
        request_id: SubstitutionId,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        self.substitutions.get(caller, request_id)
    }

    pub fn pending_substitutions(
        &self,
        caller: &Caller,
    ) -> Result<Vec<SubstitutionRequest>, RegistrationError> {
        self.substitutions.pending(caller)
    }

    pub fn record_document_upload(
        &self,
        caller: &Caller,
        person_id: PersonId,
        school_id: SchoolId,
        kind: DocumentKind,
        url: &str,
    ) -> Result<ConferralRecord, RegistrationError> {
        self.conferral
            .record_upload(caller, person_id, school_id, kind, url)
    }

    pub fn conferral_status(
        &self,
        caller: &Caller,
        person_id: PersonId,
        school_id: SchoolId,
    ) -> Result<ConferralStatus, RegistrationError> {
        self.conferral.status(caller, person_id, school_id)
    }

    pub fn set_conferral_status(
        &self,
        caller: &Caller,
        person_id: PersonId,
        school_id: SchoolId,
        verdict: ConferralVerdict,
        observation: Option<String>,
    ) -> Result<ConferralRecord, RegistrationError> {
        self.conferral
            .set_status(caller, person_id, school_id, verdict, observation)
    }

    pub fn check_individual_quota(
        &self,
        caller: &Caller,
        school_id: SchoolId,
        scope: EnrollmentScope,
    ) -> Result<IndividualQuota, RegistrationError> {
        self.quotas.check_individual_quota(caller, school_id, scope)
    }

    pub fn check_team_quota(&self, caller: &Caller, team_id: TeamId) -> Result<TeamQuota, RegistrationError> {
        self.quotas.check_team_quota(caller, team_id)
    }

    /// Administrator switch for the event-wide enrollment flag.
    pub fn set_enrollment_open(
        &self,
        caller: &Caller,
        event_id: EventId,
        open: bool,
    ) -> Result<Event, RegistrationError> {
        let admin = caller
            .admin_capability()
            .ok_or(RegistrationError::Unauthorized)?;

        let event = self.store.transaction(|tx| -> Result<_, RegistrationError> {
            let mut event = tx
                .event(event_id)?
                .ok_or_else(|| RegistrationError::not_found(EntityKind::Event, event_id))?;
            event.enrollment_open = open;
            tx.put_event(event.clone())?;
            Ok(event)
        })?;

        info!(event = %event_id, admin = %admin.user(), open, "enrollment switch changed");
        Ok(event)
    }
}

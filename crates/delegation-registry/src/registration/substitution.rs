//! Substitution request/approval state machine.
//!
//! `PENDING -> APPROVED | REJECTED`, both terminal. Approval swaps the roster members in
//! the same transaction that records the decision.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    Caller, NewSubstitution, PersonId, SubstitutionId, SubstitutionRequest, SubstitutionStatus,
    TeamId,
};
use super::error::{EntityKind, RegistrationError, StateError, ValidationError};
use super::lookup;
use super::repository::{RegistryReader, RegistryStore};
use super::roster;

/// Observations written by the workflow itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionNotes {
    pub approval: String,
    /// Used when an administrator rejects without giving a reason.
    pub rejection: String,
}

impl Default for DecisionNotes {
    fn default() -> Self {
        Self {
            approval: "Substitution approved; roster updated.".to_string(),
            rejection: "Substitution rejected by the organizing committee.".to_string(),
        }
    }
}

pub struct SubstitutionWorkflow<R> {
    store: Arc<R>,
    notes: DecisionNotes,
}

impl<R> SubstitutionWorkflow<R>
where
    R: RegistryStore + 'static,
{
    pub fn new(store: Arc<R>, notes: DecisionNotes) -> Self {
        Self { store, notes }
    }

    /// Files a pending request. The roster is untouched until approval, so filing is
    /// accepted while the event's enrollment switch is off.
    pub fn request(
        &self,
        caller: &Caller,
        team_id: TeamId,
        outgoing: PersonId,
        incoming: PersonId,
        justification: &str,
        evidence_url: Option<&str>,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        let justification = justification.trim();
        if justification.is_empty() {
            return Err(ValidationError::EmptyJustification.into());
        }
        let evidence_url = evidence_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        let request = self
            .store
            .transaction(|tx| -> Result<_, RegistrationError> {
                let team = lookup::team(&*tx, caller, team_id)?;
                lookup::ensure_not_cancelled(&team)?;

                if !tx.is_member(team_id, outgoing)? {
                    return Err(ValidationError::NotAMember.into());
                }
                if tx.is_member(team_id, incoming)? {
                    return Err(ValidationError::AlreadyMember.into());
                }
                roster::eligible_for_team(&*tx, caller, &team, incoming)?;

                Ok(tx.insert_substitution(NewSubstitution {
                    team_id,
                    school_id: team.school_id,
                    outgoing_person_id: outgoing,
                    incoming_person_id: incoming,
                    justification: justification.to_string(),
                    evidence_url,
                    requested_by: caller.user(),
                })?)
            })?;

        info!(
            substitution = %request.id,
            team = %team_id,
            outgoing = %outgoing,
            incoming = %incoming,
            "substitution requested"
        );
        Ok(request)
    }

    /// Approves a pending request and applies the swap.
    ///
    /// Membership is re-validated now, not at request time. A missing outgoing member
    /// aborts with the request still pending; an incoming member already on the roster
    /// is not inserted twice. The swap is a roster mutation and fails with `EVENT_CLOSED`
    /// while the event's enrollment switch is off; the request then stays pending.
    pub fn approve(
        &self,
        caller: &Caller,
        request_id: SubstitutionId,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        let admin = caller
            .admin_capability()
            .ok_or(RegistrationError::Unauthorized)?;

        let outcome = self.store.transaction(|tx| -> Result<_, RegistrationError> {
            let mut request = pending_request(&*tx, request_id)?;
            let team = lookup::team(&*tx, caller, request.team_id)?;
            lookup::ensure_not_cancelled(&team)?;
            let discipline = lookup::discipline(&*tx, team.discipline_id)?;
            lookup::open_event(&*tx, &discipline)?;

            let inserted = roster::swap_member(
                tx,
                team.id,
                request.outgoing_person_id,
                request.incoming_person_id,
            )?;

            request.status = SubstitutionStatus::Approved;
            request.observation = Some(self.notes.approval.clone());
            request.decided_by = Some(admin.user());
            request.decided_at = Some(Utc::now());
            tx.save_substitution(request.clone())?;
            Ok((request, inserted))
        });

        let (request, inserted) = outcome.map_err(|err| {
            if matches!(
                err,
                RegistrationError::Validation(ValidationError::OutgoingNotInTeam)
            ) {
                warn!(substitution = %request_id, "approval found outgoing member already gone");
            }
            err
        })?;

        info!(
            substitution = %request_id,
            team = %request.team_id,
            admin = %admin.user(),
            incoming_inserted = inserted,
            "substitution approved"
        );
        Ok(request)
    }

    /// Rejects a pending request. A blank observation is replaced by the default note.
    pub fn reject(
        &self,
        caller: &Caller,
        request_id: SubstitutionId,
        observation: Option<&str>,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        let admin = caller
            .admin_capability()
            .ok_or(RegistrationError::Unauthorized)?;

        let observation = observation
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map_or_else(|| self.notes.rejection.clone(), str::to_string);

        let request = self.store.transaction(|tx| -> Result<_, RegistrationError> {
            let mut request = pending_request(&*tx, request_id)?;
            request.status = SubstitutionStatus::Rejected;
            request.observation = Some(observation);
            request.decided_by = Some(admin.user());
            request.decided_at = Some(Utc::now());
            tx.save_substitution(request.clone())?;
            Ok(request)
        })?;

        info!(substitution = %request_id, admin = %admin.user(), "substitution rejected");
        Ok(request)
    }

    /// Pending requests visible to the caller, oldest first.
    pub fn pending(&self, caller: &Caller) -> Result<Vec<SubstitutionRequest>, RegistrationError> {
        self.store.read(|reader| {
            Ok(reader.substitutions(SubstitutionStatus::Pending, caller.school_scope())?)
        })
    }

    pub fn get(
        &self,
        caller: &Caller,
        request_id: SubstitutionId,
    ) -> Result<SubstitutionRequest, RegistrationError> {
        self.store.read(|reader| {
            reader
                .substitution(request_id)?
                .filter(|request| caller.can_access(request.school_id))
                .ok_or_else(|| RegistrationError::not_found(EntityKind::Substitution, request_id))
        })
    }
}

fn pending_request<R>(
    reader: &R,
    request_id: SubstitutionId,
) -> Result<SubstitutionRequest, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let request = reader
        .substitution(request_id)?
        .ok_or_else(|| RegistrationError::not_found(EntityKind::Substitution, request_id))?;
    if request.status.is_terminal() {
        return Err(StateError::AlreadyDecided {
            status: request.status,
        }
        .into());
    }
    Ok(request)
}

use std::num::NonZeroU32;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Caller, EventDiscipline, EventDisciplineId, NewTeam, PersonId, SchoolId, Team, TeamId,
    TeamMembership, TeamStatus,
};
use super::error::{EntityKind, RegistrationError, ValidationError};
use super::lookup;
use super::quota::{self, TeamQuota};
use super::repository::{RegistryReader, RegistryStore, RegistryWriter};

/// Read view of a team with its current roster.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRoster {
    pub team: Team,
    pub discipline: EventDiscipline,
    pub members: Vec<TeamMembership>,
    pub quota: TeamQuota,
}

/// Team creation and roster mutation.
///
/// Unlike individual enrollment, adding a member does not consult document conferral.
pub struct RosterManager<R> {
    store: Arc<R>,
}

impl<R> RosterManager<R>
where
    R: RegistryStore + 'static,
{
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    pub fn create_team(
        &self,
        caller: &Caller,
        discipline_id: EventDisciplineId,
        school_id: SchoolId,
    ) -> Result<Team, RegistrationError> {
        let team = self.store.transaction(|tx| {
            tx.school(school_id)?
                .filter(|school| caller.can_access(school.id))
                .ok_or_else(|| RegistrationError::not_found(EntityKind::School, school_id))?;

            let discipline = lookup::discipline(&*tx, discipline_id)?;
            quota::roster_bounds(&discipline)?;
            lookup::open_event(&*tx, &discipline)?;

            Ok::<_, RegistrationError>(tx.insert_team(NewTeam {
                discipline_id,
                school_id,
                created_by: caller.user(),
            })?)
        })?;

        info!(team = %team.id, discipline = %discipline_id, school = %school_id, "team created");
        Ok(team)
    }

    pub fn add_member(
        &self,
        caller: &Caller,
        team_id: TeamId,
        person_id: PersonId,
    ) -> Result<TeamMembership, RegistrationError> {
        let cap = self
            .store
            .read(|reader| precheck_member(reader, caller, team_id, person_id))?;

        let membership = self
            .store
            .transaction(|tx| {
                let team = lookup::team(&*tx, caller, team_id)?;
                lookup::ensure_not_cancelled(&team)?;
                let discipline = lookup::discipline(&*tx, team.discipline_id)?;
                lookup::open_event(&*tx, &discipline)?;
                Ok::<_, RegistrationError>(tx.insert_membership(team_id, person_id, cap)?)
            })
            .map_err(|err| {
                if let RegistrationError::Conflict { constraint } = &err {
                    warn!(team = %team_id, person = %person_id, %constraint, "roster insert lost a race at commit");
                }
                err
            })?;

        info!(team = %team_id, person = %person_id, "member added");
        Ok(membership)
    }

    /// Removing never checks the roster minimum; that is only asserted by `mark_complete`.
    pub fn remove_member(
        &self,
        caller: &Caller,
        team_id: TeamId,
        person_id: PersonId,
    ) -> Result<(), RegistrationError> {
        self.store.transaction(|tx| -> Result<(), RegistrationError> {
            let team = mutable_team(&*tx, caller, team_id)?;
            if !tx.delete_membership(team.id, person_id)? {
                return Err(ValidationError::NotAMember.into());
            }
            Ok(())
        })?;

        info!(team = %team_id, person = %person_id, "member removed");
        Ok(())
    }

    /// Asserts the roster size lies within bounds and records the team as complete.
    ///
    /// The status is a point-in-time assertion. Later removals or substitutions do not
    /// revert it, so a complete team may currently sit outside its bounds.
    pub fn mark_complete(&self, caller: &Caller, team_id: TeamId) -> Result<Team, RegistrationError> {
        let team = self.store.transaction(|tx| {
            let mut team = mutable_team(&*tx, caller, team_id)?;
            quota::team_quota(&*tx, &team)?.ensure_within_bounds()?;

            tx.set_team_status(team_id, TeamStatus::Complete)?;
            team.status = TeamStatus::Complete;
            Ok::<_, RegistrationError>(team)
        })?;

        info!(team = %team_id, "team marked complete");
        Ok(team)
    }

    pub fn cancel_team(&self, caller: &Caller, team_id: TeamId) -> Result<Team, RegistrationError> {
        let team = self.store.transaction(|tx| {
            let mut team = mutable_team(&*tx, caller, team_id)?;
            tx.set_team_status(team_id, TeamStatus::Cancelled)?;
            team.status = TeamStatus::Cancelled;
            Ok::<_, RegistrationError>(team)
        })?;

        info!(team = %team_id, "team cancelled");
        Ok(team)
    }

    pub fn roster(&self, caller: &Caller, team_id: TeamId) -> Result<TeamRoster, RegistrationError> {
        self.store.read(|reader| {
            let team = lookup::team(reader, caller, team_id)?;
            let discipline = lookup::discipline(reader, team.discipline_id)?;
            let quota = quota::team_quota(reader, &team)?;
            let members = reader.members(team_id)?;
            Ok(TeamRoster {
                team,
                discipline,
                members,
                quota,
            })
        })
    }
}

/// Team visible to the caller, not cancelled, whose event still accepts changes.
fn mutable_team<R>(reader: &R, caller: &Caller, team_id: TeamId) -> Result<Team, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let team = lookup::team(reader, caller, team_id)?;
    lookup::ensure_not_cancelled(&team)?;
    let discipline = lookup::discipline(reader, team.discipline_id)?;
    lookup::open_event(reader, &discipline)?;
    Ok(team)
}

/// Person from the team's own school who fits the team's bracket.
pub(crate) fn eligible_for_team<R>(
    reader: &R,
    caller: &Caller,
    team: &Team,
    person_id: PersonId,
) -> Result<(), RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let person = lookup::person(reader, caller, person_id)?;
    if person.school_id != team.school_id {
        return Err(RegistrationError::not_found(EntityKind::Person, person_id));
    }
    let discipline = lookup::discipline(reader, team.discipline_id)?;
    let event = lookup::event(reader, discipline.event_id)?;
    lookup::ensure_bracket(&person, &discipline, &event)
}

fn precheck_member<R>(
    reader: &R,
    caller: &Caller,
    team_id: TeamId,
    person_id: PersonId,
) -> Result<Option<NonZeroU32>, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let team = mutable_team(reader, caller, team_id)?;
    eligible_for_team(reader, caller, &team, person_id)?;

    if reader.is_member(team_id, person_id)? {
        return Err(ValidationError::AlreadyMember.into());
    }

    let quota = quota::team_quota(reader, &team)?;
    quota.ensure_room()?;
    Ok(quota.max)
}

/// Removes `outgoing` and inserts `incoming` unless it is already on the roster.
///
/// Every step is skip-if-applied, so re-running after a partial failure converges on the
/// same roster. Returns whether the incoming member was inserted.
pub(crate) fn swap_member(
    tx: &mut dyn RegistryWriter,
    team_id: TeamId,
    outgoing: PersonId,
    incoming: PersonId,
) -> Result<bool, RegistrationError> {
    if !tx.is_member(team_id, outgoing)? {
        return Err(ValidationError::OutgoingNotInTeam.into());
    }
    tx.delete_membership(team_id, outgoing)?;

    if tx.is_member(team_id, incoming)? {
        return Ok(false);
    }
    tx.insert_membership(team_id, incoming, None)?;
    Ok(true)
}

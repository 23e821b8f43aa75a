//! Numeric bounds per school (individual scopes) and per team (rosters).
//!
//! Checks here are advisory. The writes that follow pass the same cap to the store, whose
//! constraint is authoritative when two callers race for the last place.

use std::num::NonZeroU32;
use std::sync::Arc;

use serde::Serialize;

use super::domain::{
    Bounds, Caller, DisciplineBounds, EnrollmentScope, EventDiscipline, SchoolId, Team, TeamId,
};
use super::error::{EntityKind, RegistrationError, ValidationError};
use super::lookup;
use super::repository::{RegistryReader, RegistryStore};

/// Per-school usage of an individual enrollment scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndividualQuota {
    pub used: u32,
    /// `None` when no cap is configured.
    pub max: Option<NonZeroU32>,
    /// Whether one more enrollment fits.
    pub ok: bool,
}

impl IndividualQuota {
    fn new(used: u32, bounds: Bounds) -> Self {
        Self {
            used,
            max: bounds.max,
            ok: bounds.admits_one_more(used),
        }
    }

    pub(crate) fn ensure_room(&self) -> Result<(), RegistrationError> {
        match self.max {
            Some(max) if !self.ok => Err(ValidationError::QuotaExceeded {
                used: self.used,
                max: max.get(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}

/// Roster size against the team discipline's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamQuota {
    pub size: u32,
    pub min: u32,
    pub max: Option<NonZeroU32>,
    /// Whether the current size lies within `[min, max]`.
    pub ok: bool,
}

impl TeamQuota {
    fn new(size: u32, bounds: Bounds) -> Self {
        Self {
            size,
            min: bounds.min,
            max: bounds.max,
            ok: bounds.contains(size),
        }
    }

    pub fn has_room(&self) -> bool {
        self.max.map_or(true, |max| self.size < max.get())
    }

    pub(crate) fn ensure_room(&self) -> Result<(), RegistrationError> {
        match self.max {
            Some(max) if !self.has_room() => Err(ValidationError::QuotaExceeded {
                used: self.size,
                max: max.get(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    pub(crate) fn ensure_within_bounds(&self) -> Result<(), RegistrationError> {
        if self.ok {
            return Ok(());
        }
        Err(ValidationError::RosterSizeOutOfBounds {
            size: self.size,
            min: self.min,
            max: self.max.map(NonZeroU32::get),
        }
        .into())
    }
}

pub struct QuotaEnforcer<R> {
    store: Arc<R>,
}

impl<R> QuotaEnforcer<R>
where
    R: RegistryStore + 'static,
{
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    pub fn check_individual_quota(
        &self,
        caller: &Caller,
        school_id: SchoolId,
        scope: EnrollmentScope,
    ) -> Result<IndividualQuota, RegistrationError> {
        if !caller.can_access(school_id) {
            return Err(RegistrationError::not_found(EntityKind::School, school_id));
        }
        self.store.read(|reader| {
            reader
                .school(school_id)?
                .ok_or_else(|| RegistrationError::not_found(EntityKind::School, school_id))?;
            individual_quota(reader, school_id, scope)
        })
    }

    pub fn check_team_quota(
        &self,
        caller: &Caller,
        team_id: TeamId,
    ) -> Result<TeamQuota, RegistrationError> {
        self.store.read(|reader| {
            let team = lookup::team(reader, caller, team_id)?;
            team_quota(reader, &team)
        })
    }
}

/// Per-school bounds of an individual scope. A heat carries its own bounds.
pub(crate) fn scope_bounds<R>(reader: &R, scope: EnrollmentScope) -> Result<Bounds, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    match scope {
        EnrollmentScope::Discipline(id) => individual_bounds(&lookup::discipline(reader, id)?),
        EnrollmentScope::Heat(id) => reader
            .heat(id)?
            .map(|heat| heat.per_school)
            .ok_or_else(|| RegistrationError::not_found(EntityKind::Heat, id)),
    }
}

pub(crate) fn individual_bounds(discipline: &EventDiscipline) -> Result<Bounds, RegistrationError> {
    match discipline.bounds {
        DisciplineBounds::Individual { per_school } => Ok(per_school),
        DisciplineBounds::Team { .. } => Err(ValidationError::NotAnIndividualDiscipline.into()),
    }
}

pub(crate) fn roster_bounds(discipline: &EventDiscipline) -> Result<Bounds, RegistrationError> {
    match discipline.bounds {
        DisciplineBounds::Team { per_team } => Ok(per_team),
        DisciplineBounds::Individual { .. } => Err(ValidationError::NotATeamDiscipline.into()),
    }
}

pub(crate) fn individual_quota<R>(
    reader: &R,
    school_id: SchoolId,
    scope: EnrollmentScope,
) -> Result<IndividualQuota, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let bounds = scope_bounds(reader, scope)?;
    let used = reader.count_active_enrollments(school_id, scope)?;
    Ok(IndividualQuota::new(used, bounds))
}

pub(crate) fn team_quota<R>(reader: &R, team: &Team) -> Result<TeamQuota, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let discipline = lookup::discipline(reader, team.discipline_id)?;
    let bounds = roster_bounds(&discipline)?;
    let size = reader.members(team.id)?.len() as u32;
    Ok(TeamQuota::new(size, bounds))
}

//! Scoped record loading shared by the managers.
//!
//! Rows owned by another school are reported as missing to school managers.

use super::domain::{
    Caller, Event, EventDiscipline, EventDisciplineId, EventId, Person, PersonId, PersonKind,
    Team, TeamId, TeamStatus,
};
use super::eligibility::resolve_category;
use super::error::{EntityKind, RegistrationError, StateError, ValidationError};
use super::repository::RegistryReader;

pub(crate) fn person<R>(
    reader: &R,
    caller: &Caller,
    id: PersonId,
) -> Result<Person, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    reader
        .person(id)?
        .filter(|person| caller.can_access(person.school_id))
        .ok_or_else(|| RegistrationError::not_found(EntityKind::Person, id))
}

pub(crate) fn team<R>(reader: &R, caller: &Caller, id: TeamId) -> Result<Team, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    reader
        .team(id)?
        .filter(|team| caller.can_access(team.school_id))
        .ok_or_else(|| RegistrationError::not_found(EntityKind::Team, id))
}

pub(crate) fn discipline<R>(
    reader: &R,
    id: EventDisciplineId,
) -> Result<EventDiscipline, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    reader
        .discipline(id)?
        .ok_or_else(|| RegistrationError::not_found(EntityKind::EventDiscipline, id))
}

pub(crate) fn event<R>(reader: &R, id: EventId) -> Result<Event, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    reader
        .event(id)?
        .ok_or_else(|| RegistrationError::not_found(EntityKind::Event, id))
}

/// Loads the event behind a discipline and refuses when its enrollment switch is off.
pub(crate) fn open_event<R>(
    reader: &R,
    discipline: &EventDiscipline,
) -> Result<Event, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let event = event(reader, discipline.event_id)?;
    if !event.enrollment_open {
        return Err(ValidationError::EventClosed.into());
    }
    Ok(event)
}

pub(crate) fn ensure_not_cancelled(team: &Team) -> Result<(), RegistrationError> {
    if team.status == TeamStatus::Cancelled {
        return Err(StateError::TeamCancelled.into());
    }
    Ok(())
}

/// Active athlete whose sex and category, resolved on the event's reference date, match
/// the discipline bracket.
pub(crate) fn ensure_bracket(
    person: &Person,
    discipline: &EventDiscipline,
    event: &Event,
) -> Result<(), RegistrationError> {
    if person.kind != PersonKind::Athlete {
        return Err(ValidationError::NotAnAthlete.into());
    }
    if !person.active {
        return Err(ValidationError::PersonInactive.into());
    }

    let category = resolve_category(person.birth_date, event.reference_date);
    if !discipline.accepts(person.sex, category) {
        return Err(ValidationError::CategoryMismatch {
            expected_sex: discipline.sex,
            expected_category: discipline.category,
            found_sex: person.sex,
            found_category: category,
        }
        .into());
    }
    Ok(())
}

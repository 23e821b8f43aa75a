use std::num::NonZeroU32;
use std::sync::Arc;

use tracing::{info, warn};

use super::conferral;
use super::domain::{
    Caller, EnrollmentId, EnrollmentScope, EnrollmentStatus, EventDiscipline, Heat,
    IndividualEnrollment, NewEnrollment, PersonId, SchoolId,
};
use super::error::{EntityKind, RegistrationError, StateError, ValidationError};
use super::lookup;
use super::quota;
use super::repository::{RegistryReader, RegistryStore};

/// Individual-event enrollment, gated on bracket, documents and per-school quota.
pub struct EnrollmentManager<R> {
    store: Arc<R>,
}

impl<R> EnrollmentManager<R>
where
    R: RegistryStore + 'static,
{
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    pub fn enroll(
        &self,
        caller: &Caller,
        person_id: PersonId,
        scope: EnrollmentScope,
    ) -> Result<IndividualEnrollment, RegistrationError> {
        let (school_id, cap) = self
            .store
            .read(|reader| precheck_enrollment(reader, caller, person_id, scope))?;

        let enrollment = NewEnrollment {
            person_id,
            school_id,
            scope,
            created_by: caller.user(),
        };

        let stored = self
            .store
            .transaction(|tx| {
                let (discipline, _) = resolve_scope(&*tx, scope)?;
                lookup::open_event(&*tx, &discipline)?;
                Ok::<_, RegistrationError>(tx.insert_enrollment(enrollment, cap)?)
            })
            .map_err(|err| {
                if let RegistrationError::Conflict { constraint } = &err {
                    warn!(person = %person_id, %scope, %constraint, "enrollment lost a race at commit");
                }
                err
            })?;

        info!(
            enrollment = %stored.id,
            person = %person_id,
            school = %school_id,
            %scope,
            "enrollment created"
        );
        Ok(stored)
    }

    /// Cancels an active enrollment. Freeing a place never consults quotas.
    pub fn cancel(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
    ) -> Result<IndividualEnrollment, RegistrationError> {
        let cancelled = self.store.transaction(|tx| -> Result<_, RegistrationError> {
            let mut enrollment = tx
                .enrollment(enrollment_id)?
                .filter(|row| caller.can_access(row.school_id))
                .ok_or_else(|| RegistrationError::not_found(EntityKind::Enrollment, enrollment_id))?;

            let (discipline, _) = resolve_scope(&*tx, enrollment.scope)?;
            lookup::open_event(&*tx, &discipline)?;

            if enrollment.status != EnrollmentStatus::Active {
                return Err(StateError::EnrollmentNotActive.into());
            }

            tx.set_enrollment_status(enrollment_id, EnrollmentStatus::Cancelled)?;
            enrollment.status = EnrollmentStatus::Cancelled;
            Ok(enrollment)
        })?;

        info!(
            enrollment = %enrollment_id,
            person = %cancelled.person_id,
            scope = %cancelled.scope,
            "enrollment cancelled"
        );
        Ok(cancelled)
    }
}

/// Validates every enrollment precondition in order and returns the owning school and
/// the cap the insert must honor.
fn precheck_enrollment<R>(
    reader: &R,
    caller: &Caller,
    person_id: PersonId,
    scope: EnrollmentScope,
) -> Result<(SchoolId, Option<NonZeroU32>), RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    let person = lookup::person(reader, caller, person_id)?;
    let (discipline, heat) = resolve_scope(reader, scope)?;
    let event = lookup::open_event(reader, &discipline)?;

    quota::individual_bounds(&discipline)?;
    match &heat {
        Some(heat) if !heat.active => return Err(ValidationError::HeatInactive.into()),
        Some(_) => {}
        None => {
            if reader.heats_of(discipline.id)?.iter().any(|heat| heat.active) {
                return Err(ValidationError::HeatRequired.into());
            }
        }
    }

    lookup::ensure_bracket(&person, &discipline, &event)?;

    if reader.active_enrollment(person_id, scope)?.is_some() {
        return Err(ValidationError::AlreadyEnrolled.into());
    }

    conferral::ensure_concluded(reader, person_id, person.school_id)?;

    let quota = quota::individual_quota(reader, person.school_id, scope)?;
    quota.ensure_room()?;

    Ok((person.school_id, quota.max))
}

/// The discipline that defines the bracket for a scope; heats inherit their parent's.
fn resolve_scope<R>(
    reader: &R,
    scope: EnrollmentScope,
) -> Result<(EventDiscipline, Option<Heat>), RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    match scope {
        EnrollmentScope::Discipline(id) => Ok((lookup::discipline(reader, id)?, None)),
        EnrollmentScope::Heat(id) => {
            let heat = reader
                .heat(id)?
                .ok_or_else(|| RegistrationError::not_found(EntityKind::Heat, id))?;
            let discipline = lookup::discipline(reader, heat.discipline_id)?;
            Ok((discipline, Some(heat)))
        }
    }
}

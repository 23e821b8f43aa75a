//! Document conferral tracking: per (person, school) upload presence and review status.

mod policy;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use policy::{AutoCompleteConferral, ConferralPolicies, ConferralPolicy, ManualConferral};

use super::domain::{
    Caller, ConferralRecord, ConferralStatus, DocumentKind, PersonId, SchoolId,
};
use super::error::{EntityKind, RegistrationError, ValidationError};
use super::lookup;
use super::repository::{RegistryReader, RegistryStore};

/// Administrator verdict on a document set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConferralVerdict {
    Concluded,
    Returned,
}

impl From<ConferralVerdict> for ConferralStatus {
    fn from(value: ConferralVerdict) -> Self {
        match value {
            ConferralVerdict::Concluded => ConferralStatus::Concluded,
            ConferralVerdict::Returned => ConferralStatus::Returned,
        }
    }
}

pub struct ConferralTracker<R> {
    store: Arc<R>,
    policies: ConferralPolicies,
}

impl<R> ConferralTracker<R>
where
    R: RegistryStore + 'static,
{
    pub fn new(store: Arc<R>, policies: ConferralPolicies) -> Self {
        Self { store, policies }
    }

    /// Stores a document url and re-derives the status through the person type's policy.
    pub fn record_upload(
        &self,
        caller: &Caller,
        person_id: PersonId,
        school_id: SchoolId,
        kind: DocumentKind,
        url: &str,
    ) -> Result<ConferralRecord, RegistrationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyDocumentUrl.into());
        }

        let record = self.store.transaction(|tx| {
            ensure_school(&*tx, caller, school_id)?;
            let person = lookup::person(&*tx, caller, person_id)?;

            let now = Utc::now();
            let mut record = tx
                .conferral(person_id, school_id)?
                .unwrap_or_else(|| ConferralRecord::empty(person_id, school_id, now));
            record.set_document(kind, url.to_string());
            record.status = self.policies.for_kind(person.kind).on_upload(&record);
            record.updated_at = now;

            tx.save_conferral(record.clone())?;
            Ok::<_, RegistrationError>(record)
        })?;

        info!(
            person = %person_id,
            school = %school_id,
            document = ?kind,
            status = record.status.label(),
            "document uploaded"
        );
        Ok(record)
    }

    /// Current status; a person with nothing uploaded is `Pending`.
    pub fn status(
        &self,
        caller: &Caller,
        person_id: PersonId,
        school_id: SchoolId,
    ) -> Result<ConferralStatus, RegistrationError> {
        self.store.read(|reader| {
            ensure_school(reader, caller, school_id)?;
            lookup::person(reader, caller, person_id)?;
            current_status(reader, person_id, school_id)
        })
    }

    /// Administrator conferral. Repeating a verdict re-asserts it and overwrites the
    /// observation.
    pub fn set_status(
        &self,
        caller: &Caller,
        person_id: PersonId,
        school_id: SchoolId,
        verdict: ConferralVerdict,
        observation: Option<String>,
    ) -> Result<ConferralRecord, RegistrationError> {
        let admin = caller
            .admin_capability()
            .ok_or(RegistrationError::Unauthorized)?;

        let observation = observation
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if verdict == ConferralVerdict::Returned && observation.is_none() {
            return Err(ValidationError::EmptyObservation.into());
        }

        let record = self.store.transaction(|tx| {
            ensure_school(&*tx, caller, school_id)?;
            lookup::person(&*tx, caller, person_id)?;

            let now = Utc::now();
            let mut record = tx
                .conferral(person_id, school_id)?
                .unwrap_or_else(|| ConferralRecord::empty(person_id, school_id, now));
            record.status = verdict.into();
            record.observation = observation;
            record.updated_at = now;

            tx.save_conferral(record.clone())?;
            Ok::<_, RegistrationError>(record)
        })?;

        info!(
            admin = %admin.user(),
            person = %person_id,
            school = %school_id,
            status = record.status.label(),
            "conferral status set"
        );
        Ok(record)
    }
}

fn ensure_school<R>(reader: &R, caller: &Caller, school_id: SchoolId) -> Result<(), RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    match reader.school(school_id)? {
        Some(school) if caller.can_access(school.id) => Ok(()),
        _ => Err(RegistrationError::not_found(EntityKind::School, school_id)),
    }
}

pub(crate) fn current_status<R>(
    reader: &R,
    person_id: PersonId,
    school_id: SchoolId,
) -> Result<ConferralStatus, RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    Ok(reader
        .conferral(person_id, school_id)?
        .map_or(ConferralStatus::Pending, |record| record.status))
}

/// Enrollment gate: only a concluded document set passes.
pub(crate) fn ensure_concluded<R>(
    reader: &R,
    person_id: PersonId,
    school_id: SchoolId,
) -> Result<(), RegistrationError>
where
    R: RegistryReader + ?Sized,
{
    match current_status(reader, person_id, school_id)? {
        ConferralStatus::Concluded => Ok(()),
        status => Err(ValidationError::DocsNotReady { status }.into()),
    }
}

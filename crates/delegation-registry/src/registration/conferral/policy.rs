use std::sync::Arc;

use super::super::domain::{ConferralRecord, ConferralStatus, PersonKind};

/// Decides the status a document set lands in right after an upload.
pub trait ConferralPolicy: Send + Sync {
    fn on_upload(&self, record: &ConferralRecord) -> ConferralStatus;
}

/// Uploads always await an administrator's review.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualConferral;

impl ConferralPolicy for ManualConferral {
    fn on_upload(&self, _record: &ConferralRecord) -> ConferralStatus {
        ConferralStatus::Pending
    }
}

/// Concludes as soon as photo and both identity sides are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoCompleteConferral;

impl ConferralPolicy for AutoCompleteConferral {
    fn on_upload(&self, record: &ConferralRecord) -> ConferralStatus {
        if record.has_complete_set() {
            ConferralStatus::Concluded
        } else {
            ConferralStatus::Pending
        }
    }
}

/// Policy selection per person type. Athletes and staff deliberately differ.
#[derive(Clone)]
pub struct ConferralPolicies {
    athlete: Arc<dyn ConferralPolicy>,
    staff: Arc<dyn ConferralPolicy>,
}

impl ConferralPolicies {
    pub fn new(athlete: Arc<dyn ConferralPolicy>, staff: Arc<dyn ConferralPolicy>) -> Self {
        Self { athlete, staff }
    }

    pub fn for_kind(&self, kind: PersonKind) -> &dyn ConferralPolicy {
        match kind {
            PersonKind::Athlete => self.athlete.as_ref(),
            PersonKind::Staff => self.staff.as_ref(),
        }
    }
}

impl Default for ConferralPolicies {
    fn default() -> Self {
        Self::new(Arc::new(ManualConferral), Arc::new(AutoCompleteConferral))
    }
}

impl std::fmt::Debug for ConferralPolicies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferralPolicies").finish_non_exhaustive()
    }
}

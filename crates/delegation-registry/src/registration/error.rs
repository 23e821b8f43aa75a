use serde::Serialize;

use super::domain::{Category, ConferralStatus, Sex, SubstitutionStatus};
use super::repository::RepositoryError;

/// Precondition failures detected before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("enrollment is closed for this event")]
    EventClosed,
    #[error(
        "person does not fit the bracket (expected {expected_sex:?} {expected_category:?}, found {found_sex:?} {found_category:?})"
    )]
    CategoryMismatch {
        expected_sex: Sex,
        expected_category: Category,
        found_sex: Sex,
        found_category: Option<Category>,
    },
    #[error("person already holds an active enrollment in this scope")]
    AlreadyEnrolled,
    #[error("person is already on the roster")]
    AlreadyMember,
    #[error("person is not on the roster")]
    NotAMember,
    #[error("outgoing person is no longer on the roster")]
    OutgoingNotInTeam,
    #[error("documents are not concluded (status {status:?})")]
    DocsNotReady { status: ConferralStatus },
    #[error("quota exceeded ({used} of {max} places used)")]
    QuotaExceeded { used: u32, max: u32 },
    #[error("roster size {size} is outside the configured bounds (min {min}, max {max:?})")]
    RosterSizeOutOfBounds {
        size: u32,
        min: u32,
        max: Option<u32>,
    },
    #[error("a justification is required")]
    EmptyJustification,
    #[error("an observation is required when returning documents")]
    EmptyObservation,
    #[error("a document url is required")]
    EmptyDocumentUrl,
    #[error("only athletes can be enrolled or rostered")]
    NotAnAthlete,
    #[error("person is inactive")]
    PersonInactive,
    #[error("heat is inactive")]
    HeatInactive,
    #[error("discipline is not a team discipline")]
    NotATeamDiscipline,
    #[error("discipline is not an individual discipline")]
    NotAnIndividualDiscipline,
    #[error("individual discipline has heats; enroll in a heat instead")]
    HeatRequired,
}

impl ValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            ValidationError::EventClosed => "EVENT_CLOSED",
            ValidationError::CategoryMismatch { .. } => "CATEGORY_MISMATCH",
            ValidationError::AlreadyEnrolled => "ALREADY_ENROLLED",
            ValidationError::AlreadyMember => "ALREADY_MEMBER",
            ValidationError::NotAMember => "NOT_A_MEMBER",
            ValidationError::OutgoingNotInTeam => "OUTGOING_NOT_IN_TEAM",
            ValidationError::DocsNotReady { .. } => "DOCS_NOT_READY",
            ValidationError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            ValidationError::RosterSizeOutOfBounds { .. } => "ROSTER_SIZE_OUT_OF_BOUNDS",
            ValidationError::EmptyJustification => "EMPTY_JUSTIFICATION",
            ValidationError::EmptyObservation => "EMPTY_OBSERVATION",
            ValidationError::EmptyDocumentUrl => "EMPTY_DOCUMENT_URL",
            ValidationError::NotAnAthlete => "NOT_AN_ATHLETE",
            ValidationError::PersonInactive => "PERSON_INACTIVE",
            ValidationError::HeatInactive => "HEAT_INACTIVE",
            ValidationError::NotATeamDiscipline => "NOT_A_TEAM_DISCIPLINE",
            ValidationError::NotAnIndividualDiscipline => "NOT_AN_INDIVIDUAL_DISCIPLINE",
            ValidationError::HeatRequired => "HEAT_REQUIRED",
        }
    }
}

/// Operation not allowed from the record's current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("substitution already decided ({status:?})")]
    AlreadyDecided { status: SubstitutionStatus },
    #[error("team is cancelled")]
    TeamCancelled,
    #[error("enrollment is not active")]
    EnrollmentNotActive,
}

impl StateError {
    pub const fn code(&self) -> &'static str {
        match self {
            StateError::AlreadyDecided { .. } => "ALREADY_DECIDED",
            StateError::TeamCancelled => "TEAM_CANCELLED",
            StateError::EnrollmentNotActive => "ENROLLMENT_NOT_ACTIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    School,
    Event,
    EventDiscipline,
    Heat,
    Enrollment,
    Team,
    Substitution,
}

/// Typed result of every registration operation.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{entity:?} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    /// A storage constraint rejected the write after the pre-check had passed.
    #[error("concurrent change rejected at commit: {constraint}")]
    Conflict { constraint: String },
    #[error("administrator capability required")]
    Unauthorized,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl RegistrationError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::Validation(err) => err.code(),
            RegistrationError::State(err) => err.code(),
            RegistrationError::NotFound { .. } => "NOT_FOUND",
            RegistrationError::Conflict { .. } => "CONFLICT",
            RegistrationError::Unauthorized => "UNAUTHORIZED",
            RegistrationError::Repository(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl From<RepositoryError> for RegistrationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict { constraint } => Self::Conflict {
                constraint: constraint.to_string(),
            },
            other => Self::Repository(other),
        }
    }
}

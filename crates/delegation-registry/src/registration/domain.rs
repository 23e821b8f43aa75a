use std::fmt;
use std::num::NonZeroU32;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identity issued by the external credential provider.
    UserId
);
record_id!(MunicipalityId);
record_id!(SchoolId);
record_id!(PersonId);
record_id!(EventId);
record_id!(
    /// Identifier of an `evento_modalidade` row.
    EventDisciplineId
);
record_id!(
    /// Identifier of an `evento_prova` row. Numbered independently of disciplines.
    HeatId
);
record_id!(EnrollmentId);
record_id!(TeamId);
record_id!(SubstitutionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub const fn label(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

/// Competition age bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "12-14")]
    Age12To14,
    #[serde(rename = "15-17")]
    Age15To17,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::Age12To14 => "12-14",
            Category::Age15To17 => "15-17",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonKind {
    Athlete,
    Staff,
}

/// Athlete or staff member registered under a school.
///
/// Category is never stored; it is resolved from `birth_date` against the event's
/// reference date whenever eligibility is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub kind: PersonKind,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub school_id: SchoolId,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub municipality_id: MunicipalityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Global switch: when false no enrollment or roster mutation is accepted.
    pub enrollment_open: bool,
    /// Fixed date every category evaluation for this event is computed against.
    pub reference_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisciplineKind {
    Individual,
    Team,
}

/// Numeric participation bounds.
///
/// An absent maximum means "no cap configured". Raw storage values of `0` or null
/// normalize to `None`, they never mean "zero allowed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub max: Option<NonZeroU32>,
}

impl Bounds {
    pub fn from_raw(min: Option<u32>, max: Option<u32>) -> Self {
        Self {
            min: min.unwrap_or(0),
            max: max.and_then(NonZeroU32::new),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether one more participant fits beside `current`.
    pub fn admits_one_more(&self, current: u32) -> bool {
        self.max.map_or(true, |max| current < max.get())
    }

    pub fn contains(&self, size: u32) -> bool {
        size >= self.min && self.max.map_or(true, |max| size <= max.get())
    }
}

/// Participation bounds, tied to the discipline kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisciplineBounds {
    /// Per-school bounds for individual disciplines.
    Individual { per_school: Bounds },
    /// Per-team roster bounds for team disciplines.
    Team { per_team: Bounds },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDiscipline {
    pub id: EventDisciplineId,
    pub event_id: EventId,
    pub discipline: String,
    pub category: Category,
    pub sex: Sex,
    pub bounds: DisciplineBounds,
    /// Configured substitution allowance. Stored and returned, not enforced.
    pub substitution_cap: Option<NonZeroU32>,
}

impl EventDiscipline {
    pub fn kind(&self) -> DisciplineKind {
        match self.bounds {
            DisciplineBounds::Individual { .. } => DisciplineKind::Individual,
            DisciplineBounds::Team { .. } => DisciplineKind::Team,
        }
    }

    pub fn accepts(&self, sex: Sex, category: Option<Category>) -> bool {
        self.sex == sex && category == Some(self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heat {
    pub id: HeatId,
    pub discipline_id: EventDisciplineId,
    pub name: String,
    pub per_school: Bounds,
    pub active: bool,
}

/// Target of an individual enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EnrollmentScope {
    Discipline(EventDisciplineId),
    Heat(HeatId),
}

impl fmt::Display for EnrollmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentScope::Discipline(id) => write!(f, "discipline:{id}"),
            EnrollmentScope::Heat(id) => write!(f, "heat:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualEnrollment {
    pub id: EnrollmentId,
    pub person_id: PersonId,
    pub school_id: SchoolId,
    pub scope: EnrollmentScope,
    pub status: EnrollmentStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    pub person_id: PersonId,
    pub school_id: SchoolId,
    pub scope: EnrollmentScope,
    pub created_by: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
    Pending,
    /// Asserted once when roster bounds held. Later roster changes do not revert it, so
    /// the status can go stale.
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub discipline_id: EventDisciplineId,
    pub school_id: SchoolId,
    pub status: TeamStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeam {
    pub discipline_id: EventDisciplineId,
    pub school_id: SchoolId,
    pub created_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team_id: TeamId,
    pub person_id: PersonId,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Photo,
    IdentityFront,
    IdentityBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConferralStatus {
    Pending,
    Concluded,
    Returned,
}

impl ConferralStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ConferralStatus::Pending => "PENDING",
            ConferralStatus::Concluded => "CONCLUDED",
            ConferralStatus::Returned => "RETURNED",
        }
    }
}

/// Per (person, school) document set and its review status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferralRecord {
    pub person_id: PersonId,
    pub school_id: SchoolId,
    pub photo_url: Option<String>,
    pub identity_front_url: Option<String>,
    pub identity_back_url: Option<String>,
    pub status: ConferralStatus,
    pub observation: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConferralRecord {
    pub fn empty(person_id: PersonId, school_id: SchoolId, now: DateTime<Utc>) -> Self {
        Self {
            person_id,
            school_id,
            photo_url: None,
            identity_front_url: None,
            identity_back_url: None,
            status: ConferralStatus::Pending,
            observation: None,
            updated_at: now,
        }
    }

    pub fn document(&self, kind: DocumentKind) -> Option<&str> {
        let slot = match kind {
            DocumentKind::Photo => &self.photo_url,
            DocumentKind::IdentityFront => &self.identity_front_url,
            DocumentKind::IdentityBack => &self.identity_back_url,
        };
        slot.as_deref().filter(|url| !url.trim().is_empty())
    }

    pub fn set_document(&mut self, kind: DocumentKind, url: String) {
        let slot = match kind {
            DocumentKind::Photo => &mut self.photo_url,
            DocumentKind::IdentityFront => &mut self.identity_front_url,
            DocumentKind::IdentityBack => &mut self.identity_back_url,
        };
        *slot = Some(url);
    }

    pub fn has_complete_set(&self) -> bool {
        [
            DocumentKind::Photo,
            DocumentKind::IdentityFront,
            DocumentKind::IdentityBack,
        ]
        .into_iter()
        .all(|kind| self.document(kind).is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubstitutionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubstitutionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubstitutionStatus::Pending => "PENDING",
            SubstitutionStatus::Approved => "APPROVED",
            SubstitutionStatus::Rejected => "REJECTED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, SubstitutionStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    pub id: SubstitutionId,
    pub team_id: TeamId,
    pub school_id: SchoolId,
    pub outgoing_person_id: PersonId,
    pub incoming_person_id: PersonId,
    pub justification: String,
    pub evidence_url: Option<String>,
    pub status: SubstitutionStatus,
    pub observation: Option<String>,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubstitution {
    pub team_id: TeamId,
    pub school_id: SchoolId,
    pub outgoing_person_id: PersonId,
    pub incoming_person_id: PersonId,
    pub justification: String,
    pub evidence_url: Option<String>,
    pub requested_by: UserId,
}

/// Proof that the identity provider granted administrator capability to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCapability {
    user: UserId,
}

impl AdminCapability {
    pub fn user(&self) -> UserId {
        self.user
    }
}

/// Authenticated identity handed to the core by the calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Caller {
    SchoolManager { user: UserId, school: SchoolId },
    Administrator { user: UserId },
}

impl Caller {
    /// Builds a caller from what the identity provider reports. The admin flag wins over
    /// any school attachment. Returns `None` for a non-admin without a school.
    pub fn from_identity(user: UserId, school: Option<SchoolId>, is_admin: bool) -> Option<Self> {
        if is_admin {
            return Some(Caller::Administrator { user });
        }
        school.map(|school| Caller::SchoolManager { user, school })
    }

    pub fn user(&self) -> UserId {
        match self {
            Caller::SchoolManager { user, .. } | Caller::Administrator { user } => *user,
        }
    }

    pub fn admin_capability(&self) -> Option<AdminCapability> {
        match self {
            Caller::Administrator { user } => Some(AdminCapability { user: *user }),
            Caller::SchoolManager { .. } => None,
        }
    }

    /// Whether the caller may see and mutate rows owned by `school`.
    pub fn can_access(&self, school: SchoolId) -> bool {
        match self {
            Caller::Administrator { .. } => true,
            Caller::SchoolManager { school: own, .. } => *own == school,
        }
    }

    /// School filter to apply to listing queries; `None` means unscoped.
    pub fn school_scope(&self) -> Option<SchoolId> {
        match self {
            Caller::Administrator { .. } => None,
            Caller::SchoolManager { school, .. } => Some(*school),
        }
    }
}

//! Delegation registration core: eligibility brackets, document conferral, quotas,
//! individual enrollment, team rosters and the substitution workflow.
//!
//! Every mutating operation runs inside a single [`RegistryStore::transaction`], so a
//! failed call leaves no partial writes behind.

pub mod conferral;
pub mod domain;
pub mod eligibility;
pub mod enrollment;
pub mod error;
mod lookup;
pub mod memory;
pub mod quota;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod substitution;

#[cfg(test)]
mod tests;

pub use conferral::{
    AutoCompleteConferral, ConferralPolicies, ConferralPolicy, ConferralTracker,
    ConferralVerdict, ManualConferral,
};
pub use domain::{
    AdminCapability, Bounds, Caller, Category, ConferralRecord, ConferralStatus,
    DisciplineBounds, DisciplineKind, DocumentKind, EnrollmentId, EnrollmentScope,
    EnrollmentStatus, Event, EventDiscipline, EventDisciplineId, EventId, Heat, HeatId,
    IndividualEnrollment, MunicipalityId, Person, PersonId, PersonKind, School, SchoolId, Sex,
    SubstitutionId, SubstitutionRequest, SubstitutionStatus, Team, TeamId, TeamMembership,
    TeamStatus, UserId,
};
pub use eligibility::{age_on, resolve_category};
pub use error::{EntityKind, RegistrationError, StateError, ValidationError};
pub use memory::MemoryRegistryStore;
pub use quota::{IndividualQuota, QuotaEnforcer, TeamQuota};
pub use repository::{RegistryReader, RegistryStore, RegistryWriter, RepositoryError};
pub use roster::{RosterManager, TeamRoster};
pub use router::registration_router;
pub use service::RegistrationService;
pub use substitution::{DecisionNotes, SubstitutionWorkflow};
pub use enrollment::EnrollmentManager;

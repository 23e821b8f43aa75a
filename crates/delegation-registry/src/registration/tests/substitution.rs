use super::common::*;
use crate::registration::domain::{PersonId, SubstitutionStatus, TeamId};
use crate::registration::error::{RegistrationError, StateError, ValidationError};
use crate::registration::memory::MemoryRegistryStore;
use crate::registration::service::RegistrationService;
use crate::registration::substitution::DecisionNotes;

fn roster_of(service: &RegistrationService<MemoryRegistryStore>, team: TeamId) -> Vec<PersonId> {
    service
        .team_roster(&admin(), team)
        .expect("roster readable")
        .members
        .into_iter()
        .map(|membership| membership.person_id)
        .collect()
}

#[test]
fn request_leaves_roster_untouched() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);

    let request = service
        .request_substitution(
            &manager(SCHOOL_A),
            team,
            DORA,
            FLORA,
            "Lesão no joelho",
            Some("https://docs.example/atestado.pdf"),
        )
        .expect("request filed");

    assert_eq!(request.status, SubstitutionStatus::Pending);
    assert_eq!(request.school_id, SCHOOL_A);
    assert!(request.decided_at.is_none());
    assert_eq!(roster_of(&service, team), vec![DORA, EVA]);
}

#[test]
fn request_validates_justification_and_membership() {
    let (_, service) = build_service();
    let caller = manager(SCHOOL_A);
    let team = volley_team(&service, &[DORA, EVA]);

    let err = service
        .request_substitution(&caller, team, DORA, FLORA, "   ", None)
        .expect_err("justification required");
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::EmptyJustification)
    ));

    let err = service
        .request_substitution(&caller, team, FLORA, GABI, "Troca", None)
        .expect_err("outgoing not on roster");
    assert_eq!(err.code(), "NOT_A_MEMBER");

    let err = service
        .request_substitution(&caller, team, DORA, EVA, "Troca", None)
        .expect_err("incoming already on roster");
    assert_eq!(err.code(), "ALREADY_MEMBER");

    let err = service
        .request_substitution(&caller, team, DORA, HUGO, "Troca", None)
        .expect_err("incoming outside bracket");
    assert_eq!(err.code(), "CATEGORY_MISMATCH");
}

#[test]
fn approval_swaps_members_and_records_decision() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");

    let approved = service
        .approve_substitution(&admin(), request.id)
        .expect("approved");

    assert_eq!(approved.status, SubstitutionStatus::Approved);
    assert_eq!(approved.decided_by, Some(admin().user()));
    assert_eq!(
        approved.observation.as_deref(),
        Some(DecisionNotes::default().approval.as_str())
    );
    assert_eq!(roster_of(&service, team), vec![EVA, FLORA]);
}

#[test]
fn managers_cannot_decide() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");

    for result in [
        service.approve_substitution(&manager(SCHOOL_A), request.id),
        service.reject_substitution(&manager(SCHOOL_A), request.id, None),
    ] {
        assert!(matches!(result, Err(RegistrationError::Unauthorized)));
    }
}

#[test]
fn second_approval_is_refused_and_roster_unchanged() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");
    service
        .approve_substitution(&admin(), request.id)
        .expect("first approval");

    match service.approve_substitution(&admin(), request.id) {
        Err(RegistrationError::State(StateError::AlreadyDecided {
            status: SubstitutionStatus::Approved,
        })) => {}
        other => panic!("expected already decided, got {other:?}"),
    }
    assert_eq!(roster_of(&service, team), vec![EVA, FLORA]);
}

#[test]
fn rejection_without_reason_uses_default_note() {
    let notes = DecisionNotes {
        approval: "Aprovado".to_string(),
        rejection: "Indeferido pela comissão".to_string(),
    };
    let service = RegistrationService::new(seeded_store(), notes);
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");

    let rejected = service
        .reject_substitution(&admin(), request.id, Some("  "))
        .expect("rejected");
    assert_eq!(rejected.status, SubstitutionStatus::Rejected);
    assert_eq!(rejected.observation.as_deref(), Some("Indeferido pela comissão"));
    assert_eq!(roster_of(&service, team), vec![DORA, EVA]);

    let err = service
        .approve_substitution(&admin(), request.id)
        .expect_err("terminal");
    assert_eq!(err.code(), "ALREADY_DECIDED");
}

#[test]
fn approval_aborts_when_outgoing_already_left() {
    let (_, service) = build_service();
    let caller = manager(SCHOOL_A);
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&caller, team, DORA, FLORA, "Lesão", None)
        .expect("request filed");
    service
        .remove_member(&caller, team, DORA)
        .expect("removed meanwhile");

    let err = service
        .approve_substitution(&admin(), request.id)
        .expect_err("outgoing gone");
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::OutgoingNotInTeam)
    ));

    let still = service
        .substitution(&admin(), request.id)
        .expect("request readable");
    assert_eq!(still.status, SubstitutionStatus::Pending);
    assert_eq!(roster_of(&service, team), vec![EVA]);
}

#[test]
fn approval_does_not_duplicate_an_incoming_member() {
    let (_, service) = build_service();
    let caller = manager(SCHOOL_A);
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&caller, team, DORA, FLORA, "Lesão", None)
        .expect("request filed");
    service
        .add_member(&caller, team, FLORA)
        .expect("added meanwhile");

    service
        .approve_substitution(&admin(), request.id)
        .expect("approved");
    assert_eq!(roster_of(&service, team), vec![EVA, FLORA]);
}

#[test]
fn closed_event_blocks_approval_but_not_filing() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    close_enrollment(&service);

    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed after close");

    match service.approve_substitution(&admin(), request.id) {
        Err(RegistrationError::Validation(ValidationError::EventClosed)) => {}
        other => panic!("expected EVENT_CLOSED, got {other:?}"),
    }
    assert_eq!(roster_of(&service, team), vec![DORA, EVA]);

    let stored = service
        .substitution(&admin(), request.id)
        .expect("request readable");
    assert_eq!(stored.status, SubstitutionStatus::Pending);
    assert!(stored.decided_by.is_none());

    service
        .set_enrollment_open(&admin(), EVENT, true)
        .expect("switch reopened");
    service
        .approve_substitution(&admin(), request.id)
        .expect("approved once reopened");
    assert_eq!(roster_of(&service, team), vec![EVA, FLORA]);
}

#[test]
fn pending_listing_is_scoped_to_the_caller() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");

    let own = service
        .pending_substitutions(&manager(SCHOOL_A))
        .expect("listing");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, request.id);

    assert!(service
        .pending_substitutions(&manager(SCHOOL_B))
        .expect("listing")
        .is_empty());
    assert_eq!(
        service
            .substitution(&manager(SCHOOL_B), request.id)
            .expect_err("hidden")
            .code(),
        "NOT_FOUND"
    );

    service
        .approve_substitution(&admin(), request.id)
        .expect("approved");
    assert!(service
        .pending_substitutions(&admin())
        .expect("listing")
        .is_empty());
}

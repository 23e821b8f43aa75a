use super::common::*;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::registration::domain::Caller;
use crate::registration::error::{RegistrationError, StateError, ValidationError};
use crate::registration::router::{error_response, status_for, CallerIdentity};
use crate::registration::substitution::DecisionNotes;

#[test]
fn errors_map_to_status_codes() {
    let cases = [
        (
            RegistrationError::from(ValidationError::EventClosed),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            RegistrationError::from(StateError::TeamCancelled),
            StatusCode::CONFLICT,
        ),
        (
            RegistrationError::Conflict {
                constraint: "roster_size_cap".to_string(),
            },
            StatusCode::CONFLICT,
        ),
        (
            RegistrationError::not_found(
                crate::registration::error::EntityKind::Team,
                7,
            ),
            StatusCode::NOT_FOUND,
        ),
        (RegistrationError::Unauthorized, StatusCode::FORBIDDEN),
        (
            RegistrationError::Repository(
                crate::registration::repository::RepositoryError::Unavailable("down".to_string()),
            ),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(status_for(&error), expected, "{error:?}");
    }
}

#[tokio::test]
async fn error_body_carries_code_and_message() {
    let response = error_response(ValidationError::HeatRequired.into());
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = read_json_body(response).await;
    assert_eq!(body["error"], "HEAT_REQUIRED");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn enroll_handler_reports_missing_documents() {
    let (_, service) = build_service();
    let response = crate::registration::router::enroll_handler::<
        crate::registration::memory::MemoryRegistryStore,
    >(
        State(Arc::new(service)),
        CallerIdentity(manager(SCHOOL_A)),
        axum::Json(
            serde_json::from_value(json!({
                "person_id": ANA.0,
                "scope": { "type": "discipline", "id": SPRINT.0 },
            }))
            .expect("valid body"),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "DOCS_NOT_READY");
}

#[tokio::test]
async fn missing_identity_headers_are_rejected() {
    let (_, service) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(Method::GET, "/api/v1/substitutions", None, None))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn enroll_route_creates_enrollment() {
    let (_, service) = build_service();
    conclude(&service, ANA, SCHOOL_A);
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/enrollments",
            Some(manager(SCHOOL_A)),
            Some(json!({
                "person_id": ANA.0,
                "scope": { "type": "discipline", "id": SPRINT.0 },
            })),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["school_id"], SCHOOL_A.0);
}

#[tokio::test]
async fn approve_route_requires_admin() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    let request = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");
    let router = router_with_service(service);
    let uri = format!("/api/v1/substitutions/{}/approve", request.id);

    let forbidden = router
        .clone()
        .oneshot(json_request(Method::POST, &uri, Some(manager(SCHOOL_A)), None))
        .await
        .expect("router responds");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let approved = router
        .clone()
        .oneshot(json_request(Method::POST, &uri, Some(admin()), None))
        .await
        .expect("router responds");
    assert_eq!(approved.status(), StatusCode::OK);
    assert_eq!(read_json_body(approved).await["status"], "APPROVED");

    let repeated = router
        .oneshot(json_request(Method::POST, &uri, Some(admin()), None))
        .await
        .expect("router responds");
    assert_eq!(repeated.status(), StatusCode::CONFLICT);
    assert_eq!(read_json_body(repeated).await["error"], "ALREADY_DECIDED");
}

#[tokio::test]
async fn reject_route_accepts_missing_body() {
    let (_, service) = build_service();
    let team = volley_team(&service, &[DORA, EVA]);
    let first = service
        .request_substitution(&manager(SCHOOL_A), team, DORA, FLORA, "Lesão", None)
        .expect("request filed");
    let second = service
        .request_substitution(&manager(SCHOOL_A), team, EVA, GABI, "Transferência", None)
        .expect("request filed");
    let router = router_with_service(service);

    let bare = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/substitutions/{}/reject", first.id),
            Some(admin()),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(bare.status(), StatusCode::OK);
    let body = read_json_body(bare).await;
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["observation"], DecisionNotes::default().rejection);

    let noted = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/substitutions/{}/reject", second.id),
            Some(admin()),
            Some(json!({ "observation": "Laudo ilegível" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(noted.status(), StatusCode::OK);
    assert_eq!(read_json_body(noted).await["observation"], "Laudo ilegível");
}

#[tokio::test]
async fn team_routes_cover_roster_lifecycle() {
    let (_, service) = build_service();
    let router = router_with_service(service);
    let caller = manager(SCHOOL_A);

    let created = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/teams",
            Some(caller),
            Some(json!({ "discipline_id": VOLLEY.0, "school_id": SCHOOL_A.0 })),
        ))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let team_id = read_json_body(created).await["id"]
        .as_u64()
        .expect("team id");

    for person in [DORA, EVA] {
        let added = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/v1/teams/{team_id}/members"),
                Some(caller),
                Some(json!({ "person_id": person.0 })),
            ))
            .await
            .expect("router responds");
        assert_eq!(added.status(), StatusCode::CREATED);
    }

    let removed = router
        .clone()
        .oneshot(json_request(
            Method::DELETE,
            &format!("/api/v1/teams/{team_id}/members/{}", EVA.0),
            Some(caller),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let quota = router
        .oneshot(json_request(
            Method::GET,
            &format!("/api/v1/teams/{team_id}/quota"),
            Some(caller),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(quota.status(), StatusCode::OK);
    let body = read_json_body(quota).await;
    assert_eq!(body["size"], 1);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn school_quota_route_needs_exactly_one_scope() {
    let (_, service) = build_service();
    let router = router_with_service(service);

    let bad = router
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("/api/v1/schools/{}/quota", SCHOOL_A.0),
            Some(admin()),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let ok = router
        .oneshot(json_request(
            Method::GET,
            &format!("/api/v1/schools/{}/quota?heat={}", SCHOOL_A.0, SWIM_HEAT.0),
            Some(admin()),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(read_json_body(ok).await["max"], 1);
}

#[tokio::test]
async fn category_route_resolves_brackets() {
    let (_, service) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/eligibility/category",
            None,
            Some(json!({ "birth_date": "2011-01-01", "reference_date": "2025-12-31" })),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["category"], "12-14");
    assert_eq!(body["eligible"], true);
}

#[tokio::test]
async fn conferral_routes_upload_and_decide() {
    let (_, service) = build_service();
    let router = router_with_service(service);
    let base = format!("/api/v1/schools/{}/persons/{}", SCHOOL_A.0, COACH.0);

    for kind in ["photo", "identity_front", "identity_back"] {
        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("{base}/documents"),
                Some(manager(SCHOOL_A)),
                Some(json!({ "kind": kind, "url": format!("https://docs.example/{kind}.jpg") })),
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let status = router
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("{base}/conferral"),
            Some(manager(SCHOOL_A)),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(read_json_body(status).await["status"], "CONCLUDED");

    let returned = router
        .oneshot(json_request(
            Method::PUT,
            &format!("{base}/conferral"),
            Some(admin()),
            Some(json!({ "status": "RETURNED" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(returned.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json_body(returned).await["error"], "EMPTY_OBSERVATION");
}

#[tokio::test]
async fn enrollment_switch_is_admin_only() {
    let (_, service) = build_service();
    let router = router_with_service(service);
    let uri = format!("/api/v1/events/{}/enrollment", EVENT.0);

    let forbidden = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &uri,
            Some(manager(SCHOOL_A)),
            Some(json!({ "open": false })),
        ))
        .await
        .expect("router responds");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let closed = router
        .oneshot(json_request(
            Method::PUT,
            &uri,
            Some(admin()),
            Some(json!({ "open": false })),
        ))
        .await
        .expect("router responds");
    assert_eq!(closed.status(), StatusCode::OK);
    assert_eq!(read_json_body(closed).await["enrollment_open"], false);
}

#[test]
fn admin_flag_wins_over_school_header() {
    use crate::registration::router::caller_from_headers;
    use axum::http::HeaderMap;

    let mut headers = HeaderMap::new();
    headers.insert("x-caller-id", "9".parse().expect("header value"));
    headers.insert("x-caller-school", "10".parse().expect("header value"));
    headers.insert("x-caller-admin", "true".parse().expect("header value"));

    assert!(matches!(
        caller_from_headers(&headers),
        Some(Caller::Administrator { .. })
    ));

    headers.remove("x-caller-admin");
    headers.remove("x-caller-school");
    assert_eq!(caller_from_headers(&headers), None);
}

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::conferral::ConferralVerdict;
use super::domain::{
    Caller, DocumentKind, EnrollmentId, EnrollmentScope, EventDisciplineId, EventId, HeatId,
    PersonId, SchoolId, SubstitutionId, TeamId, UserId,
};
use super::error::RegistrationError;
use super::repository::RegistryStore;
use super::service::RegistrationService;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_SCHOOL_HEADER: &str = "x-caller-school";
pub const CALLER_ADMIN_HEADER: &str = "x-caller-admin";

/// Router builder exposing the registration operations over HTTP.
///
/// Caller identity is read from headers set by the authenticating gateway in front of
/// this service.
pub fn registration_router<R>(service: Arc<RegistrationService<R>>) -> Router
where
    R: RegistryStore + 'static,
{
    Router::new()
        .route("/api/v1/eligibility/category", post(category_handler))
        .route("/api/v1/enrollments", post(enroll_handler::<R>))
        .route(
            "/api/v1/enrollments/:enrollment_id/cancel",
            post(cancel_enrollment_handler::<R>),
        )
        .route("/api/v1/teams", post(create_team_handler::<R>))
        .route("/api/v1/teams/:team_id", get(team_roster_handler::<R>))
        .route("/api/v1/teams/:team_id/quota", get(team_quota_handler::<R>))
        .route("/api/v1/teams/:team_id/members", post(add_member_handler::<R>))
        .route(
            "/api/v1/teams/:team_id/members/:person_id",
            delete(remove_member_handler::<R>),
        )
        .route(
            "/api/v1/teams/:team_id/complete",
            post(mark_complete_handler::<R>),
        )
        .route("/api/v1/teams/:team_id/cancel", post(cancel_team_handler::<R>))
        .route(
            "/api/v1/schools/:school_id/quota",
            get(individual_quota_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/persons/:person_id/documents",
            post(upload_document_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/persons/:person_id/conferral",
            get(conferral_status_handler::<R>).put(set_conferral_handler::<R>),
        )
        .route(
            "/api/v1/substitutions",
            post(request_substitution_handler::<R>).get(pending_substitutions_handler::<R>),
        )
        .route(
            "/api/v1/substitutions/:request_id",
            get(substitution_handler::<R>),
        )
        .route(
            "/api/v1/substitutions/:request_id/approve",
            post(approve_substitution_handler::<R>),
        )
        .route(
            "/api/v1/substitutions/:request_id/reject",
            post(reject_substitution_handler::<R>),
        )
        .route(
            "/api/v1/events/:event_id/enrollment",
            put(enrollment_switch_handler::<R>),
        )
        .with_state(service)
}

/// Caller identity extracted from gateway headers.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
            .map(CallerIdentity)
            .ok_or_else(|| {
                let payload = json!({
                    "error": "UNAUTHENTICATED",
                    "message": "caller identity headers missing or invalid",
                });
                (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
            })
    }
}

pub(crate) fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    let user = header(CALLER_ID_HEADER)?.parse::<u64>().ok().map(UserId)?;
    let school = match header(CALLER_SCHOOL_HEADER) {
        Some(raw) => Some(SchoolId(raw.parse::<u64>().ok()?)),
        None => None,
    };
    let is_admin = header(CALLER_ADMIN_HEADER)
        .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    Caller::from_identity(user, school, is_admin)
}

pub(crate) fn status_for(error: &RegistrationError) -> StatusCode {
    match error {
        RegistrationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationError::State(_) | RegistrationError::Conflict { .. } => StatusCode::CONFLICT,
        RegistrationError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistrationError::Unauthorized => StatusCode::FORBIDDEN,
        RegistrationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: RegistrationError) -> Response {
    let payload = json!({
        "error": error.code(),
        "message": error.to_string(),
    });
    (status_for(&error), Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    success: StatusCode,
    result: Result<T, RegistrationError>,
) -> Response {
    match result {
        Ok(body) => (success, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryBody {
    birth_date: NaiveDate,
    reference_date: NaiveDate,
}

pub(crate) async fn category_handler(Json(body): Json<CategoryBody>) -> Response {
    let category = super::eligibility::resolve_category(body.birth_date, body.reference_date);
    let payload = json!({
        "category": category,
        "eligible": category.is_some(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollBody {
    person_id: PersonId,
    scope: EnrollmentScope,
}

pub(crate) async fn enroll_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Json(body): Json<EnrollBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.enroll(&caller, body.person_id, body.scope),
    )
}

pub(crate) async fn cancel_enrollment_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(enrollment_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.cancel_enrollment(&caller, EnrollmentId(enrollment_id)),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateTeamBody {
    discipline_id: EventDisciplineId,
    school_id: SchoolId,
}

pub(crate) async fn create_team_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Json(body): Json<CreateTeamBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_team(&caller, body.discipline_id, body.school_id),
    )
}

pub(crate) async fn team_roster_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(team_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(StatusCode::OK, service.team_roster(&caller, TeamId(team_id)))
}

pub(crate) async fn team_quota_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(team_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.check_team_quota(&caller, TeamId(team_id)),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberBody {
    person_id: PersonId,
}

pub(crate) async fn add_member_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(team_id): Path<u64>,
    Json(body): Json<MemberBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.add_member(&caller, TeamId(team_id), body.person_id),
    )
}

pub(crate) async fn remove_member_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path((team_id, person_id)): Path<(u64, u64)>,
) -> Response
where
    R: RegistryStore + 'static,
{
    match service.remove_member(&caller, TeamId(team_id), PersonId(person_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mark_complete_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(team_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.mark_team_complete(&caller, TeamId(team_id)),
    )
}

pub(crate) async fn cancel_team_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(team_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(StatusCode::OK, service.cancel_team(&caller, TeamId(team_id)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuotaQuery {
    discipline: Option<u64>,
    heat: Option<u64>,
}

pub(crate) async fn individual_quota_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(school_id): Path<u64>,
    Query(query): Query<QuotaQuery>,
) -> Response
where
    R: RegistryStore + 'static,
{
    let scope = match (query.discipline, query.heat) {
        (Some(id), None) => EnrollmentScope::Discipline(EventDisciplineId(id)),
        (None, Some(id)) => EnrollmentScope::Heat(HeatId(id)),
        _ => {
            let payload = json!({
                "error": "INVALID_SCOPE",
                "message": "provide exactly one of `discipline` or `heat`",
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    respond(
        StatusCode::OK,
        service.check_individual_quota(&caller, SchoolId(school_id), scope),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadBody {
    kind: DocumentKind,
    url: String,
}

pub(crate) async fn upload_document_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path((school_id, person_id)): Path<(u64, u64)>,
    Json(body): Json<UploadBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.record_document_upload(
            &caller,
            PersonId(person_id),
            SchoolId(school_id),
            body.kind,
            &body.url,
        ),
    )
}

pub(crate) async fn conferral_status_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path((school_id, person_id)): Path<(u64, u64)>,
) -> Response
where
    R: RegistryStore + 'static,
{
    let result = service
        .conferral_status(&caller, PersonId(person_id), SchoolId(school_id))
        .map(|status| json!({ "status": status }));
    respond(StatusCode::OK, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConferralBody {
    status: ConferralVerdict,
    #[serde(default)]
    observation: Option<String>,
}

pub(crate) async fn set_conferral_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path((school_id, person_id)): Path<(u64, u64)>,
    Json(body): Json<ConferralBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.set_conferral_status(
            &caller,
            PersonId(person_id),
            SchoolId(school_id),
            body.status,
            body.observation,
        ),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubstitutionBody {
    team_id: TeamId,
    outgoing_person_id: PersonId,
    incoming_person_id: PersonId,
    justification: String,
    #[serde(default)]
    evidence_url: Option<String>,
}

pub(crate) async fn request_substitution_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Json(body): Json<SubstitutionBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.request_substitution(
            &caller,
            body.team_id,
            body.outgoing_person_id,
            body.incoming_person_id,
            &body.justification,
            body.evidence_url.as_deref(),
        ),
    )
}

pub(crate) async fn pending_substitutions_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(StatusCode::OK, service.pending_substitutions(&caller))
}

pub(crate) async fn substitution_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(request_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.substitution(&caller, SubstitutionId(request_id)),
    )
}

pub(crate) async fn approve_substitution_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(request_id): Path<u64>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.approve_substitution(&caller, SubstitutionId(request_id)),
    )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectBody {
    #[serde(default)]
    observation: Option<String>,
}

pub(crate) async fn reject_substitution_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(request_id): Path<u64>,
    body: Option<Json<RejectBody>>,
) -> Response
where
    R: RegistryStore + 'static,
{
    let body = body.map(|Json(body)| body).unwrap_or_default();
    respond(
        StatusCode::OK,
        service.reject_substitution(
            &caller,
            SubstitutionId(request_id),
            body.observation.as_deref(),
        ),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct SwitchBody {
    open: bool,
}

pub(crate) async fn enrollment_switch_handler<R>(
    State(service): State<Arc<RegistrationService<R>>>,
    CallerIdentity(caller): CallerIdentity,
    Path(event_id): Path<u64>,
    Json(body): Json<SwitchBody>,
) -> Response
where
    R: RegistryStore + 'static,
{
    respond(
        StatusCode::OK,
        service.set_enrollment_open(&caller, EventId(event_id), body.open),
    )
}

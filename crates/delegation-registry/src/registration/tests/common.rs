use std::num::NonZeroU32;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::registration::conferral::ConferralVerdict;
use crate::registration::domain::{
    Bounds, Caller, Category, DisciplineBounds, DocumentKind, Event, EventDiscipline,
    EventDisciplineId, EventId, Heat, HeatId, MunicipalityId, Person, PersonId, PersonKind,
    School, SchoolId, Sex, TeamId, UserId,
};
use crate::registration::memory::MemoryRegistryStore;
use crate::registration::repository::{RegistryStore, RegistryWriter, RepositoryError};
use crate::registration::router::{
    registration_router, CALLER_ADMIN_HEADER, CALLER_ID_HEADER, CALLER_SCHOOL_HEADER,
};
use crate::registration::service::RegistrationService;
use crate::registration::substitution::DecisionNotes;

pub(super) const EVENT: EventId = EventId(1);
pub(super) const SCHOOL_A: SchoolId = SchoolId(10);
pub(super) const SCHOOL_B: SchoolId = SchoolId(20);

/// Individual, 12-14 female, two places per school.
pub(super) const SPRINT: EventDisciplineId = EventDisciplineId(100);
/// Individual, 15-17 male, split into heats.
pub(super) const SWIM: EventDisciplineId = EventDisciplineId(101);
/// Individual, 12-14 female, stored maximum of zero.
pub(super) const CHESS: EventDisciplineId = EventDisciplineId(102);
/// Team, 15-17 female, roster between 2 and 3.
pub(super) const VOLLEY: EventDisciplineId = EventDisciplineId(200);

pub(super) const SWIM_HEAT: HeatId = HeatId(500);
pub(super) const CLOSED_HEAT: HeatId = HeatId(501);

/// 12-14 female athletes of school A.
pub(super) const ANA: PersonId = PersonId(1001);
pub(super) const BIA: PersonId = PersonId(1002);
pub(super) const CAROL: PersonId = PersonId(1003);
pub(super) const INACTIVE: PersonId = PersonId(1004);
/// 15-17 female athletes of school A.
pub(super) const DORA: PersonId = PersonId(1101);
pub(super) const EVA: PersonId = PersonId(1102);
pub(super) const FLORA: PersonId = PersonId(1103);
pub(super) const GABI: PersonId = PersonId(1104);
/// 15-17 male athlete of school A.
pub(super) const HUGO: PersonId = PersonId(1201);
/// Staff member of school A.
pub(super) const COACH: PersonId = PersonId(1301);
/// 12-14 female athlete of school B.
pub(super) const BELA_B: PersonId = PersonId(2001);
/// 15-17 female athlete of school B.
pub(super) const IRIS_B: PersonId = PersonId(2101);

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn reference_date() -> NaiveDate {
    date(2025, 12, 31)
}

pub(super) fn admin() -> Caller {
    Caller::Administrator { user: UserId(1) }
}

pub(super) fn manager(school: SchoolId) -> Caller {
    Caller::SchoolManager {
        user: UserId(school.0 * 100),
        school,
    }
}

fn athlete(id: PersonId, name: &str, sex: Sex, birth_date: NaiveDate, school_id: SchoolId) -> Person {
    Person {
        id,
        name: name.to_string(),
        kind: PersonKind::Athlete,
        sex,
        birth_date,
        school_id,
        active: true,
    }
}

fn individual(
    id: EventDisciplineId,
    name: &str,
    category: Category,
    sex: Sex,
    max: Option<u32>,
) -> EventDiscipline {
    EventDiscipline {
        id,
        event_id: EVENT,
        discipline: name.to_string(),
        category,
        sex,
        bounds: DisciplineBounds::Individual {
            per_school: Bounds::from_raw(None, max),
        },
        substitution_cap: None,
    }
}

pub(super) fn seed(tx: &mut dyn RegistryWriter) -> Result<(), RepositoryError> {
    tx.put_event(Event {
        id: EVENT,
        name: "Jogos Escolares".to_string(),
        enrollment_open: true,
        reference_date: reference_date(),
    })?;

    for (id, name) in [(SCHOOL_A, "Escola Estadual A"), (SCHOOL_B, "Escola Municipal B")] {
        tx.put_school(School {
            id,
            name: name.to_string(),
            municipality_id: MunicipalityId(7),
        })?;
    }

    tx.put_discipline(individual(
        SPRINT,
        "Atletismo 75m",
        Category::Age12To14,
        Sex::Female,
        Some(2),
    ))?;
    tx.put_discipline(individual(
        SWIM,
        "Natação 50m livre",
        Category::Age15To17,
        Sex::Male,
        None,
    ))?;
    tx.put_discipline(individual(
        CHESS,
        "Xadrez",
        Category::Age12To14,
        Sex::Female,
        Some(0),
    ))?;
    tx.put_discipline(EventDiscipline {
        id: VOLLEY,
        event_id: EVENT,
        discipline: "Voleibol".to_string(),
        category: Category::Age15To17,
        sex: Sex::Female,
        bounds: DisciplineBounds::Team {
            per_team: Bounds::from_raw(Some(2), Some(3)),
        },
        substitution_cap: NonZeroU32::new(2),
    })?;

    tx.put_heat(Heat {
        id: SWIM_HEAT,
        discipline_id: SWIM,
        name: "Série 1".to_string(),
        per_school: Bounds::from_raw(None, Some(1)),
        active: true,
    })?;
    tx.put_heat(Heat {
        id: CLOSED_HEAT,
        discipline_id: SWIM,
        name: "Série 2".to_string(),
        per_school: Bounds::unbounded(),
        active: false,
    })?;

    let younger = date(2012, 5, 10);
    let older = date(2009, 3, 3);
    for (id, name) in [(ANA, "Ana"), (BIA, "Bia"), (CAROL, "Carol")] {
        tx.put_person(athlete(id, name, Sex::Female, younger, SCHOOL_A))?;
    }
    for (id, name) in [(DORA, "Dora"), (EVA, "Eva"), (FLORA, "Flora"), (GABI, "Gabi")] {
        tx.put_person(athlete(id, name, Sex::Female, older, SCHOOL_A))?;
    }
    tx.put_person(athlete(HUGO, "Hugo", Sex::Male, older, SCHOOL_A))?;
    tx.put_person(athlete(BELA_B, "Bela", Sex::Female, younger, SCHOOL_B))?;
    tx.put_person(athlete(IRIS_B, "Iris", Sex::Female, older, SCHOOL_B))?;

    let mut inactive = athlete(INACTIVE, "Inês", Sex::Female, younger, SCHOOL_A);
    inactive.active = false;
    tx.put_person(inactive)?;

    tx.put_person(Person {
        id: COACH,
        name: "Técnico".to_string(),
        kind: PersonKind::Staff,
        sex: Sex::Male,
        birth_date: date(1985, 1, 1),
        school_id: SCHOOL_A,
        active: true,
    })?;

    Ok(())
}

pub(super) fn seeded_store() -> Arc<MemoryRegistryStore> {
    let store = Arc::new(MemoryRegistryStore::new());
    store.transaction(seed).expect("seed fixtures");
    store
}

pub(super) fn build_service() -> (
    Arc<MemoryRegistryStore>,
    RegistrationService<MemoryRegistryStore>,
) {
    let store = seeded_store();
    let service = RegistrationService::new(store.clone(), DecisionNotes::default());
    (store, service)
}

pub(super) fn conclude(
    service: &RegistrationService<MemoryRegistryStore>,
    person: PersonId,
    school: SchoolId,
) {
    service
        .set_conferral_status(&admin(), person, school, ConferralVerdict::Concluded, None)
        .expect("conferral concluded");
}

pub(super) fn upload_all(
    service: &RegistrationService<MemoryRegistryStore>,
    person: PersonId,
    school: SchoolId,
) {
    for (kind, url) in [
        (DocumentKind::Photo, "https://docs.example/foto.jpg"),
        (DocumentKind::IdentityFront, "https://docs.example/rg-frente.jpg"),
        (DocumentKind::IdentityBack, "https://docs.example/rg-verso.jpg"),
    ] {
        service
            .record_document_upload(&manager(school), person, school, kind, url)
            .expect("upload recorded");
    }
}

/// Volleyball team of school A holding `members`.
pub(super) fn volley_team(
    service: &RegistrationService<MemoryRegistryStore>,
    members: &[PersonId],
) -> TeamId {
    let caller = manager(SCHOOL_A);
    let team = service
        .create_team(&caller, VOLLEY, SCHOOL_A)
        .expect("team created");
    for person in members {
        service
            .add_member(&caller, team.id, *person)
            .expect("member added");
    }
    team.id
}

pub(super) fn close_enrollment(service: &RegistrationService<MemoryRegistryStore>) {
    service
        .set_enrollment_open(&admin(), EVENT, false)
        .expect("switch flipped");
}

pub(super) fn router_with_service(service: RegistrationService<MemoryRegistryStore>) -> axum::Router {
    registration_router(Arc::new(service))
}

pub(super) fn json_request(method: Method, uri: &str, caller: Option<Caller>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    match caller {
        Some(Caller::Administrator { user }) => {
            builder = builder
                .header(CALLER_ID_HEADER, user.0.to_string())
                .header(CALLER_ADMIN_HEADER, "true");
        }
        Some(Caller::SchoolManager { user, school }) => {
            builder = builder
                .header(CALLER_ID_HEADER, user.0.to_string())
                .header(CALLER_SCHOOL_HEADER, school.0.to_string());
        }
        None => {}
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

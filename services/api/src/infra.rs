use chrono::{Months, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use delegation_registry::registration::{
    Bounds, Category, DisciplineBounds, Event, EventDiscipline, EventDisciplineId, EventId, Heat,
    HeatId, MunicipalityId, Person, PersonId, PersonKind, RegistryWriter, RepositoryError, School,
    SchoolId, Sex,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const DEMO_EVENT: EventId = EventId(1);
pub(crate) const DEMO_HOST_SCHOOL: SchoolId = SchoolId(1);
pub(crate) const DEMO_VISITING_SCHOOL: SchoolId = SchoolId(2);
pub(crate) const DEMO_SPRINT: EventDisciplineId = EventDisciplineId(1);
pub(crate) const DEMO_SWIM: EventDisciplineId = EventDisciplineId(2);
pub(crate) const DEMO_FUTSAL: EventDisciplineId = EventDisciplineId(3);
pub(crate) const DEMO_SWIM_HEAT: HeatId = HeatId(1);

/// Athletes of the host school: ids 1..=8 are 15-17 boys, 9 and 10 are 12-14 girls.
pub(crate) fn demo_athlete(index: u64) -> PersonId {
    PersonId(index)
}

pub(crate) const DEMO_STAFF: PersonId = PersonId(11);

pub(crate) fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default()
}

/// Birth date giving exactly `age` whole years on `reference`.
fn born_years_before(reference: NaiveDate, age: u32) -> Result<NaiveDate, RepositoryError> {
    reference
        .checked_sub_months(Months::new(age * 12 + 1))
        .ok_or_else(|| {
            RepositoryError::Unavailable(format!("cannot derive a {age}-year-old birth date"))
        })
}

fn person(
    id: PersonId,
    name: &str,
    kind: PersonKind,
    sex: Sex,
    birth_date: NaiveDate,
    school_id: SchoolId,
) -> Person {
    Person {
        id,
        name: name.to_string(),
        kind,
        sex,
        birth_date,
        school_id,
        active: true,
    }
}

/// Seeds one open event with an individual discipline, a heat-split discipline and a team
/// discipline, plus two schools with their athletes.
pub(crate) fn seed_demo_data(
    tx: &mut dyn RegistryWriter,
    reference_date: NaiveDate,
) -> Result<(), RepositoryError> {
    tx.put_event(Event {
        id: DEMO_EVENT,
        name: "Jogos Escolares".to_string(),
        enrollment_open: true,
        reference_date,
    })?;

    for (id, name) in [
        (DEMO_HOST_SCHOOL, "Escola Estadual Rui Barbosa"),
        (DEMO_VISITING_SCHOOL, "Colégio Municipal Anita Garibaldi"),
    ] {
        tx.put_school(School {
            id,
            name: name.to_string(),
            municipality_id: MunicipalityId(1),
        })?;
    }

    tx.put_discipline(EventDiscipline {
        id: DEMO_SPRINT,
        event_id: DEMO_EVENT,
        discipline: "Atletismo 100m".to_string(),
        category: Category::Age15To17,
        sex: Sex::Male,
        bounds: DisciplineBounds::Individual {
            per_school: Bounds::from_raw(None, Some(2)),
        },
        substitution_cap: None,
    })?;
    tx.put_discipline(EventDiscipline {
        id: DEMO_SWIM,
        event_id: DEMO_EVENT,
        discipline: "Natação 50m livre".to_string(),
        category: Category::Age12To14,
        sex: Sex::Female,
        bounds: DisciplineBounds::Individual {
            per_school: Bounds::unbounded(),
        },
        substitution_cap: None,
    })?;
    tx.put_heat(Heat {
        id: DEMO_SWIM_HEAT,
        discipline_id: DEMO_SWIM,
        name: "Série A".to_string(),
        per_school: Bounds::from_raw(None, Some(1)),
        active: true,
    })?;
    tx.put_discipline(EventDiscipline {
        id: DEMO_FUTSAL,
        event_id: DEMO_EVENT,
        discipline: "Futsal".to_string(),
        category: Category::Age15To17,
        sex: Sex::Male,
        bounds: DisciplineBounds::Team {
            per_team: Bounds::from_raw(Some(5), Some(12)),
        },
        substitution_cap: None,
    })?;

    let older = born_years_before(reference_date, 16)?;
    let younger = born_years_before(reference_date, 13)?;

    for index in 1..=8 {
        tx.put_person(person(
            demo_athlete(index),
            &format!("Atleta {index}"),
            PersonKind::Athlete,
            Sex::Male,
            older,
            DEMO_HOST_SCHOOL,
        ))?;
    }
    for index in 9..=10 {
        tx.put_person(person(
            demo_athlete(index),
            &format!("Atleta {index}"),
            PersonKind::Athlete,
            Sex::Female,
            younger,
            DEMO_HOST_SCHOOL,
        ))?;
    }
    tx.put_person(person(
        DEMO_STAFF,
        "Técnica responsável",
        PersonKind::Staff,
        Sex::Female,
        born_years_before(reference_date, 38)?,
        DEMO_HOST_SCHOOL,
    ))?;
    for index in 21..=26 {
        tx.put_person(person(
            PersonId(index),
            &format!("Visitante {index}"),
            PersonKind::Athlete,
            Sex::Male,
            older,
            DEMO_VISITING_SCHOOL,
        ))?;
    }

    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

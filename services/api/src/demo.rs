use crate::infra::{
    default_reference_date, demo_athlete, seed_demo_data, DEMO_EVENT, DEMO_FUTSAL,
    DEMO_HOST_SCHOOL, DEMO_SPRINT, DEMO_STAFF, DEMO_SWIM, DEMO_SWIM_HEAT,
};
use chrono::NaiveDate;
use clap::Args;
use delegation_registry::error::AppError;
use delegation_registry::registration::{
    Caller, ConferralVerdict, DecisionNotes, DocumentKind, EnrollmentScope,
    MemoryRegistryStore, RegistrationError, RegistrationService, RegistryStore, RepositoryError,
    UserId,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Event reference date used for age brackets (YYYY-MM-DD). Defaults to 2025-12-31.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) reference_date: Option<NaiveDate>,
    /// Print full JSON payloads for each successful step.
    #[arg(long)]
    pub(crate) verbose: bool,
    /// Skip the roster and substitution portion of the demo.
    #[arg(long)]
    pub(crate) skip_team: bool,
}

struct DemoRun {
    service: RegistrationService<MemoryRegistryStore>,
    manager: Caller,
    admin: Caller,
    verbose: bool,
}

impl DemoRun {
    fn step<T: Serialize>(&self, label: &str, result: Result<T, RegistrationError>) -> Option<T> {
        match result {
            Ok(value) => {
                println!("- {label}: ok");
                if self.verbose {
                    match serde_json::to_string_pretty(&value) {
                        Ok(json) => println!("{json}"),
                        Err(err) => println!("  payload unavailable: {err}"),
                    }
                }
                Some(value)
            }
            Err(err) => {
                println!("- {label}: {} ({err})", err.code());
                None
            }
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        reference_date,
        verbose,
        skip_team,
    } = args;
    let reference_date = reference_date.unwrap_or_else(default_reference_date);

    let store = Arc::new(MemoryRegistryStore::new());
    store.transaction(|tx| -> Result<(), RepositoryError> { seed_demo_data(tx, reference_date) })?;

    let run = DemoRun {
        service: RegistrationService::new(store, DecisionNotes::default()),
        manager: Caller::SchoolManager {
            user: UserId(100),
            school: DEMO_HOST_SCHOOL,
        },
        admin: Caller::Administrator { user: UserId(1) },
        verbose,
    };

    println!("Delegation registration demo (reference date {reference_date})");
    run_eligibility(&run)?;
    run_individual_enrollment(&run);
    if !skip_team {
        run_team_flow(&run);
    }
    run_enrollment_switch(&run);
    Ok(())
}

fn run_eligibility(run: &DemoRun) -> Result<(), AppError> {
    println!("\nEligibility brackets");
    for person_id in [demo_athlete(1), demo_athlete(9), DEMO_STAFF] {
        let person = run
            .service
            .store()
            .read(|reader| reader.person(person_id))?;
        if let Some(person) = person {
            let category = run
                .service
                .resolve_category(person.birth_date, reference_of(run)?);
            println!(
                "- {} ({:?}, {}): {}",
                person.name,
                person.kind,
                person.sex.label(),
                category.map_or("out of bracket", |category| category.label())
            );
        }
    }
    Ok(())
}

fn reference_of(run: &DemoRun) -> Result<NaiveDate, AppError> {
    let event = run.service.store().read(|reader| reader.event(DEMO_EVENT))?;
    Ok(event.map_or_else(default_reference_date, |event| event.reference_date))
}

fn run_individual_enrollment(run: &DemoRun) {
    println!("\nIndividual enrollment (Atletismo 100m, two places per school)");
    let service = &run.service;
    let sprint = EnrollmentScope::Discipline(DEMO_SPRINT);

    for (kind, url) in [
        (DocumentKind::Photo, "https://docs.example/atleta-1/foto.jpg"),
        (DocumentKind::IdentityFront, "https://docs.example/atleta-1/rg-frente.jpg"),
        (DocumentKind::IdentityBack, "https://docs.example/atleta-1/rg-verso.jpg"),
    ] {
        run.step(
            &format!("upload {kind:?} for athlete 1"),
            service.record_document_upload(
                &run.manager,
                demo_athlete(1),
                DEMO_HOST_SCHOOL,
                kind,
                url,
            ),
        );
    }
    run.step(
        "enroll athlete 1 before review",
        service.enroll(&run.manager, demo_athlete(1), sprint),
    );

    for index in 1..=3 {
        run.step(
            &format!("conclude documents of athlete {index}"),
            service.set_conferral_status(
                &run.admin,
                demo_athlete(index),
                DEMO_HOST_SCHOOL,
                ConferralVerdict::Concluded,
                None,
            ),
        );
    }
    for index in 1..=3 {
        run.step(
            &format!("enroll athlete {index}"),
            service.enroll(&run.manager, demo_athlete(index), sprint),
        );
    }
    run.step(
        "school quota",
        service.check_individual_quota(&run.manager, DEMO_HOST_SCHOOL, sprint),
    );

    run.step(
        "conclude documents of athlete 9",
        service.set_conferral_status(
            &run.admin,
            demo_athlete(9),
            DEMO_HOST_SCHOOL,
            ConferralVerdict::Concluded,
            None,
        ),
    );
    run.step(
        "enroll athlete 9 in swimming without a heat",
        service.enroll(&run.manager, demo_athlete(9), EnrollmentScope::Discipline(DEMO_SWIM)),
    );
    run.step(
        "enroll athlete 9 in heat A",
        service.enroll(&run.manager, demo_athlete(9), EnrollmentScope::Heat(DEMO_SWIM_HEAT)),
    );
}

fn run_team_flow(run: &DemoRun) {
    println!("\nFutsal roster (5 to 12 athletes)");
    let service = &run.service;

    let Some(team) = run.step(
        "create team",
        service.create_team(&run.manager, DEMO_FUTSAL, DEMO_HOST_SCHOOL),
    ) else {
        return;
    };

    for index in 1..=4 {
        run.step(
            &format!("add athlete {index}"),
            service.add_member(&run.manager, team.id, demo_athlete(index)),
        );
    }
    run.step(
        "mark complete with four athletes",
        service.mark_team_complete(&run.manager, team.id),
    );
    run.step(
        "add athlete 5",
        service.add_member(&run.manager, team.id, demo_athlete(5)),
    );
    run.step(
        "mark complete with five athletes",
        service.mark_team_complete(&run.manager, team.id),
    );

    println!("\nSubstitutions");
    let request = run.step(
        "request athlete 6 in for athlete 2",
        service.request_substitution(
            &run.manager,
            team.id,
            demo_athlete(2),
            demo_athlete(6),
            "Lesão no tornozelo durante o treino",
            Some("https://docs.example/laudo-atleta-2.pdf"),
        ),
    );
    if let Some(request) = request {
        run.step(
            "approve substitution",
            service.approve_substitution(&run.admin, request.id),
        );
        run.step(
            "approve substitution again",
            service.approve_substitution(&run.admin, request.id),
        );
    }

    let second = run.step(
        "request athlete 7 in for athlete 3",
        service.request_substitution(
            &run.manager,
            team.id,
            demo_athlete(3),
            demo_athlete(7),
            "Transferência de escola",
            None,
        ),
    );
    if let Some(second) = second {
        run.step(
            "reject substitution without a note",
            service.reject_substitution(&run.admin, second.id, None),
        );
    }

    if let Some(roster) = run.step("final roster", service.team_roster(&run.manager, team.id)) {
        let members: Vec<String> = roster
            .members
            .iter()
            .map(|membership| membership.person_id.to_string())
            .collect();
        println!(
            "  status {:?} | {} members [{}] | within bounds: {}",
            roster.team.status,
            roster.quota.size,
            members.join(", "),
            roster.quota.ok
        );
    }
}

fn run_enrollment_switch(run: &DemoRun) {
    println!("\nEnrollment switch");
    let service = &run.service;
    run.step(
        "close enrollment",
        service.set_enrollment_open(&run.admin, DEMO_EVENT, false),
    );
    run.step(
        "enroll athlete 4 after close",
        service.enroll(
            &run.manager,
            demo_athlete(4),
            EnrollmentScope::Discipline(DEMO_SPRINT),
        ),
    );
}

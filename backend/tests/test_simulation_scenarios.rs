//! End-to-end runs of small campuses

use campus_seir_core::duration::FixedDuration;
use campus_seir_core::models::compartment::Compartment;
use campus_seir_core::models::event::{Event, RemovalReason};
use campus_seir_core::models::roster::{IndividualId, MeetingKind, Roster, RosterBuilder};
use campus_seir_core::orchestrator::{
    InitialExposure, Interventions, ScenarioConfig, Simulation, SimulationConfig,
    SimulationParameters, Vaccination,
};
use campus_seir_core::policy::{BasicContactTracing, CohortTesting};
use chrono::NaiveDate;
use std::sync::Arc;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, m, d).unwrap()
}

fn daily(start: NaiveDate, days: u32, minutes: u32) -> Vec<(NaiveDate, u32)> {
    (0..days)
        .map(|offset| (start + chrono::Days::new(u64::from(offset)), minutes))
        .collect()
}

/// One course of `size` students meeting every day of September
fn lecture_hall(size: u32) -> Arc<Roster> {
    let mut builder = RosterBuilder::new();
    builder.insert_meeting(
        "PHYS 201",
        MeetingKind::Course,
        Some("Classroom".to_string()),
        (0..size).map(IndividualId),
        daily(date(9, 1), 30, 75),
    );
    Arc::new(builder.build().unwrap())
}

fn parameters(base_rate: f64, start: NaiveDate, end: NaiveDate) -> SimulationParameters {
    SimulationParameters {
        base_transmission_rate: base_rate,
        start_date: start,
        end_date: end,
        check_invariants: true,
        ..SimulationParameters::default()
    }
}

fn fixed(incubation_days: u32, illness_days: u32, symptomatic: bool) -> Interventions {
    Interventions {
        duration_model: Box::new(FixedDuration {
            incubation_days,
            illness_days,
            symptomatic,
        }),
        ..Interventions::default()
    }
}

#[test]
fn test_no_transmission_only_seed_is_removed() {
    let roster = lecture_hall(25);
    let config = SimulationConfig::new(
        parameters(0.0, date(9, 2), date(11, 13)),
        InitialExposure::Explicit(vec![IndividualId(4)]),
    );
    let mut sim = Simulation::new(roster, &config, Interventions::default(), 2020).unwrap();
    sim.run().unwrap();

    let snapshots = sim.statistics().snapshots();
    assert_eq!(snapshots.len(), 73);
    let last = snapshots.last().unwrap().counts;
    assert_eq!(last.removed, 1);
    assert_eq!(last.susceptible, 24);
    assert_eq!(sim.statistics().source_totals()["Community"], 1);
    assert_eq!(sim.state().infected_unvaccinated(), 1);
}

#[test]
fn test_full_mixing_infects_whole_class() {
    let roster = lecture_hall(20);
    let config = SimulationConfig::new(
        parameters(1.0, date(9, 1), date(9, 30)),
        InitialExposure::Explicit(vec![IndividualId(0)]),
    );
    let mut sim = Simulation::new(roster, &config, fixed(1, 3, false), 1).unwrap();
    sim.run().unwrap();

    let last = sim.statistics().latest().unwrap().counts;
    assert_eq!(last.removed, 20);
    let sources = sim.statistics().source_totals();
    assert_eq!(sources["Classroom"], 19);
    assert_eq!(sources["Community"], 1);

    // Everyone else was infected on the day the seed became infectious
    let exposures = sim.event_log().events_of_type("Exposed");
    assert!(exposures[1..].iter().all(|event| event.date() == date(9, 2)));
}

#[test]
fn test_fully_protective_vaccine_blocks_meeting_transmission() {
    let roster = lecture_hall(10);
    let mut params = parameters(1.0, date(9, 1), date(9, 30));
    params.vaccine_benefit_self = 1.0;
    let mut config = SimulationConfig::new(params, InitialExposure::Explicit(vec![IndividualId(0)]));
    config.vaccination = Vaccination::Explicit((1..10).map(IndividualId).collect());

    let mut sim = Simulation::new(roster, &config, fixed(1, 3, false), 3).unwrap();
    sim.run().unwrap();

    let last = sim.statistics().latest().unwrap().counts;
    assert_eq!(last.removed, 1);
    assert_eq!(last.vaccinated, 9);
    assert_eq!(sim.state().infected_vaccinated(), 0);
}

#[test]
fn test_positive_test_removes_next_day() {
    let roster = lecture_hall(5);
    // Sept 6 is a Sunday: the seed becomes infectious on Monday Sept 7
    let config = SimulationConfig::new(
        parameters(0.0, date(9, 6), date(9, 20)),
        InitialExposure::Explicit(vec![IndividualId(2)]),
    );
    let interventions = Interventions {
        testing: Box::new(CohortTesting::monday(&roster)),
        ..fixed(1, 10, false)
    };
    let mut sim = Simulation::new(roster, &config, interventions, 9).unwrap();
    sim.run().unwrap();

    let scheduled = sim.event_log().events_of_type("TestScheduled");
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].date(), date(9, 7));

    let removals = sim.event_log().events_for(IndividualId(2));
    let removal = removals
        .iter()
        .find_map(|event| match event {
            Event::Removed { date, reason, .. } => Some((*date, *reason)),
            _ => None,
        })
        .unwrap();
    assert_eq!(removal, (date(9, 8), RemovalReason::PositiveTest));
}

#[test]
fn test_tracing_ignores_untraceable_contacts() {
    let mut builder = RosterBuilder::new();
    builder.insert_meeting(
        "SEM 100",
        MeetingKind::Course,
        None,
        (0..3).map(IndividualId),
        daily(date(9, 1), 30, 50),
    );
    builder.insert_meeting(
        "Campus",
        MeetingKind::Untraceable,
        None,
        [IndividualId(0), IndividualId(3), IndividualId(4)],
        daily(date(9, 1), 30, 30),
    );
    let roster = Arc::new(builder.build().unwrap());
    let config = SimulationConfig::new(
        parameters(0.0, date(9, 1), date(9, 30)),
        InitialExposure::Explicit(vec![IndividualId(0)]),
    );
    let interventions = Interventions {
        contact_tracing: Box::new(BasicContactTracing::default()),
        ..fixed(1, 2, true)
    };
    let mut sim = Simulation::new(roster, &config, interventions, 5).unwrap();

    // Exposed Sept 1, symptomatic Sept 2, recovered and traced Sept 4
    for _ in 0..4 {
        sim.step().unwrap();
    }
    assert_eq!(sim.compartment_of(IndividualId(0)), Some(Compartment::Removed));
    for id in [1, 2] {
        assert_eq!(
            sim.compartment_of(IndividualId(id)),
            Some(Compartment::QuarantinedSusceptible)
        );
    }
    for id in [3, 4] {
        assert_eq!(sim.compartment_of(IndividualId(id)), Some(Compartment::Susceptible));
    }

    // Default 14-day quarantine: released on Sept 18
    while sim.date() < date(9, 18) {
        sim.step().unwrap();
    }
    assert_eq!(
        sim.compartment_of(IndividualId(1)),
        Some(Compartment::QuarantinedSusceptible)
    );
    sim.step().unwrap();
    assert_eq!(sim.compartment_of(IndividualId(1)), Some(Compartment::Susceptible));
}

#[test]
fn test_untraceable_only_contacts_are_never_quarantined() {
    let mut builder = RosterBuilder::new();
    builder.insert_meeting(
        "Dining Hall",
        MeetingKind::Untraceable,
        None,
        (0..6).map(IndividualId),
        daily(date(9, 1), 30, 45),
    );
    let roster = Arc::new(builder.build().unwrap());
    let config = SimulationConfig::new(
        parameters(0.0, date(9, 1), date(9, 30)),
        InitialExposure::Explicit(vec![IndividualId(0)]),
    );
    let interventions = Interventions {
        contact_tracing: Box::new(BasicContactTracing::default()),
        ..fixed(1, 2, true)
    };
    let mut sim = Simulation::new(roster, &config, interventions, 5).unwrap();
    sim.run().unwrap();

    // The symptomatic seed was traced on Sept 4 but had no traceable contacts
    let traced = sim.event_log().events_of_type("ContactTraced");
    assert_eq!(traced.len(), 1);
    assert_eq!(traced[0].date(), date(9, 4));
    assert!(sim.event_log().events_of_type("Quarantined").is_empty());
    assert!(sim
        .statistics()
        .snapshots()
        .iter()
        .all(|snapshot| snapshot.counts.reported_quarantined() == 0));
    for id in 1..6 {
        assert_eq!(sim.compartment_of(IndividualId(id)), Some(Compartment::Susceptible));
    }
}

#[test]
fn test_community_exposure_infects_without_meetings() {
    let mut builder = RosterBuilder::new();
    for id in 0..200 {
        builder.add_individual(IndividualId(id));
    }
    let roster = Arc::new(builder.build().unwrap());
    let mut params = parameters(0.0, date(9, 1), date(9, 30));
    params.community_exposure_rate = 0.05;
    let config = SimulationConfig::new(params, InitialExposure::Random(1));

    let mut sim = Simulation::new(roster, &config, Interventions::default(), 77).unwrap();
    sim.run().unwrap();

    let sources = sim.statistics().source_totals();
    assert!(sources["Community"] > 50);
    assert_eq!(sources.len(), 1);
}

#[test]
fn test_same_seed_same_run() {
    let run = |seed: u64| {
        let config = SimulationConfig::new(
            parameters(1.0 / 2000.0, date(9, 1), date(9, 30)),
            InitialExposure::Random(3),
        );
        let mut sim =
            Simulation::new(lecture_hall(60), &config, Interventions::default(), seed).unwrap();
        sim.run().unwrap();
        sim.outcome(0)
    };
    assert_eq!(run(31), run(31));
}

#[test]
fn test_scenario_file_runs_end_to_end() {
    let json = r#"{
        "roster": {
            "meetings": [
                {
                    "name": "CS 200",
                    "source_label": "Classroom",
                    "members": [0, 1, 2, 3, 4, 5, 6, 7],
                    "schedule": {"Weekly": [
                        {"start": "2020-09-02", "end": "2020-10-30", "weekdays": "MWF", "minutes": 50}
                    ]}
                }
            ]
        },
        "parameters": {"start_date": "2020-09-02", "end_date": "2020-10-30", "check_invariants": true},
        "testing": "Monday",
        "contact_tracing": {"Basic": {}},
        "initial_exposure": {"LargestMeeting": 2}
    }"#;
    let scenario = ScenarioConfig::from_json(json).unwrap();
    scenario.validate().unwrap();
    let roster = Arc::new(scenario.build_roster().unwrap());
    let mut rng = campus_seir_core::rng::RngManager::new(8);
    let interventions = Interventions::from_scenario(&scenario, &roster, &mut rng);
    let mut sim = Simulation::new(roster, &scenario.simulation_config(), interventions, 8).unwrap();
    sim.run().unwrap();

    let last = sim.statistics().latest().unwrap();
    assert_eq!(last.date, date(10, 30));
    assert_eq!(last.counts.population(), 8);
    assert!(last.counts.removed >= 2);
}

#[test]
fn test_initial_exposure_larger_than_pool_is_rejected() {
    let config = SimulationConfig::new(
        parameters(0.0, date(9, 1), date(9, 30)),
        InitialExposure::Random(50),
    );
    let result = Simulation::new(lecture_hall(10), &config, Interventions::default(), 0);
    assert!(result.is_err());
}

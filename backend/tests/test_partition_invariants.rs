//! Property tests: every individual stays in exactly one compartment

use campus_seir_core::models::event::Event;
use campus_seir_core::models::roster::{IndividualId, MeetingKind, Roster, RosterBuilder};
use campus_seir_core::orchestrator::{
    InitialExposure, Interventions, Simulation, SimulationConfig, SimulationParameters,
};
use campus_seir_core::policy::{BasicContactTracing, CohortTesting};
use campus_seir_core::rng::RngManager;
use chrono::NaiveDate;
use proptest::prelude::*;
use std::sync::Arc;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 9, 1).unwrap()
}

/// Random meetings over `population` individuals, each on a few random days
fn random_roster(population: u32, meetings: u32, seed: u64) -> Roster {
    let mut rng = RngManager::new(seed);
    let everyone: Vec<IndividualId> = (0..population).map(IndividualId).collect();
    let mut builder = RosterBuilder::new();
    for id in &everyone {
        builder.add_individual(*id);
    }
    for m in 0..meetings {
        let size = rng.range(1, population as usize + 1);
        let members = rng.choose_distinct(&everyone, size);
        let mut days = Vec::new();
        for offset in 0..20u64 {
            if rng.bernoulli(0.5) {
                days.push((start() + chrono::Days::new(offset), rng.range(10, 180) as u32));
            }
        }
        let kind = match m % 3 {
            0 => MeetingKind::Course,
            1 => MeetingKind::Social,
            _ => MeetingKind::Untraceable,
        };
        builder.insert_meeting(&format!("M{}", m), kind, None, members, days);
    }
    builder.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_compartments_partition_population(
        population in 5u32..40,
        meetings in 1u32..6,
        roster_seed in any::<u64>(),
        run_seed in any::<u64>(),
        rate_scale in 0.0f64..0.01,
        community in 0.0f64..0.05,
        quarantine_length in 1u32..15,
    ) {
        let roster = Arc::new(random_roster(population, meetings, roster_seed));
        let params = SimulationParameters {
            base_transmission_rate: rate_scale,
            quarantine_length,
            community_exposure_rate: community,
            start_date: start(),
            end_date: NaiveDate::from_ymd_opt(2020, 9, 25).unwrap(),
            check_invariants: true,
            ..SimulationParameters::default()
        };
        let config = SimulationConfig::new(params, InitialExposure::Random(2));
        let interventions = Interventions {
            testing: Box::new(CohortTesting::daily_rotation(&roster, &mut RngManager::new(run_seed))),
            contact_tracing: Box::new(BasicContactTracing::default()),
            ..Interventions::default()
        };

        let mut sim = Simulation::new(Arc::clone(&roster), &config, interventions, run_seed).unwrap();
        while !sim.is_finished() {
            prop_assert!(sim.step().is_ok());
            let counts = sim.statistics().latest().unwrap().counts;
            prop_assert_eq!(counts.population(), population as usize);
        }
        prop_assert!(sim.state().check_invariants(&roster).is_ok());

        // Quarantines always end after they start
        for event in sim.event_log().events() {
            if let Event::Quarantined { date, release, .. } = event {
                prop_assert!(release > date);
            }
        }
    }

    #[test]
    fn prop_removed_never_decreases(
        population in 5u32..30,
        run_seed in any::<u64>(),
    ) {
        let roster = Arc::new(random_roster(population, 3, run_seed ^ 0x5eed));
        let params = SimulationParameters {
            base_transmission_rate: 0.005,
            start_date: start(),
            end_date: NaiveDate::from_ymd_opt(2020, 9, 20).unwrap(),
            ..SimulationParameters::default()
        };
        let config = SimulationConfig::new(params, InitialExposure::Random(1));
        let mut sim = Simulation::new(roster, &config, Interventions::default(), run_seed).unwrap();
        sim.run().unwrap();

        let removed: Vec<usize> = sim
            .statistics()
            .snapshots()
            .iter()
            .map(|s| s.counts.removed)
            .collect();
        prop_assert!(removed.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}

//! Transmission Engine
//!
//! Per-meeting exposure draw. For a meeting occurring today with `n`
//! infectious attendees, the exposure weight is
//!
//! ```text
//! weight = (unvaccinated + (1 - vaccine_benefit_others) * vaccinated)
//!        * (preclass_time + minutes) * base_rate
//! ```
//!
//! where pre-class time only applies to courses. Two sampling regimes follow:
//!
//! - **weight ≤ 1**: draw a Poisson count with mean `weight * |S|`, then pick
//!   that many distinct susceptible members uniformly (capped at `|S|`)
//! - **weight > 1**: flip an independent coin per susceptible member with
//!   `p = 1 - exp(-weight)`
//!
//! Candidates still have to pass the vaccine gate and be Susceptible when the
//! engine infects them. Meetings are processed one at a time in id order, so
//! infections in earlier meetings shrink later meetings' susceptible sets.

use std::collections::BTreeSet;

use crate::models::roster::{IndividualId, MeetingId, MeetingKind, Roster};
use crate::models::state::SimulationState;
use crate::rng::RngManager;

/// Parameters of the exposure weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionRates {
    /// Per-minute, per-infectious-contact transmission rate
    pub base_rate: f64,
    /// Minutes of mingling added to each course occurrence
    pub preclass_interaction_time: u32,
    /// Infectiousness reduction of vaccinated cases
    pub vaccine_benefit_others: f64,
}

/// Exposure weight of one meeting occurrence
pub fn exposure_weight(
    unvaccinated_infectious: usize,
    vaccinated_infectious: usize,
    kind: MeetingKind,
    minutes: u32,
    rates: &TransmissionRates,
) -> f64 {
    let preclass = if kind.has_preclass_time() {
        rates.preclass_interaction_time
    } else {
        0
    };
    let infectious = unvaccinated_infectious as f64
        + (1.0 - rates.vaccine_benefit_others) * vaccinated_infectious as f64;
    infectious * f64::from(preclass + minutes) * rates.base_rate
}

/// Draw exposure candidates among `susceptible` for a given weight
pub fn draw_candidates(
    weight: f64,
    susceptible: &BTreeSet<IndividualId>,
    rng: &mut RngManager,
) -> Vec<IndividualId> {
    if susceptible.is_empty() || weight <= 0.0 {
        return Vec::new();
    }

    if weight <= 1.0 {
        let count = rng.poisson(weight * susceptible.len() as f64);
        if count == 0 {
            return Vec::new();
        }
        let pool: Vec<IndividualId> = susceptible.iter().copied().collect();
        rng.choose_distinct(&pool, count)
    } else {
        let p = 1.0 - (-weight).exp();
        susceptible
            .iter()
            .copied()
            .filter(|_| rng.bernoulli(p))
            .collect()
    }
}

/// Candidates exposed in one meeting occurrence
///
/// Empty when the meeting has no susceptible or no infectious attendee;
/// no random numbers are consumed in that case.
pub fn meeting_candidates(
    roster: &Roster,
    state: &SimulationState,
    meeting: MeetingId,
    minutes: u32,
    rates: &TransmissionRates,
    rng: &mut RngManager,
) -> Vec<IndividualId> {
    let susceptible = state.susceptible_in(meeting);
    if susceptible.is_empty() {
        return Vec::new();
    }
    let (unvaccinated, vaccinated) = state.infectious_attendees(roster, meeting);
    if unvaccinated + vaccinated == 0 {
        return Vec::new();
    }
    let weight = exposure_weight(
        unvaccinated,
        vaccinated,
        roster.meeting_kind(meeting),
        minutes,
        rates,
    );
    draw_candidates(weight, susceptible, rng)
}

//! Geometric duration models

use chrono::NaiveDate;

use super::{check_rate, DurationModel};
use crate::core::calendar::add_days;
use crate::models::compartment::InfectionTimeline;
use crate::models::roster::IndividualId;
use crate::rng::RngManager;

/// Geometric incubation and illness with a symptomatic fraction
///
/// Symptomatic cases recover at `rate_symptoms`, asymptomatic ones at
/// `rate_recovery`. Vaccinated individuals are never symptomatic.
#[derive(Debug, Clone, PartialEq)]
pub struct VariedResponse {
    /// Daily rate at which an exposed individual becomes infectious
    pub rate_contagious: f64,
    /// Daily recovery rate of asymptomatic cases
    pub rate_recovery: f64,
    /// Daily rate at which a symptomatic case is removed
    pub rate_symptoms: f64,
    /// Fraction of unvaccinated cases that stay asymptomatic
    pub asymptomatic_ratio: f64,
}

impl Default for VariedResponse {
    fn default() -> Self {
        Self {
            rate_contagious: 1.0 / 3.5,
            rate_recovery: 1.0 / 4.5,
            rate_symptoms: 1.0 / 2.0,
            asymptomatic_ratio: 0.75,
        }
    }
}

impl DurationModel for VariedResponse {
    fn duration(
        &self,
        _individual: IndividualId,
        exposure_date: NaiveDate,
        vaccinated: bool,
        rng: &mut RngManager,
    ) -> InfectionTimeline {
        let incubation = rng.geometric(self.rate_contagious);
        // Vaccinated cases skip the symptom draw entirely
        let symptomatic = !vaccinated && rng.next_f64() > self.asymptomatic_ratio;
        let illness = if symptomatic {
            rng.geometric(self.rate_symptoms)
        } else {
            rng.geometric(self.rate_recovery)
        };

        InfectionTimeline {
            exposure_date,
            contagious_date: add_days(exposure_date, incubation),
            removal_date: add_days(exposure_date, incubation.saturating_add(illness)),
            symptomatic,
        }
    }

    fn validate(&self) -> Result<(), String> {
        check_rate("rate_contagious", self.rate_contagious)?;
        check_rate("rate_recovery", self.rate_recovery)?;
        check_rate("rate_symptoms", self.rate_symptoms)?;
        if !(0.0..=1.0).contains(&self.asymptomatic_ratio) {
            return Err(format!(
                "asymptomatic_ratio must be in [0, 1], got {}",
                self.asymptomatic_ratio
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "VariedResponse(contagious: {:.4}, recovery: {:.4}, symptoms: {:.4}, asymptomatic ratio: {:.2})",
            self.rate_contagious, self.rate_recovery, self.rate_symptoms, self.asymptomatic_ratio
        )
    }
}

/// Geometric incubation and illness, never symptomatic
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInfectionDuration {
    pub rate_contagious: f64,
    pub rate_recovery: f64,
}

impl DurationModel for BasicInfectionDuration {
    fn duration(
        &self,
        _individual: IndividualId,
        exposure_date: NaiveDate,
        _vaccinated: bool,
        rng: &mut RngManager,
    ) -> InfectionTimeline {
        let contagious_date = add_days(exposure_date, rng.geometric(self.rate_contagious));
        InfectionTimeline {
            exposure_date,
            contagious_date,
            removal_date: add_days(contagious_date, rng.geometric(self.rate_recovery)),
            symptomatic: false,
        }
    }

    fn validate(&self) -> Result<(), String> {
        check_rate("rate_contagious", self.rate_contagious)?;
        check_rate("rate_recovery", self.rate_recovery)
    }

    fn describe(&self) -> String {
        format!(
            "BasicInfectionDuration(contagious: {:.4}, recovery: {:.4})",
            self.rate_contagious, self.rate_recovery
        )
    }
}

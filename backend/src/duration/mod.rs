//! Infection duration models
//!
//! A duration model decides, at the moment of exposure, when an individual
//! becomes contagious, when they are removed, and whether they will show
//! symptoms. Models are injected into the simulation as boxed trait objects
//! built from [`DurationModelConfig`].
//!
//! Every model must produce `exposure < contagious < removal`.

mod fixed;
mod varied;

pub use fixed::FixedDuration;
pub use varied::{BasicInfectionDuration, VariedResponse};

use chrono::NaiveDate;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};

use crate::models::compartment::InfectionTimeline;
use crate::models::roster::IndividualId;
use crate::rng::RngManager;

/// Draws the timeline of a new infection
pub trait DurationModel: DynClone + Send {
    fn duration(
        &self,
        individual: IndividualId,
        exposure_date: NaiveDate,
        vaccinated: bool,
        rng: &mut RngManager,
    ) -> InfectionTimeline;

    /// Check the model's parameters; returns a description of the problem
    fn validate(&self) -> Result<(), String>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// A daily rate usable as a geometric success probability
pub(crate) fn check_rate(name: &str, value: f64) -> Result<(), String> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(format!("{} must be in (0, 1], got {}", name, value))
    }
}

dyn_clone::clone_trait_object!(DurationModel);

/// Serializable choice of duration model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DurationModelConfig {
    VariedResponse {
        rate_contagious: f64,
        rate_recovery: f64,
        rate_symptoms: f64,
        asymptomatic_ratio: f64,
    },
    BasicInfectionDuration {
        rate_contagious: f64,
        rate_recovery: f64,
    },
    Fixed {
        incubation_days: u32,
        illness_days: u32,
        symptomatic: bool,
    },
}

impl Default for DurationModelConfig {
    fn default() -> Self {
        let model = VariedResponse::default();
        DurationModelConfig::VariedResponse {
            rate_contagious: model.rate_contagious,
            rate_recovery: model.rate_recovery,
            rate_symptoms: model.rate_symptoms,
            asymptomatic_ratio: model.asymptomatic_ratio,
        }
    }
}

impl DurationModelConfig {
    /// Check the configured model's parameters
    pub fn validate(&self) -> Result<(), String> {
        self.build().validate()
    }

    /// Build the boxed model
    pub fn build(&self) -> Box<dyn DurationModel> {
        match self {
            DurationModelConfig::VariedResponse {
                rate_contagious,
                rate_recovery,
                rate_symptoms,
                asymptomatic_ratio,
            } => Box::new(VariedResponse {
                rate_contagious: *rate_contagious,
                rate_recovery: *rate_recovery,
                rate_symptoms: *rate_symptoms,
                asymptomatic_ratio: *asymptomatic_ratio,
            }),
            DurationModelConfig::BasicInfectionDuration {
                rate_contagious,
                rate_recovery,
            } => Box::new(BasicInfectionDuration {
                rate_contagious: *rate_contagious,
                rate_recovery: *rate_recovery,
            }),
            DurationModelConfig::Fixed {
                incubation_days,
                illness_days,
                symptomatic,
            } => Box::new(FixedDuration {
                incubation_days: *incubation_days,
                illness_days: *illness_days,
                symptomatic: *symptomatic,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_varied_response() {
        let config = DurationModelConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.build().describe().starts_with("VariedResponse"));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = DurationModelConfig::BasicInfectionDuration {
            rate_contagious: 0.0,
            rate_recovery: 0.2,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let config = DurationModelConfig::VariedResponse {
            rate_contagious: 0.3,
            rate_recovery: 0.2,
            rate_symptoms: 0.5,
            asymptomatic_ratio: 1.5,
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("asymptomatic_ratio"));
    }

    #[test]
    fn test_zero_fixed_illness_rejected() {
        let config = DurationModelConfig::Fixed {
            incubation_days: 2,
            illness_days: 0,
            symptomatic: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_shape() {
        let config: DurationModelConfig = serde_json::from_str(
            r#"{"Fixed": {"incubation_days": 2, "illness_days": 5, "symptomatic": true}}"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }
}

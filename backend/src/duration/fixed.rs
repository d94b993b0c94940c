use chrono::NaiveDate;

use super::DurationModel;
use crate::core::calendar::add_days;
use crate::models::compartment::InfectionTimeline;
use crate::models::roster::IndividualId;
use crate::rng::RngManager;

/// Deterministic durations, mostly for tests and what-if runs
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDuration {
    pub incubation_days: u32,
    pub illness_days: u32,
    pub symptomatic: bool,
}

impl DurationModel for FixedDuration {
    fn duration(
        &self,
        _individual: IndividualId,
        exposure_date: NaiveDate,
        vaccinated: bool,
        _rng: &mut RngManager,
    ) -> InfectionTimeline {
        let contagious_date = add_days(exposure_date, u64::from(self.incubation_days.max(1)));
        InfectionTimeline {
            exposure_date,
            contagious_date,
            removal_date: add_days(contagious_date, u64::from(self.illness_days.max(1))),
            symptomatic: self.symptomatic && !vaccinated,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.incubation_days == 0 || self.illness_days == 0 {
            Err("fixed incubation and illness lengths must be at least one day".to_string())
        } else {
            Ok(())
        }
    }

    fn describe(&self) -> String {
        format!(
            "FixedDuration(incubation: {}d, illness: {}d, symptomatic: {})",
            self.incubation_days, self.illness_days, self.symptomatic
        )
    }
}

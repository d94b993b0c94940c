//! Compartments and infection timelines

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::roster::{IndividualId, MeetingId};

/// Disease/intervention compartment of an individual
///
/// Every individual is in exactly one compartment at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    InfectiousAsymptomatic,
    InfectiousSymptomatic,
    QuarantinedSusceptible,
    QuarantinedExposed,
    QuarantinedAsymptomatic,
    QuarantinedSymptomatic,
    Removed,
}

impl Compartment {
    pub const ALL: [Compartment; 9] = [
        Compartment::Susceptible,
        Compartment::Exposed,
        Compartment::InfectiousAsymptomatic,
        Compartment::InfectiousSymptomatic,
        Compartment::QuarantinedSusceptible,
        Compartment::QuarantinedExposed,
        Compartment::QuarantinedAsymptomatic,
        Compartment::QuarantinedSymptomatic,
        Compartment::Removed,
    ];

    /// Free-moving and able to transmit
    pub fn is_infectious(self) -> bool {
        matches!(
            self,
            Compartment::InfectiousAsymptomatic | Compartment::InfectiousSymptomatic
        )
    }

    pub fn is_quarantined(self) -> bool {
        matches!(
            self,
            Compartment::QuarantinedSusceptible
                | Compartment::QuarantinedExposed
                | Compartment::QuarantinedAsymptomatic
                | Compartment::QuarantinedSymptomatic
        )
    }

    /// Would test positive: infectious, free or quarantined
    pub fn tests_positive(self) -> bool {
        matches!(
            self,
            Compartment::InfectiousAsymptomatic
                | Compartment::InfectiousSymptomatic
                | Compartment::QuarantinedAsymptomatic
                | Compartment::QuarantinedSymptomatic
        )
    }

    /// Biological bucket used for per-meeting health tracking
    ///
    /// Quarantined susceptibles belong to no bucket while quarantined.
    pub fn health_bucket(self) -> Option<HealthBucket> {
        match self {
            Compartment::Susceptible => Some(HealthBucket::Susceptible),
            Compartment::Exposed | Compartment::QuarantinedExposed => Some(HealthBucket::Exposed),
            Compartment::InfectiousAsymptomatic
            | Compartment::InfectiousSymptomatic
            | Compartment::QuarantinedAsymptomatic
            | Compartment::QuarantinedSymptomatic => Some(HealthBucket::Infectious),
            Compartment::Removed => Some(HealthBucket::Removed),
            Compartment::QuarantinedSusceptible => None,
        }
    }

    /// Short label used in logs and CSV headers
    pub fn label(self) -> &'static str {
        match self {
            Compartment::Susceptible => "S",
            Compartment::Exposed => "E",
            Compartment::InfectiousAsymptomatic => "Ia",
            Compartment::InfectiousSymptomatic => "Is",
            Compartment::QuarantinedSusceptible => "Q",
            Compartment::QuarantinedExposed => "Qe",
            Compartment::QuarantinedAsymptomatic => "Qa",
            Compartment::QuarantinedSymptomatic => "Qs",
            Compartment::Removed => "R",
        }
    }
}

/// S/E/I/R view of a meeting's members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthBucket {
    Susceptible,
    Exposed,
    Infectious,
    Removed,
}

/// Dates of one infection, drawn once at exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionTimeline {
    pub exposure_date: NaiveDate,
    pub contagious_date: NaiveDate,
    pub removal_date: NaiveDate,
    pub symptomatic: bool,
}

impl InfectionTimeline {
    pub fn incubation_days(&self) -> i64 {
        (self.contagious_date - self.exposure_date).num_days()
    }

    pub fn illness_days(&self) -> i64 {
        (self.removal_date - self.contagious_date).num_days()
    }

    /// Compartment entered when incubation ends
    pub fn infectious_compartment(&self) -> Compartment {
        if self.symptomatic {
            Compartment::InfectiousSymptomatic
        } else {
            Compartment::InfectiousAsymptomatic
        }
    }
}

/// Members of one meeting grouped by health bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingHealth {
    pub susceptible: BTreeSet<IndividualId>,
    pub exposed: BTreeSet<IndividualId>,
    pub infectious: BTreeSet<IndividualId>,
    pub removed: BTreeSet<IndividualId>,
}

impl MeetingHealth {
    pub fn bucket(&self, bucket: HealthBucket) -> &BTreeSet<IndividualId> {
        match bucket {
            HealthBucket::Susceptible => &self.susceptible,
            HealthBucket::Exposed => &self.exposed,
            HealthBucket::Infectious => &self.infectious,
            HealthBucket::Removed => &self.removed,
        }
    }

    pub fn bucket_mut(&mut self, bucket: HealthBucket) -> &mut BTreeSet<IndividualId> {
        match bucket {
            HealthBucket::Susceptible => &mut self.susceptible,
            HealthBucket::Exposed => &mut self.exposed,
            HealthBucket::Infectious => &mut self.infectious,
            HealthBucket::Removed => &mut self.removed,
        }
    }

    /// Current `(S, E, I, R)` sizes
    pub fn counts(&self) -> MeetingHealthCounts {
        MeetingHealthCounts {
            susceptible: self.susceptible.len(),
            exposed: self.exposed.len(),
            infectious: self.infectious.len(),
            removed: self.removed.len(),
        }
    }
}

/// Sizes of a meeting's health buckets on one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingHealthCounts {
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious: usize,
    pub removed: usize,
}

/// Where an infection came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InfectionSource {
    /// Initial seeds and spontaneous community exposure
    Community,
    /// Transmission during a meeting occurrence
    Meeting { meeting: MeetingId, label: String },
}

impl InfectionSource {
    /// Label aggregated in statistics
    pub fn label(&self) -> &str {
        match self {
            InfectionSource::Community => "Community",
            InfectionSource::Meeting { label, .. } => label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_bucket_mapping() {
        assert_eq!(
            Compartment::QuarantinedExposed.health_bucket(),
            Some(HealthBucket::Exposed)
        );
        assert_eq!(
            Compartment::QuarantinedSymptomatic.health_bucket(),
            Some(HealthBucket::Infectious)
        );
        assert_eq!(Compartment::QuarantinedSusceptible.health_bucket(), None);
    }

    #[test]
    fn test_tests_positive_excludes_exposed() {
        assert!(!Compartment::Exposed.tests_positive());
        assert!(!Compartment::QuarantinedExposed.tests_positive());
        assert!(Compartment::QuarantinedAsymptomatic.tests_positive());
    }

    #[test]
    fn test_timeline_lengths() {
        let d = |day| NaiveDate::from_ymd_opt(2020, 9, day).unwrap();
        let timeline = InfectionTimeline {
            exposure_date: d(2),
            contagious_date: d(5),
            removal_date: d(10),
            symptomatic: true,
        };
        assert_eq!(timeline.incubation_days(), 3);
        assert_eq!(timeline.illness_days(), 5);
        assert_eq!(
            timeline.infectious_compartment(),
            Compartment::InfectiousSymptomatic
        );
    }
}

//! Intervention Policy Module
//!
//! Testing and contact-tracing policies decide **who** to test or
//! quarantine each day. They never touch the simulation state themselves:
//! each policy reads a [`PolicyContext`] and returns a list of
//! [`InterventionAction`]s, which the engine applies through its own
//! operations (quarantine, positive test scheduling, test requests).
//!
//! # Policy Interface
//!
//! ```rust
//! use campus_seir_core::policy::{InterventionAction, PolicyContext, TestingPolicy};
//!
//! #[derive(Clone)]
//! struct TestEveryoneRequested;
//!
//! impl TestingPolicy for TestEveryoneRequested {
//!     fn testing(&mut self, ctx: &PolicyContext<'_>) -> Vec<InterventionAction> {
//!         ctx.test_requests
//!             .iter()
//!             .filter(|id| ctx.tests_positive(**id))
//!             .map(|id| InterventionAction::PositiveTestResult(*id))
//!             .collect()
//!     }
//!
//!     fn describe(&self) -> String {
//!         "TestEveryoneRequested".to_string()
//!     }
//! }
//! ```
//!
//! # Available policies
//!
//! Testing:
//! 1. **NoTesting**: never tests
//! 2. **CohortTesting**: tests one weekday group per day (weekly, 5-day and
//!    7-day rotations)
//! 3. **RollingTesting**: tests group `day_of_year % days`
//!
//! Contact tracing:
//! 1. **NoTracing**: never traces
//! 2. **BasicContactTracing**: quarantines recent traceable contacts of
//!    symptomatic cases
//!
//! Policies are configured through [`TestingPolicyConfig`] and
//! [`ContactTracingConfig`] and built by their factories.

mod testing;
mod contact_tracing;

pub use testing::{CohortTesting, NoTesting, RollingTesting};
pub use contact_tracing::{BasicContactTracing, NoTracing};

use chrono::NaiveDate;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::roster::{IndividualId, Roster};
use crate::models::state::SimulationState;
use crate::rng::RngManager;

/// Decision returned by a policy, applied by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterventionAction {
    /// Quarantine an individual; `None` uses the simulation's default length
    Quarantine {
        individual: IndividualId,
        length: Option<u32>,
    },

    /// Positive test taken today; the result arrives tomorrow
    PositiveTestResult(IndividualId),

    /// Ask testing policies to test this individual today
    RequestTest(IndividualId),

    /// Informational: contacts traced for an index case (event log only)
    RecordTrace {
        index_case: IndividualId,
        contacts: usize,
    },
}

/// Read-only view handed to policies
pub struct PolicyContext<'a> {
    pub date: NaiveDate,
    pub roster: &'a Roster,
    pub state: &'a SimulationState,
    /// Individuals whose tests were requested for today
    pub test_requests: &'a BTreeSet<IndividualId>,
    /// Symptomatic cases to trace today
    pub trace_requests: &'a BTreeSet<IndividualId>,
}

impl PolicyContext<'_> {
    /// Whether a test taken today by `individual` comes back positive
    ///
    /// Only infectious individuals (free or quarantined) are detected.
    pub fn tests_positive(&self, individual: IndividualId) -> bool {
        self.state
            .compartment_of(individual)
            .map(|compartment| compartment.tests_positive())
            .unwrap_or(false)
    }
}

/// Decides whom to test each day
pub trait TestingPolicy: DynClone + Send {
    fn testing(&mut self, ctx: &PolicyContext<'_>) -> Vec<InterventionAction>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

dyn_clone::clone_trait_object!(TestingPolicy);

/// Decides whom to quarantine after a symptomatic case
pub trait ContactTracingPolicy: DynClone + Send {
    fn trace(&mut self, ctx: &PolicyContext<'_>) -> Vec<InterventionAction>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

dyn_clone::clone_trait_object!(ContactTracingPolicy);

// ============================================================================
// Configuration
// ============================================================================

/// Serializable choice of testing policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TestingPolicyConfig {
    #[default]
    None,
    /// Everyone on one weekday (0 = Monday)
    Weekly { weekday: u32 },
    /// Everyone on Mondays
    Monday,
    /// Everyone on Thursdays
    Thursday,
    /// Random permutation split into five groups, Monday to Friday
    WeekdayRotation,
    /// Random permutation split into seven groups, one per day
    DailyRotation,
    /// Roster order split into `days` groups, chosen by day of year
    Rolling { days: u32 },
}

impl TestingPolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TestingPolicyConfig::Rolling { days: 0 } => {
                Err("rolling testing needs at least one group".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Build the policy; rotations draw their groups from `rng`
    pub fn build(&self, roster: &Roster, rng: &mut RngManager) -> Box<dyn TestingPolicy> {
        match self {
            TestingPolicyConfig::None => Box::new(NoTesting),
            TestingPolicyConfig::Weekly { weekday } => {
                Box::new(CohortTesting::weekly(roster, *weekday))
            }
            TestingPolicyConfig::Monday => Box::new(CohortTesting::monday(roster)),
            TestingPolicyConfig::Thursday => Box::new(CohortTesting::thursday(roster)),
            TestingPolicyConfig::WeekdayRotation => {
                Box::new(CohortTesting::weekday_rotation(roster, rng))
            }
            TestingPolicyConfig::DailyRotation => {
                Box::new(CohortTesting::daily_rotation(roster, rng))
            }
            TestingPolicyConfig::Rolling { days } => {
                Box::new(RollingTesting::new(roster, (*days).max(1)))
            }
        }
    }
}

fn default_trace_window() -> u32 {
    3
}

/// Serializable choice of contact tracing policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ContactTracingConfig {
    #[default]
    None,
    Basic {
        /// Quarantine length for contacts; defaults to the simulation's
        #[serde(default)]
        quarantine_length: Option<u32>,
        /// Days looked back before the symptomatic recovery
        #[serde(default = "default_trace_window")]
        trace_window: u32,
        /// Also request same-day tests for traced contacts
        #[serde(default)]
        request_tests: bool,
    },
}

impl ContactTracingConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ContactTracingConfig::Basic {
                quarantine_length: Some(0),
                ..
            } => Err("contact tracing quarantine length must be at least one day".to_string()),
            _ => Ok(()),
        }
    }

    pub fn build(&self) -> Box<dyn ContactTracingPolicy> {
        match self {
            ContactTracingConfig::None => Box::new(NoTracing),
            ContactTracingConfig::Basic {
                quarantine_length,
                trace_window,
                request_tests,
            } => Box::new(BasicContactTracing {
                quarantine_length: *quarantine_length,
                trace_window: *trace_window,
                request_tests: *request_tests,
            }),
        }
    }
}

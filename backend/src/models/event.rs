//! Event logging for per-run auditing.
//!
//! Every compartment transition and intervention taken by the engine is
//! captured as an [`Event`]. The log makes it possible to:
//! - Debug a run (what happened to whom, and when)
//! - Audit interventions (who was traced, tested, quarantined)
//! - Summarize a run (event counts by type)
//!
//! # Example
//!
//! ```rust
//! use campus_seir_core::models::event::{Event, EventLog};
//! use campus_seir_core::models::compartment::InfectionSource;
//! use campus_seir_core::models::roster::IndividualId;
//! use chrono::NaiveDate;
//!
//! let mut log = EventLog::new();
//! log.log(Event::Exposed {
//!     date: NaiveDate::from_ymd_opt(2020, 9, 2).unwrap(),
//!     individual: IndividualId(7),
//!     source: InfectionSource::Community,
//! });
//!
//! assert_eq!(log.events_of_type("Exposed").len(), 1);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::compartment::{Compartment, InfectionSource};
use crate::models::roster::IndividualId;

/// Why an individual left the infected compartments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Illness ran its course
    Recovered,
    /// Positive test result arrived
    PositiveTest,
    /// Quarantine of an infected individual ended
    QuarantineEnded,
}

/// Simulation event capturing a state change.
///
/// Events are logged in the order they occur within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Susceptible individual infected
    Exposed {
        date: NaiveDate,
        individual: IndividualId,
        source: InfectionSource,
    },

    /// Incubation ended
    BecameInfectious {
        date: NaiveDate,
        individual: IndividualId,
        symptomatic: bool,
    },

    /// Individual entered quarantine
    Quarantined {
        date: NaiveDate,
        individual: IndividualId,
        from: Compartment,
        release: NaiveDate,
    },

    /// Quarantined susceptible returned to circulation
    QuarantineReleased {
        date: NaiveDate,
        individual: IndividualId,
    },

    Removed {
        date: NaiveDate,
        individual: IndividualId,
        reason: RemovalReason,
    },

    /// Positive result queued for a later day
    TestScheduled {
        date: NaiveDate,
        individual: IndividualId,
        result_date: NaiveDate,
    },

    /// Contacts of a symptomatic case were traced
    ContactTraced {
        date: NaiveDate,
        index_case: IndividualId,
        contacts: usize,
    },
}

impl Event {
    /// Date the event occurred
    pub fn date(&self) -> NaiveDate {
        match self {
            Event::Exposed { date, .. } => *date,
            Event::BecameInfectious { date, .. } => *date,
            Event::Quarantined { date, .. } => *date,
            Event::QuarantineReleased { date, .. } => *date,
            Event::Removed { date, .. } => *date,
            Event::TestScheduled { date, .. } => *date,
            Event::ContactTraced { date, .. } => *date,
        }
    }

    /// Short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Exposed { .. } => "Exposed",
            Event::BecameInfectious { .. } => "BecameInfectious",
            Event::Quarantined { .. } => "Quarantined",
            Event::QuarantineReleased { .. } => "QuarantineReleased",
            Event::Removed { .. } => "Removed",
            Event::TestScheduled { .. } => "TestScheduled",
            Event::ContactTraced { .. } => "ContactTraced",
        }
    }

    /// Individual the event is about
    pub fn individual(&self) -> IndividualId {
        match self {
            Event::Exposed { individual, .. } => *individual,
            Event::BecameInfectious { individual, .. } => *individual,
            Event::Quarantined { individual, .. } => *individual,
            Event::QuarantineReleased { individual, .. } => *individual,
            Event::Removed { individual, .. } => *individual,
            Event::TestScheduled { individual, .. } => *individual,
            Event::ContactTraced { index_case, .. } => *index_case,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events of a single day
    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.events.iter().filter(|e| e.date() == date).collect()
    }

    /// Events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events about one individual
    pub fn events_for(&self, individual: IndividualId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.individual() == individual)
            .collect()
    }

    /// Number of events per type
    pub fn counts_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.event_type().to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

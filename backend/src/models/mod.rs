//! Domain models for the campus simulator

pub mod clusters;
pub mod compartment;
pub mod event;
pub mod roster;
pub mod schedule;
pub mod state;

// Re-exports
pub use clusters::{Cluster, ClusterSettings, GroupShape};
pub use compartment::{
    Compartment, HealthBucket, InfectionSource, InfectionTimeline, MeetingHealth,
    MeetingHealthCounts,
};
pub use event::{Event, EventLog, RemovalReason};
pub use roster::{
    IndividualId, Meeting, MeetingId, MeetingKind, MeetingSchedule, MeetingSpec, Roster,
    RosterBuilder, RosterError, RosterSpec, WeeklyPattern,
};
pub use state::{InvariantViolation, SimulationState};

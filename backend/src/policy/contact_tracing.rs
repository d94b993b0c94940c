//! Contact tracing policies

use chrono::NaiveDate;
use log::trace;
use std::collections::BTreeSet;

use super::{ContactTracingPolicy, InterventionAction, PolicyContext};
use crate::core::calendar::sub_days;
use crate::models::roster::{IndividualId, MeetingId, Roster};

/// Never traces
#[derive(Debug, Clone, Default)]
pub struct NoTracing;

impl ContactTracingPolicy for NoTracing {
    fn trace(&mut self, _ctx: &PolicyContext<'_>) -> Vec<InterventionAction> {
        Vec::new()
    }

    fn describe(&self) -> String {
        "NoTracing".to_string()
    }
}

/// Quarantines everyone who shared a traceable meeting with a symptomatic case
///
/// For each case to trace, every Course or Social meeting the case is
/// enrolled in and that met during the `trace_window` days before today is
/// considered. All members of those meetings except the case are
/// quarantined. Untraceable meetings are never used.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicContactTracing {
    /// Quarantine length for contacts (`None`: simulation default)
    pub quarantine_length: Option<u32>,
    pub trace_window: u32,
    /// Also request same-day tests for contacts
    pub request_tests: bool,
}

impl Default for BasicContactTracing {
    fn default() -> Self {
        Self {
            quarantine_length: None,
            trace_window: 3,
            request_tests: false,
        }
    }
}

impl BasicContactTracing {
    /// Traceable meetings `case` attended in the window before `date`
    pub fn recent_meetings(&self, roster: &Roster, case: IndividualId, date: NaiveDate) -> BTreeSet<MeetingId> {
        let window: Vec<NaiveDate> = (1..=u64::from(self.trace_window))
            .map(|days| sub_days(date, days))
            .collect();
        roster
            .enrollment(case)
            .iter()
            .copied()
            .filter(|meeting| roster.meeting_kind(*meeting).is_traceable())
            .filter(|meeting| window.iter().any(|day| roster.meets_on(*day, *meeting)))
            .collect()
    }

    /// Contacts of `case`: members of its recent traceable meetings, minus itself
    pub fn contacts(&self, roster: &Roster, case: IndividualId, date: NaiveDate) -> BTreeSet<IndividualId> {
        let mut peers: BTreeSet<IndividualId> = self
            .recent_meetings(roster, case, date)
            .into_iter()
            .flat_map(|meeting| roster.members(meeting).iter().copied())
            .collect();
        peers.remove(&case);
        peers
    }
}

impl ContactTracingPolicy for BasicContactTracing {
    fn trace(&mut self, ctx: &PolicyContext<'_>) -> Vec<InterventionAction> {
        let mut actions = Vec::new();
        for case in ctx.trace_requests {
            let contacts = self.contacts(ctx.roster, *case, ctx.date);
            trace!("Tracing {}: {} contacts", case, contacts.len());
            actions.push(InterventionAction::RecordTrace {
                index_case: *case,
                contacts: contacts.len(),
            });
            for contact in contacts {
                actions.push(InterventionAction::Quarantine {
                    individual: contact,
                    length: self.quarantine_length,
                });
                if self.request_tests {
                    actions.push(InterventionAction::RequestTest(contact));
                }
            }
        }
        actions
    }

    fn describe(&self) -> String {
        format!(
            "BasicContactTracing(window: {}d, quarantine: {}, request tests: {})",
            self.trace_window,
            self.quarantine_length
                .map(|days| format!("{}d", days))
                .unwrap_or_else(|| "default".to_string()),
            self.request_tests
        )
    }
}

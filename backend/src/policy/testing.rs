//! Testing policies
//!
//! A testing policy picks today's testing group, adds today's test requests,
//! and reports a positive result (arriving tomorrow) for everyone tested who
//! is currently infectious. Exposed individuals are never detected.

use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};

use super::{InterventionAction, PolicyContext, TestingPolicy};
use crate::models::roster::{IndividualId, Roster};
use crate::rng::RngManager;

/// Positive results among `group ∪ requests`, in id order
fn positive_results(
    ctx: &PolicyContext<'_>,
    group: Option<&BTreeSet<IndividualId>>,
) -> Vec<InterventionAction> {
    let tested: BTreeSet<IndividualId> = group
        .into_iter()
        .flatten()
        .chain(ctx.test_requests.iter())
        .copied()
        .collect();
    tested
        .into_iter()
        .filter(|id| ctx.tests_positive(*id))
        .map(InterventionAction::PositiveTestResult)
        .collect()
}

/// Deal individuals round-robin into `groups` groups
fn deal(individuals: impl IntoIterator<Item = IndividualId>, groups: u32) -> BTreeMap<u32, BTreeSet<IndividualId>> {
    let mut dealt: BTreeMap<u32, BTreeSet<IndividualId>> = BTreeMap::new();
    for (i, individual) in individuals.into_iter().enumerate() {
        dealt
            .entry(i as u32 % groups)
            .or_default()
            .insert(individual);
    }
    dealt
}

/// Never tests anyone, not even on request
#[derive(Debug, Clone, Default)]
pub struct NoTesting;

impl TestingPolicy for NoTesting {
    fn testing(&mut self, _ctx: &PolicyContext<'_>) -> Vec<InterventionAction> {
        Vec::new()
    }

    fn describe(&self) -> String {
        "NoTesting".to_string()
    }
}

/// Tests a fixed group on each weekday (0 = Monday ... 6 = Sunday)
///
/// # Example
///
/// ```rust
/// use campus_seir_core::models::roster::{IndividualId, MeetingKind, RosterBuilder};
/// use campus_seir_core::policy::CohortTesting;
/// use campus_seir_core::rng::RngManager;
///
/// let mut builder = RosterBuilder::new();
/// for id in 0..10 {
///     builder.add_individual(IndividualId(id));
/// }
/// let roster = builder.build().unwrap();
///
/// let policy = CohortTesting::weekday_rotation(&roster, &mut RngManager::new(1));
/// let sizes: Vec<usize> = (0..5).map(|day| policy.group(day).len()).collect();
/// assert_eq!(sizes, vec![2, 2, 2, 2, 2]);
/// assert!(policy.group(5).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CohortTesting {
    groups: BTreeMap<u32, BTreeSet<IndividualId>>,
}

static NOBODY: BTreeSet<IndividualId> = BTreeSet::new();

impl CohortTesting {
    pub fn new(groups: BTreeMap<u32, BTreeSet<IndividualId>>) -> Self {
        Self { groups }
    }

    /// Everyone tested on one weekday
    pub fn weekly(roster: &Roster, weekday: u32) -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(weekday % 7, roster.individuals().clone());
        Self { groups }
    }

    pub fn monday(roster: &Roster) -> Self {
        Self::weekly(roster, 0)
    }

    pub fn thursday(roster: &Roster) -> Self {
        Self::weekly(roster, 3)
    }

    /// Random permutation split into five groups, Monday to Friday
    pub fn weekday_rotation(roster: &Roster, rng: &mut RngManager) -> Self {
        Self::rotation(roster, rng, 5)
    }

    /// Random permutation split into seven groups, one per day
    pub fn daily_rotation(roster: &Roster, rng: &mut RngManager) -> Self {
        Self::rotation(roster, rng, 7)
    }

    fn rotation(roster: &Roster, rng: &mut RngManager, days: u32) -> Self {
        let mut order: Vec<IndividualId> = roster.individuals().iter().copied().collect();
        rng.shuffle(&mut order);
        Self {
            groups: deal(order, days),
        }
    }

    /// Group tested on a weekday
    pub fn group(&self, weekday: u32) -> &BTreeSet<IndividualId> {
        self.groups.get(&weekday).unwrap_or(&NOBODY)
    }
}

impl TestingPolicy for CohortTesting {
    fn testing(&mut self, ctx: &PolicyContext<'_>) -> Vec<InterventionAction> {
        let weekday = ctx.date.weekday().num_days_from_monday();
        positive_results(ctx, self.groups.get(&weekday))
    }

    fn describe(&self) -> String {
        let sizes: Vec<String> = self
            .groups
            .iter()
            .map(|(day, group)| format!("{}:{}", day, group.len()))
            .collect();
        format!("CohortTesting({})", sizes.join(", "))
    }
}

/// Roster order split into `days` groups; group `day_of_year % days` is tested
#[derive(Debug, Clone)]
pub struct RollingTesting {
    days: u32,
    groups: BTreeMap<u32, BTreeSet<IndividualId>>,
}

impl RollingTesting {
    pub fn new(roster: &Roster, days: u32) -> Self {
        let days = days.max(1);
        Self {
            days,
            groups: deal(roster.individuals().iter().copied(), days),
        }
    }
}

impl TestingPolicy for RollingTesting {
    fn testing(&mut self, ctx: &PolicyContext<'_>) -> Vec<InterventionAction> {
        let group = ctx.date.ordinal() % self.days;
        positive_results(ctx, self.groups.get(&group))
    }

    fn describe(&self) -> String {
        format!("RollingTesting(days: {})", self.days)
    }
}

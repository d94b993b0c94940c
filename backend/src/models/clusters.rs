//! Randomised social clusters
//!
//! Contact outside class is modelled as extra Social meetings named
//! "AutoCluster <prefix><n>". The generators draw groups of individuals
//! through an [`RngManager`]; [`add_clusters`] writes them into a copy of a
//! roster.
//!
//! ```
//! use campus_seir_core::models::clusters::{add_clusters, pair_clusters};
//! use campus_seir_core::models::{IndividualId, MeetingKind, RosterBuilder};
//! use campus_seir_core::RngManager;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2020, 9, 2).unwrap();
//! let mut builder = RosterBuilder::new();
//! builder.insert_meeting("CS 101", MeetingKind::Course, None, (0..20).map(IndividualId), [(day, 75)]);
//! let roster = builder.build().unwrap();
//!
//! let mut rng = RngManager::new(3);
//! let pairs = pair_clusters(&roster, 1.0, 1200, &Default::default(), false, &mut rng);
//! let social = add_clusters(&roster, &pairs, "pair ").unwrap();
//! assert_eq!(social.num_meetings(), 1 + pairs.len());
//! assert_eq!(social.num_individuals(), 20);
//! ```

use chrono::{Datelike, NaiveDate, Weekday};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::roster::{IndividualId, MeetingKind, Roster, RosterBuilder, RosterError};
use crate::rng::RngManager;

/// A group of individuals and the days it meets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub members: BTreeSet<IndividualId>,
    pub occurrences: BTreeMap<NaiveDate, u32>,
}

/// Groups drawn for one day: how many, how large, for how long
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupShape {
    pub count: usize,
    pub size: usize,
    pub minutes: u32,
}

/// Group shapes for weekdays and weekends over a date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Defaults to the roster's first scheduled date
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Defaults to the roster's last scheduled date
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub weekday: GroupShape,
    pub weekend: GroupShape,
}

impl ClusterSettings {
    /// Shape used on `date`
    pub fn shape_on(&self, date: NaiveDate) -> GroupShape {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => self.weekend,
            _ => self.weekday,
        }
    }

    /// Inclusive date range, falling back to the roster's calendar
    pub fn date_range(&self, roster: &Roster) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start_date.or_else(|| roster.first_date())?;
        let end = self.end_date.or_else(|| roster.last_date())?;
        Some((start, end))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.weekday.size == 0 || self.weekend.size == 0 {
            return Err("cluster size must be at least 1".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(format!("cluster range ends ({}) before it starts ({})", end, start));
            }
        }
        Ok(())
    }
}

fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}

/// Disjoint groups of `shape.size` drawn from `pool`
///
/// The group count is capped by how many full groups fit.
fn draw_groups(
    pool: &[IndividualId],
    shape: GroupShape,
    rng: &mut RngManager,
) -> Vec<BTreeSet<IndividualId>> {
    if shape.size == 0 {
        return Vec::new();
    }
    let count = shape.count.min(pool.len() / shape.size);
    if count == 0 {
        return Vec::new();
    }
    rng.choose_distinct(pool, count * shape.size)
        .chunks(shape.size)
        .map(|group| group.iter().copied().collect())
        .collect()
}

/// Fresh groups every day; each group meets only on the day it is drawn
pub fn daily_clusters(
    pool: &[IndividualId],
    settings: &ClusterSettings,
    (start, end): (NaiveDate, NaiveDate),
    rng: &mut RngManager,
) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    for date in days(start, end) {
        let shape = settings.shape_on(date);
        for members in draw_groups(pool, shape, rng) {
            clusters.push(Cluster {
                members,
                occurrences: BTreeMap::from([(date, shape.minutes)]),
            });
        }
    }
    clusters
}

/// Groups drawn once with the weekday shape, meeting every day of the range
pub fn static_clusters(
    pool: &[IndividualId],
    settings: &ClusterSettings,
    (start, end): (NaiveDate, NaiveDate),
    rng: &mut RngManager,
) -> Vec<Cluster> {
    let shape = settings.weekday;
    let occurrences: BTreeMap<NaiveDate, u32> =
        days(start, end).map(|date| (date, shape.minutes)).collect();
    draw_groups(pool, shape, rng)
        .into_iter()
        .map(|members| Cluster {
            members,
            occurrences: occurrences.clone(),
        })
        .collect()
}

/// Clusters within each team, as for varsity squads training in small units
///
/// Each team is its own pool and gets as many groups as fit; the counts in
/// `settings` are ignored.
pub fn team_clusters(
    teams: &BTreeMap<String, Vec<IndividualId>>,
    settings: &ClusterSettings,
    range: (NaiveDate, NaiveDate),
    fixed: bool,
    rng: &mut RngManager,
) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    for members in teams.values() {
        let team_settings = ClusterSettings {
            weekday: GroupShape {
                count: members.len(),
                ..settings.weekday
            },
            weekend: GroupShape {
                count: members.len(),
                ..settings.weekend
            },
            ..settings.clone()
        };
        if fixed {
            clusters.extend(static_clusters(members, &team_settings, range, rng));
        } else {
            clusters.extend(daily_clusters(members, &team_settings, range, rng));
        }
    }
    clusters
}

/// Meetings `a` and `b` attend together
fn shared_meetings(roster: &Roster, a: IndividualId, b: IndividualId) -> usize {
    roster
        .enrollment(a)
        .iter()
        .filter(|meeting| roster.members(**meeting).contains(&b))
        .count()
}

/// Pairs of friends meeting every day of the roster's calendar
///
/// `fraction_paired * |eligible|` draws are taken with replacement from
/// the individuals not in `excluded`; repeated draws shrink the pool. With
/// `weighted`, each partner is chosen with weight 1 + number of shared
/// meetings, otherwise the pool is shuffled and paired in order.
pub fn pair_clusters(
    roster: &Roster,
    fraction_paired: f64,
    minutes: u32,
    excluded: &BTreeSet<IndividualId>,
    weighted: bool,
    rng: &mut RngManager,
) -> Vec<Cluster> {
    let (Some(start), Some(end)) = (roster.first_date(), roster.last_date()) else {
        return Vec::new();
    };
    let eligible: Vec<IndividualId> = roster
        .individuals()
        .iter()
        .filter(|individual| !excluded.contains(individual))
        .copied()
        .collect();
    let draws = (eligible.len() as f64 * fraction_paired.clamp(0.0, 1.0)) as usize;
    if draws == 0 {
        return Vec::new();
    }
    let mut pool: Vec<IndividualId> = (0..draws)
        .map(|_| eligible[rng.range(0, eligible.len())])
        .collect();

    let occurrences: BTreeMap<NaiveDate, u32> =
        days(start, end).map(|date| (date, minutes)).collect();
    let pair = |a: IndividualId, b: IndividualId| Cluster {
        members: BTreeSet::from([a, b]),
        occurrences: occurrences.clone(),
    };

    let mut pairs = Vec::new();
    if weighted {
        let mut remaining: BTreeSet<IndividualId> = pool.iter().copied().collect();
        for individual in &pool {
            if !remaining.contains(individual) {
                continue;
            }
            if remaining.len() < 2 {
                break;
            }
            remaining.remove(individual);
            let candidates: Vec<IndividualId> = remaining.iter().copied().collect();
            let weights: Vec<f64> = candidates
                .iter()
                .map(|candidate| 1.0 + shared_meetings(roster, *individual, *candidate) as f64)
                .collect();
            if let Some(chosen) = rng.weighted_index(&weights) {
                remaining.remove(&candidates[chosen]);
                pairs.push(pair(*individual, candidates[chosen]));
            }
        }
    } else {
        rng.shuffle(&mut pool);
        for two in pool.chunks_exact(2) {
            // A repeated draw cannot befriend itself
            if two[0] != two[1] {
                pairs.push(pair(two[0], two[1]));
            }
        }
    }
    pairs
}

/// Source label shared by clusters with the same prefix
pub fn cluster_label(prefix: &str) -> String {
    format!("AutoCluster {}", prefix).trim_end().to_string()
}

/// Add each cluster as a Social meeting "AutoCluster <prefix><n>"
///
/// Numbering continues after clusters already present with the same
/// prefix. Cluster members not yet on the roster are added.
pub fn add_clusters(
    roster: &Roster,
    clusters: &[Cluster],
    prefix: &str,
) -> Result<Roster, RosterError> {
    let name = |n: usize| format!("AutoCluster {}{}", prefix, n);
    let first = (0..)
        .find(|n| roster.meeting_by_name(&name(*n)).is_none())
        .unwrap_or(0);

    let mut builder = RosterBuilder::from_roster(roster);
    for (offset, cluster) in clusters.iter().enumerate() {
        builder.insert_meeting(
            &name(first + offset),
            MeetingKind::Social,
            Some(cluster_label(prefix)),
            cluster.members.iter().copied(),
            cluster.occurrences.iter().map(|(date, minutes)| (*date, *minutes)),
        );
    }
    debug!("Added {} social clusters \"{}\"", clusters.len(), cluster_label(prefix));
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 9, d).unwrap()
    }

    fn shape(count: usize, size: usize, minutes: u32) -> GroupShape {
        GroupShape {
            count,
            size,
            minutes,
        }
    }

    #[test]
    fn test_group_count_capped_by_pool() {
        let pool: Vec<IndividualId> = (0..7).map(IndividualId).collect();
        let groups = draw_groups(&pool, shape(5, 3, 60), &mut RngManager::new(1));
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|group| group.len() == 3));
        assert!(groups[0].is_disjoint(&groups[1]));
    }

    #[test]
    fn test_zero_size_draws_nothing() {
        let pool: Vec<IndividualId> = (0..7).map(IndividualId).collect();
        assert!(draw_groups(&pool, shape(5, 0, 60), &mut RngManager::new(1)).is_empty());
    }

    #[test]
    fn test_weekend_shape() {
        let settings = ClusterSettings {
            start_date: None,
            end_date: None,
            weekday: shape(1, 2, 30),
            weekend: shape(1, 4, 120),
        };
        // Sept 5, 2020 is a Saturday
        assert_eq!(settings.shape_on(date(5)).minutes, 120);
        assert_eq!(settings.shape_on(date(7)).minutes, 30);
    }

    #[test]
    fn test_cluster_label() {
        assert_eq!(cluster_label(""), "AutoCluster");
        assert_eq!(cluster_label("pair "), "AutoCluster pair");
    }
}

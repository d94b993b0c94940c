//! Alternative teaching plans derived from a base roster

use campus_seir_core::models::clusters::{
    add_clusters, daily_clusters, pair_clusters, ClusterSettings, GroupShape,
};
use campus_seir_core::models::roster::{IndividualId, Meeting, MeetingKind, Roster, RosterBuilder};
use campus_seir_core::models::schedule::{alternate_hybrid, small_classes_only, split_classes};
use campus_seir_core::orchestrator::ScheduleTransform;
use campus_seir_core::RngManager;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, m, d).unwrap()
}

/// Three courses and a dorm, all meeting on Sept 7 and 14 (week 0 and week 1)
fn base() -> Roster {
    let days = [(date(9, 7), 50), (date(9, 14), 50)];
    let mut builder = RosterBuilder::new();
    builder.insert_meeting("A", MeetingKind::Course, Some("Classroom".to_string()), (0..5).map(IndividualId), days);
    builder.insert_meeting("B", MeetingKind::Course, None, (5..60).map(IndividualId), days);
    builder.insert_meeting("Dorm", MeetingKind::Social, Some("Dorm".to_string()), (0..10).map(IndividualId), days);
    builder.insert_meeting("C", MeetingKind::Course, None, (10..12).map(IndividualId), days);
    builder.build().unwrap()
}

fn id(roster: &Roster, name: &str) -> campus_seir_core::MeetingId {
    roster.meeting_by_name(name).unwrap().id()
}

#[test]
fn test_hybrid_alternates_courses_by_week() {
    let roster = base();
    let hybrid = alternate_hybrid(&roster).unwrap();

    // Positions: A=0 (even), B=1 (odd), Dorm=2 (not a course), C=3 (odd)
    let a = id(&hybrid, "A");
    let b = id(&hybrid, "B");
    let c = id(&hybrid, "C");
    let dorm = id(&hybrid, "Dorm");

    assert!(!hybrid.meets_on(date(9, 7), a));
    assert!(hybrid.meets_on(date(9, 14), a));

    assert!(hybrid.meets_on(date(9, 7), b));
    assert!(!hybrid.meets_on(date(9, 14), b));
    assert!(hybrid.meets_on(date(9, 7), c));
    assert!(!hybrid.meets_on(date(9, 14), c));

    assert!(hybrid.meets_on(date(9, 7), dorm));
    assert!(hybrid.meets_on(date(9, 14), dorm));

    // Input untouched
    assert!(roster.meets_on(date(9, 14), b));
}

#[test]
fn test_split_classes_creates_weekly_sections() {
    let roster = base();
    let split = split_classes(&roster).unwrap();

    assert!(split.meeting_by_name("A").is_none());
    let w1 = split.meeting_by_name("A W1").unwrap();
    let w2 = split.meeting_by_name("A W2").unwrap();
    assert_eq!(w1.source_label(), "Classroom");

    let first: Vec<u32> = split.members(w1.id()).iter().map(|i| i.0).collect();
    let second: Vec<u32> = split.members(w2.id()).iter().map(|i| i.0).collect();
    assert_eq!(first, vec![0, 2, 4]);
    assert_eq!(second, vec![1, 3]);

    assert!(split.meets_on(date(9, 7), w1.id()));
    assert!(!split.meets_on(date(9, 14), w1.id()));
    assert!(split.meets_on(date(9, 14), w2.id()));
    assert!(!split.meets_on(date(9, 7), w2.id()));

    // Social meetings and population unchanged
    assert!(split.meeting_by_name("Dorm").is_some());
    assert_eq!(split.num_individuals(), roster.num_individuals());
    assert_eq!(split.num_meetings(), 7);
}

#[test]
fn test_small_classes_only_cancels_large_courses() {
    let roster = base();
    let small = small_classes_only(&roster, 50).unwrap();
    assert!(small.meeting_by_name("B").is_none());
    assert!(small.meeting_by_name("A").is_some());
    assert!(small.meeting_by_name("Dorm").is_some());
    assert_eq!(small.num_individuals(), roster.num_individuals());
    assert!(small.enrollment(IndividualId(30)).is_empty());
}

#[test]
fn test_transform_config_dispatch() {
    let roster = base();
    let transform: ScheduleTransform = serde_json::from_str(r#"{"SmallClassesOnly": {}}"#).unwrap();
    assert_eq!(transform, ScheduleTransform::SmallClassesOnly { max_size: 50 });
    assert_eq!(transform.apply(&roster).unwrap().num_meetings(), 3);
    assert_eq!(ScheduleTransform::None.apply(&roster).unwrap(), roster);
}

fn auto_clusters(roster: &Roster) -> Vec<&Meeting> {
    roster
        .meetings()
        .filter(|meeting| meeting.name().starts_with("AutoCluster"))
        .collect()
}

fn meeting_days(roster: &Roster, meeting: &Meeting) -> Vec<NaiveDate> {
    roster
        .calendar()
        .filter(|(_, schedule)| schedule.contains_key(&meeting.id()))
        .map(|(date, _)| *date)
        .collect()
}

fn settings(weekday: GroupShape, weekend: GroupShape) -> ClusterSettings {
    ClusterSettings {
        start_date: None,
        end_date: None,
        weekday,
        weekend,
    }
}

#[test]
fn test_daily_clusters_follow_weekday_and_weekend_shapes() {
    let roster = base();
    let settings = settings(
        GroupShape { count: 3, size: 4, minutes: 45 },
        GroupShape { count: 2, size: 6, minutes: 180 },
    );
    let pool: Vec<IndividualId> = roster.individuals().iter().copied().collect();
    let range = settings.date_range(&roster).unwrap();
    assert_eq!(range, (date(9, 7), date(9, 14)));

    let clusters = daily_clusters(&pool, &settings, range, &mut RngManager::new(5));
    // Six weekdays (Sept 7-11, 14) and one weekend (Sept 12-13)
    assert_eq!(clusters.len(), 6 * 3 + 2 * 2);

    let social = add_clusters(&roster, &clusters, "daily ").unwrap();
    assert_eq!(roster.num_meetings(), 4);
    assert_eq!(social.num_meetings(), 4 + 22);
    assert_eq!(social.num_individuals(), roster.num_individuals());

    for meeting in auto_clusters(&social) {
        assert_eq!(meeting.kind(), MeetingKind::Social);
        assert_eq!(meeting.source_label(), "AutoCluster daily");
        let days = meeting_days(&social, meeting);
        assert_eq!(days.len(), 1);
        let members = social.members(meeting.id()).len();
        match days[0] {
            d if d == date(9, 12) || d == date(9, 13) => {
                assert_eq!(members, 6);
                assert_eq!(social.duration_on(d, meeting.id()), Some(180));
            }
            d => {
                assert_eq!(members, 4);
                assert_eq!(social.duration_on(d, meeting.id()), Some(45));
            }
        }
    }
}

#[test]
fn test_static_clusters_are_disjoint_and_meet_daily() {
    let roster = base();
    let transform: ScheduleTransform = serde_json::from_str(
        r#"{"StaticClusters": {"settings": {
            "weekday": {"count": 5, "size": 10, "minutes": 60},
            "weekend": {"count": 5, "size": 10, "minutes": 60}
        }, "seed": 12}}"#,
    )
    .unwrap();
    assert!(transform.validate().is_ok());
    let social = transform.apply(&roster).unwrap();
    assert_eq!(social, transform.apply(&roster).unwrap());

    let clusters = auto_clusters(&social);
    assert_eq!(clusters.len(), 5);
    let mut seen = BTreeSet::new();
    for meeting in clusters {
        assert_eq!(meeting_days(&social, meeting).len(), 8);
        for member in social.members(meeting.id()) {
            assert!(seen.insert(*member));
        }
    }
    assert_eq!(seen.len(), 50);
}

#[test]
fn test_weighted_pairs_never_share_members() {
    let roster = base();
    let excluded: BTreeSet<IndividualId> = (0..10).map(IndividualId).collect();
    let pairs = pair_clusters(&roster, 1.0, 1200, &excluded, true, &mut RngManager::new(8));
    assert!(!pairs.is_empty());

    let mut seen = BTreeSet::new();
    for pair in &pairs {
        assert_eq!(pair.members.len(), 2);
        assert_eq!(pair.occurrences.len(), 8);
        assert!(pair.occurrences.values().all(|minutes| *minutes == 1200));
        for member in &pair.members {
            assert!(!excluded.contains(member));
            assert!(seen.insert(*member));
        }
    }
}

#[test]
fn test_unweighted_pairs() {
    let roster = base();
    let pairs = pair_clusters(&roster, 0.5, 90, &BTreeSet::new(), false, &mut RngManager::new(8));
    // 30 draws give at most 15 pairs
    assert!(!pairs.is_empty() && pairs.len() <= 15);
    assert!(pairs.iter().all(|pair| pair.members.len() == 2));
    assert!(pair_clusters(&roster, 0.0, 90, &BTreeSet::new(), false, &mut RngManager::new(8)).is_empty());
}

#[test]
fn test_team_clusters_stay_within_teams() {
    let roster = base();
    let mut teams = BTreeMap::new();
    teams.insert("Varsity Soccer".to_string(), (0..8).map(IndividualId).collect::<Vec<_>>());
    teams.insert(
        "Varsity Tennis".to_string(),
        vec![IndividualId(20), IndividualId(21), IndividualId(22), IndividualId(23), IndividualId(999)],
    );
    let transform = ScheduleTransform::TeamClusters {
        teams: teams.clone(),
        settings: settings(
            GroupShape { count: 1, size: 4, minutes: 120 },
            GroupShape { count: 1, size: 4, minutes: 120 },
        ),
        fixed: true,
        seed: 3,
    };
    let social = transform.apply(&roster).unwrap();

    // Soccer fits two groups of four, tennis one; the unknown player is ignored
    let clusters = auto_clusters(&social);
    assert_eq!(clusters.len(), 3);
    assert!(!social.contains_individual(IndividualId(999)));
    assert_eq!(social.num_individuals(), roster.num_individuals());
    for meeting in clusters {
        let members = social.members(meeting.id());
        let in_team = |team: &str| members.iter().all(|member| teams[team].contains(member));
        assert!(in_team("Varsity Soccer") || in_team("Varsity Tennis"));
    }
}

#[test]
fn test_transform_sequence_applies_in_order() {
    let roster = base();
    let transform = ScheduleTransform::Sequence(vec![
        ScheduleTransform::SmallClassesOnly { max_size: 50 },
        ScheduleTransform::SocialPairs {
            fraction_paired: 1.0,
            minutes: 600,
            weighted: true,
            excluded: Vec::new(),
            seed: 1,
        },
    ]);
    let social = transform.apply(&roster).unwrap();
    assert!(social.meeting_by_name("B").is_none());
    let pairs = auto_clusters(&social);
    assert!(!pairs.is_empty());
    assert_eq!(social.num_meetings(), 3 + pairs.len());
    assert!(pairs.iter().all(|meeting| meeting.source_label() == "AutoCluster pair"));
}

#[test]
fn test_cluster_transform_validation() {
    let pairs = ScheduleTransform::SocialPairs {
        fraction_paired: 1.5,
        minutes: 600,
        weighted: false,
        excluded: Vec::new(),
        seed: 0,
    };
    assert!(pairs.validate().is_err());

    let empty_groups = ScheduleTransform::RandomClusters {
        settings: settings(
            GroupShape { count: 2, size: 0, minutes: 60 },
            GroupShape { count: 2, size: 3, minutes: 60 },
        ),
        seed: 0,
    };
    assert!(ScheduleTransform::Sequence(vec![empty_groups]).validate().is_err());
}

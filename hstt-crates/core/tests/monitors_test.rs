use std::sync::Arc;

use hstt_core::containers::StorageKey;
use hstt_core::instance::Constraint;
use hstt_core::instance::ConstraintKind;
use hstt_core::instance::EventId;
use hstt_core::instance::InstanceBuilder;
use hstt_core::monitors::MonitorTag;
use hstt_core::solvers::resource::task_tree_make;
use hstt_core::Cost;
use hstt_core::Solution;

/// Four times and one teacher, Smith, preassigned to Maths, a two-time event taught as two
/// single-time meets.
fn clash_solution() -> Solution {
    let mut builder = InstanceBuilder::new("clash");
    for index in 0..4 {
        let _ = builder.add_time(format!("t{index}"));
    }
    let teacher = builder.add_resource_type("Teacher");
    let smith = builder.add_resource("Smith", teacher);
    let maths = builder.add_event("Maths", 2, None);
    let _ = builder.add_event_resource(maths, teacher, None, Some(smith));
    let _ = builder.add_constraint(Constraint::new(
        "avoid clashes",
        true,
        1,
        ConstraintKind::AvoidClashes {
            resources: vec![smith],
        },
    ));

    let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));
    solution.make_complete_representation();
    let meet = solution.event_meets(maths)[0];
    let _ = solution.meet_split(meet, 1).expect("the meet splits");
    let _ = task_tree_make(&mut solution);
    solution
}

#[test]
fn a_clash_costs_until_one_meet_moves_away() {
    let mut solution = clash_solution();
    let cycle_meet = solution.cycle_meets()[0];
    let meets = solution.event_meets(EventId::create_from_index(0)).to_vec();
    assert_eq!(meets.len(), 2);
    let clashes = solution
        .constraint_monitors()
        .find(|&monitor| solution.monitor_tag(monitor) == MonitorTag::AvoidClashes)
        .expect("one avoid clashes monitor");

    assert!(solution.meet_assign(meets[0], cycle_meet, 0));
    assert!(solution.meet_assign(meets[1], cycle_meet, 0));
    assert_eq!(solution.monitor_deviations(clashes).sum(), 1);
    assert_eq!(solution.cost(), Cost::hard(1));

    assert!(solution.meet_move(meets[1], cycle_meet, 1));
    assert!(solution.monitor_deviations(clashes).is_zero());
    assert!(solution.cost().is_zero());
    assert!(solution.check_costs().is_empty());
}

#[test]
fn every_split_point_merges_back() {
    let mut builder = InstanceBuilder::new("long");
    for index in 0..6 {
        let _ = builder.add_time(format!("t{index}"));
    }
    let event = builder.add_event("Double", 5, None);
    let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));
    solution.make_complete_representation();
    let meet = solution.event_meets(event)[0];

    for first_duration in 1..5 {
        let rest = solution.meet_split(meet, first_duration).expect("the meet splits");
        assert_eq!(solution.meet_duration(meet), first_duration);
        assert_eq!(solution.meet_duration(rest), 5 - first_duration);
        assert!(solution.meet_merge_check(meet, rest));
        assert!(solution.meet_merge(meet, rest));
        assert_eq!(solution.event_meets(event), &[meet]);
        assert_eq!(solution.meet_duration(meet), 5);
    }
    assert!(solution.meet_split(meet, 0).is_none());
    assert!(solution.meet_split(meet, 5).is_none());
}

#[test]
fn split_events_counts_long_meets_and_too_many_meets() {
    let mut builder = InstanceBuilder::new("split");
    for index in 0..6 {
        let _ = builder.add_time(format!("t{index}"));
    }
    let maths = builder.add_event("Maths", 3, None);
    let _ = builder.add_constraint(Constraint::new(
        "split maths",
        true,
        1,
        ConstraintKind::SplitEvents {
            events: vec![maths],
            min_duration: 1,
            max_duration: 2,
            min_amount: 1,
            max_amount: 2,
        },
    ));
    let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));
    solution.make_complete_representation();

    // One meet of duration 3 is one time too long.
    assert_eq!(solution.cost(), Cost::hard(1));

    let meet = solution.event_meets(maths)[0];
    let _ = solution.meet_split(meet, 2).expect("the meet splits");
    assert!(solution.cost().is_zero());

    // Three meets are one too many.
    let _ = solution.meet_split(meet, 1).expect("the meet splits again");
    assert_eq!(solution.event_meets(maths).len(), 3);
    assert_eq!(solution.cost(), Cost::hard(1));
    assert!(solution.check_costs().is_empty());
}

#[test]
fn a_meet_far_outside_the_duration_range_counts_once() {
    let mut builder = InstanceBuilder::new("long");
    for index in 0..6 {
        let _ = builder.add_time(format!("t{index}"));
    }
    let double = builder.add_event("Double", 6, None);
    let _ = builder.add_constraint(Constraint::new(
        "doubles only",
        true,
        1,
        ConstraintKind::SplitEvents {
            events: vec![double],
            min_duration: 2,
            max_duration: 2,
            min_amount: 1,
            max_amount: 3,
        },
    ));
    let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));
    solution.make_complete_representation();
    assert_eq!(solution.cost(), Cost::hard(1));

    let meet = solution.event_meets(double)[0];
    let rest = solution.meet_split(meet, 1).expect("the meet splits");
    assert_eq!(solution.cost(), Cost::hard(2));

    assert!(solution.meet_merge(meet, rest));
    let rest = solution.meet_split(meet, 2).expect("the meet splits");
    let _ = solution.meet_split(rest, 2).expect("the rest splits");
    assert!(solution.cost().is_zero());
    assert!(solution.check_costs().is_empty());
}

use std::sync::Arc;

use hstt_core::instance::Constraint;
use hstt_core::instance::ConstraintKind;
use hstt_core::instance::InstanceBuilder;
use hstt_core::instance::TimeGroupKind;
use hstt_core::solvers::layer_tree_make;
use hstt_core::solvers::LayerTreeOptions;
use hstt_core::Solution;

/// Two days of three times. Smith teaches Maths (duration 3, split into meets of at most two
/// times) and History (duration 2).
fn school() -> Solution {
    let mut builder = InstanceBuilder::new("school");
    let times = (0..6)
        .map(|index| builder.add_time(format!("t{index}")))
        .collect::<Vec<_>>();
    let _ = builder.add_time_group("Mon", TimeGroupKind::Day, times[..3].iter().copied());
    let _ = builder.add_time_group("Tue", TimeGroupKind::Day, times[3..].iter().copied());
    let teacher = builder.add_resource_type("Teacher");
    let smith = builder.add_resource("Smith", teacher);
    let maths = builder.add_event("Maths", 3, None);
    let _ = builder.add_event_resource(maths, teacher, None, Some(smith));
    let history = builder.add_event("History", 2, None);
    let _ = builder.add_event_resource(history, teacher, None, Some(smith));
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

    Solution::new(Arc::new(builder.build().expect("valid instance")))
}

#[test]
fn a_node_cannot_become_its_own_ancestor() {
    let mut solution = school();
    let top = solution.node_make();
    let middle = solution.node_make();
    let bottom = solution.node_make();
    assert!(solution.node_add_parent(middle, top));
    assert!(solution.node_add_parent(bottom, middle));

    assert!(!solution.node_add_parent(top, bottom));
    assert!(!solution.node_add_parent(top, top));
    assert!(solution.node_is_descendant(bottom, top));
    assert!(!solution.node_is_descendant(top, bottom));
    assert_eq!(solution.node_parent(top), None);
}

#[test]
fn the_layer_tree_splits_events_below_the_cycle_node() {
    let mut solution = school();
    solution.split_cycle_meet();
    solution.make_complete_representation();
    let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());

    assert_eq!(solution.cycle_node(), Some(cycle_node));
    assert_eq!(solution.cycle_meets().len(), 2);
    let maths = solution.instance().events().next().expect("two events");
    let mut durations = solution
        .event_meets(maths)
        .iter()
        .map(|&meet| solution.meet_duration(meet))
        .collect::<Vec<_>>();
    durations.sort_unstable();
    assert_eq!(durations, vec![1, 2]);
    assert!(solution.cost().is_zero());

    for node in solution.nodes().collect::<Vec<_>>() {
        if node == cycle_node {
            continue;
        }
        assert!(solution.node_is_descendant(node, cycle_node));
        for &child in solution.node_children(node) {
            assert!(!solution.node_is_descendant(node, child));
        }
    }
    for &meet in solution.event_meets(maths) {
        let node = solution.meet_node(meet).expect("event meets lie in nodes");
        assert_ne!(node, cycle_node);
    }
}

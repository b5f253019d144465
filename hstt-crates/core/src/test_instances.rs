//! Small instances shared by the unit tests.
use std::sync::Arc;

use crate::instance::Constraint;
use crate::instance::ConstraintKind;
use crate::instance::InstanceBuilder;
use crate::solution::Solution;

/// Six times and two teachers, `A` and `B`. Event `e0` (duration 3) and event `e1` (duration 2)
/// each have a teacher preassigned `A`; event `e2` (duration 1) needs any teacher. The
/// constraints are hard: avoid clashes for both teachers (`c0`), assign times to all events
/// (`c1`) and assign a resource to `e2` (`c2`).
///
/// The solution has the complete representation: one unassigned meet per event, with one
/// unassigned task each.
pub(crate) fn two_teacher_solution() -> Solution {
    let mut builder = InstanceBuilder::new("two teachers");
    for index in 0..6 {
        let _ = builder.add_time(format!("t{index}"));
    }
    let teacher = builder.add_resource_type("Teacher");
    let a = builder.add_resource("A", teacher);
    let b = builder.add_resource("B", teacher);

    let e0 = builder.add_event("e0", 3, None);
    let _ = builder.add_event_resource(e0, teacher, Some("teacher"), Some(a));
    let e1 = builder.add_event("e1", 2, None);
    let _ = builder.add_event_resource(e1, teacher, Some("teacher"), Some(a));
    let e2 = builder.add_event("e2", 1, None);
    let er2 = builder.add_event_resource(e2, teacher, Some("teacher"), None);

    let _ = builder.add_constraint(Constraint::new(
        "avoid clashes",
        true,
        1,
        ConstraintKind::AvoidClashes {
            resources: vec![a, b],
        },
    ));
    let _ = builder.add_constraint(Constraint::new(
        "assign times",
        true,
        1,
        ConstraintKind::AssignTime {
            events: vec![e0, e1, e2],
        },
    ));
    let _ = builder.add_constraint(Constraint::new(
        "assign teacher",
        true,
        1,
        ConstraintKind::AssignResource {
            event_resources: vec![er2],
        },
    ));

    let instance = builder.build().expect("the two teacher instance is valid");
    let mut solution = Solution::new(Arc::new(instance));
    solution.make_complete_representation();
    solution
}

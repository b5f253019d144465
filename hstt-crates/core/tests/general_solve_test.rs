use std::sync::Arc;

use hstt_core::instance::Constraint;
use hstt_core::instance::ConstraintKind;
use hstt_core::instance::EventId;
use hstt_core::instance::InstanceBuilder;
use hstt_core::instance::TimeGroupKind;
use hstt_core::parallel_solve;
use hstt_core::solvers::general_solve;
use hstt_core::solvers::GeneralSolveOptions;
use hstt_core::Solution;

/// Two days of three times and teachers Smith and Jones. Smith teaches Maths (duration 3, in
/// meets of at most two times) and History (duration 2); the Physics teacher is not known yet.
fn school() -> Solution {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut builder = InstanceBuilder::new("school");
    let times = (0..6)
        .map(|index| builder.add_time(format!("t{index}")))
        .collect::<Vec<_>>();
    let _ = builder.add_time_group("Mon", TimeGroupKind::Day, times[..3].iter().copied());
    let _ = builder.add_time_group("Tue", TimeGroupKind::Day, times[3..].iter().copied());
    let teacher = builder.add_resource_type("Teacher");
    let smith = builder.add_resource("Smith", teacher);
    let jones = builder.add_resource("Jones", teacher);

    let maths = builder.add_event("Maths", 3, None);
    let _ = builder.add_event_resource(maths, teacher, None, Some(smith));
    let history = builder.add_event("History", 2, None);
    let _ = builder.add_event_resource(history, teacher, None, Some(smith));
    let physics = builder.add_event("Physics", 2, None);
    let physics_teacher = builder.add_event_resource(physics, teacher, None, None);

    for (name, kind) in [
        (
            "split maths",
            ConstraintKind::SplitEvents {
                events: vec![maths],
                min_duration: 1,
                max_duration: 2,
                min_amount: 1,
                max_amount: 2,
            },
        ),
        (
            "assign times",
            ConstraintKind::AssignTime {
                events: vec![maths, history, physics],
            },
        ),
        (
            "assign teachers",
            ConstraintKind::AssignResource {
                event_resources: vec![physics_teacher],
            },
        ),
        (
            "avoid clashes",
            ConstraintKind::AvoidClashes {
                resources: vec![smith, jones],
            },
        ),
    ] {
        let _ = builder.add_constraint(Constraint::new(name, true, 1, kind));
    }

    Solution::new(Arc::new(builder.build().expect("valid instance")))
}

#[test]
fn the_school_is_timetabled_without_cost() {
    let mut solution = school();
    general_solve(&mut solution, &GeneralSolveOptions::default());

    assert!(solution.cost().is_zero());
    assert!(solution.check_costs().is_empty());
    assert!(!solution.has_matching());
    for event in solution.instance().events() {
        for &meet in solution.event_meets(event) {
            assert!(solution.meet_start_time(meet).is_some());
            for &task in solution.meet_tasks(meet) {
                assert!(solution.task_resource(task).is_some());
            }
        }
    }
}

#[test]
fn parallel_copies_agree_on_the_best_cost() {
    let solution = school();
    let options = GeneralSolveOptions::default();
    let best = parallel_solve(&solution, 2, |copy| general_solve(copy, &options));

    assert!(best.cost().is_zero());
    assert!(best.check_costs().is_empty());
}

#[test]
fn a_long_event_is_cut_at_the_day_boundary() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut builder = InstanceBuilder::new("two days");
    let times = (0..6)
        .map(|index| builder.add_time(format!("t{index}")))
        .collect::<Vec<_>>();
    let _ = builder.add_time_group("Mon", TimeGroupKind::Day, times[..3].iter().copied());
    let _ = builder.add_time_group("Tue", TimeGroupKind::Day, times[3..].iter().copied());
    let teacher = builder.add_resource_type("Teacher");
    let smith = builder.add_resource("Smith", teacher);
    let long = builder.add_event("A", 4, None);
    let _ = builder.add_event_resource(long, teacher, None, Some(smith));
    let short = builder.add_event("B", 2, None);
    let _ = builder.add_event_resource(short, teacher, None, Some(smith));
    for (name, kind) in [
        (
            "assign times",
            ConstraintKind::AssignTime {
                events: vec![long, short],
            },
        ),
        (
            "avoid clashes",
            ConstraintKind::AvoidClashes {
                resources: vec![smith],
            },
        ),
    ] {
        let _ = builder.add_constraint(Constraint::new(name, true, 1, kind));
    }
    let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));

    general_solve(&mut solution, &GeneralSolveOptions::default());

    let durations = |event: EventId| {
        let mut durations = solution
            .event_meets(event)
            .iter()
            .map(|&meet| solution.meet_duration(meet))
            .collect::<Vec<_>>();
        durations.sort_unstable();
        durations
    };
    assert_eq!(durations(long), vec![1, 3]);
    assert_eq!(durations(short), vec![2]);
    assert!(solution.cost().is_zero());
    assert!(solution.check_costs().is_empty());
}

use crate::instance::ConstraintKind;
use crate::instance::EventResourceId;
use crate::solution::Solution;
use crate::solution::TaskId;

/// The tasks of `event_resource` which are not assigned yet.
fn unassigned_tasks(solution: &Solution, event_resource: EventResourceId) -> Vec<TaskId> {
    solution
        .event_resource_tasks(event_resource)
        .iter()
        .copied()
        .filter(|&task| solution.task_assignment(task).is_none())
        .collect()
}

/// Builds the task tree before any search:
///
/// 1. every task of an event resource with a preassigned resource is confined to, and assigned,
///    that resource;
/// 2. every task of a required prefer resources constraint is confined to its resources;
/// 3. the tasks of each point of a required avoid split assignments constraint follow one
///    leader, whose domain is narrowed to the resources all of them allow.
///
/// Steps which would leave a task without resources are skipped. Returns the number of tasks
/// assigned, to resources or to leaders.
pub fn task_tree_make(solution: &mut Solution) -> usize {
    let instance = std::sync::Arc::clone(solution.instance_arc());
    let mut assigned = 0;

    for event_resource in instance.event_resources() {
        let Some(resource) = instance.event_resource(event_resource).preassigned else {
            continue;
        };
        let only = instance.resource_set([resource]);
        for task in unassigned_tasks(solution, event_resource) {
            let _ = solution.task_tighten_domain(task, &only);
            if solution.task_assign_resource(task, resource) {
                assigned += 1;
            }
        }
    }

    for (_, constraint) in instance.constraints() {
        if !constraint.required {
            continue;
        }
        if let ConstraintKind::PreferResources {
            event_resources,
            resources,
        } = &constraint.kind
        {
            let allowed = instance.resource_set(resources.iter().copied());
            for &event_resource in event_resources {
                for task in unassigned_tasks(solution, event_resource) {
                    let _ = solution.task_tighten_domain(task, &allowed);
                }
            }
        }
    }

    for (_, constraint) in instance.constraints() {
        if !constraint.required {
            continue;
        }
        let ConstraintKind::AvoidSplitAssignments {
            event_resource_groups,
        } = &constraint.kind
        else {
            continue;
        };
        for group in event_resource_groups {
            assigned += leader_make(solution, group);
        }
    }

    log::debug!("task tree: {assigned} tasks assigned");
    assigned
}

/// Makes the first task of `group` with a resource, or else its first task, the leader of the
/// other unassigned tasks of `group`. Returns the number of followers assigned.
fn leader_make(solution: &mut Solution, group: &[EventResourceId]) -> usize {
    let tasks = group
        .iter()
        .flat_map(|&event_resource| {
            solution
                .event_resource_tasks(event_resource)
                .iter()
                .copied()
        })
        .collect::<Vec<_>>();
    let Some(leader) = tasks
        .iter()
        .copied()
        .find(|&task| solution.task_resource(task).is_some())
        .or_else(|| tasks.first().copied())
    else {
        return 0;
    };

    let followers = tasks
        .iter()
        .copied()
        .filter(|&task| task != leader && solution.task_assignment(task).is_none())
        .collect::<Vec<_>>();
    if solution.task_assignment(leader).is_none() {
        let mut common = solution.task_domain(leader).clone();
        for &follower in followers.iter() {
            common.intersect_with(solution.task_domain(follower));
        }
        if !common.is_empty() {
            let _ = solution.task_tighten_domain(leader, &common);
        }
    }

    let mut assigned = 0;
    for follower in followers {
        if solution.task_assign(follower, leader) {
            assigned += 1;
        }
    }
    assigned
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::instance::Constraint;
    use crate::instance::InstanceBuilder;
    use crate::instance::ResourceId;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn preassigned_tasks_get_their_resource() {
        let mut solution = two_teacher_solution();
        assert_eq!(task_tree_make(&mut solution), 2);

        let assigned = solution
            .tasks()
            .filter(|&task| !solution.task_is_cycle(task))
            .filter(|&task| solution.task_resource(task) == Some(ResourceId(0)))
            .count();
        assert_eq!(assigned, 2);
    }

    #[test]
    fn split_assignments_follow_one_leader() {
        let mut builder = InstanceBuilder::new("classes");
        let _ = builder.add_time("t0");
        let _ = builder.add_time("t1");
        let teacher = builder.add_resource_type("Teacher");
        let jones = builder.add_resource("Jones", teacher);
        let _ = builder.add_resource("Brown", teacher);
        let first = builder.add_event("first", 1, None);
        let second = builder.add_event("second", 1, None);
        let first_teacher = builder.add_event_resource(first, teacher, None, None);
        let second_teacher = builder.add_event_resource(second, teacher, None, None);
        let _ = builder.add_constraint(Constraint::new(
            "same teacher",
            true,
            1,
            ConstraintKind::AvoidSplitAssignments {
                event_resource_groups: vec![vec![first_teacher, second_teacher]],
            },
        ));
        let _ = builder.add_constraint(Constraint::new(
            "jones teaches second",
            true,
            1,
            ConstraintKind::PreferResources {
                event_resources: vec![second_teacher],
                resources: vec![jones],
            },
        ));
        let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));
        solution.make_complete_representation();

        assert_eq!(task_tree_make(&mut solution), 1);

        let leader = solution.event_resource_tasks(first_teacher)[0];
        let follower = solution.event_resource_tasks(second_teacher)[0];
        assert_eq!(solution.task_assignment(follower), Some(leader));
        assert_eq!(solution.task_domain(leader).len(), 1);
        assert!(solution.task_assign_resource(leader, jones));
        assert_eq!(solution.task_resource(follower), Some(jones));
    }
}

use crate::basic_types::Cost;
use crate::instance::ConstraintKind;
use crate::instance::ResourceId;
use crate::instance::ResourceTypeId;
use crate::monitors::MonitorKind;
use crate::solution::Solution;
use crate::solution::TaskId;

/// The unassigned tasks of `resource_type` which belong to a meet.
pub(crate) fn open_tasks(solution: &Solution, resource_type: ResourceTypeId) -> Vec<TaskId> {
    solution
        .tasks()
        .filter(|&task| {
            !solution.task_is_cycle(task)
                && solution.task_resource_type(task) == resource_type
                && solution.task_meet(task).is_some()
                && solution.task_assignment(task).is_none()
        })
        .collect()
}

/// The cost of the solution with `task` assigned `resource`, or `None` when the assignment is
/// refused. The solution is left as it was.
fn trial_cost(solution: &mut Solution, task: TaskId, resource: ResourceId) -> Option<Cost> {
    let mark = solution.transaction_begin();
    let assigned = solution.task_assign_resource(task, resource);
    let cost = solution.cost();
    solution.transaction_rollback(mark);
    assigned.then_some(cost)
}

/// The resources of the domain of `task` which are free at all its busy times.
fn free_resources(solution: &Solution, task: TaskId) -> Vec<ResourceId> {
    let times = solution.task_busy_times(task);
    solution
        .task_domain(task)
        .iter()
        .filter(|&resource| solution.resource_free_at(resource, &times, &[]))
        .collect()
}

/// Assigns the open tasks of `resource_type` one at a time, always taking the task with the
/// fewest free resources, longest first among equals, and giving it the resource which lowers
/// the solution cost most. A task no resource improves stays open. Returns the number of tasks
/// assigned.
pub fn most_constrained_assign_resources(
    solution: &mut Solution,
    resource_type: ResourceTypeId,
) -> usize {
    let mut open = open_tasks(solution, resource_type);
    let mut assigned = 0;
    while !open.is_empty() {
        let Some(index) = (0..open.len()).min_by_key(|&index| {
            let task = open[index];
            (
                free_resources(solution, task).len(),
                std::cmp::Reverse(solution.task_duration(task)),
                task,
            )
        }) else {
            break;
        };
        let task = open.swap_remove(index);

        let cost = solution.cost();
        let mut best: Option<(Cost, ResourceId)> = None;
        let mut resources = solution.task_domain(task).iter().collect::<Vec<_>>();
        solution.diversify(&mut resources);
        for resource in resources {
            let Some(trial) = trial_cost(solution, task, resource) else {
                continue;
            };
            if trial < cost && best.map_or(true, |(best_cost, _)| trial < best_cost) {
                best = Some((trial, resource));
            }
        }
        if let Some((_, resource)) = best {
            if solution.task_assign_resource(task, resource) {
                assigned += 1;
            }
        }
    }
    log::debug!("most constrained first: {assigned} tasks of {resource_type} assigned");
    assigned
}

/// Fills resources one at a time with the open tasks of `resource_type`, taking the resources
/// with the fewest candidate tasks first. A resource takes a candidate, longest first, when it
/// is free at the busy times of the task and the assignment does not raise the cost. Returns the
/// number of tasks assigned.
pub fn resource_pack_assign(solution: &mut Solution, resource_type: ResourceTypeId) -> usize {
    let instance = std::sync::Arc::clone(solution.instance_arc());
    let mut open = open_tasks(solution, resource_type);
    open.sort_by_key(|&task| (std::cmp::Reverse(solution.task_duration(task)), task));

    let mut resources = instance.resource_type(resource_type).resources.clone();
    resources.sort_by_key(|&resource| {
        let candidates = open
            .iter()
            .filter(|&&task| solution.task_domain(task).contains(resource))
            .count();
        (candidates, resource)
    });

    let mut assigned = 0;
    for resource in resources {
        for &task in open.iter() {
            if solution.task_assignment(task).is_some()
                || !solution.task_domain(task).contains(resource)
                || !solution.resource_free_at(resource, &solution.task_busy_times(task), &[])
            {
                continue;
            }
            let cost = solution.cost();
            if trial_cost(solution, task, resource).is_some_and(|trial| trial <= cost)
                && solution.task_assign_resource(task, resource)
            {
                assigned += 1;
            }
        }
    }
    log::debug!("resource packing: {assigned} tasks of {resource_type} assigned");
    assigned
}

/// Moves the tasks of each defective avoid split assignments point to the resource already
/// holding most of their duration, keeping each move which lowers the cost. Only tasks assigned
/// straight to a resource are moved. Returns the number of points whose cost went down.
pub fn split_assignments_repair(solution: &mut Solution) -> usize {
    let instance = std::sync::Arc::clone(solution.instance_arc());
    let defective = solution
        .constraint_monitors()
        .filter(|&monitor| solution.monitor_cost(monitor).is_positive())
        .filter_map(|monitor| match *solution.monitor_kind(monitor) {
            MonitorKind::AvoidSplitAssignments { constraint, point } => {
                Some((monitor, constraint, point))
            }
            _ => None,
        })
        .collect::<Vec<_>>();

    let mut repaired = 0;
    for (monitor, constraint, point) in defective {
        let ConstraintKind::AvoidSplitAssignments {
            event_resource_groups,
        } = &instance.constraint(constraint).kind
        else {
            continue;
        };
        let Some(group) = event_resource_groups.get(point) else {
            continue;
        };
        let tasks = group
            .iter()
            .flat_map(|&event_resource| {
                solution
                    .event_resource_tasks(event_resource)
                    .iter()
                    .copied()
            })
            .filter(|&task| {
                solution
                    .task_assignment(task)
                    .is_some_and(|target| solution.task_is_cycle(target))
            })
            .collect::<Vec<_>>();

        let mut durations: Vec<(ResourceId, usize)> = vec![];
        for &task in tasks.iter() {
            let Some(resource) = solution.task_resource(task) else {
                continue;
            };
            match durations.iter_mut().find(|(other, _)| *other == resource) {
                Some((_, total)) => *total += solution.task_duration(task),
                None => durations.push((resource, solution.task_duration(task))),
            }
        }
        let Some(&(resource, _)) = durations
            .iter()
            .max_by_key(|&&(resource, total)| (total, std::cmp::Reverse(resource)))
        else {
            continue;
        };

        let cost = solution.monitor_cost(monitor);
        let total = solution.cost();
        let mark = solution.transaction_begin();
        for &task in tasks.iter() {
            if solution.task_resource(task) != Some(resource) {
                let _ = solution.task_move_resource(task, resource);
            }
        }
        if solution.cost() < total && solution.monitor_cost(monitor) < cost {
            solution.transaction_commit(mark);
            repaired += 1;
        } else {
            solution.transaction_rollback(mark);
        }
    }
    log::debug!("split assignments repaired at {repaired} points");
    repaired
}

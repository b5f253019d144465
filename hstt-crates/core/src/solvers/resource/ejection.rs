use enumset::EnumSet;

use crate::ejector::Augment;
use crate::ejector::Ejector;
use crate::ejector::EjectorContext;
use crate::instance::ConstraintKind;
use crate::instance::ResourceId;
use crate::instance::ResourceTypeId;
use crate::instance::TimeId;
use crate::monitors::MonitorKind;
use crate::monitors::MonitorTag;
use crate::solution::MonitorId;
use crate::solution::Solution;
use crate::solution::TaskId;

pub fn resource_repair_tags() -> EnumSet<MonitorTag> {
    MonitorTag::AssignResource
        | MonitorTag::PreferResources
        | MonitorTag::AvoidSplitAssignments
        | MonitorTag::AvoidClashes
        | MonitorTag::AvoidUnavailableTimes
        | MonitorTag::LimitIdleTimes
        | MonitorTag::ClusterBusyTimes
        | MonitorTag::LimitBusyTimes
        | MonitorTag::LimitWorkload
        | MonitorTag::OrdinaryDemand
        | MonitorTag::WorkloadDemand
        | MonitorTag::Evenness
}

/// Repairs a resource defect by reassigning one of the tasks it concerns: an unassigned task is
/// given a resource of its domain; an assigned one is moved to another resource, swapped with a
/// task of that resource which is busy at the same times, or unassigned.
#[derive(Clone, Copy, Debug)]
pub struct ResourceAugment {
    resource_type: ResourceTypeId,
}

impl ResourceAugment {
    /// An augment which only changes tasks of `resource_type`.
    pub fn new(resource_type: ResourceTypeId) -> ResourceAugment {
        ResourceAugment { resource_type }
    }

    pub fn register(&self, ejector: &mut Ejector) {
        for tag in resource_repair_tags() {
            ejector.set_augment(tag, *self);
        }
    }

    fn repair_task(&self, context: &mut EjectorContext<'_>, task: TaskId) -> bool {
        if context.solution().task_resource_type(task) != self.resource_type
            || !context.visit_task(task)
        {
            return false;
        }
        let current = context.solution().task_resource(task);
        let domain = context.solution().task_domain(task).clone();

        for resource in domain.iter() {
            if current == Some(resource) {
                continue;
            }
            let repaired = match current {
                None => {
                    context.try_repair(|solution| solution.task_assign_resource(task, resource))
                }
                Some(_) => {
                    context.try_repair(|solution| solution.task_move_resource(task, resource))
                }
            };
            if repaired {
                return true;
            }
            if current.is_some() {
                for other in swap_candidates(context.solution(), task, resource) {
                    if context.try_repair(|solution| solution.task_swap(task, other)) {
                        return true;
                    }
                }
            }
        }
        current.is_some() && context.try_repair(|solution| solution.task_unassign(task))
    }
}

impl Augment for ResourceAugment {
    fn augment(&self, context: &mut EjectorContext<'_>, defect: MonitorId) -> bool {
        for task in defect_tasks(context.solution(), defect) {
            if self.repair_task(context, task) {
                return true;
            }
        }
        false
    }
}

/// The tasks assigned straight to `resource` which are busy at a busy time of `task`.
fn swap_candidates(solution: &Solution, task: TaskId, resource: ResourceId) -> Vec<TaskId> {
    let mut candidates = vec![];
    for time in solution.task_busy_times(task) {
        for &other in solution.resource_tasks_at(resource, time) {
            let other = root_task(solution, other);
            if other != task && !candidates.contains(&other) {
                candidates.push(other);
            }
        }
    }
    candidates
}

/// The task whose assignment decides the resource of `task`: the last task on its chain of
/// leaders before a cycle task.
fn root_task(solution: &Solution, mut task: TaskId) -> TaskId {
    while let Some(target) = solution.task_assignment(task) {
        if solution.task_is_cycle(target) {
            break;
        }
        task = target;
    }
    task
}

/// The tasks assigned `resource` at one of `times`, or at any time when `times` is `None`.
fn resource_tasks(
    solution: &Solution,
    resource: ResourceId,
    times: Option<&[TimeId]>,
) -> Vec<TaskId> {
    let all_times;
    let times = match times {
        Some(times) => times,
        None => {
            all_times = solution.instance().times().collect::<Vec<_>>();
            &all_times
        }
    };
    let mut tasks = vec![];
    for &time in times {
        for &task in solution.resource_tasks_at(resource, time) {
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
    }
    tasks
}

/// The tasks whose reassignment may lower the cost of `defect`, as the roots of their leader
/// chains, with duplicates and preassigned tasks removed.
pub(crate) fn defect_tasks(solution: &Solution, defect: MonitorId) -> Vec<TaskId> {
    let instance = solution.instance();
    let tasks = match solution.monitor_kind(defect) {
        MonitorKind::AssignResource { event_resource, .. }
        | MonitorKind::PreferResources { event_resource, .. } => {
            solution.event_resource_tasks(*event_resource).to_vec()
        }
        MonitorKind::AvoidSplitAssignments { constraint, point } => {
            match &instance.constraint(*constraint).kind {
                ConstraintKind::AvoidSplitAssignments {
                    event_resource_groups,
                } => event_resource_groups
                    .get(*point)
                    .into_iter()
                    .flatten()
                    .flat_map(|&event_resource| {
                        solution
                            .event_resource_tasks(event_resource)
                            .iter()
                            .copied()
                    })
                    .collect(),
                _ => vec![],
            }
        }
        MonitorKind::AvoidClashes { resource, .. } => {
            let clashing = instance
                .times()
                .filter(|&time| solution.resource_tasks_at(*resource, time).len() > 1)
                .collect::<Vec<_>>();
            resource_tasks(solution, *resource, Some(clashing.as_slice()))
        }
        MonitorKind::AvoidUnavailableTimes {
            constraint,
            resource,
        } => match &instance.constraint(*constraint).kind {
            ConstraintKind::AvoidUnavailableTimes { times, .. } => {
                resource_tasks(solution, *resource, Some(times.as_slice()))
            }
            _ => vec![],
        },
        MonitorKind::LimitIdleTimes { resource, .. }
        | MonitorKind::ClusterBusyTimes { resource, .. }
        | MonitorKind::LimitBusyTimes { resource, .. }
        | MonitorKind::LimitWorkload { resource, .. }
        | MonitorKind::WorkloadDemand { resource } => resource_tasks(solution, *resource, None),
        MonitorKind::OrdinaryDemand { .. } => solution
            .demand_competitors(defect)
            .into_iter()
            .filter_map(|competitor| match *solution.monitor_kind(competitor) {
                MonitorKind::OrdinaryDemand { task } => Some(task),
                _ => None,
            })
            .collect(),
        MonitorKind::Evenness { partition, time } => instance
            .resource_group(*partition)
            .resources
            .iter()
            .flat_map(|resource| {
                resource_tasks(solution, resource, Some(std::slice::from_ref(time)))
            })
            .collect(),
        _ => vec![],
    };

    let mut roots = vec![];
    for task in tasks {
        let root = root_task(solution, task);
        if !solution.task_is_cycle(root)
            && !solution.task_is_preassigned(root)
            && !roots.contains(&root)
        {
            roots.push(root);
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Cost;
    use crate::ejector::EjectorOptions;
    use crate::instance::EventId;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn a_clashing_teacher_is_replaced() {
        let mut solution = two_teacher_solution();
        let cycle_meet = solution.cycle_meets()[0];
        for (index, offset) in [(0, 0), (1, 3), (2, 0)] {
            let meet = solution.event_meets(EventId(index))[0];
            assert!(solution.meet_assign(meet, cycle_meet, offset));
            let task = solution.meet_tasks(meet)[0];
            assert!(solution.task_assign_resource(task, ResourceId(0)));
        }
        // e2 clashes with e0 on teacher A at the first time.
        assert_eq!(solution.cost(), Cost::hard(1));

        let teacher = solution.instance().resource(ResourceId(0)).resource_type;
        let mut ejector = Ejector::new(EjectorOptions::default());
        ResourceAugment::new(teacher).register(&mut ejector);
        let root = solution.root_monitor();

        assert!(ejector.solve(&mut solution, root, None));
        assert!(solution.cost().is_zero());
        let task = solution.meet_tasks(solution.event_meets(EventId(2))[0])[0];
        assert_eq!(solution.task_resource(task), Some(ResourceId(1)));
    }
}

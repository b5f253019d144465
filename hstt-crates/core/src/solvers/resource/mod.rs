//! Resource assignment: giving the tasks of one resource type their resources once times are
//! known.
mod assign;
mod ejection;
mod task_tree;

pub use assign::most_constrained_assign_resources;
pub use assign::resource_pack_assign;
pub use assign::split_assignments_repair;
pub use ejection::resource_repair_tags;
pub use ejection::ResourceAugment;
pub use task_tree::task_tree_make;

use super::repair_group_make;
use crate::ejector::Ejector;
use crate::ejector::EjectorOptions;
use crate::ejector::RESOURCE_REPAIR_GROUP_SUB_TAG;
use crate::instance::ResourceTypeId;
use crate::monitors::MonitorTag;
use crate::solution::Solution;
use crate::statistics::should_log_statistics;
use crate::statistics::StatisticLogger;

#[derive(Clone, Debug)]
pub struct ResourceSolveOptions {
    pub ejector: EjectorOptions,
    /// Forbid repairs which leave more demand unmatched than before.
    pub preserve_matching: bool,
    /// Fill resources one at a time with the tasks the first pass left open.
    pub packing: bool,
}

impl Default for ResourceSolveOptions {
    fn default() -> Self {
        ResourceSolveOptions {
            ejector: EjectorOptions::default(),
            preserve_matching: true,
            packing: true,
        }
    }
}

/// Assigns resources to the tasks of `resource_type`: most constrained first, then by
/// packing, then by repairing split assignments, then by ejection chains.
///
/// Returns whether every task of the type now has a resource.
pub fn tasking_assign_resources(
    solution: &mut Solution,
    resource_type: ResourceTypeId,
    options: &ResourceSolveOptions,
) -> bool {
    let _ = most_constrained_assign_resources(solution, resource_type);
    if options.packing {
        let _ = resource_pack_assign(solution, resource_type);
    }
    let _ = split_assignments_repair(solution);

    let group = repair_group_make(
        solution,
        RESOURCE_REPAIR_GROUP_SUB_TAG,
        "resource repair",
        resource_repair_tags(),
    );
    let mut ejector = Ejector::new(options.ejector.clone());
    ResourceAugment::new(resource_type).register(&mut ejector);
    if options.preserve_matching && solution.has_matching() {
        let demand = solution
            .monitors()
            .filter(|&monitor| {
                matches!(
                    solution.monitor_tag(monitor),
                    MonitorTag::OrdinaryDemand | MonitorTag::WorkloadDemand
                )
            })
            .collect::<Vec<_>>();
        for monitor in demand {
            ejector.add_monitor_cost_limit(monitor, solution.monitor_cost(monitor));
        }
    }
    let _ = ejector.solve(solution, group, None);
    if should_log_statistics() {
        ejector.log_statistics(StatisticLogger::new("resource_ejector"));
    }
    solution.monitor_group_dissolve(group);

    let complete = assign::open_tasks(solution, resource_type).is_empty();
    log::info!(
        "resources of {} assigned: complete {complete}, cost {}",
        solution.instance().resource_type(resource_type).name,
        solution.cost()
    );
    complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::EventId;
    use crate::instance::ResourceId;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn every_teacher_task_gets_a_teacher() {
        let mut solution = two_teacher_solution();
        let cycle_meet = solution.cycle_meets()[0];
        for (index, offset) in [(0, 0), (1, 3), (2, 0)] {
            let meet = solution.event_meets(EventId(index))[0];
            assert!(solution.meet_assign(meet, cycle_meet, offset));
        }
        let _ = task_tree_make(&mut solution);
        let teacher = solution.instance().resource(ResourceId(0)).resource_type;

        assert!(tasking_assign_resources(
            &mut solution,
            teacher,
            &ResourceSolveOptions::default()
        ));
        assert!(solution.cost().is_zero());
        assert!(solution.check_costs().is_empty());
    }
}

//! The solvers: layer tree construction, time assignment, resource assignment, and the
//! [`general_solve`] pipeline which runs them in order.
mod general;
mod layer_tree;
mod parallel;
pub mod resource;
pub mod time;

pub use general::ensure_official_cost;
pub use general::general_solve;
pub use general::merge_meets;
pub use general::AssignResourcesPolicy;
pub use general::GeneralSolveOptions;
pub use layer_tree::layer_tree_make;
pub use layer_tree::LayerTreeOptions;
pub use parallel::parallel_solve;
pub use resource::tasking_assign_resources;
pub use resource::ResourceSolveOptions;
pub use time::cycle_node_assign_times;
pub use time::TimeSolveOptions;

use enumset::EnumSet;

use crate::monitors::MonitorTag;
use crate::solution::MonitorId;
use crate::solution::Solution;

/// Makes a group monitor below the root and moves into it every child of the root whose tag
/// is in `tags`. The caller dissolves the group when done with it.
pub(crate) fn repair_group_make(
    solution: &mut Solution,
    sub_tag: usize,
    name: &str,
    tags: EnumSet<MonitorTag>,
) -> MonitorId {
    let root = solution.root_monitor();
    let group = solution.monitor_group_make(sub_tag, name, root);
    let members = solution
        .monitor_children(root)
        .iter()
        .copied()
        .filter(|&child| child != group && tags.contains(solution.monitor_tag(child)))
        .collect::<Vec<_>>();
    for monitor in members {
        solution.monitor_set_parent(monitor, group);
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn the_repair_group_takes_only_the_given_tags() {
        let mut solution = two_teacher_solution();
        let cost = solution.cost();
        let group = repair_group_make(
            &mut solution,
            1,
            "clashes",
            EnumSet::only(MonitorTag::AvoidClashes),
        );

        assert_eq!(solution.monitor_children(group).len(), 2);
        assert_eq!(solution.cost(), cost);
        assert!(solution.monitor_cost(group).is_zero());

        solution.monitor_group_dissolve(group);
        assert_eq!(solution.cost(), cost);
        assert!(!solution.monitor_children(solution.root_monitor()).contains(&group));
    }
}

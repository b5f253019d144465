//! Time assignment: placing the meets of the layer tree into the cycle.
//!
//! [`cycle_node_assign_times`] drives the whole phase. The layered node (the cycle node, or its
//! vizier node when there is one) has its child layers coordinated and its runarounds built;
//! meets with a preassigned time are placed; the remaining child meets are placed layer by layer
//! and repaired by an ejector using [`TimeAugment`]; the tree is flattened and repaired once
//! more.
mod ejection;
mod kempe;
mod layer_match;
mod runaround;
mod simple;
mod tighten;

pub use ejection::time_repair_tags;
pub use ejection::TimeAugment;
pub use kempe::kempe_meet_move;
pub use kempe::KempeStatistics;
pub use layer_match::layer_match_assign_times;
pub use layer_match::node_regularity_improve;
pub use runaround::runarounds_make;
pub use runaround::FirstFitPacker;
pub use runaround::RUNAROUND_CYCLE_DIVISOR;
pub use runaround::RUNAROUND_DURATION_THRESHOLD;
pub use simple::node_preassigned_assign_times;
pub use simple::node_simple_assign_times;
pub use tighten::tighten_to_partition;

use super::repair_group_make;
use crate::ejector::Ejector;
use crate::ejector::EjectorOptions;
use crate::ejector::TIME_REPAIR_GROUP_SUB_TAG;
use crate::solution::NodeId;
use crate::solution::Solution;
use crate::statistics::should_log_statistics;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

/// Assigns times to the meets of the child nodes of one node.
pub trait NodeTimeSolver {
    /// Assigns the unassigned meets of the child nodes of `node` into the meets of `node`.
    /// Returns whether every such meet is now assigned.
    fn assign_times(&mut self, solution: &mut Solution, node: NodeId) -> bool;
}

/// The [`NodeTimeSolver`] of [`node_simple_assign_times`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleTimeSolver;

impl NodeTimeSolver for SimpleTimeSolver {
    fn assign_times(&mut self, solution: &mut Solution, node: NodeId) -> bool {
        node_simple_assign_times(solution, node)
    }
}

#[derive(Clone, Debug)]
pub struct TimeSolveOptions {
    pub ejector: EjectorOptions,
    /// Let the repairs try Kempe meet moves.
    pub kempe: bool,
    /// Build runarounds below the layered node before timetabling it.
    pub runarounds: bool,
    /// Confine resource demands to one partition while times are assigned.
    pub tighten_to_partition: bool,
    /// Prefer positions on days on which the node of a meet has no other meet.
    pub spread_days: bool,
    /// Make zones from the first layer and swap nodes to follow them.
    pub regularity: bool,
}

impl Default for TimeSolveOptions {
    fn default() -> Self {
        TimeSolveOptions {
            ejector: EjectorOptions::default(),
            kempe: true,
            runarounds: true,
            tighten_to_partition: true,
            spread_days: true,
            regularity: true,
        }
    }
}

/// The node whose children are timetabled: the vizier node when the cycle node has one, the
/// cycle node otherwise.
fn layered_node(solution: &Solution, cycle_node: NodeId) -> NodeId {
    match *solution.node_children(cycle_node) {
        [only]
            if !solution.node_children(only).is_empty()
                && solution.node_meets(only).iter().all(|&meet| {
                    solution
                        .meet_target(meet)
                        .is_some_and(|target| solution.meet_is_cycle(target))
                }) =>
        {
            only
        }
        _ => cycle_node,
    }
}

/// Whether every meet of an event has a start time.
fn all_event_meets_assigned(solution: &Solution) -> bool {
    solution
        .meets()
        .filter(|&meet| solution.meet_event(meet).is_some())
        .all(|meet| solution.meet_start_time(meet).is_some())
}

/// Runs an ejector over the defects of the time repair tags, moving only meets below `scope`
/// when it is given. Returns whether the cost went down.
fn time_repair(
    solution: &mut Solution,
    scope: Option<NodeId>,
    options: &TimeSolveOptions,
    augment: &TimeAugment,
) -> bool {
    let group = repair_group_make(
        solution,
        TIME_REPAIR_GROUP_SUB_TAG,
        "time repair",
        time_repair_tags(),
    );
    let mut ejector = Ejector::new(options.ejector.clone());
    augment.register(&mut ejector);
    let improved = ejector.solve(solution, group, scope);
    if should_log_statistics() {
        ejector.log_statistics(StatisticLogger::new("time_ejector"));
    }
    solution.monitor_group_dissolve(group);
    improved
}

/// Places the child meets of `node`: layer by layer, then whatever no layer holds, then
/// repairs.
fn node_layered_assign_times(
    solution: &mut Solution,
    node: NodeId,
    options: &TimeSolveOptions,
    augment: &TimeAugment,
) {
    let layers = solution.node_child_layers(node).to_vec();
    for (index, &layer) in layers.iter().enumerate() {
        let _ = layer_match_assign_times(solution, node, layer, options.spread_days);
        if index == 0 && options.regularity {
            solution.node_zones_make_from_layer(node, layer);
        }
    }
    let _ = node_simple_assign_times(solution, node);
    if options.regularity {
        let _ = node_regularity_improve(solution, node);
    }
    let _ = time_repair(solution, Some(node), options, augment);
}

/// Assigns times to every meet below the cycle node, which the layer tree must have made.
/// Returns whether every meet of an event ends up with a start time.
pub fn cycle_node_assign_times(solution: &mut Solution, options: &TimeSolveOptions) -> bool {
    let Some(cycle_node) = solution.cycle_node() else {
        log::warn!("times cannot be assigned before the layer tree is made");
        return false;
    };
    let node = layered_node(solution, cycle_node);
    if solution.node_child_layers(node).is_empty() {
        solution.node_child_layers_make(node);
    }
    solution.node_child_layers_coordinate(node);

    if options.runarounds {
        let _ = runarounds_make(solution, node, &mut FirstFitPacker);
    }
    let _ = node_preassigned_assign_times(solution, node);

    let tightening = options.tighten_to_partition.then(|| {
        let mark = solution.transaction_begin();
        let _ = tighten_to_partition(solution);
        solution.transaction_end(mark)
    });

    let augment = TimeAugment::new(options.kempe);
    node_layered_assign_times(solution, node, options, &augment);
    solution.node_flatten(cycle_node);
    let _ = time_repair(solution, None, options, &augment);

    if let Some(tightening) = tightening {
        solution.transaction_undo(&tightening);
    }
    if should_log_statistics() {
        augment.kempe_statistics().log(StatisticLogger::new("kempe"));
    }

    let assigned = all_event_meets_assigned(solution);
    log::info!("times assigned: complete {assigned}, cost {}", solution.cost());
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Cost;
    use crate::instance::ResourceId;
    use crate::solvers::layer_tree_make;
    use crate::solvers::LayerTreeOptions;
    use crate::test_instances::two_teacher_solution;

    fn assign_preassigned_resources(solution: &mut Solution) {
        for task in solution.tasks().collect::<Vec<_>>() {
            let preassigned = solution.task_event_resource(task).and_then(|event_resource| {
                solution.instance().event_resource(event_resource).preassigned
            });
            if let Some(resource) = preassigned {
                assert!(solution.task_assign_resource(task, resource));
            }
        }
    }

    #[test]
    fn every_meet_gets_a_time_without_clashes() {
        let mut solution = two_teacher_solution();
        let _ = layer_tree_make(&mut solution, &LayerTreeOptions::default());
        assign_preassigned_resources(&mut solution);

        assert!(cycle_node_assign_times(&mut solution, &TimeSolveOptions::default()));
        // Only the teacher of e2 is missing.
        assert_eq!(solution.cost(), Cost::hard(1));
        assert!(solution.check_costs().is_empty());
        assert!(solution
            .instance()
            .times()
            .all(|time| solution.resource_tasks_at(ResourceId(0), time).len() <= 1));
    }

    #[test]
    fn the_vizier_node_is_timetabled_and_flattened() {
        let mut solution = two_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions { vizier: true });
        assign_preassigned_resources(&mut solution);
        assert_ne!(layered_node(&solution, cycle_node), cycle_node);

        assert!(cycle_node_assign_times(&mut solution, &TimeSolveOptions::default()));
        assert_eq!(solution.cost(), Cost::hard(1));
        // Flattening left every event node directly below the cycle node.
        assert!(solution
            .node_children(cycle_node)
            .iter()
            .all(|&child| solution.node_children(child).is_empty()));
    }

    #[test]
    fn nothing_happens_without_a_layer_tree() {
        let mut solution = two_teacher_solution();
        assert!(!cycle_node_assign_times(&mut solution, &TimeSolveOptions::default()));
        assert_eq!(solution.cost(), Cost::hard(7));
    }
}

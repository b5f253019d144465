//! Runarounds: child nodes of one heavily loaded layer which are packed together into a few
//! longer meets before the layer is timetabled, so that the layer needs fewer distinct
//! positions in its parent.
use itertools::Itertools;

use super::simple::position_allowed;
use super::NodeTimeSolver;
use crate::hstt_assert_simple;
use crate::solution::LayerId;
use crate::solution::MeetId;
use crate::solution::NodeId;
use crate::solution::Solution;

/// A child layer whose duration is at least this fraction of the duration of its parent node
/// is a problem layer.
pub const RUNAROUND_DURATION_THRESHOLD: f64 = 0.9;
/// The preferred runaround meet duration is the duration of the parent node divided by this.
pub const RUNAROUND_CYCLE_DIVISOR: usize = 5;

/// Assigns the meets of the child nodes of a node into its meets, longest first, each at the
/// first offset where it overlaps no meet assigned there already.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstFitPacker;

impl NodeTimeSolver for FirstFitPacker {
    fn assign_times(&mut self, solution: &mut Solution, node: NodeId) -> bool {
        let mut meets = solution
            .node_children(node)
            .iter()
            .flat_map(|&child| solution.node_meets(child).iter().copied())
            .filter(|&meet| solution.meet_assignment(meet).is_none())
            .collect::<Vec<_>>();
        meets.sort_by_key(|&meet| (std::cmp::Reverse(solution.meet_duration(meet)), meet));

        let targets = solution.node_meets(node).to_vec();
        for meet in meets {
            let duration = solution.meet_duration(meet);
            let position = targets.iter().find_map(|&target| {
                let occupied = occupied_offsets(solution, target);
                (0..solution.meet_duration(target))
                    .filter(|&offset| position_allowed(solution, meet, target, offset))
                    .find(|&offset| (offset..offset + duration).all(|at| !occupied[at]))
                    .map(|offset| (target, offset))
            });
            match position {
                Some((target, offset)) if solution.meet_assign(meet, target, offset) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Which offsets of `target` are covered by a meet assigned to it.
fn occupied_offsets(solution: &Solution, target: MeetId) -> Vec<bool> {
    let mut occupied = vec![false; solution.meet_duration(target)];
    for &child in solution.meet_assigned_children(target) {
        if let Some((_, offset)) = solution.meet_assignment(child) {
            for at in offset..offset + solution.meet_duration(child) {
                occupied[at] = true;
            }
        }
    }
    occupied
}

/// The child layers of `node` whose duration reaches the runaround threshold.
fn problem_layers(solution: &Solution, node: NodeId) -> Vec<LayerId> {
    let threshold = RUNAROUND_DURATION_THRESHOLD * solution.node_duration(node) as f64;
    solution
        .node_child_layers(node)
        .iter()
        .copied()
        .filter(|&layer| solution.layer_duration(layer) as f64 >= threshold)
        .collect()
}

/// The children of `layer` which lie in no other problem layer, have no children of their own
/// and whose meets are all unassigned with unrestricted domains.
fn free_nodes(solution: &Solution, layer: LayerId, problem: &[LayerId]) -> Vec<NodeId> {
    let full = solution.instance().full_time_set();
    solution
        .layer_children(layer)
        .iter()
        .copied()
        .filter(|&child| {
            problem
                .iter()
                .filter(|&&other| solution.layer_children(other).contains(&child))
                .count()
                == 1
                && solution.node_children(child).is_empty()
                && !solution.node_meets(child).is_empty()
                && solution.node_meets(child).iter().all(|&meet| {
                    solution.meet_assignment(meet).is_none() && *solution.meet_domain(meet) == full
                })
        })
        .collect()
}

/// The duration of the meets of a runaround over meets of the given durations, in a node of
/// duration `node_duration`.
///
/// `v` is the node duration divided by [`RUNAROUND_CYCLE_DIVISOR`]; `u` is the duration which
/// accounts for most of the total, capped at `v`. The result is the largest multiple of `u` not
/// above `v`, and at least the longest duration.
pub(crate) fn runaround_block_duration(durations: &[usize], node_duration: usize) -> usize {
    let v = (node_duration / RUNAROUND_CYCLE_DIVISOR).max(1);
    let u = durations
        .iter()
        .counts()
        .into_iter()
        .map(|(&duration, count)| (duration * count, std::cmp::Reverse(duration)))
        .max()
        .map_or(1, |(_, std::cmp::Reverse(duration))| duration)
        .clamp(1, v);
    let longest = durations.iter().copied().max().unwrap_or(1);
    ((v / u).max(1) * u).max(longest)
}

/// Makes runarounds below `node`: for each problem layer with at least two free nodes, a new
/// child of `node` with enough meets of the runaround duration to hold them, which becomes the
/// parent of the free nodes. `packer` then assigns their meets into the runaround; when it
/// fails the runaround is dissolved again. The child layers of `node` are remade when any
/// runaround was kept.
///
/// Returns the runaround nodes made.
pub fn runarounds_make(
    solution: &mut Solution,
    node: NodeId,
    packer: &mut dyn NodeTimeSolver,
) -> Vec<NodeId> {
    let node_duration = solution.node_duration(node);
    if node_duration == 0 {
        return vec![];
    }
    let problem = problem_layers(solution, node);
    let candidates = problem
        .iter()
        .map(|&layer| free_nodes(solution, layer, &problem))
        .filter(|free| free.len() >= 2)
        .collect::<Vec<_>>();

    let mut made = vec![];
    for free in candidates {
        if let Some(runaround) = runaround_make(solution, node, &free, packer) {
            made.push(runaround);
        }
    }
    if !made.is_empty() {
        solution.node_child_layers_make(node);
        solution.node_child_layers_coordinate(node);
    }
    log::debug!("{} runarounds made below {node}", made.len());
    made
}

fn runaround_make(
    solution: &mut Solution,
    node: NodeId,
    free: &[NodeId],
    packer: &mut dyn NodeTimeSolver,
) -> Option<NodeId> {
    let durations = free
        .iter()
        .flat_map(|&child| solution.node_meets(child).iter())
        .map(|&meet| solution.meet_duration(meet))
        .collect::<Vec<_>>();
    let node_duration = solution.node_duration(node);
    let block = runaround_block_duration(&durations, node_duration);
    let count = durations.iter().sum::<usize>().div_ceil(block);
    if count * block > node_duration {
        return None;
    }

    let runaround = solution.node_make();
    let added = solution.node_add_parent(runaround, node);
    hstt_assert_simple!(added, "a fresh node has no parent and no children");
    for _ in 0..count {
        let meet = solution.meet_make(block, None);
        let _ = solution.node_add_meet(runaround, meet);
    }
    for &child in free {
        let _ = solution.node_delete_parent(child);
        let moved = solution.node_add_parent(child, runaround);
        hstt_assert_simple!(moved, "a free node has no children");
    }

    if packer.assign_times(solution, runaround) {
        log::trace!("runaround {runaround}: {count} meets of duration {block}");
        return Some(runaround);
    }

    for &child in free {
        for meet in solution.node_meets(child).to_vec() {
            let _ = solution.meet_unassign(meet);
        }
    }
    let bypassed = solution.node_bypass(runaround);
    hstt_assert_simple!(bypassed, "a runaround has a parent");
    for meet in solution.node_meets(runaround).to_vec() {
        let deleted = solution.meet_delete(meet);
        hstt_assert_simple!(deleted, "runaround meets are unassigned and empty");
    }
    solution.node_delete(runaround);
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::instance::Constraint;
    use crate::instance::ConstraintKind;
    use crate::instance::InstanceBuilder;
    use crate::solvers::layer_tree_make;
    use crate::solvers::LayerTreeOptions;

    #[test]
    fn block_duration_follows_the_most_common_duration() {
        // v = 30 / 5 = 6; duration 2 accounts for 8 of the 11 times, and 6 / 2 * 2 = 6.
        assert_eq!(runaround_block_duration(&[2, 2, 2, 2, 3], 30), 6);
        // u is capped at v = 1, but the block must still hold the longest meet.
        assert_eq!(runaround_block_duration(&[2, 2], 5), 2);
    }

    /// Ten times; one teacher attends nine single-time events.
    fn busy_teacher_solution() -> Solution {
        let mut builder = InstanceBuilder::new("busy");
        for index in 0..10 {
            let _ = builder.add_time(format!("t{index}"));
        }
        let teacher = builder.add_resource_type("Teacher");
        let smith = builder.add_resource("Smith", teacher);
        let mut events = vec![];
        for index in 0..9 {
            let event = builder.add_event(format!("e{index}"), 1, None);
            let _ = builder.add_event_resource(event, teacher, None, Some(smith));
            events.push(event);
        }
        let _ = builder.add_constraint(Constraint::new(
            "assign times",
            true,
            1,
            ConstraintKind::AssignTime { events },
        ));
        let mut solution = Solution::new(Arc::new(builder.build().expect("valid instance")));
        solution.make_complete_representation();
        solution
    }

    #[test]
    fn free_nodes_of_a_problem_layer_share_a_runaround() {
        let mut solution = busy_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());

        let made = runarounds_make(&mut solution, cycle_node, &mut FirstFitPacker);

        assert_eq!(made.len(), 1);
        let runaround = made[0];
        assert_eq!(solution.node_children(runaround).len(), 9);
        // v = 10 / 5 = 2, so the nine times go into five meets of duration 2.
        assert_eq!(solution.node_meets(runaround).len(), 5);
        assert!(solution
            .node_children(runaround)
            .iter()
            .flat_map(|&child| solution.node_meets(child).iter())
            .all(|&meet| solution.meet_assignment(meet).is_some()));
        assert_eq!(solution.node_children(cycle_node), &[runaround]);
    }
}

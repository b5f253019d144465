use super::simple::meet_positions;
use super::simple::trial_cost;
use crate::basic_types::Cost;
use crate::containers::StorageKey;
use crate::instance::TimeGroupId;
use crate::solution::LayerId;
use crate::solution::MeetId;
use crate::solution::NodeId;
use crate::solution::Solution;

/// The weight of placing a meet at one position; smaller is better. Compared by solution cost
/// first, then by how many meets of the same node already meet on that day, then by how badly
/// the placement fits the zones of the parent node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeWeight {
    cost: Cost,
    same_day: usize,
    irregularity: usize,
}

/// For every time, the day containing it, if any.
fn time_days(solution: &Solution) -> Vec<Option<TimeGroupId>> {
    let instance = solution.instance();
    let mut days = vec![None; instance.time_count()];
    for day in instance.days() {
        for time in instance.time_group(day).times.iter() {
            days[time.index()] = Some(day);
        }
    }
    days
}

/// The day on which `meet` would start when placed at `offset` in `target`.
fn position_day(
    solution: &Solution,
    days: &[Option<TimeGroupId>],
    target: MeetId,
    offset: usize,
) -> Option<TimeGroupId> {
    let start = solution.meet_start_time(target)?;
    days.get(start.index() + offset).copied().flatten()
}

/// Assigns the unassigned meets of the child nodes of `layer` into the meets of `node`.
///
/// Every meet, longest first, is given the position of smallest weight: a position is weighted
/// by the solution cost after placing the meet there, then, when `spread_days` is set, by the
/// number of meets of the same child node already starting on that day, then by its zone
/// irregularity. Returns whether every such meet is now assigned.
pub fn layer_match_assign_times(
    solution: &mut Solution,
    node: NodeId,
    layer: LayerId,
    spread_days: bool,
) -> bool {
    let days = if spread_days {
        time_days(solution)
    } else {
        vec![]
    };

    let mut meets = solution
        .layer_children(layer)
        .iter()
        .flat_map(|&child| solution.node_meets(child).iter().copied())
        .filter(|&meet| solution.meet_assignment(meet).is_none())
        .collect::<Vec<_>>();
    meets.sort_by_key(|&meet| (std::cmp::Reverse(solution.meet_duration(meet)), meet));

    let mut all_assigned = true;
    for meet in meets {
        let siblings = solution
            .meet_node(meet)
            .map(|child| solution.node_meets(child).to_vec())
            .unwrap_or_default();

        let mut best: Option<(EdgeWeight, MeetId, usize)> = None;
        for (target, offset) in meet_positions(solution, meet) {
            if solution.meet_node(target) != Some(node) {
                continue;
            }
            let Some(cost) = trial_cost(solution, meet, target, offset) else {
                continue;
            };
            let same_day = if spread_days {
                let day = position_day(solution, &days, target, offset);
                siblings
                    .iter()
                    .filter(|&&sibling| sibling != meet && day.is_some())
                    .filter_map(|&sibling| {
                        let (sibling_target, sibling_offset) = solution.meet_assignment(sibling)?;
                        position_day(solution, &days, sibling_target, sibling_offset)
                    })
                    .filter(|&sibling_day| Some(sibling_day) == day)
                    .count()
            } else {
                0
            };
            let weight = EdgeWeight {
                cost,
                same_day,
                irregularity: solution.zone_irregularity(meet, target, offset),
            };
            if best.map_or(true, |(best_weight, _, _)| weight < best_weight) {
                best = Some((weight, target, offset));
            }
        }

        match best {
            Some((_, target, offset)) => all_assigned &= solution.meet_assign(meet, target, offset),
            None => all_assigned = false,
        }
    }
    log::trace!("layer {layer} of {node}: all assigned {all_assigned}");
    all_assigned
}

/// Swaps the assignments of pairs of child nodes of `node` with matching meet durations when
/// this lowers the solution cost, or keeps it and lowers the irregularity of `node`. Returns
/// whether any swap was kept.
pub fn node_regularity_improve(solution: &mut Solution, node: NodeId) -> bool {
    let children = solution.node_children(node).to_vec();
    let mut improved = false;
    for (index, &first) in children.iter().enumerate() {
        for &second in children[index + 1..].iter() {
            if !solution.node_swap_check(first, second) {
                continue;
            }
            let cost = solution.cost();
            let irregularity = solution.node_irregularity(node);

            let mark = solution.transaction_begin();
            let swapped = solution.node_swap(first, second);
            let new_cost = solution.cost();
            let better = new_cost < cost
                || (new_cost == cost && solution.node_irregularity(node) < irregularity);
            if swapped && better {
                solution.transaction_commit(mark);
                improved = true;
            } else {
                solution.transaction_rollback(mark);
            }
        }
    }
    if improved {
        log::debug!("regularity of {node} improved to {}", solution.node_irregularity(node));
    }
    improved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::EventId;
    use crate::instance::ResourceId;
    use crate::solvers::layer_tree_make;
    use crate::solvers::LayerTreeOptions;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn the_layer_of_a_teacher_is_placed_without_clashes() {
        let mut solution = two_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());
        for event in [EventId(0), EventId(1)] {
            let task = solution.meet_tasks(solution.event_meets(event)[0])[0];
            assert!(solution.task_assign_resource(task, ResourceId(0)));
        }
        let layer = solution.node_child_layers(cycle_node)[0];

        assert!(layer_match_assign_times(&mut solution, cycle_node, layer, true));

        let cycle_meet = solution.cycle_meets()[0];
        let e0 = solution.event_meets(EventId(0))[0];
        let e1 = solution.event_meets(EventId(1))[0];
        assert_eq!(solution.meet_assignment(e0), Some((cycle_meet, 0)));
        assert_eq!(solution.meet_assignment(e1), Some((cycle_meet, 3)));
        // Only e2 is left without a time and a teacher.
        assert_eq!(solution.cost(), Cost::hard(2));
    }

    #[test]
    fn swaps_which_raise_the_cost_are_not_kept() {
        let mut solution = two_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());
        let cycle_meet = solution.cycle_meets()[0];
        let e0 = solution.event_meets(EventId(0))[0];
        assert!(solution.meet_assign(e0, cycle_meet, 0));
        let cost = solution.cost();

        // No two children of the cycle node have meets of equal durations.
        assert!(!node_regularity_improve(&mut solution, cycle_node));
        assert_eq!(solution.cost(), cost);
    }
}

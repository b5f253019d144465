use crate::basic_types::Cost;
use crate::containers::StorageKey;
use crate::solution::MeetId;
use crate::solution::NodeId;
use crate::solution::Solution;

/// The meets `meet` may be assigned to: the meets of the parent of its node, or the cycle meets
/// when its node has no parent or it has no node.
pub(crate) fn meet_targets(solution: &Solution, meet: MeetId) -> Vec<MeetId> {
    match solution
        .meet_node(meet)
        .and_then(|node| solution.node_parent(node))
    {
        Some(parent) => solution.node_meets(parent).to_vec(),
        None => solution.cycle_meets().to_vec(),
    }
}

/// Whether `meet` could sit at `offset` in `target`, ignoring its current assignment.
pub(crate) fn position_allowed(
    solution: &Solution,
    meet: MeetId,
    target: MeetId,
    offset: usize,
) -> bool {
    offset + solution.meet_duration(meet) <= solution.meet_duration(target)
        && solution
            .meet_domain(target)
            .shifted(offset)
            .is_subset(solution.meet_domain(meet))
}

/// Every position `meet` could move to other than its current one, in target order.
pub(crate) fn meet_positions(solution: &Solution, meet: MeetId) -> Vec<(MeetId, usize)> {
    let current = solution.meet_assignment(meet);
    meet_targets(solution, meet)
        .into_iter()
        .filter(|&target| target != meet)
        .flat_map(|target| {
            let duration = solution.meet_duration(target);
            (0..duration).map(move |offset| (target, offset))
        })
        .filter(|&(target, offset)| {
            Some((target, offset)) != current && position_allowed(solution, meet, target, offset)
        })
        .collect()
}

/// The cost of the solution with `meet` moved to `offset` in `target`, or `None` when the move
/// is refused. The solution is left as it was.
pub(crate) fn trial_cost(
    solution: &mut Solution,
    meet: MeetId,
    target: MeetId,
    offset: usize,
) -> Option<Cost> {
    let mark = solution.transaction_begin();
    let moved = solution.meet_move(meet, target, offset);
    let cost = solution.cost();
    solution.transaction_rollback(mark);
    moved.then_some(cost)
}

/// The unassigned meets of the child nodes of `node`, longest first.
pub(crate) fn unassigned_child_meets(solution: &Solution, node: NodeId) -> Vec<MeetId> {
    let mut meets = solution
        .node_children(node)
        .iter()
        .flat_map(|&child| solution.node_meets(child).iter().copied())
        .filter(|&meet| solution.meet_assignment(meet).is_none())
        .collect::<Vec<_>>();
    meets.sort_by_key(|&meet| (std::cmp::Reverse(solution.meet_duration(meet)), meet));
    meets
}

/// Assigns every unassigned meet of the child nodes of `node`, longest first, to the position
/// in a meet of `node` which gives the lowest solution cost. Returns whether every such meet is
/// now assigned.
pub fn node_simple_assign_times(solution: &mut Solution, node: NodeId) -> bool {
    let mut all_assigned = true;
    for meet in unassigned_child_meets(solution, node) {
        let mut best: Option<(Cost, MeetId, usize)> = None;
        let mut positions = meet_positions(solution, meet);
        solution.diversify(&mut positions);
        for (target, offset) in positions {
            let Some(cost) = trial_cost(solution, meet, target, offset) else {
                continue;
            };
            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, target, offset));
            }
        }
        match best {
            Some((_, target, offset)) => {
                let assigned = solution.meet_assign(meet, target, offset);
                all_assigned &= assigned;
            }
            None => all_assigned = false,
        }
    }
    all_assigned
}

/// Assigns each unassigned meet below `node` whose domain is a single time to the position
/// which makes it start at that time. Returns the number of meets assigned.
pub fn node_preassigned_assign_times(solution: &mut Solution, node: NodeId) -> usize {
    let mut stack = vec![node];
    let mut assigned = 0;
    while let Some(current) = stack.pop() {
        stack.extend(solution.node_children(current).iter().copied());
        for meet in solution.node_meets(current).to_vec() {
            if solution.meet_assignment(meet).is_some() || solution.meet_domain(meet).len() != 1 {
                continue;
            }
            let Some(time) = solution.meet_domain(meet).first() else {
                continue;
            };
            let position = meet_positions(solution, meet)
                .into_iter()
                .find(|&(target, offset)| {
                    solution
                        .meet_start_time(target)
                        .is_some_and(|start| start.index() + offset == time.index())
                });
            if let Some((target, offset)) = position {
                if solution.meet_assign(meet, target, offset) {
                    assigned += 1;
                }
            }
        }
    }
    log::debug!("assigned {assigned} meets with preassigned times");
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::layer_tree_make;
    use crate::solvers::LayerTreeOptions;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn simple_assignment_avoids_clashes() {
        let mut solution = two_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());
        for task in solution.tasks().collect::<Vec<_>>() {
            if let Some(event_resource) = solution.task_event_resource(task) {
                let preassigned = solution.instance().event_resource(event_resource).preassigned;
                if let Some(resource) = preassigned {
                    assert!(solution.task_assign_resource(task, resource));
                }
            }
        }

        assert!(node_simple_assign_times(&mut solution, cycle_node));
        assert_eq!(solution.cost(), crate::basic_types::Cost::hard(1));
    }
}

//! Layer tree construction: deciding how events are split into meets and grouping the meets
//! into nodes below the cycle node.
//!
//! Every constraint which bears on splitting contributes [`SplitTask`]s. They are tried one at a
//! time, highest priority first, against a [`SplitForest`]; a task which cannot be reconciled
//! with those tried before it is dropped. The forest is then finalised into meets and nodes.
mod split_forest;
mod split_task;

pub(crate) use split_forest::SplitForest;
pub(crate) use split_task::split_tasks_make;
pub(crate) use split_task::SplitTask;
pub(crate) use split_task::SplitTaskKind;

use crate::hstt_assert_simple;
use crate::instance::EventId;
use crate::solution::MeetId;
use crate::solution::NodeId;
use crate::solution::Solution;

#[derive(Clone, Copy, Debug, Default)]
pub struct LayerTreeOptions {
    /// Insert a vizier node between the cycle node and the event nodes: one meet per cycle
    /// meet, fixed in place, into which the event meets are assigned.
    pub vizier: bool,
}

/// Splits the events into meets, builds the cycle node with one child node per split class
/// and gives the layered node its child layers. Returns the cycle node; when the solution
/// already has one, nothing changes.
pub fn layer_tree_make(solution: &mut Solution, options: &LayerTreeOptions) -> NodeId {
    if let Some(cycle_node) = solution.cycle_node() {
        return cycle_node;
    }

    let bins = solution
        .cycle_meets()
        .iter()
        .map(|&meet| solution.meet_duration(meet))
        .collect();
    let mut forest = SplitForest::new(solution.instance(), bins);
    let tasks = split_tasks_make(solution);
    let mut dropped = 0;
    for task in tasks.iter() {
        if !forest.try_task(task) {
            log::trace!("split task dropped: {:?}", task.kind);
            dropped += 1;
        }
    }
    log::debug!(
        "layer tree: {} split tasks, {dropped} dropped, {} packed layers",
        tasks.len(),
        forest.layers.iter().filter(|layer| layer.packed).count()
    );
    for layer in forest.layers.iter().filter(|layer| layer.packed) {
        log::trace!("the layer of {} packs as {:?}", layer.resource, layer.parts);
    }

    finalize(solution, &forest, options)
}

fn finalize(solution: &mut Solution, forest: &SplitForest, options: &LayerTreeOptions) -> NodeId {
    let cycle_node = solution.node_make();
    for meet in solution.cycle_meets().to_vec() {
        let _ = solution.node_add_meet(cycle_node, meet);
    }
    solution.cycle_node = Some(cycle_node);
    let parent = if options.vizier {
        vizier_node_make(solution, cycle_node)
    } else {
        cycle_node
    };

    let full_domain = solution.instance().full_time_set();
    let partitions = forest.chosen_partitions();
    for class in forest.class_ids() {
        let Some(data) = forest.class(class) else {
            continue;
        };
        let partition = partitions
            .get(&class)
            .cloned()
            .unwrap_or_else(|| vec![data.duration]);

        let node = solution.node_make();
        let added = solution.node_add_parent(node, parent);
        hstt_assert_simple!(added, "a fresh node has no parent and no children");

        let mut leader_meets = vec![];
        for (index, &event) in data.events.iter().enumerate() {
            let meets = event_meets_conform(solution, event, &partition);
            if data.bounds.domain != full_domain {
                for &meet in meets.iter() {
                    let _ = solution.meet_tighten_domain(meet, &data.bounds.domain);
                }
            }
            if index == 0 {
                for &meet in meets.iter() {
                    let _ = solution.node_add_meet(node, meet);
                }
                leader_meets = meets;
            } else {
                for (&follower, &leader) in meets.iter().zip(leader_meets.iter()) {
                    if solution.meet_duration(follower) == solution.meet_duration(leader)
                        && solution.meet_assignment(follower).is_none()
                    {
                        let _ = solution.meet_assign(follower, leader, 0);
                    }
                }
            }
        }
    }

    solution.node_child_layers_make(parent);
    cycle_node
}

/// Splits the meets of `event` to match `partition` when it still consists of its single
/// unassigned meet. Returns the meets of the event, longest first.
fn event_meets_conform(
    solution: &mut Solution,
    event: EventId,
    partition: &[usize],
) -> Vec<MeetId> {
    let mut meets = solution.event_meets(event).to_vec();
    let total = partition.iter().sum::<usize>();
    if meets.len() == 1
        && partition.len() > 1
        && solution.meet_duration(meets[0]) == total
        && solution.meet_assignment(meets[0]).is_none()
    {
        let mut current = meets[0];
        for &part in partition[..partition.len() - 1].iter() {
            match solution.meet_split(current, part) {
                Some(rest) => {
                    meets.push(rest);
                    current = rest;
                }
                None => break,
            }
        }
    }
    meets.sort_by_key(|&meet| (std::cmp::Reverse(solution.meet_duration(meet)), meet));
    meets
}

/// Makes a child of the cycle node with one meet per cycle meet, assigned to it at offset 0.
fn vizier_node_make(solution: &mut Solution, cycle_node: NodeId) -> NodeId {
    let vizier = solution.node_make();
    let added = solution.node_add_parent(vizier, cycle_node);
    hstt_assert_simple!(added, "a fresh node has no parent and no children");
    for cycle_meet in solution.cycle_meets().to_vec() {
        let Some(start) = solution.meet_start_time(cycle_meet) else {
            continue;
        };
        let meet = solution.meet_make(solution.meet_duration(cycle_meet), None);
        let domain = solution.instance().time_set([start]);
        let _ = solution.meet_set_domain(meet, domain);
        let _ = solution.meet_assign(meet, cycle_meet, 0);
        let _ = solution.node_add_meet(vizier, meet);
    }
    vizier
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::instance::Constraint;
    use crate::instance::ConstraintKind;
    use crate::instance::InstanceBuilder;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn every_event_gets_a_node_below_the_cycle_node() {
        let mut solution = two_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());

        assert_eq!(solution.cycle_node(), Some(cycle_node));
        assert_eq!(solution.node_children(cycle_node).len(), 3);
        assert_eq!(solution.node_meets(cycle_node), solution.cycle_meets());
        // Teacher A is preassigned to e0 and e1, so their nodes form one layer.
        assert_eq!(solution.node_child_layers(cycle_node).len(), 1);
        let layer = solution.node_child_layers(cycle_node)[0];
        assert_eq!(solution.layer_children(layer).len(), 2);
    }

    #[test]
    fn linked_events_share_a_node() {
        let mut builder = InstanceBuilder::new("linked");
        for index in 0..4 {
            let _ = builder.add_time(format!("t{index}"));
        }
        let first = builder.add_event("first", 2, None);
        let second = builder.add_event("second", 2, None);
        let group = builder.add_event_group("both", [first, second]);
        let _ = builder.add_constraint(Constraint::new(
            "link",
            true,
            1,
            ConstraintKind::LinkEvents {
                event_groups: vec![group],
            },
        ));
        let instance = builder.build().expect("valid instance");
        let mut solution = Solution::new(Arc::new(instance));
        solution.make_complete_representation();

        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions::default());

        assert_eq!(solution.node_children(cycle_node).len(), 1);
        let node = solution.node_children(cycle_node)[0];
        let leader = solution.event_meets(first)[0];
        let follower = solution.event_meets(second)[0];
        assert_eq!(solution.node_meets(node), &[leader]);
        assert_eq!(solution.meet_assignment(follower), Some((leader, 0)));
    }

    #[test]
    fn vizier_meets_sit_on_the_cycle_meets() {
        let mut solution = two_teacher_solution();
        let cycle_node = layer_tree_make(&mut solution, &LayerTreeOptions { vizier: true });

        assert_eq!(solution.node_children(cycle_node).len(), 1);
        let vizier = solution.node_children(cycle_node)[0];
        assert_eq!(solution.node_children(vizier).len(), 3);
        let cycle_meet = solution.cycle_meets()[0];
        assert!(solution
            .node_meets(vizier)
            .iter()
            .all(|&meet| solution.meet_assignment(meet) == Some((cycle_meet, 0))));
    }
}

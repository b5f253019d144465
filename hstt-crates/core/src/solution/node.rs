use super::*;
use crate::hstt_assert_simple;
use crate::containers::StorageKey;

#[derive(Clone, Debug, Default)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) meets: Vec<MeetId>,
    pub(crate) child_layers: Vec<LayerId>,
    pub(crate) parent_layers: Vec<LayerId>,
    pub(crate) zones: Vec<ZoneId>,
    pub(crate) visit_num: u32,
    pub(crate) deleted: bool,
}

impl Solution {
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter_with_keys()
            .filter(|(_, node)| !node.deleted)
            .map(|(id, _)| id)
    }

    /// The node holding the cycle meets, once a layer tree has been built.
    pub fn cycle_node(&self) -> Option<NodeId> {
        self.cycle_node
    }

    pub fn node_parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    pub fn node_children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn node_meets(&self, node: NodeId) -> &[MeetId] {
        &self.nodes[node].meets
    }

    pub fn node_child_layers(&self, node: NodeId) -> &[LayerId] {
        &self.nodes[node].child_layers
    }

    pub fn node_parent_layers(&self, node: NodeId) -> &[LayerId] {
        &self.nodes[node].parent_layers
    }

    pub fn node_zones(&self, node: NodeId) -> &[ZoneId] {
        &self.nodes[node].zones
    }

    /// The total duration of the meets of `node`.
    pub fn node_duration(&self, node: NodeId) -> usize {
        self.nodes[node]
            .meets
            .iter()
            .map(|&meet| self.meets[meet].duration)
            .sum()
    }

    /// The latest end time, as a time index, which the domains of the meets of `node` allow
    /// while keeping each meet inside the cycle. Zero when no meet of `node` has such a start.
    pub fn node_latest_end(&self, node: NodeId) -> usize {
        let time_count = self.instance.time_count();
        self.nodes[node]
            .meets
            .iter()
            .filter_map(|&meet| {
                let duration = self.meets[meet].duration;
                self.meet_possible_start_times(meet)
                    .iter()
                    .map(|start| start.index() + duration)
                    .filter(|&end| end <= time_count)
                    .max()
            })
            .max()
            .unwrap_or(0)
    }

    /// The total duration of the assigned meets of `node`.
    pub fn node_assigned_duration(&self, node: NodeId) -> usize {
        self.nodes[node]
            .meets
            .iter()
            .filter(|&&meet| self.meets[meet].assignment.is_some())
            .map(|&meet| self.meets[meet].duration)
            .sum()
    }

    pub fn node_visited(&self, node: NodeId) -> bool {
        self.nodes[node].visit_num == self.visit_num
    }

    pub fn node_visit(&mut self, node: NodeId) {
        self.nodes[node].visit_num = self.visit_num;
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn node_is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.nodes[candidate].parent;
        }
        false
    }

    pub fn node_make(&mut self) -> NodeId {
        let visit_num = self.visit_num.wrapping_sub(1);
        self.nodes.push(Node {
            visit_num,
            ..Node::default()
        })
    }

    /// Deletes `node`: its meets leave it, its children lose their parent, its layers and zones
    /// are deleted and it leaves its parent.
    pub fn node_delete(&mut self, node: NodeId) {
        if self.nodes[node].deleted {
            return;
        }
        while let Some(&layer) = self.nodes[node].child_layers.last() {
            self.layer_delete(layer);
        }
        while let Some(&layer) = self.nodes[node].parent_layers.last() {
            let _ = self.layer_delete_child_node(layer, node);
        }
        while let Some(&zone) = self.nodes[node].zones.last() {
            self.zone_delete(zone);
        }
        while let Some(&child) = self.nodes[node].children.last() {
            let _ = self.node_delete_parent(child);
        }
        while let Some(&meet) = self.nodes[node].meets.last() {
            let _ = self.node_delete_meet(node, meet);
        }
        let _ = self.node_delete_parent(node);
        if self.cycle_node == Some(node) {
            self.cycle_node = None;
        }
        self.nodes[node].deleted = true;
    }

    /// Makes `parent` the parent of `child`. Declines when `child` already has a parent or
    /// when `parent` lies below `child`.
    pub fn node_add_parent(&mut self, child: NodeId, parent: NodeId) -> bool {
        if self.nodes[child].parent.is_some() || self.node_is_descendant(parent, child) {
            return false;
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        true
    }

    pub fn node_delete_parent(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.nodes[child].parent else {
            return false;
        };
        while let Some(&layer) = self.nodes[child].parent_layers.last() {
            let _ = self.layer_delete_child_node(layer, child);
        }
        self.nodes[parent].children.retain(|&other| other != child);
        self.nodes[child].parent = None;
        true
    }

    pub fn node_add_meet(&mut self, node: NodeId, meet: MeetId) -> bool {
        if self.meets[meet].node.is_some() || self.meets[meet].deleted {
            return false;
        }
        self.meets[meet].node = Some(node);
        self.nodes[node].meets.push(meet);
        true
    }

    pub fn node_delete_meet(&mut self, node: NodeId, meet: MeetId) -> bool {
        if self.meets[meet].node != Some(node) {
            return false;
        }
        for offset in 0..self.meets[meet].duration {
            self.zone_delete_meet_offset(meet, offset);
        }
        self.meets[meet].node = None;
        self.nodes[node].meets.retain(|&other| other != meet);
        true
    }

    /// The meets of `node` ordered by decreasing duration, then by handle.
    fn node_meets_by_duration(&self, node: NodeId) -> Vec<MeetId> {
        let mut meets = self.nodes[node].meets.clone();
        meets.sort_by_key(|&meet| (std::cmp::Reverse(self.meets[meet].duration), meet));
        meets
    }

    /// Whether the meets of the two nodes pair up by duration.
    pub fn node_swap_check(&self, first: NodeId, second: NodeId) -> bool {
        let first_meets = self.node_meets_by_duration(first);
        let second_meets = self.node_meets_by_duration(second);
        first != second
            && first_meets.len() == second_meets.len()
            && first_meets
                .iter()
                .zip(second_meets.iter())
                .all(|(&a, &b)| self.meets[a].duration == self.meets[b].duration)
    }

    /// Exchanges the assignments of the meets of two nodes, pairing their meets by duration;
    /// all or nothing.
    pub fn node_swap(&mut self, first: NodeId, second: NodeId) -> bool {
        if !self.node_swap_check(first, second) {
            return false;
        }
        let first_meets = self.node_meets_by_duration(first);
        let second_meets = self.node_meets_by_duration(second);
        let pairs = first_meets
            .iter()
            .zip(second_meets.iter())
            .map(|(&a, &b)| (a, b, self.meets[a].assignment, self.meets[b].assignment))
            .collect::<Vec<_>>();

        let mark = self.transaction_begin();
        for &(a, b, _, _) in pairs.iter() {
            let _ = self.meet_unassign_internal(a);
            let _ = self.meet_unassign_internal(b);
        }
        let mut success = true;
        for &(a, b, a_assignment, b_assignment) in pairs.iter() {
            if let Some((target, offset)) = b_assignment {
                success &= self.meet_assign_internal(a, target, offset);
            }
            if let Some((target, offset)) = a_assignment {
                success &= self.meet_assign_internal(b, target, offset);
            }
        }
        if success {
            self.transaction_commit(mark);
            self.settle();
        } else {
            self.transaction_rollback(mark);
        }
        success
    }

    /// Replaces `node` in the tree by its children: they become children of the parent of
    /// `node`, which keeps its meets. Declines for a node without a parent.
    pub fn node_bypass(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes[node].parent else {
            return false;
        };
        while let Some(&child) = self.nodes[node].children.last() {
            let _ = self.node_delete_parent(child);
            let added = self.node_add_parent(child, parent);
            hstt_assert_simple!(added, "the grandparent of a node cannot lie below it");
        }
        true
    }

    /// Makes every proper descendant of `node` a child of `node`.
    pub fn node_flatten(&mut self, node: NodeId) {
        let mut index = 0;
        while index < self.nodes[node].children.len() {
            let child = self.nodes[node].children[index];
            if self.nodes[child].children.is_empty() {
                index += 1;
            } else {
                let _ = self.node_bypass(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::instance::EventId;
    use crate::instance::TimeId;
    use crate::test_instances;

    #[test]
    fn the_latest_end_follows_the_domains_of_the_meets() {
        let mut solution = test_instances::two_teacher_solution();
        let node = solution.node_make();
        assert_eq!(solution.node_latest_end(node), 0);

        let long = solution.event_meets(EventId(0))[0];
        assert!(solution.node_add_meet(node, long));
        assert_eq!(solution.node_latest_end(node), 6);
        assert_eq!(solution.node_duration(node), 3);

        let early = solution.instance().time_set([TimeId(0), TimeId(1)]);
        assert!(solution.meet_set_domain(long, early));
        assert_eq!(solution.node_latest_end(node), 4);

        let short = solution.event_meets(EventId(1))[0];
        let late = solution.instance().time_set([TimeId(3)]);
        assert!(solution.meet_set_domain(short, late));
        assert!(solution.node_add_meet(node, short));
        assert_eq!(solution.node_latest_end(node), 5);
        assert_eq!(solution.node_duration(node), 5);
    }

    #[test]
    fn parents_cannot_form_cycles() {
        let mut solution = test_instances::two_teacher_solution();
        let a = solution.node_make();
        let b = solution.node_make();
        let c = solution.node_make();

        assert!(solution.node_add_parent(b, a));
        assert!(solution.node_add_parent(c, b));
        assert!(!solution.node_add_parent(a, c));
        assert!(!solution.node_add_parent(c, a));
    }

    #[test]
    fn flatten_lifts_every_descendant() {
        let mut solution = test_instances::two_teacher_solution();
        let root = solution.node_make();
        let middle = solution.node_make();
        let leaf = solution.node_make();
        assert!(solution.node_add_parent(middle, root));
        assert!(solution.node_add_parent(leaf, middle));

        solution.node_flatten(root);

        assert_eq!(solution.node_parent(leaf), Some(root));
        assert_eq!(solution.node_parent(middle), Some(root));
        assert!(solution.node_children(middle).is_empty());
    }

    #[test]
    fn node_swap_exchanges_meet_assignments() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let first = solution.node_make();
        let second = solution.node_make();
        let a = solution.meet_make(2, None);
        let b = solution.meet_make(2, None);
        assert!(solution.node_add_meet(first, a));
        assert!(solution.node_add_meet(second, b));
        assert!(solution.meet_assign(a, cycle, 0));
        assert!(solution.meet_assign(b, cycle, 3));

        assert!(solution.node_swap(first, second));
        assert_eq!(solution.meet_assignment(a), Some((cycle, 3)));
        assert_eq!(solution.meet_assignment(b), Some((cycle, 0)));
        assert_eq!(solution.node_assigned_duration(first), 2);
    }
}

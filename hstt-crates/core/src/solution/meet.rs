use super::*;
use crate::containers::StorageKey;
use crate::hstt_assert_moderate;
use crate::hstt_assert_simple;
use crate::instance::TimeSet;

#[derive(Clone, Debug)]
pub(crate) struct Meet {
    pub(crate) duration: usize,
    pub(crate) event: Option<EventId>,
    /// The target meet and the offset into it.
    pub(crate) assignment: Option<(MeetId, usize)>,
    pub(crate) assigned_children: Vec<MeetId>,
    /// Defined exactly when the meet is a cycle meet or is assigned, possibly indirectly, to one.
    pub(crate) start_time: Option<TimeId>,
    pub(crate) cycle: bool,
    /// The allowed start times.
    pub(crate) domain: TimeSet,
    pub(crate) tasks: Vec<TaskId>,
    pub(crate) node: Option<NodeId>,
    pub(crate) zones: Vec<Option<ZoneId>>,
    pub(crate) visit_num: u32,
    pub(crate) deleted: bool,
}

impl Meet {
    pub(crate) fn cycle(instance: &Instance, start: TimeId, duration: usize) -> Meet {
        Meet {
            duration,
            event: None,
            assignment: None,
            assigned_children: vec![],
            start_time: Some(start),
            cycle: true,
            domain: TimeSet::singleton(instance.time_count(), start),
            tasks: vec![],
            node: None,
            zones: vec![None; duration],
            visit_num: 0,
            deleted: false,
        }
    }

    fn ordinary(instance: &Instance, duration: usize, event: Option<EventId>) -> Meet {
        Meet {
            duration,
            event,
            assignment: None,
            assigned_children: vec![],
            start_time: None,
            cycle: false,
            domain: instance.full_time_set(),
            tasks: vec![],
            node: None,
            zones: vec![None; duration],
            visit_num: 0,
            deleted: false,
        }
    }
}

/// Whether a meet with domain `domain` may sit at `offset` inside a target with domain
/// `target_domain`.
fn domain_allows(target_domain: &TimeSet, offset: usize, domain: &TimeSet) -> bool {
    target_domain.shifted(offset).is_subset(domain)
}

/// The start times left for the part of a meet with domain `domain` which begins
/// `first_duration` times after it. An unrestricted domain stays unrestricted.
fn trailing_domain(domain: &TimeSet, first_duration: usize) -> TimeSet {
    if domain.is_full() {
        domain.clone()
    } else {
        domain.shifted(first_duration)
    }
}

impl Solution {
    pub fn meets(&self) -> impl Iterator<Item = MeetId> + '_ {
        self.meets
            .iter_with_keys()
            .filter(|(_, meet)| !meet.deleted)
            .map(|(id, _)| id)
    }

    pub fn cycle_meets(&self) -> &[MeetId] {
        &self.cycle_meets
    }

    /// The cycle meet covering `time`, with the offset of `time` inside it.
    pub fn time_cycle_meet(&self, time: TimeId) -> Option<(MeetId, usize)> {
        self.cycle_meets.iter().find_map(|&cycle_meet| {
            let start = self.meets[cycle_meet].start_time?;
            let offset = time.index().checked_sub(start.index())?;
            (offset < self.meets[cycle_meet].duration).then_some((cycle_meet, offset))
        })
    }

    pub fn event_meets(&self, event: EventId) -> &[MeetId] {
        &self.event_meets[event]
    }

    pub fn meet_duration(&self, meet: MeetId) -> usize {
        self.meets[meet].duration
    }

    pub fn meet_event(&self, meet: MeetId) -> Option<EventId> {
        self.meets[meet].event
    }

    pub fn meet_assignment(&self, meet: MeetId) -> Option<(MeetId, usize)> {
        self.meets[meet].assignment
    }

    pub fn meet_target(&self, meet: MeetId) -> Option<MeetId> {
        self.meets[meet].assignment.map(|(target, _)| target)
    }

    pub fn meet_start_time(&self, meet: MeetId) -> Option<TimeId> {
        self.meets[meet].start_time
    }

    pub fn meet_domain(&self, meet: MeetId) -> &TimeSet {
        &self.meets[meet].domain
    }

    pub fn meet_tasks(&self, meet: MeetId) -> &[TaskId] {
        &self.meets[meet].tasks
    }

    pub fn meet_node(&self, meet: MeetId) -> Option<NodeId> {
        self.meets[meet].node
    }

    pub fn meet_is_cycle(&self, meet: MeetId) -> bool {
        self.meets[meet].cycle
    }

    pub fn meet_is_deleted(&self, meet: MeetId) -> bool {
        self.meets[meet].deleted
    }

    pub fn meet_assigned_children(&self, meet: MeetId) -> &[MeetId] {
        &self.meets[meet].assigned_children
    }

    pub fn meet_visited(&self, meet: MeetId) -> bool {
        self.meets[meet].visit_num == self.visit_num
    }

    pub fn meet_visit(&mut self, meet: MeetId) {
        self.meets[meet].visit_num = self.visit_num;
    }

    /// The highest meet reachable from `meet` by following assignments, with the total offset of
    /// `meet` inside it.
    pub fn meet_root(&self, meet: MeetId) -> (MeetId, usize) {
        let mut current = meet;
        let mut offset = 0;
        while let Some((target, target_offset)) = self.meets[current].assignment {
            offset += target_offset;
            current = target;
        }
        (current, offset)
    }

    /// The start times `meet` could end up with given its current assignment: its start time
    /// when defined, otherwise the domain of its root shifted by its offset in the root.
    pub fn meet_possible_start_times(&self, meet: MeetId) -> TimeSet {
        if let Some(start) = self.meets[meet].start_time {
            return self.instance.time_set([start]);
        }
        let (root, offset) = self.meet_root(meet);
        if root == meet {
            self.meets[meet].domain.clone()
        } else {
            self.meets[root].domain.shifted(offset)
        }
    }

    /// Creates an unassigned meet with an unrestricted domain and no tasks.
    pub fn meet_make(&mut self, duration: usize, event: Option<EventId>) -> MeetId {
        hstt_assert_simple!(duration > 0, "meets have a positive duration");
        let meet = self.meets.push(Meet::ordinary(&self.instance, duration, event));
        if let Some(event) = event {
            self.event_meets[event].push(meet);
            self.notify_event(event);
        }
        self.settle();
        meet
    }

    /// Deletes an unassigned meet without assigned children, together with its tasks. Declines
    /// when a task of the meet is assigned or has followers.
    pub fn meet_delete(&mut self, meet: MeetId) -> bool {
        let state = &self.meets[meet];
        if state.deleted
            || state.cycle
            || state.assignment.is_some()
            || !state.assigned_children.is_empty()
            || state.tasks.iter().any(|&task| {
                self.tasks[task].assignment.is_some() || !self.tasks[task].followers.is_empty()
            })
        {
            return false;
        }

        if let Some(node) = state.node {
            let _ = self.node_delete_meet(node, meet);
        }
        for offset in 0..self.meets[meet].duration {
            self.zone_delete_meet_offset(meet, offset);
        }
        for index in 0..self.meets[meet].tasks.len() {
            let task = self.meets[meet].tasks[index];
            self.task_remove(task);
        }
        if let Some(event) = self.meets[meet].event {
            self.event_meets[event].retain(|&other| other != meet);
            self.notify_event(event);
        }
        self.meets[meet].deleted = true;
        self.settle();
        true
    }

    pub fn meet_assign_check(&self, meet: MeetId, target: MeetId, offset: usize) -> bool {
        let state = &self.meets[meet];
        let target_state = &self.meets[target];
        if state.deleted
            || target_state.deleted
            || state.cycle
            || state.assignment.is_some()
            || offset + state.duration > target_state.duration
        {
            return false;
        }

        let mut current = Some(target);
        while let Some(ancestor) = current {
            if ancestor == meet {
                return false;
            }
            current = self.meets[ancestor].assignment.map(|(next, _)| next);
        }

        domain_allows(&target_state.domain, offset, &state.domain)
    }

    pub fn meet_assign(&mut self, meet: MeetId, target: MeetId, offset: usize) -> bool {
        let assigned = self.meet_assign_internal(meet, target, offset);
        self.settle();
        assigned
    }

    pub fn meet_unassign(&mut self, meet: MeetId) -> bool {
        let unassigned = self.meet_unassign_internal(meet);
        self.settle();
        unassigned
    }

    /// Moves an assigned or unassigned `meet` to `offset` in `target`; all or nothing.
    pub fn meet_move(&mut self, meet: MeetId, target: MeetId, offset: usize) -> bool {
        let old = self.meets[meet].assignment;
        if old == Some((target, offset)) {
            return false;
        }
        let _ = self.meet_unassign_internal(meet);
        if !self.meet_assign_internal(meet, target, offset) {
            if let Some((old_target, old_offset)) = old {
                let restored = self.meet_assign_internal(meet, old_target, old_offset);
                hstt_assert_simple!(restored, "a meet can return to where it came from");
            }
            self.settle();
            return false;
        }
        self.settle();
        true
    }

    /// Swaps the assignments of two assigned meets; all or nothing.
    pub fn meet_swap(&mut self, first: MeetId, second: MeetId) -> bool {
        let (Some((first_target, first_offset)), Some((second_target, second_offset))) = (
            self.meets[first].assignment,
            self.meets[second].assignment,
        ) else {
            return false;
        };
        if first == second {
            return false;
        }
        self.meet_reassign_pair(
            (first, second_target, second_offset),
            (second, first_target, first_offset),
        )
    }

    /// Like [`Solution::meet_swap`], except that when both meets lie in the same target the
    /// swapped pair keeps occupying the same block of offsets, even if their durations differ.
    pub fn meet_block_swap(&mut self, first: MeetId, second: MeetId) -> bool {
        let (Some((first_target, first_offset)), Some((second_target, second_offset))) = (
            self.meets[first].assignment,
            self.meets[second].assignment,
        ) else {
            return false;
        };
        if first == second {
            return false;
        }
        if first_target != second_target {
            return self.meet_swap(first, second);
        }

        let (earlier, later) = if first_offset <= second_offset {
            (first, second)
        } else {
            (second, first)
        };
        let earlier_offset = first_offset.min(second_offset);
        let later_end = first_offset.max(second_offset) + self.meets[later].duration;
        let earlier_duration = self.meets[earlier].duration;
        if later_end < earlier_duration {
            return false;
        }
        self.meet_reassign_pair(
            (later, first_target, earlier_offset),
            (earlier, first_target, later_end - earlier_duration),
        )
    }

    fn meet_reassign_pair(
        &mut self,
        (first, first_target, first_offset): (MeetId, MeetId, usize),
        (second, second_target, second_offset): (MeetId, MeetId, usize),
    ) -> bool {
        let mark = self.transaction_begin();
        let _ = self.meet_unassign_internal(first);
        let _ = self.meet_unassign_internal(second);
        if self.meet_assign_internal(first, first_target, first_offset)
            && self.meet_assign_internal(second, second_target, second_offset)
        {
            self.transaction_commit(mark);
            self.settle();
            true
        } else {
            self.transaction_rollback(mark);
            false
        }
    }

    pub(crate) fn meet_assign_internal(
        &mut self,
        meet: MeetId,
        target: MeetId,
        offset: usize,
    ) -> bool {
        if !self.meet_assign_check(meet, target, offset) {
            return false;
        }

        self.meets[meet].assignment = Some((target, offset));
        self.meets[target].assigned_children.push(meet);
        let start = self.meets[target]
            .start_time
            .map(|start| start.offset(offset));
        self.meet_set_start_time(meet, start);
        self.record(Operation::MeetAssign {
            meet,
            target,
            offset,
        });
        true
    }

    pub(crate) fn meet_unassign_internal(&mut self, meet: MeetId) -> bool {
        let Some((target, offset)) = self.meets[meet].assignment else {
            return false;
        };

        let children = &mut self.meets[target].assigned_children;
        if let Some(position) = children.iter().position(|&child| child == meet) {
            let _ = children.remove(position);
        }
        self.meets[meet].assignment = None;
        self.meet_set_start_time(meet, None);
        self.record(Operation::MeetUnassign {
            meet,
            target,
            offset,
        });
        true
    }

    /// Sets the start time of `meet` and, recursively, of the meets assigned to it, updating
    /// everything which depends on the times of their tasks.
    fn meet_set_start_time(&mut self, meet: MeetId, start: Option<TimeId>) {
        if self.meets[meet].start_time == start {
            return;
        }

        for index in 0..self.meets[meet].tasks.len() {
            let task = self.meets[meet].tasks[index];
            self.task_placement_remove(task);
        }
        self.meets[meet].start_time = start;
        for index in 0..self.meets[meet].tasks.len() {
            let task = self.meets[meet].tasks[index];
            self.task_placement_add(task);
        }
        if let Some(event) = self.meets[meet].event {
            self.notify_event(event);
        }

        for index in 0..self.meets[meet].assigned_children.len() {
            let child = self.meets[meet].assigned_children[index];
            let child_offset = self.meets[child].assignment.map_or(0, |(_, offset)| offset);
            self.meet_set_start_time(child, start.map(|start| start.offset(child_offset)));
        }
    }

    /// Marks the demand nodes of the tasks of `meet` and of every meet below it as changed.
    fn meet_mark_demand_dirty(&mut self, meet: MeetId) {
        for index in 0..self.meets[meet].tasks.len() {
            let task = self.meets[meet].tasks[index];
            self.task_mark_demand_dirty(task);
        }
        for index in 0..self.meets[meet].assigned_children.len() {
            let child = self.meets[meet].assigned_children[index];
            self.meet_mark_demand_dirty(child);
        }
    }

    /// Puts back a domain `meet` held before, without the checks of
    /// [`Solution::meet_set_domain`]; undoing a merge relies on it.
    pub(crate) fn meet_restore_domain(&mut self, meet: MeetId, domain: TimeSet) {
        hstt_assert_simple!(!self.meets[meet].deleted && !self.meets[meet].cycle);
        self.meets[meet].domain = domain;
        self.meet_mark_demand_dirty(meet);
    }

    /// Replaces the domain of `meet`. Declines when the current assignment of `meet` or of one
    /// of its children would violate the new domain.
    pub fn meet_set_domain(&mut self, meet: MeetId, domain: TimeSet) -> bool {
        let changed = self.meet_set_domain_internal(meet, domain);
        self.settle();
        changed
    }

    /// Intersects the domain of `meet` with `domain`.
    pub fn meet_tighten_domain(&mut self, meet: MeetId, domain: &TimeSet) -> bool {
        let tightened = self.meets[meet].domain.intersection(domain);
        self.meet_set_domain(meet, tightened)
    }

    pub(crate) fn meet_set_domain_internal(&mut self, meet: MeetId, domain: TimeSet) -> bool {
        let state = &self.meets[meet];
        if state.cycle || state.deleted {
            return false;
        }
        if let Some((target, offset)) = state.assignment {
            if !domain_allows(&self.meets[target].domain, offset, &domain) {
                return false;
            }
        }
        for &child in state.assigned_children.iter() {
            let (_, child_offset) = self.meets[child]
                .assignment
                .unwrap_or((meet, 0));
            if !domain_allows(&domain, child_offset, &self.meets[child].domain) {
                return false;
            }
        }

        let old = std::mem::replace(&mut self.meets[meet].domain, domain.clone());
        self.meet_mark_demand_dirty(meet);
        self.record(Operation::MeetSetDomain {
            meet,
            old,
            new: domain,
        });
        true
    }

    /// Splits `meet` into a meet of duration `first_duration`, which keeps the handle of `meet`,
    /// and a new meet holding the rest, which is returned. The new meet copies the assignment,
    /// node and tasks of `meet`, and its domain is the domain of `meet` shifted by
    /// `first_duration`; assigned children in the second part move along.
    /// Declines when the split point is not strictly inside the meet or when an assigned child
    /// straddles it.
    pub fn meet_split(&mut self, meet: MeetId, first_duration: usize) -> Option<MeetId> {
        if self.meets[meet].cycle {
            return None;
        }
        let other = self.meet_split_internal(meet, first_duration, None);
        self.settle();
        other
    }

    /// Splits the cycle meet at the start of every day, so that no meet can be assigned across
    /// a day boundary. Must be called before anything is assigned to the cycle meets.
    pub fn split_cycle_meet(&mut self) {
        let days = self.instance.days();
        for day in days {
            let Some(first_time) = self.instance.time_group(day).times.first() else {
                continue;
            };
            let Some(&cycle_meet) = self.cycle_meets.iter().rev().find(|&&cycle_meet| {
                self.meets[cycle_meet]
                    .start_time
                    .is_some_and(|start| start <= first_time)
            }) else {
                continue;
            };
            let start = self.meets[cycle_meet].start_time.map_or(0, |start| start.index());
            let first_duration = first_time.index() - start;
            if first_duration > 0 {
                let _ = self.meet_split_internal(cycle_meet, first_duration, None);
            }
        }
        self.settle();
    }

    pub(crate) fn meet_split_internal(
        &mut self,
        meet: MeetId,
        first_duration: usize,
        reuse: Option<MeetId>,
    ) -> Option<MeetId> {
        let state = &self.meets[meet];
        if state.deleted || first_duration == 0 || first_duration >= state.duration {
            return None;
        }
        let straddles = state.assigned_children.iter().any(|&child| {
            let child_state = &self.meets[child];
            let (_, offset) = child_state.assignment.unwrap_or((meet, 0));
            offset < first_duration && offset + child_state.duration > first_duration
        });
        if straddles {
            return None;
        }
        let second_domain = if state.cycle {
            None
        } else {
            Some(trailing_domain(&state.domain, first_duration))
        };
        if let Some(second_domain) = second_domain.as_ref() {
            if let Some((target, offset)) = state.assignment {
                if !domain_allows(
                    &self.meets[target].domain,
                    offset + first_duration,
                    second_domain,
                ) {
                    return None;
                }
            }
            for &child in state.assigned_children.iter() {
                let (_, offset) = self.meets[child].assignment.unwrap_or((meet, 0));
                if offset >= first_duration
                    && !domain_allows(
                        second_domain,
                        offset - first_duration,
                        &self.meets[child].domain,
                    )
                {
                    return None;
                }
            }
        }

        for index in 0..self.meets[meet].tasks.len() {
            let task = self.meets[meet].tasks[index];
            self.task_placement_remove(task);
        }

        let state = &self.meets[meet];
        let second_duration = state.duration - first_duration;
        let second_start = state
            .start_time
            .map(|start| start.offset(first_duration));
        let (kept_children, moved_children): (Vec<MeetId>, Vec<MeetId>) =
            state.assigned_children.iter().partition(|&&child| {
                self.meets[child]
                    .assignment
                    .is_some_and(|(_, offset)| offset < first_duration)
            });
        let second = Meet {
            duration: second_duration,
            event: state.event,
            assignment: state
                .assignment
                .map(|(target, offset)| (target, offset + first_duration)),
            assigned_children: moved_children.clone(),
            start_time: second_start,
            cycle: state.cycle,
            domain: match (second_domain, second_start) {
                (Some(domain), _) => domain,
                (None, Some(start)) => self.instance.time_set([start]),
                (None, None) => state.domain.clone(),
            },
            tasks: vec![],
            node: state.node,
            zones: state.zones[first_duration..].to_vec(),
            visit_num: state.visit_num,
            deleted: false,
        };

        let other = match reuse {
            Some(other) => {
                hstt_assert_simple!(self.meets[other].deleted, "only deleted meets are revived");
                let revived_tasks = std::mem::take(&mut self.meets[other].tasks);
                self.meets[other] = second;
                self.meets[other].tasks = revived_tasks;
                other
            }
            None => self.meets.push(second),
        };

        let first = &mut self.meets[meet];
        first.duration = first_duration;
        first.zones.truncate(first_duration);
        first.assigned_children = kept_children;
        for &child in moved_children.iter() {
            if let Some((_, offset)) = self.meets[child].assignment {
                self.meets[child].assignment = Some((other, offset - first_duration));
            }
        }

        if let Some((target, _)) = self.meets[other].assignment {
            self.meets[target].assigned_children.push(other);
        }
        if let Some(node) = self.meets[other].node {
            self.nodes[node].meets.push(other);
        }
        if let Some(event) = self.meets[other].event {
            self.event_meets[event].push(other);
            self.notify_event(event);
        }
        if self.meets[other].cycle {
            if let Some(position) = self.cycle_meets.iter().position(|&cycle| cycle == meet) {
                self.cycle_meets.insert(position + 1, other);
            }
        }
        for offset in 0..second_duration {
            if let Some(zone) = self.meets[other].zones[offset] {
                for entry in self.zones[zone].meet_offsets.iter_mut() {
                    if *entry == (meet, offset + first_duration) {
                        *entry = (other, offset);
                    }
                }
            }
        }

        self.meet_split_tasks(meet, other, reuse.is_some());

        for index in 0..self.meets[meet].tasks.len() {
            let task = self.meets[meet].tasks[index];
            self.task_placement_add(task);
            self.task_resize_demand(task);
        }
        for index in 0..self.meets[other].tasks.len() {
            let task = self.meets[other].tasks[index];
            self.task_placement_add(task);
            self.task_resize_demand(task);
        }

        self.record(Operation::MeetSplit {
            meet,
            other,
            first_duration,
        });
        Some(other)
    }

    /// Gives `other` one task per task of `meet`, with the same event resource, domain and
    /// assignment; when `revive` is set the tombstoned tasks already listed by `other` are used.
    fn meet_split_tasks(&mut self, meet: MeetId, other: MeetId, revive: bool) {
        let count = self.meets[meet].tasks.len();
        hstt_assert_moderate!(!revive || self.meets[other].tasks.len() == count);
        for index in 0..count {
            let original = self.meets[meet].tasks[index];
            let copy = Task {
                meet: Some(other),
                event_resource: self.tasks[original].event_resource,
                resource_type: self.tasks[original].resource_type,
                assignment: self.tasks[original].assignment,
                followers: vec![],
                resource: self.tasks[original].resource,
                cycle_resource: None,
                domain: self.tasks[original].domain.clone(),
                partition: None,
                demand_nodes: vec![],
                visit_num: self.tasks[original].visit_num,
                deleted: false,
            };
            let task = if revive {
                let task = self.meets[other].tasks[index];
                let demand_nodes = std::mem::take(&mut self.tasks[task].demand_nodes);
                self.tasks[task] = copy;
                self.tasks[task].demand_nodes = demand_nodes;
                task
            } else {
                let task = self.tasks.push(copy);
                self.meets[other].tasks.push(task);
                task
            };
            if let Some(leader) = self.tasks[task].assignment {
                self.tasks[leader].followers.push(task);
            }
            if let Some(event_resource) = self.tasks[task].event_resource {
                self.event_resource_tasks[event_resource].push(task);
                self.notify_event_resource(event_resource);
            }
        }
    }

    /// Whether `first` and `second` can be merged by [`Solution::meet_merge`]. The domain of
    /// `second` must admit every start time the domain of `first` leaves for it.
    pub fn meet_merge_check(&self, first: MeetId, second: MeetId) -> bool {
        let a = &self.meets[first];
        let b = &self.meets[second];
        if first == second
            || a.deleted
            || b.deleted
            || a.cycle
            || b.cycle
            || a.event != b.event
            || a.node != b.node
            || a.tasks.len() != b.tasks.len()
        {
            return false;
        }
        if !trailing_domain(&a.domain, a.duration).is_subset(&b.domain) {
            return false;
        }
        let adjacent = match (a.assignment, b.assignment) {
            (None, None) => true,
            (Some((a_target, a_offset)), Some((b_target, b_offset))) => {
                a_target == b_target && a_offset + a.duration == b_offset
            }
            _ => false,
        };
        adjacent
            && a.tasks.iter().zip(b.tasks.iter()).all(|(&x, &y)| {
                let x = &self.tasks[x];
                let y = &self.tasks[y];
                x.event_resource == y.event_resource
                    && x.assignment == y.assignment
                    && x.domain == y.domain
                    && y.followers.is_empty()
            })
    }

    /// Merges `second` into `first`, which must lie directly before it in the same target (or
    /// both be unassigned). The exact inverse of [`Solution::meet_split`].
    pub fn meet_merge(&mut self, first: MeetId, second: MeetId) -> bool {
        let merged = self.meet_merge_internal(first, second);
        self.settle();
        merged
    }

    pub(crate) fn meet_merge_internal(&mut self, first: MeetId, second: MeetId) -> bool {
        if !self.meet_merge_check(first, second) {
            return false;
        }

        for index in 0..self.meets[first].tasks.len() {
            let task = self.meets[first].tasks[index];
            self.task_placement_remove(task);
        }
        for index in 0..self.meets[second].tasks.len() {
            let task = self.meets[second].tasks[index];
            self.task_placement_remove(task);
        }

        let first_duration = self.meets[first].duration;
        let other_domain = self.meets[second].domain.clone();

        let moved_children = std::mem::take(&mut self.meets[second].assigned_children);
        for &child in moved_children.iter() {
            if let Some((_, offset)) = self.meets[child].assignment {
                self.meets[child].assignment = Some((first, offset + first_duration));
            }
        }
        self.meets[first].assigned_children.extend(moved_children);

        let second_zones = self.meets[second].zones.clone();
        for (offset, zone) in second_zones.iter().enumerate() {
            if let Some(zone) = *zone {
                for entry in self.zones[zone].meet_offsets.iter_mut() {
                    if *entry == (second, offset) {
                        *entry = (first, offset + first_duration);
                    }
                }
            }
        }
        self.meets[first].zones.extend(second_zones);
        self.meets[first].duration += self.meets[second].duration;

        for index in 0..self.meets[second].tasks.len() {
            let task = self.meets[second].tasks[index];
            self.task_tombstone(task);
        }

        if let Some((target, _)) = self.meets[second].assignment {
            self.meets[target]
                .assigned_children
                .retain(|&child| child != second);
        }
        if let Some(node) = self.meets[second].node {
            self.nodes[node].meets.retain(|&other| other != second);
        }
        if let Some(event) = self.meets[second].event {
            self.event_meets[event].retain(|&other| other != second);
            self.notify_event(event);
        }
        self.meets[second].deleted = true;

        for index in 0..self.meets[first].tasks.len() {
            let task = self.meets[first].tasks[index];
            self.task_placement_add(task);
            self.task_resize_demand(task);
        }

        self.record(Operation::MeetMerge {
            meet: first,
            other: second,
            first_duration,
            other_domain,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::instance::TimeId;
    use crate::test_instances;

    #[test]
    fn assignment_sets_start_times_recursively() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let outer = solution.meet_make(3, None);
        let inner = solution.meet_make(1, None);

        assert!(solution.meet_assign(inner, outer, 2));
        assert_eq!(solution.meet_start_time(inner), None);

        assert!(solution.meet_assign(outer, cycle, 1));
        assert_eq!(solution.meet_start_time(inner).map(|t| t.0), Some(3));
        assert_eq!(solution.meet_root(inner), (cycle, 3));

        assert!(solution.meet_unassign(outer));
        assert_eq!(solution.meet_start_time(inner), None);
    }

    #[test]
    fn assignment_declines_cycles_and_overflow() {
        let mut solution = test_instances::two_teacher_solution();
        let outer = solution.meet_make(3, None);
        let inner = solution.meet_make(2, None);

        assert!(!solution.meet_assign(inner, outer, 2));
        assert!(solution.meet_assign(inner, outer, 1));
        assert!(!solution.meet_assign(outer, inner, 0));
        assert!(!solution.meet_assign(inner, outer, 0));
        assert_eq!(solution.meet_assignment(inner), Some((outer, 1)));
    }

    #[test]
    fn assignment_respects_domains() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.meet_make(1, None);
        let allowed = solution.instance().time_set([crate::instance::TimeId(2)]);
        assert!(solution.meet_set_domain(meet, allowed));

        assert!(!solution.meet_assign(meet, cycle, 1));
        assert!(solution.meet_assign(meet, cycle, 2));

        let narrower = solution.instance().time_set([crate::instance::TimeId(3)]);
        assert!(!solution.meet_set_domain(meet, narrower));
    }

    #[test]
    fn split_then_merge_restores_the_meet() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let event = crate::instance::EventId(0);
        let meet = solution.event_meets(event)[0];
        let duration = solution.meet_duration(meet);
        assert!(solution.meet_assign(meet, cycle, 0));
        let cost = solution.cost();

        for first_duration in 1..duration {
            let other = solution.meet_split(meet, first_duration).unwrap();
            assert_eq!(solution.meet_duration(meet), first_duration);
            assert_eq!(solution.meet_duration(other), duration - first_duration);
            assert_eq!(solution.meet_assignment(other), Some((cycle, first_duration)));
            assert_eq!(solution.meet_tasks(other).len(), solution.meet_tasks(meet).len());

            assert!(solution.meet_merge(meet, other));
            assert_eq!(solution.meet_duration(meet), duration);
            assert!(solution.meet_is_deleted(other));
            assert_eq!(solution.event_meets(event), &[meet]);
            assert_eq!(solution.cost(), cost);
        }
    }

    #[test]
    fn split_declines_degenerate_points() {
        let mut solution = test_instances::two_teacher_solution();
        let meet = solution.event_meets(crate::instance::EventId(0))[0];
        let duration = solution.meet_duration(meet);

        assert!(solution.meet_split(meet, 0).is_none());
        assert!(solution.meet_split(meet, duration).is_none());
    }

    #[test]
    fn merge_declines_meets_which_are_not_adjacent() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(0))[0];
        let other = solution.meet_split(meet, 1).unwrap();
        assert!(solution.meet_assign(meet, cycle, 0));
        assert!(solution.meet_assign(other, cycle, 3));

        assert!(!solution.meet_merge(meet, other));
        assert!(solution.meet_move(other, cycle, 1));
        assert!(solution.meet_merge(meet, other));
    }

    #[test]
    fn an_assigned_meet_with_a_narrow_domain_splits_and_merges_back() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(0))[0];
        let start = solution.instance().time_set([TimeId(0)]);
        assert!(solution.meet_set_domain(meet, start.clone()));
        assert!(solution.meet_assign(meet, cycle, 0));

        let other = solution.meet_split(meet, 1).unwrap();
        assert_eq!(solution.meet_assignment(other), Some((cycle, 1)));
        assert_eq!(solution.meet_domain(other), &solution.instance().time_set([TimeId(1)]));
        assert_eq!(solution.meet_domain(meet), &start);

        assert!(solution.meet_merge(meet, other));
        assert_eq!(solution.meet_duration(meet), 3);
        assert_eq!(solution.meet_domain(meet), &start);
    }

    #[test]
    fn the_halves_of_a_narrow_meet_still_fit_next_to_each_other() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(0))[0];
        let starts = solution.instance().time_set([TimeId(0), TimeId(3)]);
        assert!(solution.meet_set_domain(meet, starts));

        let other = solution.meet_split(meet, 1).unwrap();
        assert_eq!(
            solution.meet_domain(other),
            &solution.instance().time_set([TimeId(1), TimeId(4)])
        );
        assert!(solution.meet_assign(meet, cycle, 3));
        assert!(!solution.meet_assign_check(other, cycle, 3));
        assert!(solution.meet_assign(other, cycle, 4));
        assert!(solution.meet_merge(meet, other));
        assert_eq!(solution.meet_assignment(meet), Some((cycle, 3)));
    }

    #[test]
    fn an_unrestricted_meet_splits_into_unrestricted_halves() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(0))[0];

        let other = solution.meet_split(meet, 2).unwrap();
        assert!(solution.meet_domain(other).is_full());
        assert!(solution.meet_assign(other, cycle, 0));
        assert!(solution.meet_assign(meet, cycle, 0));
    }

    #[test]
    fn merge_declines_a_second_meet_whose_domain_misses_a_start() {
        let mut solution = test_instances::two_teacher_solution();
        let meet = solution.event_meets(crate::instance::EventId(0))[0];
        let other = solution.meet_split(meet, 1).unwrap();
        let starts = solution.instance().time_set([TimeId(0), TimeId(3)]);
        assert!(solution.meet_set_domain(meet, starts));
        let only_one = solution.instance().time_set([TimeId(1)]);
        assert!(solution.meet_set_domain(other, only_one));

        assert!(!solution.meet_merge_check(meet, other));
        assert!(!solution.meet_merge(meet, other));

        let both = solution.instance().time_set([TimeId(1), TimeId(4)]);
        assert!(solution.meet_set_domain(other, both));
        assert!(solution.meet_merge(meet, other));

        // A full domain leaves every start open, so a narrower second meet does not merge.
        let other = solution.meet_split(meet, 1).unwrap();
        let full = solution.instance().full_time_set();
        assert!(solution.meet_set_domain(meet, full));
        assert!(!solution.meet_merge_check(meet, other));
    }

    #[test]
    fn swap_exchanges_positions() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let a = solution.meet_make(1, None);
        let b = solution.meet_make(2, None);
        assert!(solution.meet_assign(a, cycle, 0));
        assert!(solution.meet_assign(b, cycle, 1));

        assert!(solution.meet_block_swap(a, b));
        assert_eq!(solution.meet_assignment(b), Some((cycle, 0)));
        assert_eq!(solution.meet_assignment(a), Some((cycle, 2)));

        assert!(solution.meet_swap(a, b));
        assert_eq!(solution.meet_assignment(a), Some((cycle, 0)));
        assert_eq!(solution.meet_assignment(b), Some((cycle, 2)));
    }
}

use super::*;
use crate::hstt_assert_simple;
use crate::instance::ResourceSet;
use crate::instance::ResourceTypeId;

#[derive(Clone, Debug)]
pub(crate) struct Task {
    /// `None` for cycle tasks.
    pub(crate) meet: Option<MeetId>,
    pub(crate) event_resource: Option<EventResourceId>,
    pub(crate) resource_type: ResourceTypeId,
    pub(crate) assignment: Option<TaskId>,
    pub(crate) followers: Vec<TaskId>,
    /// The resource of the cycle task at the root of the assignment chain, if any.
    pub(crate) resource: Option<ResourceId>,
    pub(crate) cycle_resource: Option<ResourceId>,
    pub(crate) domain: ResourceSet,
    /// The partition the domain lies in, cached for the evenness monitors while placed.
    pub(crate) partition: Option<crate::instance::ResourceGroupId>,
    pub(crate) demand_nodes: Vec<usize>,
    pub(crate) visit_num: u32,
    pub(crate) deleted: bool,
}

impl Task {
    pub(crate) fn cycle(instance: &Instance, resource: ResourceId) -> Task {
        Task {
            meet: None,
            event_resource: None,
            resource_type: instance.resource(resource).resource_type,
            assignment: None,
            followers: vec![],
            resource: Some(resource),
            cycle_resource: Some(resource),
            domain: instance.resource_set([resource]),
            partition: None,
            demand_nodes: vec![],
            visit_num: 0,
            deleted: false,
        }
    }
}

impl Solution {
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks
            .iter_with_keys()
            .filter(|(_, task)| !task.deleted && task.cycle_resource.is_none())
            .map(|(id, _)| id)
    }

    pub fn cycle_task(&self, resource: ResourceId) -> TaskId {
        self.cycle_tasks[resource]
    }

    pub fn event_resource_tasks(&self, event_resource: EventResourceId) -> &[TaskId] {
        &self.event_resource_tasks[event_resource]
    }

    pub fn task_meet(&self, task: TaskId) -> Option<MeetId> {
        self.tasks[task].meet
    }

    pub fn task_event_resource(&self, task: TaskId) -> Option<EventResourceId> {
        self.tasks[task].event_resource
    }

    pub fn task_resource_type(&self, task: TaskId) -> ResourceTypeId {
        self.tasks[task].resource_type
    }

    pub fn task_assignment(&self, task: TaskId) -> Option<TaskId> {
        self.tasks[task].assignment
    }

    pub fn task_resource(&self, task: TaskId) -> Option<ResourceId> {
        self.tasks[task].resource
    }

    pub fn task_domain(&self, task: TaskId) -> &ResourceSet {
        &self.tasks[task].domain
    }

    pub fn task_followers(&self, task: TaskId) -> &[TaskId] {
        &self.tasks[task].followers
    }

    pub fn task_is_cycle(&self, task: TaskId) -> bool {
        self.tasks[task].cycle_resource.is_some()
    }

    pub fn task_is_deleted(&self, task: TaskId) -> bool {
        self.tasks[task].deleted
    }

    pub fn task_duration(&self, task: TaskId) -> usize {
        self.tasks[task]
            .meet
            .map_or(0, |meet| self.meets[meet].duration)
    }

    /// Whether the resource of `task` was fixed by the instance.
    pub fn task_is_preassigned(&self, task: TaskId) -> bool {
        self.tasks[task]
            .event_resource
            .is_some_and(|event_resource| {
                self.instance.event_resource(event_resource).preassigned.is_some()
            })
    }

    pub fn task_visited(&self, task: TaskId) -> bool {
        self.tasks[task].visit_num == self.visit_num
    }

    pub fn task_visit(&mut self, task: TaskId) {
        self.tasks[task].visit_num = self.visit_num;
    }

    /// The times occupied by `task` and, recursively, by its followers.
    pub fn task_busy_times(&self, task: TaskId) -> Vec<TimeId> {
        let mut times = vec![];
        let mut stack = vec![task];
        while let Some(current) = stack.pop() {
            if let Some(meet) = self.tasks[current].meet {
                if let Some(start) = self.meets[meet].start_time {
                    times.extend((0..self.meets[meet].duration).map(|offset| start.offset(offset)));
                }
            }
            stack.extend(self.tasks[current].followers.iter().copied());
        }
        times.sort();
        times.dedup();
        times
    }

    /// The workload of `task` in thousandths: its share of the workload of its event resource,
    /// proportional to the duration of its meet.
    pub(crate) fn task_workload(&self, task: TaskId) -> i64 {
        let state = &self.tasks[task];
        let (Some(meet), Some(event_resource)) = (state.meet, state.event_resource) else {
            return 0;
        };
        let event_resource = self.instance.event_resource(event_resource);
        let event_duration = self.instance.event(event_resource.event).duration as i64;
        event_resource.workload * 1000 * self.meets[meet].duration as i64 / event_duration
    }

    /// Creates an unassigned task of `meet` for `event_resource`, with the resources of its
    /// type as domain.
    pub fn task_make(&mut self, meet: MeetId, event_resource: EventResourceId) -> TaskId {
        let resource_type = self.instance.event_resource(event_resource).resource_type;
        let task = self.tasks.push(Task {
            meet: Some(meet),
            event_resource: Some(event_resource),
            resource_type,
            assignment: None,
            followers: vec![],
            resource: None,
            cycle_resource: None,
            domain: self.instance.resource_type_set(resource_type),
            partition: None,
            demand_nodes: vec![],
            visit_num: 0,
            deleted: false,
        });
        self.meets[meet].tasks.push(task);
        self.event_resource_tasks[event_resource].push(task);
        self.task_placement_add(task);
        self.task_resize_demand(task);
        self.notify_event_resource(event_resource);
        self.settle();
        task
    }

    /// Removes an unassigned task without followers from its meet.
    pub(crate) fn task_remove(&mut self, task: TaskId) {
        self.task_tombstone(task);
        if let Some(meet) = self.tasks[task].meet {
            self.meets[meet].tasks.retain(|&other| other != task);
        }
    }

    /// Takes `task` out of every index while it stays listed by its meet, so that a split can
    /// revive it.
    pub(crate) fn task_tombstone(&mut self, task: TaskId) {
        if let Some(leader) = self.tasks[task].assignment {
            self.tasks[leader].followers.retain(|&other| other != task);
        }
        if let Some(event_resource) = self.tasks[task].event_resource {
            self.event_resource_tasks[event_resource].retain(|&other| other != task);
            self.notify_event_resource(event_resource);
        }
        self.task_delete_demand(task);
        self.tasks[task].deleted = true;
    }

    pub fn task_assign_check(&self, task: TaskId, target: TaskId) -> bool {
        let state = &self.tasks[task];
        let target_state = &self.tasks[target];
        if task == target
            || state.deleted
            || target_state.deleted
            || state.cycle_resource.is_some()
            || state.assignment.is_some()
            || state.resource_type != target_state.resource_type
            || !target_state.domain.is_subset(&state.domain)
        {
            return false;
        }

        let mut current = Some(target);
        while let Some(ancestor) = current {
            if ancestor == task {
                return false;
            }
            current = self.tasks[ancestor].assignment;
        }
        true
    }

    pub fn task_assign(&mut self, task: TaskId, target: TaskId) -> bool {
        let assigned = self.task_assign_internal(task, target);
        self.settle();
        assigned
    }

    /// Assigns `task` to the cycle task of `resource`.
    pub fn task_assign_resource(&mut self, task: TaskId, resource: ResourceId) -> bool {
        self.task_assign(task, self.cycle_tasks[resource])
    }

    pub fn task_unassign(&mut self, task: TaskId) -> bool {
        let unassigned = self.task_unassign_internal(task);
        self.settle();
        unassigned
    }

    /// Moves `task` to `target`; all or nothing.
    pub fn task_move(&mut self, task: TaskId, target: TaskId) -> bool {
        let old = self.tasks[task].assignment;
        if old == Some(target) {
            return false;
        }
        let _ = self.task_unassign_internal(task);
        if !self.task_assign_internal(task, target) {
            if let Some(old) = old {
                let restored = self.task_assign_internal(task, old);
                hstt_assert_simple!(restored, "a task can return to where it came from");
            }
            self.settle();
            return false;
        }
        self.settle();
        true
    }

    pub fn task_move_resource(&mut self, task: TaskId, resource: ResourceId) -> bool {
        self.task_move(task, self.cycle_tasks[resource])
    }

    /// Swaps the assignments of two assigned tasks; all or nothing.
    pub fn task_swap(&mut self, first: TaskId, second: TaskId) -> bool {
        let (Some(first_target), Some(second_target)) =
            (self.tasks[first].assignment, self.tasks[second].assignment)
        else {
            return false;
        };
        if first == second || first_target == second_target {
            return false;
        }

        let mark = self.transaction_begin();
        let _ = self.task_unassign_internal(first);
        let _ = self.task_unassign_internal(second);
        if self.task_assign_internal(first, second_target)
            && self.task_assign_internal(second, first_target)
        {
            self.transaction_commit(mark);
            self.settle();
            true
        } else {
            self.transaction_rollback(mark);
            false
        }
    }

    pub(crate) fn task_assign_internal(&mut self, task: TaskId, target: TaskId) -> bool {
        if !self.task_assign_check(task, target) {
            return false;
        }
        self.tasks[task].assignment = Some(target);
        self.tasks[target].followers.push(task);
        let resource = self.tasks[target].resource;
        self.task_set_resource(task, resource);
        self.record(Operation::TaskAssign { task, target });
        true
    }

    pub(crate) fn task_unassign_internal(&mut self, task: TaskId) -> bool {
        let Some(target) = self.tasks[task].assignment else {
            return false;
        };
        let followers = &mut self.tasks[target].followers;
        if let Some(position) = followers.iter().position(|&other| other == task) {
            let _ = followers.remove(position);
        }
        self.tasks[task].assignment = None;
        self.task_set_resource(task, None);
        self.record(Operation::TaskUnassign { task, target });
        true
    }

    /// Sets the effective resource of `task` and its followers.
    fn task_set_resource(&mut self, task: TaskId, resource: Option<ResourceId>) {
        if self.tasks[task].resource == resource {
            return;
        }
        self.task_placement_remove(task);
        self.tasks[task].resource = resource;
        self.task_placement_add(task);
        if let Some(event_resource) = self.tasks[task].event_resource {
            self.notify_event_resource(event_resource);
        }
        for index in 0..self.tasks[task].followers.len() {
            let follower = self.tasks[task].followers[index];
            self.task_set_resource(follower, resource);
        }
    }

    /// Replaces the domain of `task`. Declines when the resource of its target or the domain of
    /// one of its followers would violate the new domain.
    pub fn task_set_domain(&mut self, task: TaskId, domain: ResourceSet) -> bool {
        let changed = self.task_set_domain_internal(task, domain);
        self.settle();
        changed
    }

    /// Intersects the domain of `task` with `domain`; declines when the result is empty.
    pub fn task_tighten_domain(&mut self, task: TaskId, domain: &ResourceSet) -> bool {
        let tightened = self.tasks[task].domain.intersection(domain);
        if tightened.is_empty() {
            return false;
        }
        self.task_set_domain(task, tightened)
    }

    pub(crate) fn task_set_domain_internal(&mut self, task: TaskId, domain: ResourceSet) -> bool {
        let state = &self.tasks[task];
        if state.deleted || state.cycle_resource.is_some() {
            return false;
        }
        if let Some(target) = state.assignment {
            if !self.tasks[target].domain.is_subset(&domain) {
                return false;
            }
        }
        if state
            .followers
            .iter()
            .any(|&follower| !domain.is_subset(&self.tasks[follower].domain))
        {
            return false;
        }

        self.task_placement_remove(task);
        let old = std::mem::replace(&mut self.tasks[task].domain, domain.clone());
        self.task_placement_add(task);
        self.record(Operation::TaskSetDomain {
            task,
            old,
            new: domain,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::instance::EventResourceId;
    use crate::instance::ResourceId;
    use crate::test_instances;

    #[test]
    fn followers_inherit_the_resource_of_their_leader() {
        let mut solution = test_instances::two_teacher_solution();
        let leader = solution.event_resource_tasks(EventResourceId(0))[0];
        let follower = solution.event_resource_tasks(EventResourceId(2))[0];

        assert!(solution.task_assign(follower, leader));
        assert_eq!(solution.task_resource(follower), None);

        assert!(solution.task_assign_resource(leader, ResourceId(1)));
        assert_eq!(solution.task_resource(follower), Some(ResourceId(1)));

        assert!(solution.task_move_resource(leader, ResourceId(0)));
        assert_eq!(solution.task_resource(follower), Some(ResourceId(0)));

        assert!(!solution.task_assign(leader, follower));
    }

    #[test]
    fn tightened_domains_restrict_assignments() {
        let mut solution = test_instances::two_teacher_solution();
        let task = solution.event_resource_tasks(EventResourceId(2))[0];
        let only_b = solution.instance().resource_set([ResourceId(1)]);

        assert!(solution.task_tighten_domain(task, &only_b));
        assert!(!solution.task_assign_resource(task, ResourceId(0)));
        assert!(solution.task_assign_resource(task, ResourceId(1)));

        let only_a = solution.instance().resource_set([ResourceId(0)]);
        assert!(!solution.task_set_domain(task, only_a));
    }

    #[test]
    fn swapping_tasks_exchanges_resources() {
        let mut solution = test_instances::two_teacher_solution();
        let first = solution.event_resource_tasks(EventResourceId(0))[0];
        let second = solution.event_resource_tasks(EventResourceId(2))[0];
        assert!(solution.task_assign_resource(first, ResourceId(0)));
        assert!(solution.task_assign_resource(second, ResourceId(1)));

        assert!(solution.task_swap(first, second));
        assert_eq!(solution.task_resource(first), Some(ResourceId(1)));
        assert_eq!(solution.task_resource(second), Some(ResourceId(0)));
    }
}

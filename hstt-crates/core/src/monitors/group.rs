use super::*;
use crate::hstt_assert_moderate;
use crate::hstt_assert_simple;

impl Solution {
    /// The sub-tag of a group monitor, which selects its augment in the ejector.
    pub fn monitor_sub_tag(&self, monitor: MonitorId) -> Option<usize> {
        match self.monitors[monitor].kind {
            MonitorKind::Group { sub_tag, .. } => Some(sub_tag),
            _ => None,
        }
    }

    pub fn monitor_children(&self, group: MonitorId) -> &[MonitorId] {
        &self.monitors[group].children
    }

    pub fn monitor_defect_count(&self, group: MonitorId) -> usize {
        self.monitors[group].defects.len()
    }

    pub fn monitor_defect(&self, group: MonitorId, index: usize) -> MonitorId {
        self.monitors[group].defects[index]
    }

    /// A copy of the defects of `group`, sorted by decreasing cost, which stays valid while the
    /// solution changes.
    pub fn monitor_defect_copy(&self, group: MonitorId) -> Vec<MonitorId> {
        let mut defects = self.monitors[group].defects.clone();
        defects.sort_by_key(|&defect| (std::cmp::Reverse(self.monitors[defect].cost), defect));
        defects
    }

    /// Makes an empty group monitor below `parent`.
    pub fn monitor_group_make(
        &mut self,
        sub_tag: usize,
        name: &str,
        parent: MonitorId,
    ) -> MonitorId {
        let group = self.monitors.push(Monitor::group(sub_tag, name, Some(parent)));
        self.monitors[parent].children.push(group);
        group
    }

    /// Moves the children of `group` to its parent and deletes it.
    pub fn monitor_group_dissolve(&mut self, group: MonitorId) {
        hstt_assert_simple!(group != self.root_monitor, "the root group cannot be dissolved");
        let Some(parent) = self.monitors[group].parent else {
            return;
        };
        while let Some(&child) = self.monitors[group].children.last() {
            self.monitor_set_parent(child, parent);
        }
        hstt_assert_moderate!(self.monitors[group].cost.is_zero());
        self.monitor_set_parent_detached(group, None);
        self.monitors[group].deleted = true;
    }

    /// Moves `monitor` below `parent`, taking its cost along.
    pub fn monitor_set_parent(&mut self, monitor: MonitorId, parent: MonitorId) {
        if self.monitors[monitor].parent == Some(parent) {
            return;
        }
        hstt_assert_simple!(
            !self.monitor_is_below(parent, monitor),
            "a monitor cannot become its own descendant"
        );
        self.monitor_set_parent_detached(monitor, Some(parent));
    }

    fn monitor_set_parent_detached(&mut self, monitor: MonitorId, parent: Option<MonitorId>) {
        let cost = self.monitors[monitor].cost;
        let contributes = self.monitors[monitor].attached && cost.is_positive();
        if let Some(old_parent) = self.monitors[monitor].parent {
            if contributes {
                self.monitor_group_child_changed(old_parent, monitor, cost, Cost::ZERO);
            }
            self.monitors[old_parent]
                .children
                .retain(|&child| child != monitor);
        }
        self.monitors[monitor].parent = parent;
        if let Some(new_parent) = parent {
            self.monitors[new_parent].children.push(monitor);
            if contributes {
                self.monitor_group_child_changed(new_parent, monitor, Cost::ZERO, cost);
            }
        }
    }

    /// Builds the state of `monitor` from the current solution and adds its cost to its
    /// ancestors. Attaching a group attaches its children.
    pub fn monitor_attach(&mut self, monitor: MonitorId) {
        if self.monitors[monitor].kind.tag() == MonitorTag::Group {
            for index in 0..self.monitors[monitor].children.len() {
                let child = self.monitors[monitor].children[index];
                self.monitor_attach(child);
            }
            return;
        }
        if self.monitors[monitor].attached {
            return;
        }
        self.monitors[monitor].attached = true;
        self.monitor_watch(monitor, true);
        self.monitor_recompute(monitor);
    }

    /// Removes exactly the contribution of `monitor` from its ancestors. Detaching a group
    /// detaches its children.
    pub fn monitor_detach(&mut self, monitor: MonitorId) {
        if self.monitors[monitor].kind.tag() == MonitorTag::Group {
            for index in 0..self.monitors[monitor].children.len() {
                let child = self.monitors[monitor].children[index];
                self.monitor_detach(child);
            }
            return;
        }
        if !self.monitors[monitor].attached {
            return;
        }
        self.monitor_set_cost(monitor, Cost::ZERO);
        self.monitor_watch(monitor, false);
        let state = &mut self.monitors[monitor];
        state.attached = false;
        state.deviations = Deviations::default();
    }

    /// Registers or deregisters `monitor` with the entities whose changes it must hear about.
    fn monitor_watch(&mut self, monitor: MonitorId, register: bool) {
        let instance = std::sync::Arc::clone(&self.instance);
        let mut events = vec![];
        let mut event_resources = vec![];
        let mut resources = vec![];
        match self.monitors[monitor].kind {
            MonitorKind::AssignTime { event, .. }
            | MonitorKind::SplitEvents { event, .. }
            | MonitorKind::DistributeSplitEvents { event, .. }
            | MonitorKind::PreferTimes { event, .. } => events.push(event),
            MonitorKind::SpreadEvents { event_group, .. }
            | MonitorKind::LinkEvents { event_group, .. } => {
                events.extend(instance.event_group(event_group).events.iter().copied())
            }
            MonitorKind::OrderEvents { constraint, point } => {
                if let ConstraintKind::OrderEvents { pairs, .. } =
                    &instance.constraint(constraint).kind
                {
                    let (first, second) = pairs[point];
                    events.extend([first, second]);
                }
            }
            MonitorKind::AssignResource { event_resource, .. }
            | MonitorKind::PreferResources { event_resource, .. } => {
                event_resources.push(event_resource)
            }
            MonitorKind::AvoidSplitAssignments { constraint, point } => {
                if let ConstraintKind::AvoidSplitAssignments {
                    event_resource_groups,
                } = &instance.constraint(constraint).kind
                {
                    event_resources.extend(event_resource_groups[point].iter().copied());
                }
            }
            MonitorKind::AvoidClashes { resource, .. }
            | MonitorKind::AvoidUnavailableTimes { resource, .. }
            | MonitorKind::LimitIdleTimes { resource, .. }
            | MonitorKind::ClusterBusyTimes { resource, .. }
            | MonitorKind::LimitBusyTimes { resource, .. }
            | MonitorKind::LimitWorkload { resource, .. } => resources.push(resource),
            MonitorKind::OrdinaryDemand { .. }
            | MonitorKind::WorkloadDemand { .. }
            | MonitorKind::Evenness { .. }
            | MonitorKind::Group { .. } => {}
        }

        events.sort();
        events.dedup();
        event_resources.sort();
        event_resources.dedup();
        for event in events {
            let watchers = &mut self.event_watchers[event];
            if register {
                watchers.push(monitor);
            } else {
                watchers.retain(|&other| other != monitor);
            }
        }
        for event_resource in event_resources {
            let watchers = &mut self.event_resource_watchers[event_resource];
            if register {
                watchers.push(monitor);
            } else {
                watchers.retain(|&other| other != monitor);
            }
        }
        for resource in resources {
            let watchers = &mut self.resource_watchers[resource];
            if register {
                watchers.push(monitor);
            } else {
                watchers.retain(|&other| other != monitor);
            }
        }
    }

    /// Sets the cached cost of `monitor` and, when it is attached, passes the change on to its
    /// ancestors. Every change is noted by the open traces.
    pub(crate) fn monitor_set_cost(&mut self, monitor: MonitorId, cost: Cost) {
        let old = self.monitors[monitor].cost;
        if old == cost {
            return;
        }
        hstt_assert_moderate!(cost >= Cost::ZERO, "monitor costs are never negative");
        self.trace_note(monitor, old);
        self.monitors[monitor].cost = cost;
        if !self.monitors[monitor].attached {
            return;
        }
        if let Some(parent) = self.monitors[monitor].parent {
            self.monitor_group_child_changed(parent, monitor, old, cost);
        }
    }

    fn monitor_group_child_changed(
        &mut self,
        group: MonitorId,
        child: MonitorId,
        old: Cost,
        new: Cost,
    ) {
        if !old.is_positive() && new.is_positive() {
            let index = self.monitors[group].defects.len();
            self.monitors[group].defects.push(child);
            self.monitors[child].defect_index = Some(index);
        } else if old.is_positive() && !new.is_positive() {
            if let Some(index) = self.monitors[child].defect_index.take() {
                let defects = &mut self.monitors[group].defects;
                let _ = defects.swap_remove(index);
                if let Some(&moved) = defects.get(index) {
                    self.monitors[moved].defect_index = Some(index);
                }
            }
        }
        let cost = self.monitors[group].cost - old + new;
        self.monitor_set_cost(group, cost);
    }
}

#[cfg(test)]
mod tests {
    use crate::monitors::MonitorTag;
    use crate::test_instances;

    #[test]
    fn regrouping_keeps_the_total_cost() {
        let mut solution = test_instances::two_teacher_solution();
        let cost = solution.cost();
        let root = solution.root_monitor();
        let group = solution.monitor_group_make(7, "time", root);
        let members = solution
            .constraint_monitors()
            .filter(|&monitor| solution.monitor_tag(monitor) == MonitorTag::AssignTime)
            .collect::<Vec<_>>();

        for &monitor in members.iter() {
            solution.monitor_set_parent(monitor, group);
        }
        assert_eq!(solution.cost(), cost);
        assert_eq!(solution.monitor_defect_count(group), members.len());
        assert_eq!(solution.monitor_sub_tag(group), Some(7));

        solution.monitor_group_dissolve(group);
        assert_eq!(solution.cost(), cost);
        assert_eq!(solution.monitor_parent(members[0]), Some(root));
    }

    #[test]
    fn defects_follow_costs() {
        let mut solution = test_instances::two_teacher_solution();
        let root = solution.root_monitor();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(2))[0];
        let monitor = solution
            .constraint_monitors()
            .find(|&monitor| {
                solution.monitor_kind(monitor)
                    == &crate::monitors::MonitorKind::AssignTime {
                        constraint: crate::instance::ConstraintId(1),
                        event: crate::instance::EventId(2),
                    }
            })
            .unwrap();
        assert!(solution.monitor_defect_copy(root).contains(&monitor));

        assert!(solution.meet_assign(meet, cycle, 5));
        assert!(!solution.monitor_defect_copy(root).contains(&monitor));
    }
}

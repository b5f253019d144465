//! The demand matching: a maximum matching between demand nodes, one per offset of every task
//! and one per unavailable time of every resource, and supply nodes, one per resource and time.
//!
//! A demand node of a task may be matched to any resource of its domain (or its assigned
//! resource) at any time the offset could run at. Demand nodes which stay unmatched in a
//! maximum matching show that the resources cannot all be assigned without clashes; each one
//! costs its demand monitor one unit of the matching weight.
use std::collections::BTreeSet;
use std::collections::VecDeque;

use super::*;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::containers::StorageKey;
use crate::create_statistics_struct;
use crate::instance::ResourceSet;
use crate::instance::TimeSet;
use crate::statistics::CumulativeMovingAverage;
use crate::statistics::MovingAverage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchingOptions {
    /// The cost of one unmatched demand node.
    pub weight: Cost,
    /// Whether the unavailable times of hard avoid unavailable times constraints reserve
    /// supply.
    pub workload_demand: bool,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        MatchingOptions {
            weight: Cost::hard(1),
            workload_demand: true,
        }
    }
}

create_statistics_struct!(
    /// Statistics of the demand matching.
    MatchingStatistics {
        num_searches: u64,
        num_augmenting_paths: u64,
        average_hall_set_size: CumulativeMovingAverage<u64>,
    }
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DemandOwner {
    Task { task: TaskId, offset: usize },
    Workload { resource: ResourceId, time: TimeId },
}

#[derive(Clone, Debug)]
struct DemandNode {
    owner: DemandOwner,
    monitor: MonitorId,
    supply: Option<usize>,
    live: bool,
}

enum SearchOutcome {
    /// A free supply node and, for every supply node reached, the demand node it was reached
    /// from.
    Augmenting {
        free_supply: usize,
        reached_from: HashMap<usize, usize>,
    },
    /// Every demand node reachable from the start; together they need more supply than they
    /// can reach.
    HallSet(Vec<usize>),
}

#[derive(Clone, Debug)]
pub(crate) struct Matching {
    options: MatchingOptions,
    time_count: usize,
    nodes: Vec<DemandNode>,
    free_nodes: Vec<usize>,
    /// The demand node matched to each supply node, indexed by `resource * time_count + time`.
    supply: Vec<Option<usize>>,
    dirty: Vec<usize>,
    unmatched: BTreeSet<usize>,
    unmatched_by_monitor: HashMap<MonitorId, usize>,
    changed_monitors: Vec<MonitorId>,
    task_monitors: HashMap<TaskId, MonitorId>,
    workload_monitors: HashMap<ResourceId, MonitorId>,
    statistics: MatchingStatistics,
}

impl Matching {
    fn new(options: MatchingOptions, resource_count: usize, time_count: usize) -> Matching {
        Matching {
            options,
            time_count,
            nodes: vec![],
            free_nodes: vec![],
            supply: vec![None; resource_count * time_count],
            dirty: vec![],
            unmatched: BTreeSet::new(),
            unmatched_by_monitor: HashMap::default(),
            changed_monitors: vec![],
            task_monitors: HashMap::default(),
            workload_monitors: HashMap::default(),
            statistics: MatchingStatistics::default(),
        }
    }

    pub(crate) fn weight(&self) -> Cost {
        self.options.weight
    }

    pub(crate) fn unmatched_count(&self, monitor: MonitorId) -> usize {
        self.unmatched_by_monitor.get(&monitor).copied().unwrap_or(0)
    }

    fn supply_index(&self, resource: ResourceId, time: TimeId) -> usize {
        resource.index() * self.time_count + time.index()
    }

    fn note_unmatched(&mut self, node: usize, unmatched: bool) {
        let monitor = self.nodes[node].monitor;
        let count = self.unmatched_by_monitor.entry(monitor).or_insert(0);
        if unmatched {
            *count += 1;
            let _ = self.unmatched.insert(node);
        } else {
            *count -= 1;
            let _ = self.unmatched.remove(&node);
        }
        self.changed_monitors.push(monitor);
    }

    fn node_make(&mut self, owner: DemandOwner, monitor: MonitorId) -> usize {
        let node = DemandNode {
            owner,
            monitor,
            supply: None,
            live: true,
        };
        let index = match self.free_nodes.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.note_unmatched(index, true);
        self.dirty.push(index);
        index
    }

    fn node_delete(&mut self, node: usize) {
        match self.nodes[node].supply.take() {
            Some(supply) => self.supply[supply] = None,
            None => self.note_unmatched(node, false),
        }
        self.nodes[node].live = false;
        self.free_nodes.push(node);
    }

    fn unmatch(&mut self, node: usize) {
        if let Some(supply) = self.nodes[node].supply.take() {
            self.supply[supply] = None;
            self.note_unmatched(node, true);
        }
    }

    /// The resources and times a demand node may be matched to.
    fn demand_range(&self, solution: &Solution, owner: DemandOwner) -> (ResourceSet, TimeSet) {
        match owner {
            DemandOwner::Task { task, offset } => {
                let state = &solution.tasks[task];
                let resources = match state.resource {
                    Some(resource) => solution.instance.resource_set([resource]),
                    None => state.domain.clone(),
                };
                let times = match state.meet {
                    Some(meet) => solution.meet_possible_start_times(meet).shifted(offset),
                    None => solution.instance.empty_time_set(),
                };
                (resources, times)
            }
            DemandOwner::Workload { resource, time } => (
                solution.instance.resource_set([resource]),
                solution.instance.time_set([time]),
            ),
        }
    }

    fn edges(&self, solution: &Solution, node: usize) -> Vec<usize> {
        let (resources, times) = self.demand_range(solution, self.nodes[node].owner);
        resources
            .iter()
            .flat_map(|resource| times.iter().map(move |time| (resource, time)))
            .map(|(resource, time)| self.supply_index(resource, time))
            .collect()
    }

    /// Breadth-first search for an augmenting path from the unmatched demand node `start`.
    fn search(&self, solution: &Solution, start: usize) -> SearchOutcome {
        let mut reached_from: HashMap<usize, usize> = HashMap::default();
        let mut visited = vec![start];
        let mut seen: HashSet<usize> = HashSet::default();
        let _ = seen.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(demand) = queue.pop_front() {
            for supply in self.edges(solution, demand) {
                if reached_from.contains_key(&supply) {
                    continue;
                }
                let _ = reached_from.insert(supply, demand);
                match self.supply[supply] {
                    None => {
                        return SearchOutcome::Augmenting {
                            free_supply: supply,
                            reached_from,
                        }
                    }
                    Some(other) => {
                        if seen.insert(other) {
                            visited.push(other);
                            queue.push_back(other);
                        }
                    }
                }
            }
        }
        SearchOutcome::HallSet(visited)
    }

    fn augment(&mut self, solution: &Solution, start: usize) -> bool {
        self.statistics.num_searches += 1;
        match self.search(solution, start) {
            SearchOutcome::Augmenting {
                free_supply,
                reached_from,
            } => {
                let mut supply = free_supply;
                loop {
                    let demand = reached_from[&supply];
                    let previous = self.nodes[demand].supply.replace(supply);
                    self.supply[supply] = Some(demand);
                    match previous {
                        Some(previous) => supply = previous,
                        None => break,
                    }
                }
                self.note_unmatched(start, false);
                self.statistics.num_augmenting_paths += 1;
                true
            }
            SearchOutcome::HallSet(visited) => {
                self.statistics
                    .average_hall_set_size
                    .add_term(visited.len() as u64);
                false
            }
        }
    }

    /// Drops the edges of changed nodes which are no longer allowed, then augments from every
    /// unmatched node.
    fn settle(&mut self, solution: &Solution) {
        let mut dirty = std::mem::take(&mut self.dirty);
        dirty.sort_unstable();
        dirty.dedup();
        for node in dirty {
            if !self.nodes[node].live {
                continue;
            }
            if let Some(supply) = self.nodes[node].supply {
                if !self.edges(solution, node).contains(&supply) {
                    self.unmatch(node);
                }
            }
        }
        let unmatched = self.unmatched.iter().copied().collect::<Vec<_>>();
        for node in unmatched {
            let _ = self.augment(solution, node);
        }
    }
}

impl Solution {
    /// Adds one ordinary demand monitor per task and one workload demand monitor per resource
    /// with hard unavailable times, all below the root, and matches them.
    pub fn matching_install(&mut self, options: MatchingOptions) {
        if self.matching.is_some() {
            return;
        }
        self.matching = Some(Matching::new(
            options,
            self.instance.resource_count(),
            self.instance.time_count(),
        ));

        let tasks = self.tasks().collect::<Vec<_>>();
        for task in tasks {
            self.task_resize_demand(task);
        }

        if options.workload_demand {
            let instance = std::sync::Arc::clone(&self.instance);
            for (_, constraint) in instance.constraints() {
                let crate::instance::ConstraintKind::AvoidUnavailableTimes { resources, times } =
                    &constraint.kind
                else {
                    continue;
                };
                if !constraint.required {
                    continue;
                }
                for &resource in resources.iter() {
                    let monitor = self.workload_demand_monitor(resource);
                    for &time in times.iter() {
                        if let Some(matching) = self.matching.as_mut() {
                            let owner = DemandOwner::Workload { resource, time };
                            let _ = matching.node_make(owner, monitor);
                        }
                    }
                }
            }
        }
        self.settle();
    }

    fn workload_demand_monitor(&mut self, resource: ResourceId) -> MonitorId {
        if let Some(&monitor) = self
            .matching
            .as_ref()
            .and_then(|matching| matching.workload_monitors.get(&resource))
        {
            return monitor;
        }
        let root = self.root_monitor;
        let monitor = self.monitor_make(MonitorKind::WorkloadDemand { resource }, root);
        if let Some(matching) = self.matching.as_mut() {
            let _ = matching.workload_monitors.insert(resource, monitor);
        }
        monitor
    }

    /// Deletes the demand monitors and the matching.
    pub fn matching_uninstall(&mut self) {
        let Some(matching) = self.matching.take() else {
            return;
        };
        let mut monitors = matching
            .task_monitors
            .values()
            .chain(matching.workload_monitors.values())
            .copied()
            .collect::<Vec<_>>();
        monitors.sort();
        for monitor in monitors {
            self.monitor_delete(monitor);
        }
        for task in self.tasks.iter_mut() {
            task.demand_nodes.clear();
        }
    }

    pub fn has_matching(&self) -> bool {
        self.matching.is_some()
    }

    /// The total number of unmatched demand nodes.
    pub fn matching_unmatched_count(&self) -> usize {
        self.matching
            .as_ref()
            .map_or(0, |matching| matching.unmatched.len())
    }

    pub fn matching_statistics(&self) -> Option<MatchingStatistics> {
        self.matching.as_ref().map(|matching| matching.statistics)
    }

    /// The demand monitors owning the Hall set of the first unmatched demand node of `monitor`:
    /// the demand nodes which compete for the supply that node could use. Contains `monitor`
    /// itself whenever it has an unmatched node.
    pub fn demand_competitors(&self, monitor: MonitorId) -> Vec<MonitorId> {
        let Some(matching) = self.matching.as_ref() else {
            return vec![];
        };
        let Some(&start) = matching
            .unmatched
            .iter()
            .find(|&&node| matching.nodes[node].monitor == monitor)
        else {
            return vec![];
        };
        match matching.search(self, start) {
            SearchOutcome::Augmenting { .. } => vec![monitor],
            SearchOutcome::HallSet(visited) => {
                let mut monitors = vec![];
                for node in visited {
                    let owner = matching.nodes[node].monitor;
                    if !monitors.contains(&owner) {
                        monitors.push(owner);
                    }
                }
                monitors
            }
        }
    }

    /// Gives `task` one demand node per offset of its meet, making its demand monitor first if
    /// needed.
    pub(crate) fn task_resize_demand(&mut self, task: TaskId) {
        let state = &self.tasks[task];
        if self.matching.is_none() || state.deleted || state.cycle_resource.is_some() {
            return;
        }
        let Some(meet) = state.meet else {
            return;
        };
        let duration = self.meets[meet].duration;

        let existing = self
            .matching
            .as_ref()
            .and_then(|matching| matching.task_monitors.get(&task).copied());
        let monitor = match existing {
            Some(monitor) => monitor,
            None => {
                let root = self.root_monitor;
                let monitor = self.monitor_make(MonitorKind::OrdinaryDemand { task }, root);
                if let Some(matching) = self.matching.as_mut() {
                    let _ = matching.task_monitors.insert(task, monitor);
                }
                monitor
            }
        };

        if let Some(matching) = self.matching.as_mut() {
            let nodes = &mut self.tasks[task].demand_nodes;
            while nodes.len() < duration {
                let offset = nodes.len();
                nodes.push(matching.node_make(DemandOwner::Task { task, offset }, monitor));
            }
            while nodes.len() > duration {
                if let Some(node) = nodes.pop() {
                    matching.node_delete(node);
                }
            }
            matching.dirty.extend(nodes.iter().copied());
        }
        self.monitor_attach(monitor);
    }

    /// Removes the demand nodes of `task` and detaches its demand monitor.
    pub(crate) fn task_delete_demand(&mut self, task: TaskId) {
        let Some(matching) = self.matching.as_mut() else {
            return;
        };
        for node in std::mem::take(&mut self.tasks[task].demand_nodes) {
            matching.node_delete(node);
        }
        let monitor = matching.task_monitors.get(&task).copied();
        if let Some(monitor) = monitor {
            self.monitor_detach(monitor);
        }
    }

    pub(crate) fn task_mark_demand_dirty(&mut self, task: TaskId) {
        if let Some(matching) = self.matching.as_mut() {
            matching
                .dirty
                .extend(self.tasks[task].demand_nodes.iter().copied());
        }
    }

    /// Repairs the matching after a mutation and updates the demand monitors whose number of
    /// unmatched nodes changed.
    pub(crate) fn matching_settle(&mut self) {
        let Some(mut matching) = self.matching.take() else {
            return;
        };
        matching.settle(self);
        let mut changed = std::mem::take(&mut matching.changed_monitors);
        self.matching = Some(matching);

        changed.sort_unstable();
        changed.dedup();
        for monitor in changed {
            if self.monitors[monitor].attached {
                self.monitor_recompute(monitor);
            }
        }
    }
}

//! The mutable solution: meets, tasks, nodes, layers, zones and the monitors observing them.
//!
//! Every entity lives in an arena of the [`Solution`] and is referred to by a handle. Entities are
//! tombstoned instead of removed, so that a transaction can bring back exactly the handles it
//! removed. Every mutation notifies the monitors which observe the mutated entity; event and
//! event resource monitors are recomputed lazily when the mutation completes, resource monitors
//! are updated by delta immediately.
mod check;
mod debug;
mod ids;
mod layer;
mod meet;
mod node;
mod representation;
mod task;
mod timetable;
mod trace;
mod transaction;
mod zone;

use std::sync::Arc;

pub use check::CostDiscrepancy;
pub use debug::CostSummary;
pub use ids::*;
pub(crate) use layer::Layer;
pub(crate) use meet::Meet;
pub(crate) use node::Node;
use rand::rngs::SmallRng;
use rand::SeedableRng;
pub(crate) use task::Task;
pub(crate) use timetable::ResourceTimetable;
pub(crate) use trace::TraceState;
pub use trace::TraceEntry;
pub use trace::TraceId;
pub use trace::TraceReport;
pub(crate) use transaction::Operation;
pub use transaction::Transaction;
pub use transaction::TransactionMark;
pub(crate) use zone::Zone;

use crate::basic_types::Random;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::instance::EventId;
use crate::instance::EventResourceId;
use crate::instance::Instance;
use crate::instance::ResourceId;
use crate::instance::TimeId;
use crate::monitors::Evenness;
use crate::monitors::Matching;
use crate::monitors::Monitor;

/// The sub-tag of the root group monitor of every solution.
pub const ROOT_GROUP_SUB_TAG: usize = 0;

/// A solution of an [`Instance`].
///
/// Cloning a solution is a deep copy; the instance itself is shared.
#[derive(Clone, Debug)]
pub struct Solution {
    pub(crate) instance: Arc<Instance>,
    pub(crate) meets: KeyedVec<MeetId, Meet>,
    pub(crate) tasks: KeyedVec<TaskId, Task>,
    pub(crate) nodes: KeyedVec<NodeId, Node>,
    pub(crate) layers: KeyedVec<LayerId, Layer>,
    pub(crate) zones: KeyedVec<ZoneId, Zone>,
    pub(crate) monitors: KeyedVec<MonitorId, Monitor>,
    /// The cycle meets ordered by start time.
    pub(crate) cycle_meets: Vec<MeetId>,
    pub(crate) cycle_tasks: KeyedVec<ResourceId, TaskId>,
    pub(crate) cycle_node: Option<NodeId>,
    pub(crate) event_meets: KeyedVec<EventId, Vec<MeetId>>,
    pub(crate) event_resource_tasks: KeyedVec<EventResourceId, Vec<TaskId>>,
    pub(crate) timetables: KeyedVec<ResourceId, ResourceTimetable>,
    pub(crate) event_watchers: KeyedVec<EventId, Vec<MonitorId>>,
    pub(crate) event_resource_watchers: KeyedVec<EventResourceId, Vec<MonitorId>>,
    pub(crate) resource_watchers: KeyedVec<ResourceId, Vec<MonitorId>>,
    pub(crate) dirty_monitors: Vec<MonitorId>,
    pub(crate) matching: Option<Matching>,
    pub(crate) evenness: Option<Evenness>,
    pub(crate) trail: Trail<Operation>,
    /// Set while a rollback replays inverse operations, which must not be recorded again.
    pub(crate) undoing: bool,
    pub(crate) traces: Vec<Option<TraceState>>,
    pub(crate) active_traces: usize,
    pub(crate) root_monitor: MonitorId,
    pub(crate) visit_num: u32,
    pub(crate) diversifier: u64,
    pub(crate) rng: SmallRng,
}

impl Solution {
    /// Creates the empty solution of `instance`: one cycle meet covering every time, one cycle
    /// task per resource and one attached monitor per constraint point of application.
    pub fn new(instance: Arc<Instance>) -> Solution {
        let time_count = instance.time_count();

        let mut meets = KeyedVec::default();
        let cycle_meet = meets.push(Meet::cycle(&instance, TimeId(0), time_count));

        let mut tasks = KeyedVec::default();
        let mut cycle_tasks = KeyedVec::default();
        let mut timetables = KeyedVec::default();
        for resource in instance.resources() {
            let cycle_task = tasks.push(Task::cycle(&instance, resource));
            let _ = cycle_tasks.push(cycle_task);
            let _ = timetables.push(ResourceTimetable::new(time_count));
        }

        let mut monitors = KeyedVec::default();
        let root_monitor = monitors.push(Monitor::group(ROOT_GROUP_SUB_TAG, "root", None));

        let mut event_meets = KeyedVec::default();
        event_meets.resize(instance.event_count(), vec![]);
        let mut event_resource_tasks = KeyedVec::default();
        event_resource_tasks.resize(instance.event_resource_count(), vec![]);
        let mut event_watchers = KeyedVec::default();
        event_watchers.resize(instance.event_count(), vec![]);
        let mut event_resource_watchers = KeyedVec::default();
        event_resource_watchers.resize(instance.event_resource_count(), vec![]);
        let mut resource_watchers = KeyedVec::default();
        resource_watchers.resize(instance.resource_count(), vec![]);

        let mut solution = Solution {
            instance,
            meets,
            tasks,
            nodes: KeyedVec::default(),
            layers: KeyedVec::default(),
            zones: KeyedVec::default(),
            monitors,
            cycle_meets: vec![cycle_meet],
            cycle_tasks,
            cycle_node: None,
            event_meets,
            event_resource_tasks,
            timetables,
            event_watchers,
            event_resource_watchers,
            resource_watchers,
            dirty_monitors: vec![],
            matching: None,
            evenness: None,
            trail: Trail::default(),
            undoing: false,
            traces: vec![],
            active_traces: 0,
            root_monitor,
            visit_num: 0,
            diversifier: 0,
            rng: SmallRng::seed_from_u64(0),
        };
        solution.monitors_make_from_constraints();
        solution
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn instance_arc(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// The total cost of the solution: the cost of the root group monitor.
    pub fn cost(&self) -> crate::basic_types::Cost {
        self.monitors[self.root_monitor].cost
    }

    pub fn root_monitor(&self) -> MonitorId {
        self.root_monitor
    }

    pub fn diversifier(&self) -> u64 {
        self.diversifier
    }

    /// Sets the diversifier and reseeds the random generator from it.
    pub fn set_diversifier(&mut self, diversifier: u64) {
        self.diversifier = diversifier;
        self.rng = SmallRng::seed_from_u64(diversifier);
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Rotates `elements` by an amount drawn from the random generator, so that solutions with
    /// different diversifiers try alternatives in different orders. Diversifier 0 keeps the
    /// order as it is.
    pub fn diversify<T>(&mut self, elements: &mut [T]) {
        if self.diversifier != 0 {
            self.rng.rotate(elements);
        }
    }

    /// Starts a new visit epoch; every entity visited before is now unvisited.
    pub fn visit_epoch_advance(&mut self) {
        self.visit_num += 1;
    }

    pub fn visit_num(&self) -> u32 {
        self.visit_num
    }

    /// Queues every attached monitor observing `event` for recomputation.
    pub(crate) fn notify_event(&mut self, event: EventId) {
        for index in 0..self.event_watchers[event].len() {
            let monitor = self.event_watchers[event][index];
            self.mark_monitor_dirty(monitor);
        }
    }

    /// Queues every attached monitor observing `event_resource` for recomputation.
    pub(crate) fn notify_event_resource(&mut self, event_resource: EventResourceId) {
        for index in 0..self.event_resource_watchers[event_resource].len() {
            let monitor = self.event_resource_watchers[event_resource][index];
            self.mark_monitor_dirty(monitor);
        }
    }

    pub(crate) fn mark_monitor_dirty(&mut self, monitor: MonitorId) {
        let state = &mut self.monitors[monitor];
        if state.attached && !state.dirty {
            state.dirty = true;
            self.dirty_monitors.push(monitor);
        }
    }

    /// Brings every lazily maintained monitor up to date; called when a public mutation
    /// completes.
    pub(crate) fn settle(&mut self) {
        while let Some(monitor) = self.dirty_monitors.pop() {
            self.monitors[monitor].dirty = false;
            if self.monitors[monitor].attached {
                self.monitor_recompute(monitor);
            }
        }
        self.matching_settle();
    }
}

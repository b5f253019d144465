use super::*;
use crate::containers::StorageKey;

/// The tasks occupying one resource at each time, and its total workload in thousandths.
#[derive(Clone, Debug)]
pub(crate) struct ResourceTimetable {
    pub(crate) cells: Vec<Vec<TaskId>>,
    pub(crate) workload: i64,
}

impl ResourceTimetable {
    pub(crate) fn new(time_count: usize) -> Self {
        ResourceTimetable {
            cells: vec![vec![]; time_count],
            workload: 0,
        }
    }

    pub(crate) fn occupancy(&self, time: TimeId) -> usize {
        self.cells[time.index()].len()
    }

    pub(crate) fn is_busy(&self, time: TimeId) -> bool {
        !self.cells[time.index()].is_empty()
    }
}

impl Solution {
    /// The tasks occupying `resource` at `time`.
    pub fn resource_tasks_at(&self, resource: ResourceId, time: TimeId) -> &[TaskId] {
        &self.timetables[resource].cells[time.index()]
    }

    pub fn resource_busy_at(&self, resource: ResourceId, time: TimeId) -> bool {
        self.timetables[resource].is_busy(time)
    }

    /// The workload of `resource`, in thousandths.
    pub fn resource_workload(&self, resource: ResourceId) -> i64 {
        self.timetables[resource].workload
    }

    /// Whether `resource` is free at every time in `times`, ignoring the tasks in `ignore`.
    pub fn resource_free_at(
        &self,
        resource: ResourceId,
        times: &[TimeId],
        ignore: &[TaskId],
    ) -> bool {
        times.iter().all(|&time| {
            self.timetables[resource].cells[time.index()]
                .iter()
                .all(|task| ignore.contains(task))
        })
    }

    /// Withdraws the contribution of `task` from the timetables, the evenness counts and the
    /// matching. Must be paired with [`Solution::task_placement_add`] once the task has changed.
    pub(crate) fn task_placement_remove(&mut self, task: TaskId) {
        let Some(meet) = self.tasks[task].meet else {
            return;
        };
        let start = self.meets[meet].start_time;
        let duration = self.meets[meet].duration;

        if let (Some(resource), Some(start)) = (self.tasks[task].resource, start) {
            for offset in 0..duration {
                let time = start.offset(offset);
                let cell = &mut self.timetables[resource].cells[time.index()];
                let old = cell.len();
                if let Some(position) = cell.iter().position(|&other| other == task) {
                    let _ = cell.swap_remove(position);
                }
                let new = cell.len();
                self.resource_occupancy_changed(resource, time, old, new);
            }
            let workload = self.task_workload(task);
            let old = self.timetables[resource].workload;
            self.timetables[resource].workload -= workload;
            self.resource_workload_changed(resource, old, old - workload);
        }

        if let Some(partition) = self.tasks[task].partition.take() {
            if let Some(start) = start {
                self.evenness_demand_changed(partition, start, duration, false);
            }
        }

        self.task_mark_demand_dirty(task);
    }

    pub(crate) fn task_placement_add(&mut self, task: TaskId) {
        let Some(meet) = self.tasks[task].meet else {
            return;
        };
        if self.tasks[task].deleted {
            return;
        }
        let start = self.meets[meet].start_time;
        let duration = self.meets[meet].duration;

        if let (Some(resource), Some(start)) = (self.tasks[task].resource, start) {
            for offset in 0..duration {
                let time = start.offset(offset);
                let cell = &mut self.timetables[resource].cells[time.index()];
                let old = cell.len();
                cell.push(task);
                self.resource_occupancy_changed(resource, time, old, old + 1);
            }
            let workload = self.task_workload(task);
            let old = self.timetables[resource].workload;
            self.timetables[resource].workload += workload;
            self.resource_workload_changed(resource, old, old + workload);
        }

        if self.evenness.is_some() {
            if let Some(start) = start {
                let partition = self
                    .instance
                    .partition_containing(self.tasks[task].resource_type, &self.tasks[task].domain);
                self.tasks[task].partition = partition;
                if let Some(partition) = partition {
                    self.evenness_demand_changed(partition, start, duration, true);
                }
            }
        }

        self.task_mark_demand_dirty(task);
    }
}

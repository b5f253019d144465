use super::*;
use crate::containers::StorageKey;
use crate::instance::Constraint;
use crate::instance::TimeGroupId;

/// The deviation of `value` from the interval `[minimum, maximum]`.
fn interval_deviation(value: i64, minimum: i64, maximum: i64) -> i64 {
    if value < minimum {
        minimum - value
    } else if value > maximum {
        value - maximum
    } else {
        0
    }
}

impl Solution {
    /// Recomputes `monitor` from scratch and passes any change of cost on.
    pub(crate) fn monitor_recompute(&mut self, monitor: MonitorId) {
        let (deviations, cost) = self.monitor_evaluate(monitor);
        self.monitors[monitor].deviations = deviations;
        self.monitor_set_cost(monitor, cost);
    }

    /// The deviations and cost `monitor` should have given the current solution, computed
    /// without looking at its cached state. Groups add up the cached costs of their attached
    /// children.
    pub(crate) fn monitor_evaluate(&self, monitor: MonitorId) -> (Deviations, Cost) {
        let kind = &self.monitors[monitor].kind;
        match *kind {
            MonitorKind::OrdinaryDemand { .. } | MonitorKind::WorkloadDemand { .. } => {
                let unmatched = self
                    .matching
                    .as_ref()
                    .map_or(0, |matching| matching.unmatched_count(monitor));
                let deviations = Deviations::from_values([unmatched as i64]);
                (deviations, self.monitor_combined_weight(monitor) * unmatched as i64)
            }
            MonitorKind::Evenness { partition, time } => {
                let excess = self.evenness_excess(partition, time);
                let deviations = Deviations::from_values([excess]);
                (deviations, self.monitor_combined_weight(monitor) * excess)
            }
            MonitorKind::Group { .. } => {
                let cost = self.monitors[monitor]
                    .children
                    .iter()
                    .filter(|&&child| self.monitors[child].attached)
                    .map(|&child| self.monitors[child].cost)
                    .sum();
                (Deviations::default(), cost)
            }
            _ => {
                let Some(constraint) = kind.constraint() else {
                    return (Deviations::default(), Cost::ZERO);
                };
                let constraint = self.instance.constraint(constraint);
                let deviations =
                    Deviations::from_values(self.constraint_deviations(kind, constraint));
                (deviations, constraint.cost(&deviations))
            }
        }
    }

    /// The individual deviations of a constraint monitor.
    fn constraint_deviations(&self, kind: &MonitorKind, constraint: &Constraint) -> Vec<i64> {
        match (kind, &constraint.kind) {
            (MonitorKind::AssignTime { event, .. }, _) => vec![self.event_meets[*event]
                .iter()
                .filter(|&&meet| self.meets[meet].start_time.is_none())
                .map(|&meet| self.meets[meet].duration as i64)
                .sum()],

            (
                MonitorKind::SplitEvents { event, .. },
                ConstraintKind::SplitEvents {
                    min_duration,
                    max_duration,
                    min_amount,
                    max_amount,
                    ..
                },
            ) => {
                // Each meet outside the duration range counts once, however far outside.
                let meets = &self.event_meets[*event];
                let mut values = meets
                    .iter()
                    .map(|&meet| {
                        let duration = self.meets[meet].duration;
                        i64::from(duration < *min_duration || duration > *max_duration)
                    })
                    .collect::<Vec<_>>();
                values.push(interval_deviation(
                    meets.len() as i64,
                    *min_amount as i64,
                    *max_amount as i64,
                ));
                values
            }

            (
                MonitorKind::DistributeSplitEvents { event, .. },
                ConstraintKind::DistributeSplitEvents {
                    duration,
                    minimum,
                    maximum,
                    ..
                },
            ) => {
                let count = self.event_meets[*event]
                    .iter()
                    .filter(|&&meet| self.meets[meet].duration == *duration)
                    .count();
                vec![interval_deviation(count as i64, *minimum as i64, *maximum as i64)]
            }

            (
                MonitorKind::PreferTimes { event, .. },
                ConstraintKind::PreferTimes {
                    times, duration, ..
                },
            ) => self.event_meets[*event]
                .iter()
                .filter(|&&meet| {
                    duration.map_or(true, |duration| self.meets[meet].duration == duration)
                })
                .filter_map(|&meet| {
                    let start = self.meets[meet].start_time?;
                    (!times.contains(&start)).then_some(self.meets[meet].duration as i64)
                })
                .collect(),

            (
                MonitorKind::SpreadEvents { event_group, .. },
                ConstraintKind::SpreadEvents { limits, .. },
            ) => {
                let starts = self
                    .instance
                    .event_group(*event_group)
                    .events
                    .iter()
                    .flat_map(|&event| self.event_meets[event].iter())
                    .filter_map(|&meet| self.meets[meet].start_time)
                    .collect::<Vec<_>>();
                limits
                    .iter()
                    .map(|limit| {
                        let times = &self.instance.time_group(limit.time_group).times;
                        let count = starts.iter().filter(|&&start| times.contains(start)).count();
                        interval_deviation(count as i64, limit.minimum as i64, limit.maximum as i64)
                    })
                    .collect()
            }

            (MonitorKind::LinkEvents { event_group, .. }, _) => {
                let busy = self
                    .instance
                    .event_group(*event_group)
                    .events
                    .iter()
                    .map(|&event| self.event_busy_times(event))
                    .collect::<Vec<_>>();
                let mut union = self.instance.empty_time_set();
                for times in busy.iter() {
                    union.union_with(times);
                }
                union
                    .iter()
                    .map(|time| i64::from(!busy.iter().all(|times| times.contains(time))))
                    .collect()
            }

            (
                MonitorKind::OrderEvents { point, .. },
                ConstraintKind::OrderEvents {
                    pairs,
                    min_separation,
                    max_separation,
                },
            ) => {
                let (first, second) = pairs[*point];
                let first_end = self.event_meets[first]
                    .iter()
                    .filter_map(|&meet| {
                        let start = self.meets[meet].start_time?;
                        Some((start.index() + self.meets[meet].duration) as i64)
                    })
                    .max();
                let second_start = self.event_meets[second]
                    .iter()
                    .filter_map(|&meet| self.meets[meet].start_time)
                    .map(|start| start.index() as i64)
                    .min();
                match (first_end, second_start) {
                    (Some(end), Some(start)) => vec![interval_deviation(
                        start - end,
                        *min_separation as i64,
                        *max_separation as i64,
                    )],
                    _ => vec![],
                }
            }

            (MonitorKind::AssignResource { event_resource, .. }, _) => self.event_resource_tasks
                [*event_resource]
                .iter()
                .filter(|&&task| self.tasks[task].resource.is_none())
                .map(|&task| self.task_duration(task) as i64)
                .collect(),

            (
                MonitorKind::PreferResources { event_resource, .. },
                ConstraintKind::PreferResources { resources, .. },
            ) => self.event_resource_tasks[*event_resource]
                .iter()
                .filter(|&&task| {
                    self.tasks[task]
                        .resource
                        .is_some_and(|resource| !resources.contains(&resource))
                })
                .map(|&task| self.task_duration(task) as i64)
                .collect(),

            (
                MonitorKind::AvoidSplitAssignments { point, .. },
                ConstraintKind::AvoidSplitAssignments {
                    event_resource_groups,
                },
            ) => {
                let mut resources = event_resource_groups[*point]
                    .iter()
                    .flat_map(|&event_resource| self.event_resource_tasks[event_resource].iter())
                    .filter_map(|&task| self.tasks[task].resource)
                    .collect::<Vec<_>>();
                resources.sort();
                resources.dedup();
                vec![resources.len().saturating_sub(1) as i64]
            }

            (MonitorKind::AvoidClashes { resource, .. }, _) => self.timetables[*resource]
                .cells
                .iter()
                .map(|cell| cell.len().saturating_sub(1) as i64)
                .collect(),

            (
                MonitorKind::AvoidUnavailableTimes { resource, .. },
                ConstraintKind::AvoidUnavailableTimes { times, .. },
            ) => times
                .iter()
                .map(|&time| i64::from(self.timetables[*resource].is_busy(time)))
                .collect(),

            (
                MonitorKind::LimitIdleTimes { resource, .. },
                ConstraintKind::LimitIdleTimes {
                    time_groups,
                    minimum,
                    maximum,
                    ..
                },
            ) => {
                let idle = time_groups
                    .iter()
                    .map(|&time_group| self.resource_idle_times(*resource, time_group))
                    .sum::<usize>();
                vec![interval_deviation(idle as i64, *minimum as i64, *maximum as i64)]
            }

            (
                MonitorKind::ClusterBusyTimes { resource, .. },
                ConstraintKind::ClusterBusyTimes {
                    time_groups,
                    minimum,
                    maximum,
                    ..
                },
            ) => {
                let busy_groups = time_groups
                    .iter()
                    .filter(|&&time_group| self.resource_busy_times(*resource, time_group) > 0)
                    .count();
                vec![interval_deviation(busy_groups as i64, *minimum as i64, *maximum as i64)]
            }

            (
                MonitorKind::LimitBusyTimes { resource, .. },
                ConstraintKind::LimitBusyTimes {
                    time_groups,
                    minimum,
                    maximum,
                    ..
                },
            ) => time_groups
                .iter()
                .map(|&time_group| self.resource_busy_times(*resource, time_group))
                .filter(|&busy| busy > 0)
                .map(|busy| interval_deviation(busy as i64, *minimum as i64, *maximum as i64))
                .collect(),

            (
                MonitorKind::LimitWorkload { resource, .. },
                ConstraintKind::LimitWorkload {
                    minimum, maximum, ..
                },
            ) => {
                let workload = (self.timetables[*resource].workload + 999).div_euclid(1000);
                vec![interval_deviation(workload, *minimum, *maximum)]
            }

            _ => vec![],
        }
    }

    /// The times at which some meet of `event` is running.
    pub(crate) fn event_busy_times(&self, event: EventId) -> crate::instance::TimeSet {
        let mut times = self.instance.empty_time_set();
        for &meet in self.event_meets[event].iter() {
            if let Some(start) = self.meets[meet].start_time {
                for offset in 0..self.meets[meet].duration {
                    times.insert(start.offset(offset));
                }
            }
        }
        times
    }

    /// The number of times of `time_group` at which `resource` is busy.
    pub fn resource_busy_times(&self, resource: ResourceId, time_group: TimeGroupId) -> usize {
        self.instance
            .time_group(time_group)
            .times
            .iter()
            .filter(|&time| self.timetables[resource].is_busy(time))
            .count()
    }

    /// The number of times of `time_group` at which `resource` is free although it is busy
    /// both earlier and later in the group.
    pub fn resource_idle_times(&self, resource: ResourceId, time_group: TimeGroupId) -> usize {
        let times = self.instance.time_group(time_group).times.iter().collect::<Vec<_>>();
        let busy = |time: &TimeId| self.timetables[resource].is_busy(*time);
        let (Some(first), Some(last)) = (times.iter().position(busy), times.iter().rposition(busy))
        else {
            return 0;
        };
        times[first..=last].iter().filter(|time| !busy(time)).count()
    }

    /// Updates the monitors of `resource` after the number of tasks it runs at `time` went from
    /// `old` to `new`.
    pub(crate) fn resource_occupancy_changed(
        &mut self,
        resource: ResourceId,
        time: TimeId,
        old: usize,
        new: usize,
    ) {
        let busy_changed = (old == 0) != (new == 0);
        for index in 0..self.resource_watchers[resource].len() {
            let monitor = self.resource_watchers[resource][index];
            match self.monitors[monitor].kind {
                MonitorKind::AvoidClashes { constraint, .. } => {
                    let state = &mut self.monitors[monitor];
                    state
                        .deviations
                        .replace(old.saturating_sub(1) as i64, new.saturating_sub(1) as i64);
                    let cost = self.instance.constraint(constraint).cost(&state.deviations);
                    self.monitor_set_cost(monitor, cost);
                }
                MonitorKind::AvoidUnavailableTimes { constraint, .. } if busy_changed => {
                    let definition = self.instance.constraint(constraint);
                    if let ConstraintKind::AvoidUnavailableTimes { times, .. } = &definition.kind {
                        if times.contains(&time) {
                            let state = &mut self.monitors[monitor];
                            state.deviations.replace(i64::from(old > 0), i64::from(new > 0));
                            let cost = definition.cost(&state.deviations);
                            self.monitor_set_cost(monitor, cost);
                        }
                    }
                }
                MonitorKind::LimitIdleTimes { constraint, .. }
                | MonitorKind::ClusterBusyTimes { constraint, .. }
                | MonitorKind::LimitBusyTimes { constraint, .. }
                    if busy_changed =>
                {
                    let affected = match &self.instance.constraint(constraint).kind {
                        ConstraintKind::LimitIdleTimes { time_groups, .. }
                        | ConstraintKind::ClusterBusyTimes { time_groups, .. }
                        | ConstraintKind::LimitBusyTimes { time_groups, .. } => {
                            time_groups.iter().any(|&time_group| {
                                self.instance.time_group(time_group).times.contains(time)
                            })
                        }
                        _ => false,
                    };
                    if affected {
                        self.mark_monitor_dirty(monitor);
                    }
                }
                _ => {}
            }
        }
    }

    /// Updates the workload monitors of `resource` after its workload changed.
    pub(crate) fn resource_workload_changed(&mut self, resource: ResourceId, old: i64, new: i64) {
        if old == new {
            return;
        }
        for index in 0..self.resource_watchers[resource].len() {
            let monitor = self.resource_watchers[resource][index];
            if self.monitors[monitor].kind.tag() == MonitorTag::LimitWorkload {
                self.monitor_recompute(monitor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::interval_deviation;

    #[test]
    fn deviation_is_the_distance_to_the_interval() {
        assert_eq!(interval_deviation(1, 2, 4), 1);
        assert_eq!(interval_deviation(3, 2, 4), 0);
        assert_eq!(interval_deviation(7, 2, 4), 3);
    }
}

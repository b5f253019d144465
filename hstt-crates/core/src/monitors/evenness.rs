use super::*;
use crate::containers::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvennessOptions {
    /// The cost of one task too many in a partition at one time.
    pub weight: Cost,
}

impl Default for EvennessOptions {
    fn default() -> Self {
        EvennessOptions {
            weight: Cost::soft(1),
        }
    }
}

/// The number of running tasks whose domain lies in each resource partition at each time.
///
/// When a partition runs more tasks at once than it has resources, some of them cannot be
/// assigned; spreading such tasks evenly over the times keeps resource assignment open.
#[derive(Clone, Debug)]
pub(crate) struct Evenness {
    options: EvennessOptions,
    counts: HashMap<(ResourceGroupId, TimeId), usize>,
    monitors: HashMap<(ResourceGroupId, TimeId), MonitorId>,
}

impl Evenness {
    pub(crate) fn weight(&self) -> Cost {
        self.options.weight
    }
}

impl Solution {
    /// Adds one evenness monitor per partition and time below the root.
    pub fn evenness_install(&mut self, options: EvennessOptions) {
        if self.evenness.is_some() {
            return;
        }
        self.evenness = Some(Evenness {
            options,
            counts: HashMap::default(),
            monitors: HashMap::default(),
        });

        let tasks = self.tasks().collect::<Vec<_>>();
        for task in tasks {
            self.task_placement_remove(task);
            self.task_placement_add(task);
        }

        let instance = std::sync::Arc::clone(&self.instance);
        let root = self.root_monitor;
        for resource_type in instance.resource_types() {
            for &partition in instance.resource_type(resource_type).partitions.iter() {
                for time in instance.times() {
                    let kind = MonitorKind::Evenness { partition, time };
                    let monitor = self.monitor_make(kind, root);
                    if let Some(evenness) = self.evenness.as_mut() {
                        let _ = evenness.monitors.insert((partition, time), monitor);
                    }
                }
            }
        }
        self.settle();
    }

    pub fn evenness_uninstall(&mut self) {
        let Some(evenness) = self.evenness.take() else {
            return;
        };
        let mut monitors = evenness.monitors.values().copied().collect::<Vec<_>>();
        monitors.sort();
        for monitor in monitors {
            self.monitor_delete(monitor);
        }
        for task in self.tasks.iter_mut() {
            task.partition = None;
        }
    }

    /// How many more tasks of `partition` run at `time` than it has resources.
    pub(crate) fn evenness_excess(&self, partition: ResourceGroupId, time: TimeId) -> i64 {
        let Some(evenness) = self.evenness.as_ref() else {
            return 0;
        };
        let count = evenness.counts.get(&(partition, time)).copied().unwrap_or(0);
        let limit = self.instance.resource_group(partition).resources.len();
        count.saturating_sub(limit) as i64
    }

    pub(crate) fn evenness_demand_changed(
        &mut self,
        partition: ResourceGroupId,
        start: TimeId,
        duration: usize,
        add: bool,
    ) {
        for offset in 0..duration {
            let time = start.offset(offset);
            let Some(evenness) = self.evenness.as_mut() else {
                return;
            };
            let count = evenness.counts.entry((partition, time)).or_insert(0);
            if add {
                *count += 1;
            } else {
                *count -= 1;
            }
            let monitor = evenness.monitors.get(&(partition, time)).copied();
            if let Some(monitor) = monitor {
                self.monitor_recompute(monitor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::EvennessOptions;
    use crate::basic_types::Cost;
    use crate::instance::ConstraintKind;
    use crate::instance::Constraint;
    use crate::instance::InstanceBuilder;
    use crate::instance::TimeGroupKind;
    use crate::solution::Solution;

    #[test]
    fn too_many_tasks_of_one_partition_cost_evenness() {
        let mut builder = InstanceBuilder::new("evenness");
        let time = builder.add_time("t0");
        let _ = builder.add_time_group("all", TimeGroupKind::Ordinary, vec![time]);
        let room_type = builder.add_resource_type("Room");
        let room = builder.add_resource("r0", room_type);
        let _ = builder.add_resource_group("rooms", room_type, vec![room], true);
        let mut events = vec![];
        for name in ["a", "b"] {
            let event = builder.add_event(name, 1, None);
            let _ = builder.add_event_resource(event, room_type, None, None);
            events.push(event);
        }
        let _ = builder.add_constraint(Constraint::new(
            "assign times",
            true,
            1,
            ConstraintKind::AssignTime { events },
        ));
        let mut solution = Solution::new(Arc::new(builder.build().unwrap()));
        solution.make_complete_representation();
        let cycle = solution.cycle_meets()[0];
        let meets = solution
            .meets()
            .filter(|&meet| !solution.meet_is_cycle(meet))
            .collect::<Vec<_>>();
        for &meet in meets.iter() {
            assert!(solution.meet_assign(meet, cycle, 0));
        }
        let cost = solution.cost();

        solution.evenness_install(EvennessOptions::default());
        assert_eq!(solution.cost(), cost + Cost::soft(1));

        assert!(solution.meet_unassign(meets[1]));
        assert_eq!(solution.cost(), Cost::hard(1));

        solution.evenness_uninstall();
        assert_eq!(solution.cost(), Cost::hard(1));
    }
}

use super::*;
use crate::basic_types::Cost;
use crate::hstt_assert_advanced;

/// An attached monitor whose cached cost differs from the cost recomputed from scratch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CostDiscrepancy {
    pub monitor: MonitorId,
    pub cached: Cost,
    pub recomputed: Cost,
}

impl Solution {
    /// Recomputes every attached monitor from scratch and reports those whose cached cost is
    /// wrong. Groups are checked against the cached costs of their children. Demand monitors
    /// are checked against the current matching, which is maximum but not unique.
    pub fn check_costs(&self) -> Vec<CostDiscrepancy> {
        self.monitors()
            .filter(|&monitor| self.monitors[monitor].attached)
            .filter_map(|monitor| {
                let cached = self.monitors[monitor].cost;
                let (_, recomputed) = self.monitor_evaluate(monitor);
                (cached != recomputed).then_some(CostDiscrepancy {
                    monitor,
                    cached,
                    recomputed,
                })
            })
            .collect()
    }

    /// Panics when [`Solution::check_costs`] finds a discrepancy; only at the advanced
    /// assertion level, since it rescans the whole solution.
    pub fn debug_check_costs(&self) {
        hstt_assert_advanced!(
            self.check_costs().is_empty(),
            "cached costs differ from recomputed costs"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::test_instances;

    #[test]
    fn costs_stay_consistent_under_mutation() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(0))[0];
        assert!(solution.check_costs().is_empty());

        let other = solution.meet_split(meet, 1).unwrap();
        assert!(solution.meet_assign(other, cycle, 2));
        let task = solution.meet_tasks(other)[0];
        assert!(solution.task_assign_resource(task, crate::instance::ResourceId(1)));

        assert!(solution.check_costs().is_empty());
        solution.debug_check_costs();
    }
}

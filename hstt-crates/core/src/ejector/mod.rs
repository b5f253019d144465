//! Ejection chains: the local search at the heart of every repair phase.
//!
//! An [`Ejector`] takes the defects of a group monitor one at a time and tries to remove each by
//! a chain of repairs. A repair which lowers the cost of the group ends the chain; a repair which
//! does not, but which leaves new defects behind, is followed by repairs of those defects, until
//! the depth of the current [`EjectorSchedule`] runs out. Repairs themselves are supplied per
//! monitor tag, and per group sub-tag, by [`Augment`]s.
mod augment;
mod context;
mod options;
mod schedule;

pub use augment::Augment;
pub use augment::AugmentRegistry;
pub use context::EjectorContext;
pub use options::EjectorOptions;
pub use options::SolveType;
pub use schedule::EjectorSchedule;
pub use schedule::EjectorSchedules;
pub use schedule::ScheduleParseError;

use crate::basic_types::Cost;
use crate::create_statistics_struct;
use crate::monitors::MonitorTag;
use crate::solution::MonitorId;
use crate::solution::NodeId;
use crate::solution::Solution;
use crate::statistics::CumulativeMovingAverage;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

/// The sub-tag of the group monitors gathering the defects a time repair phase targets.
pub const TIME_REPAIR_GROUP_SUB_TAG: usize = 1;
/// The sub-tag of the group monitors gathering the defects a resource repair phase targets.
pub const RESOURCE_REPAIR_GROUP_SUB_TAG: usize = 2;

create_statistics_struct!(
    /// Counters of the chains an ejector ran.
    EjectorStatistics {
        num_chains: u64,
        num_successful_chains: u64,
        num_repairs: u64,
        /// The mean number of repairs of the chains which lowered the cost.
        average_chain_length: CumulativeMovingAverage<u64>,
    }
);

#[derive(Debug, Default)]
pub struct Ejector {
    options: EjectorOptions,
    augments: AugmentRegistry,
    cost_limits: Vec<(MonitorId, Cost)>,
    statistics: EjectorStatistics,
}

impl Ejector {
    pub fn new(options: EjectorOptions) -> Ejector {
        Ejector {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &EjectorOptions {
        &self.options
    }

    /// Registers the repairs of defects tagged `tag`, replacing any earlier ones.
    pub fn set_augment(&mut self, tag: MonitorTag, augment: impl Augment + 'static) {
        self.augments.set(tag, Box::new(augment));
    }

    /// Registers the repairs of defective group monitors with sub-tag `sub_tag`.
    pub fn set_group_augment(&mut self, sub_tag: usize, augment: impl Augment + 'static) {
        self.augments.set_group(sub_tag, Box::new(augment));
    }

    /// Forbids any repair after which the cost of `monitor` exceeds `limit`.
    pub fn add_monitor_cost_limit(&mut self, monitor: MonitorId, limit: Cost) {
        self.cost_limits.push((monitor, limit));
    }

    pub fn clear_monitor_cost_limits(&mut self) {
        self.cost_limits.clear();
    }

    pub fn statistics(&self) -> &EjectorStatistics {
        &self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }

    /// Repairs the defects of `group`, running each schedule until a pass over the defects finds
    /// no successful chain. When `scope` is given only meets below that node are moved.
    ///
    /// Returns whether the cost of `group` went down. It never goes up.
    pub fn solve(
        &mut self,
        solution: &mut Solution,
        group: MonitorId,
        scope: Option<NodeId>,
    ) -> bool {
        let initial_cost = solution.monitor_cost(group);
        let mut statistics = std::mem::take(&mut self.statistics);

        for index in 0..self.options.schedules.0.len() {
            let schedule = self.options.schedules.0[index];
            log::trace!("ejector schedule {schedule} on {initial_cost}");
            loop {
                let mut improved = false;
                let mut defects = solution.monitor_defect_copy(group);
                solution.diversify(&mut defects);
                for defect in defects {
                    if !solution.monitor_cost(defect).is_positive() {
                        continue;
                    }
                    let context = EjectorContext::new(
                        solution,
                        self,
                        &mut statistics,
                        schedule,
                        group,
                        scope,
                    );
                    improved |= context.chain(defect);
                }
                if !improved || solution.monitor_cost(group).is_zero() {
                    break;
                }
            }
        }

        self.statistics = statistics;
        let final_cost = solution.monitor_cost(group);
        log::debug!("ejector: {initial_cost} -> {final_cost}");
        final_cost < initial_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitors::MonitorKind;
    use crate::test_instances::two_teacher_solution;

    /// Moves the meets of a defective assign time monitor to the first start in the cycle.
    #[derive(Debug)]
    struct AssignAtFirstStart;

    impl Augment for AssignAtFirstStart {
        fn augment(&self, context: &mut EjectorContext<'_>, defect: MonitorId) -> bool {
            let MonitorKind::AssignTime { event, .. } = *context.solution().monitor_kind(defect)
            else {
                return false;
            };
            let cycle_meet = context.solution().cycle_meets()[0];
            let meets = context.solution().event_meets(event).to_vec();
            for meet in meets {
                if context.solution().meet_assignment(meet).is_some() || !context.visit_meet(meet)
                {
                    continue;
                }
                if context.try_repair(|solution| solution.meet_assign(meet, cycle_meet, 0)) {
                    return true;
                }
            }
            false
        }
    }

    #[test]
    fn assign_time_defects_are_repaired() {
        let mut solution = two_teacher_solution();
        let root = solution.root_monitor();
        assert_eq!(solution.cost(), Cost::hard(7));

        let mut ejector = Ejector::new(EjectorOptions::default());
        ejector.set_augment(MonitorTag::AssignTime, AssignAtFirstStart);

        assert!(ejector.solve(&mut solution, root, None));
        assert_eq!(solution.cost(), Cost::hard(1));
        assert_eq!(ejector.statistics().num_successful_chains, 3);
        assert!(solution.check_costs().is_empty());
    }

    #[test]
    fn defects_without_augment_are_left_alone() {
        let mut solution = two_teacher_solution();
        let root = solution.root_monitor();

        let mut ejector = Ejector::new(EjectorOptions::default());
        assert!(!ejector.solve(&mut solution, root, None));
        assert_eq!(solution.cost(), Cost::hard(7));
        assert_eq!(ejector.statistics().num_repairs, 0);
    }

    #[test]
    fn cost_limits_reject_repairs() {
        let mut solution = two_teacher_solution();
        let root = solution.root_monitor();

        let mut ejector = Ejector::new(EjectorOptions::default());
        ejector.set_augment(MonitorTag::AssignTime, AssignAtFirstStart);
        ejector.add_monitor_cost_limit(root, Cost::ZERO);

        assert!(!ejector.solve(&mut solution, root, None));
        assert_eq!(solution.cost(), Cost::hard(7));
        assert!(solution
            .meets()
            .all(|meet| solution.meet_is_cycle(meet) || solution.meet_assignment(meet).is_none()));
    }

    #[test]
    fn min_cost_keeps_the_best_chain() {
        let mut solution = two_teacher_solution();
        let root = solution.root_monitor();

        let mut ejector = Ejector::new(EjectorOptions {
            solve_type: SolveType::MinCost,
            ..Default::default()
        });
        ejector.set_augment(MonitorTag::AssignTime, AssignAtFirstStart);

        assert!(ejector.solve(&mut solution, root, None));
        assert_eq!(solution.cost(), Cost::hard(1));
    }
}

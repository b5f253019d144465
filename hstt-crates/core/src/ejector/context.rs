use super::*;
use crate::hstt_assert_moderate;
use crate::solution::MeetId;
use crate::solution::NodeId;
use crate::solution::TaskId;
use crate::solution::Transaction;
use crate::solution::TransactionMark;
use crate::statistics::MovingAverage;

/// The best chain found so far by a minimising solve type.
#[derive(Debug)]
struct BestChain {
    cost: Cost,
    disruption: usize,
    transaction: Transaction,
}

/// The state of one ejection chain search, handed to every [`Augment`].
#[derive(Debug)]
pub struct EjectorContext<'a> {
    solution: &'a mut Solution,
    ejector: &'a Ejector,
    schedule: EjectorSchedule,
    group: MonitorId,
    scope: Option<NodeId>,
    start_cost: Cost,
    chain_mark: TransactionMark,
    depth: usize,
    max_depth: usize,
    best: Option<BestChain>,
    statistics: &'a mut EjectorStatistics,
}

impl<'a> EjectorContext<'a> {
    pub(super) fn new(
        solution: &'a mut Solution,
        ejector: &'a Ejector,
        statistics: &'a mut EjectorStatistics,
        schedule: EjectorSchedule,
        group: MonitorId,
        scope: Option<NodeId>,
    ) -> Self {
        let max_depth = schedule
            .max_depth
            .unwrap_or_else(|| solution.meets().count() + solution.tasks().count());
        solution.visit_epoch_advance();
        let start_cost = solution.monitor_cost(group);
        let chain_mark = solution.transaction_begin();
        EjectorContext {
            solution,
            ejector,
            schedule,
            group,
            scope,
            start_cost,
            chain_mark,
            depth: 0,
            max_depth,
            best: None,
            statistics,
        }
    }

    pub fn solution(&self) -> &Solution {
        self.solution
    }

    /// Rotates `elements` as [`Solution::diversify`] does.
    pub fn diversify<T>(&mut self, elements: &mut [T]) {
        self.solution.diversify(elements);
    }

    /// The group monitor whose cost the chain must lower.
    pub fn group(&self) -> MonitorId {
        self.group
    }

    /// The node below which the chain may move meets, if restricted.
    pub fn scope(&self) -> Option<NodeId> {
        self.scope
    }

    /// The number of repairs on the current chain, counting the one being tried.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether `meet` lies in the scope of the search.
    pub fn meet_in_scope(&self, meet: MeetId) -> bool {
        match self.scope {
            None => true,
            Some(scope) => self
                .solution
                .meet_node(meet)
                .is_some_and(|node| self.solution.node_is_descendant(node, scope)),
        }
    }

    /// Marks `meet` visited and reports whether the chain may change it.
    pub fn visit_meet(&mut self, meet: MeetId) -> bool {
        if !self.meet_in_scope(meet) || self.solution.meet_is_cycle(meet) {
            return false;
        }
        if self.solution.meet_visited(meet) && !self.schedule.may_revisit {
            return false;
        }
        self.solution.meet_visit(meet);
        true
    }

    /// Marks `task` visited and reports whether the chain may change it.
    pub fn visit_task(&mut self, task: TaskId) -> bool {
        if self.solution.task_is_cycle(task) {
            return false;
        }
        if self.solution.task_visited(task) && !self.schedule.may_revisit {
            return false;
        }
        self.solution.task_visit(task);
        true
    }

    /// Runs one chain from `defect`; on success the chain stays applied.
    pub(super) fn chain(mut self, defect: MonitorId) -> bool {
        self.statistics.num_chains += 1;

        if self.augment_defect(defect) {
            self.solution.transaction_commit(self.chain_mark);
            self.statistics.num_successful_chains += 1;
            return true;
        }
        self.solution.transaction_rollback(self.chain_mark);

        match self.best.take() {
            Some(best) => {
                self.solution.transaction_redo(&best.transaction);
                hstt_assert_moderate!(self.solution.monitor_cost(self.group) == best.cost);
                self.statistics.num_successful_chains += 1;
                true
            }
            None => false,
        }
    }

    /// Calls the augment registered for `defect`. A group without its own augment is searched
    /// through its defects.
    pub fn augment_defect(&mut self, defect: MonitorId) -> bool {
        if !self.solution.monitor_cost(defect).is_positive() {
            return false;
        }
        let ejector = self.ejector;
        let tag = self.solution.monitor_tag(defect);
        if tag == MonitorTag::Group {
            let sub_tag = self.solution.monitor_sub_tag(defect).unwrap_or_default();
            if let Some(augment) = ejector.augments.get_group(sub_tag) {
                return augment.augment(self, defect);
            }
            for child in self.solution.monitor_defect_copy(defect) {
                if self.augment_defect(child) {
                    return true;
                }
            }
            return false;
        }
        match ejector.augments.get(tag) {
            Some(augment) => augment.augment(self, defect),
            None => false,
        }
    }

    fn within_cost_limits(&self) -> bool {
        self.ejector
            .cost_limits
            .iter()
            .all(|&(monitor, limit)| self.solution.monitor_cost(monitor) <= limit)
    }

    fn record_best(&mut self, cost: Cost, disruption: usize) {
        let better = match &self.best {
            None => true,
            Some(best) => match self.ejector.options.solve_type {
                SolveType::MinDisruptionThenCost => {
                    (disruption, cost) < (best.disruption, best.cost)
                }
                _ => (cost, disruption) < (best.cost, best.disruption),
            },
        };
        if better {
            self.best = Some(BestChain {
                cost,
                disruption,
                transaction: self.solution.transaction_snapshot(self.chain_mark),
            });
        }
    }

    /// Tries one repair inside a transaction and a trace.
    ///
    /// The repair is undone when it fails, breaks a monitor cost limit or exceeds the
    /// disruption budget. When it lowers the cost of the group below its cost at the start of
    /// the chain the chain has succeeded; otherwise, while the depth allows, the chain continues
    /// from every monitor whose cost the repair increased. Returns `true` when the chain
    /// succeeded through this repair, in which case the repair stays applied.
    pub fn try_repair(&mut self, repair: impl FnOnce(&mut Solution) -> bool) -> bool {
        self.statistics.num_repairs += 1;
        self.depth += 1;
        let mark = self.solution.transaction_begin();
        let trace = self.solution.trace_begin(self.group);
        let applied = repair(self.solution);
        let report = self.solution.trace_end(trace);

        let disruption = self.solution.transaction_snapshot(self.chain_mark).len();
        let within_budget = self
            .schedule
            .max_disruption
            .map_or(true, |max_disruption| disruption <= max_disruption);
        if !applied || !within_budget || !self.within_cost_limits() {
            self.solution.transaction_rollback(mark);
            self.depth -= 1;
            return false;
        }

        let cost = self.solution.monitor_cost(self.group);
        if cost < self.start_cost {
            self.statistics.average_chain_length.add_term(self.depth as u64);
            if self.ejector.options.solve_type == SolveType::FirstSuccess {
                self.solution.transaction_commit(mark);
                self.depth -= 1;
                return true;
            }
            self.record_best(cost, disruption);
            self.solution.transaction_rollback(mark);
            self.depth -= 1;
            return false;
        }

        if self.depth < self.max_depth {
            let increased = report
                .increased()
                .map(|entry| entry.monitor)
                .filter(|&monitor| self.solution.monitor_tag(monitor) != MonitorTag::Group)
                .collect::<Vec<_>>();
            for monitor in increased {
                if self.augment_defect(monitor) {
                    self.solution.transaction_commit(mark);
                    self.depth -= 1;
                    return true;
                }
            }
        }

        self.solution.transaction_rollback(mark);
        self.depth -= 1;
        false
    }
}

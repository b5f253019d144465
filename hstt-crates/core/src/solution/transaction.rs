use super::*;
use crate::hstt_assert_eq_simple;
use crate::hstt_assert_simple;
use crate::instance::ResourceSet;
use crate::instance::TimeSet;

/// One recorded mutation of a solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    MeetAssign {
        meet: MeetId,
        target: MeetId,
        offset: usize,
    },
    MeetUnassign {
        meet: MeetId,
        target: MeetId,
        offset: usize,
    },
    MeetSplit {
        meet: MeetId,
        other: MeetId,
        first_duration: usize,
    },
    MeetMerge {
        meet: MeetId,
        other: MeetId,
        first_duration: usize,
        other_domain: TimeSet,
    },
    MeetSetDomain {
        meet: MeetId,
        old: TimeSet,
        new: TimeSet,
    },
    TaskAssign {
        task: TaskId,
        target: TaskId,
    },
    TaskUnassign {
        task: TaskId,
        target: TaskId,
    },
    TaskSetDomain {
        task: TaskId,
        old: ResourceSet,
        new: ResourceSet,
    },
}

/// Identifies an open transaction; transactions nest and must be closed innermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionMark {
    checkpoint: usize,
}

/// A copy of the operations of a transaction, which can be undone or redone on the solution it
/// was taken from, in the state it was taken in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    operations: Vec<Operation>,
}

impl Transaction {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Solution {
    pub(crate) fn record(&mut self, operation: Operation) {
        if !self.undoing && self.trail.is_recording() {
            self.trail.push(operation);
        }
    }

    /// Opens a transaction: every mutation from now on is recorded until the transaction is
    /// committed, ended or rolled back.
    pub fn transaction_begin(&mut self) -> TransactionMark {
        self.trail.new_checkpoint();
        TransactionMark {
            checkpoint: self.trail.get_checkpoint(),
        }
    }

    /// Closes the innermost transaction, keeping its mutations. They stay recorded in the
    /// enclosing transaction, if any.
    pub fn transaction_commit(&mut self, mark: TransactionMark) {
        hstt_assert_eq_simple!(mark.checkpoint, self.trail.get_checkpoint());
        self.trail.merge_checkpoint();
    }

    /// Like [`Solution::transaction_commit`], returning a copy of the operations.
    pub fn transaction_end(&mut self, mark: TransactionMark) -> Transaction {
        let transaction = self.transaction_snapshot(mark);
        self.transaction_commit(mark);
        transaction
    }

    /// A copy of the operations recorded since `mark` was opened, leaving it open.
    pub fn transaction_snapshot(&self, mark: TransactionMark) -> Transaction {
        Transaction {
            operations: self.trail.values_since_checkpoint(mark.checkpoint).to_vec(),
        }
    }

    /// Closes the innermost transaction and undoes its mutations, newest first.
    pub fn transaction_rollback(&mut self, mark: TransactionMark) {
        hstt_assert_eq_simple!(mark.checkpoint, self.trail.get_checkpoint());
        let operations = self
            .trail
            .synchronise(mark.checkpoint - 1)
            .collect::<Vec<_>>();
        let undoing = std::mem::replace(&mut self.undoing, true);
        for operation in operations.iter() {
            self.apply_inverse(operation);
        }
        self.undoing = undoing;
        self.settle();
    }

    /// Undoes `transaction`, which must be the most recent change to this solution's
    /// assignments. The undo is recorded by any open transaction.
    pub fn transaction_undo(&mut self, transaction: &Transaction) {
        for operation in transaction.operations.iter().rev() {
            self.apply_inverse(operation);
        }
        self.settle();
    }

    /// Redoes `transaction` on a solution in the state it started from. The redo is recorded by
    /// any open transaction.
    pub fn transaction_redo(&mut self, transaction: &Transaction) {
        for operation in transaction.operations.iter() {
            self.apply_forward(operation);
        }
        self.settle();
    }

    fn apply_forward(&mut self, operation: &Operation) {
        let applied = match operation {
            Operation::MeetAssign {
                meet,
                target,
                offset,
            } => self.meet_assign_internal(*meet, *target, *offset),
            Operation::MeetUnassign { meet, .. } => self.meet_unassign_internal(*meet),
            Operation::MeetSplit {
                meet,
                other,
                first_duration,
            } => self
                .meet_split_internal(*meet, *first_duration, Some(*other))
                .is_some(),
            Operation::MeetMerge { meet, other, .. } => self.meet_merge_internal(*meet, *other),
            Operation::MeetSetDomain { meet, new, .. } => {
                self.meet_set_domain_internal(*meet, new.clone())
            }
            Operation::TaskAssign { task, target } => self.task_assign_internal(*task, *target),
            Operation::TaskUnassign { task, .. } => self.task_unassign_internal(*task),
            Operation::TaskSetDomain { task, new, .. } => {
                self.task_set_domain_internal(*task, new.clone())
            }
        };
        hstt_assert_simple!(applied, "redoing {operation:?} failed");
    }

    fn apply_inverse(&mut self, operation: &Operation) {
        let applied = match operation {
            Operation::MeetAssign { meet, .. } => self.meet_unassign_internal(*meet),
            Operation::MeetUnassign {
                meet,
                target,
                offset,
            } => self.meet_assign_internal(*meet, *target, *offset),
            Operation::MeetSplit { meet, other, .. } => self.meet_merge_internal(*meet, *other),
            Operation::MeetMerge {
                meet,
                other,
                first_duration,
                other_domain,
            } => {
                let split = self
                    .meet_split_internal(*meet, *first_duration, Some(*other))
                    .is_some();
                if split {
                    self.meet_restore_domain(*other, other_domain.clone());
                }
                split
            }
            Operation::MeetSetDomain { meet, old, .. } => {
                self.meet_set_domain_internal(*meet, old.clone())
            }
            Operation::TaskAssign { task, .. } => self.task_unassign_internal(*task),
            Operation::TaskUnassign { task, target } => self.task_assign_internal(*task, *target),
            Operation::TaskSetDomain { task, old, .. } => {
                self.task_set_domain_internal(*task, old.clone())
            }
        };
        hstt_assert_simple!(applied, "undoing {operation:?} failed");
    }
}

#[cfg(test)]
mod tests {
    use crate::instance::EventId;
    use crate::instance::EventResourceId;
    use crate::instance::ResourceId;
    use crate::instance::TimeId;
    use crate::test_instances;

    #[test]
    fn rollback_restores_assignments_and_cost() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(EventId(0))[0];
        let task = solution.event_resource_tasks(EventResourceId(2))[0];
        let cost = solution.cost();

        let mark = solution.transaction_begin();
        assert!(solution.meet_assign(meet, cycle, 0));
        let other = solution.meet_split(meet, 1).unwrap();
        assert!(solution.task_assign_resource(task, ResourceId(1)));
        assert_ne!(solution.cost(), cost);
        solution.transaction_rollback(mark);

        assert_eq!(solution.cost(), cost);
        assert_eq!(solution.meet_assignment(meet), None);
        assert_eq!(solution.meet_duration(meet), 3);
        assert!(solution.meet_is_deleted(other));
        assert_eq!(solution.task_resource(task), None);
    }

    #[test]
    fn undo_then_redo_replays_the_same_state() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(EventId(0))[0];
        let start_cost = solution.cost();

        let mark = solution.transaction_begin();
        let other = solution.meet_split(meet, 2).unwrap();
        assert!(solution.meet_assign(meet, cycle, 0));
        assert!(solution.meet_assign(other, cycle, 4));
        let transaction = solution.transaction_end(mark);
        let end_cost = solution.cost();
        assert_eq!(transaction.len(), 3);

        solution.transaction_undo(&transaction);
        assert_eq!(solution.cost(), start_cost);
        assert!(solution.meet_is_deleted(other));

        solution.transaction_redo(&transaction);
        assert_eq!(solution.cost(), end_cost);
        assert!(!solution.meet_is_deleted(other));
        assert_eq!(solution.meet_assignment(other), Some((cycle, 4)));
    }

    #[test]
    fn rolling_back_a_merge_restores_both_domains() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(EventId(0))[0];
        let other = solution.meet_split(meet, 1).unwrap();
        assert!(solution.meet_assign(meet, cycle, 0));
        assert!(solution.meet_assign(other, cycle, 1));
        let start = solution.instance().time_set([TimeId(0)]);
        assert!(solution.meet_set_domain(meet, start.clone()));
        let cost = solution.cost();

        let mark = solution.transaction_begin();
        assert!(solution.meet_merge(meet, other));
        assert!(solution.meet_is_deleted(other));
        solution.transaction_rollback(mark);

        assert!(!solution.meet_is_deleted(other));
        assert_eq!(solution.meet_duration(meet), 1);
        assert_eq!(solution.meet_duration(other), 2);
        assert_eq!(solution.meet_domain(meet), &start);
        assert!(solution.meet_domain(other).is_full());
        assert_eq!(solution.meet_assignment(other), Some((cycle, 1)));
        assert_eq!(solution.event_meets(EventId(0)), &[meet, other]);
        assert_eq!(solution.cost(), cost);
    }

    #[test]
    fn nested_commit_is_rolled_back_by_the_enclosing_transaction() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(EventId(1))[0];

        let outer = solution.transaction_begin();
        let inner = solution.transaction_begin();
        assert!(solution.meet_assign(meet, cycle, 1));
        solution.transaction_commit(inner);
        solution.transaction_rollback(outer);

        assert_eq!(solution.meet_assignment(meet), None);
    }
}

use std::iter::Rev;
use std::ops::Deref;
use std::vec::Drain;

use crate::hstt_assert_simple;

/// A log of values with nested checkpoints.
///
/// Checkpoint `i` (1-based) starts at `trail_delimiter[i - 1]`. Values are only recorded while at
/// least one checkpoint is open; a checkpoint is either rolled back, which drains its values, or
/// merged into its enclosing checkpoint.
#[derive(Clone, Debug)]
pub(crate) struct Trail<T> {
    current_checkpoint: usize,
    /// At index i is the position where the (i + 1)-th checkpoint starts on the trail
    trail_delimiter: Vec<usize>,
    trail: Vec<T>,
}

// We explicitly implement the Default and not as a macro, because we want to avoid imposing Default
// on the generic type T.
impl<T> Default for Trail<T> {
    fn default() -> Self {
        Trail {
            current_checkpoint: Default::default(),
            trail_delimiter: Default::default(),
            trail: Default::default(),
        }
    }
}

impl<T> Trail<T> {
    pub(crate) fn new_checkpoint(&mut self) {
        self.current_checkpoint += 1;
        self.trail_delimiter.push(self.trail.len());
    }

    pub(crate) fn get_checkpoint(&self) -> usize {
        self.current_checkpoint
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.current_checkpoint > 0
    }

    /// The values pushed since `checkpoint` was opened, including those of nested checkpoints.
    pub(crate) fn values_since_checkpoint(&self, checkpoint: usize) -> &[T] {
        hstt_assert_simple!(checkpoint >= 1 && checkpoint <= self.current_checkpoint);

        &self.trail[self.trail_delimiter[checkpoint - 1]..]
    }

    /// Removes every checkpoint from `new_checkpoint + 1` onwards, returning their values newest
    /// first.
    pub(crate) fn synchronise(&mut self, new_checkpoint: usize) -> Rev<Drain<'_, T>> {
        hstt_assert_simple!(new_checkpoint < self.current_checkpoint);

        let new_trail_len = self.trail_delimiter[new_checkpoint];

        self.current_checkpoint = new_checkpoint;
        self.trail_delimiter.truncate(new_checkpoint);
        self.trail.drain(new_trail_len..).rev()
    }

    /// Closes the innermost checkpoint, keeping its values as part of the enclosing one. Closing
    /// the outermost checkpoint discards the log since nothing can roll it back anymore.
    pub(crate) fn merge_checkpoint(&mut self) {
        hstt_assert_simple!(self.current_checkpoint > 0);

        self.current_checkpoint -= 1;
        let _ = self.trail_delimiter.pop();
        if self.current_checkpoint == 0 {
            self.trail.clear();
        }
    }

    pub(crate) fn push(&mut self, elem: T) {
        self.trail.push(elem)
    }
}

impl<T> Deref for Trail<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_values_are_observed_through_indexing() {
        let mut trail = Trail::default();

        let expected = [1, 2, 3, 4];
        for &elem in expected.iter() {
            trail.push(elem);
        }

        assert_eq!(&expected, trail.deref());
    }

    #[test]
    fn backtracking_removes_elements_beyond_checkpoint() {
        let mut trail = Trail::default();

        trail.new_checkpoint();
        trail.push(1);
        let _ = trail.synchronise(0);

        assert!(trail.is_empty());
    }

    #[test]
    fn backtracking_returns_values_newest_first() {
        let mut trail = Trail::default();

        trail.new_checkpoint();
        trail.push(1);
        trail.new_checkpoint();
        trail.push(2);
        trail.push(3);

        let drained = trail.synchronise(0).collect::<Vec<_>>();
        assert_eq!(drained, vec![3, 2, 1]);
        assert_eq!(trail.get_checkpoint(), 0);
    }

    #[test]
    fn merged_checkpoint_values_belong_to_the_enclosing_checkpoint() {
        let mut trail = Trail::default();

        trail.new_checkpoint();
        trail.push(1);
        trail.new_checkpoint();
        trail.push(2);
        trail.merge_checkpoint();

        assert_eq!(trail.values_since_checkpoint(1), &[1, 2]);

        let drained = trail.synchronise(0).collect::<Vec<_>>();
        assert_eq!(drained, vec![2, 1]);
    }

    #[test]
    fn closing_the_outermost_checkpoint_discards_the_log() {
        let mut trail = Trail::default();

        trail.new_checkpoint();
        trail.push(1);
        trail.merge_checkpoint();

        assert!(!trail.is_recording());
        assert!(trail.is_empty());
    }
}

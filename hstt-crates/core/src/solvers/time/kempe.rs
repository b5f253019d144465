use crate::containers::HashSet;
use crate::create_statistics_struct;
use crate::monitors::MonitorTag;
use crate::solution::MeetId;
use crate::solution::MonitorId;
use crate::solution::Solution;
use crate::statistics::CumulativeMovingAverage;
use crate::statistics::MovingAverage;

create_statistics_struct!(
    /// Counters of the Kempe meet moves tried by the time repairs.
    KempeStatistics {
        num_attempts: u64,
        num_successes: u64,
        /// The mean number of meets moved by a successful Kempe move.
        average_length: CumulativeMovingAverage<u64>,
    }
);

impl KempeStatistics {
    pub fn record(&mut self, outcome: Option<usize>) {
        self.num_attempts += 1;
        if let Some(length) = outcome {
            self.num_successes += 1;
            self.average_length.add_term(length as u64);
        }
    }
}

/// Which way a meet crosses between the two frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// The meet assigned directly to `target` which `meet` lies in, possibly `meet` itself.
fn meet_below(solution: &Solution, meet: MeetId, target: MeetId) -> Option<MeetId> {
    let mut current = meet;
    loop {
        let (next, _) = solution.meet_assignment(current)?;
        if next == target {
            return Some(current);
        }
        current = next;
    }
}

/// Moves `meet`, assigned to `target`, to `offset` in `target`.
///
/// The offsets `meet` leaves and the offsets it moves to, each extended up to the start of the
/// other, form two frames. Every meet which then clashes with a moved meet on a preassigned
/// resource is moved to the other frame, keeping its place relative to the frame, and so on
/// until no clash remains. The move fails, changing
/// nothing, when the frames overlap, when a meet would cross in the same direction twice, when a
/// clashing meet does not lie wholly inside a frame of `target`, or when it raises the cost of
/// an avoid unavailable times monitor. An `anchor` group monitor is needed to trace that cost;
/// without one the move fails.
///
/// Returns the number of meets moved. The numbers of meets and tasks never change.
pub fn kempe_meet_move(
    solution: &mut Solution,
    meet: MeetId,
    target: MeetId,
    offset: usize,
    anchor: Option<MonitorId>,
) -> Option<usize> {
    let anchor = anchor?;
    let (current_target, current_offset) = solution.meet_assignment(meet)?;
    let target_duration = solution.meet_duration(target);
    if current_target != target || offset.max(current_offset) >= target_duration {
        return None;
    }
    let length = current_offset
        .abs_diff(offset)
        .min(target_duration - offset.max(current_offset));
    if solution.meet_duration(meet) > length {
        return None;
    }

    let frame_start = |direction: Direction| match direction {
        Direction::Forward => offset,
        Direction::Backward => current_offset,
    };

    let trace = solution.trace_begin(anchor);
    let mark = solution.transaction_begin();
    let mut crossed: HashSet<(MeetId, Direction)> = HashSet::default();
    let mut pending = vec![(meet, Direction::Forward)];
    let mut moves = 0;
    let mut success = true;

    while let Some((moving, direction)) = pending.pop() {
        if !crossed.insert((moving, direction)) {
            success = false;
            break;
        }
        let Some((_, moving_offset)) = solution.meet_assignment(moving) else {
            success = false;
            break;
        };
        let source = frame_start(direction.opposite());
        let destination = frame_start(direction);
        let new_offset = destination + moving_offset - source;
        if !solution.meet_move(moving, target, new_offset) {
            success = false;
            break;
        }
        moves += 1;

        for clashing in preassigned_clashes(solution, moving) {
            let Some(clashing) = meet_below(solution, clashing, target) else {
                success = false;
                break;
            };
            let Some((_, clashing_offset)) = solution.meet_assignment(clashing) else {
                success = false;
                break;
            };
            let inside_destination = clashing_offset >= destination
                && clashing_offset + solution.meet_duration(clashing) <= destination + length;
            if !inside_destination {
                success = false;
                break;
            }
            if !pending.contains(&(clashing, direction.opposite())) {
                pending.push((clashing, direction.opposite()));
            }
        }
        if !success {
            break;
        }
    }

    let report = solution.trace_end(trace);
    if success
        && report.increased().any(|entry| {
            solution.monitor_tag(entry.monitor) == MonitorTag::AvoidUnavailableTimes
        })
    {
        success = false;
    }

    if success {
        solution.transaction_commit(mark);
        Some(moves)
    } else {
        solution.transaction_rollback(mark);
        None
    }
}

/// The meets other than `meet` holding a task which shares a preassigned resource and a time
/// with a preassigned task of `meet`.
fn preassigned_clashes(solution: &Solution, meet: MeetId) -> Vec<MeetId> {
    let mut clashes = vec![];
    for &task in solution.meet_tasks(meet) {
        if !solution.task_is_preassigned(task) {
            continue;
        }
        let Some(resource) = solution.task_resource(task) else {
            continue;
        };
        for time in solution.task_busy_times(task) {
            for &other in solution.resource_tasks_at(resource, time) {
                let Some(other_meet) = solution.task_meet(other) else {
                    continue;
                };
                if other != task && other_meet != meet && !clashes.contains(&other_meet) {
                    clashes.push(other_meet);
                }
            }
        }
    }
    clashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_instances::two_teacher_solution;

    /// Places e0 (duration 3) at offset 0 and e1 (duration 2) at offset 3 with teacher A, the
    /// meet of e2 at offset 5, and returns the three meets.
    fn placed_solution() -> (Solution, [MeetId; 3]) {
        let mut solution = two_teacher_solution();
        let cycle_meet = solution.cycle_meets()[0];
        let meets = [0, 1, 2].map(|index| {
            let event = crate::instance::EventId(index);
            solution.event_meets(event)[0]
        });
        assert!(solution.meet_assign(meets[0], cycle_meet, 0));
        assert!(solution.meet_assign(meets[1], cycle_meet, 3));
        assert!(solution.meet_assign(meets[2], cycle_meet, 5));
        for meet in meets[..2].iter() {
            let task = solution.meet_tasks(*meet)[0];
            assert!(solution.task_assign_resource(task, crate::instance::ResourceId(0)));
        }
        (solution, meets)
    }

    #[test]
    fn clashing_meets_cross_to_the_other_frame() {
        let (mut solution, [e0, e1, _]) = placed_solution();
        let cycle_meet = solution.cycle_meets()[0];
        let root = solution.root_monitor();
        let meet_count = solution.meets().count();
        let task_count = solution.tasks().count();

        // The frames are [0, 3) and [3, 6); e1 now clashes with e0, which crosses to offset 3.
        let moved = kempe_meet_move(&mut solution, e1, cycle_meet, 0, Some(root));

        assert_eq!(moved, Some(2));
        assert_eq!(solution.meet_assignment(e1), Some((cycle_meet, 0)));
        assert_eq!(solution.meet_assignment(e0), Some((cycle_meet, 3)));
        assert_eq!(solution.meets().count(), meet_count);
        assert_eq!(solution.tasks().count(), task_count);
    }

    #[test]
    fn moves_without_an_anchor_fail() {
        let (mut solution, [_, e1, _]) = placed_solution();
        let cycle_meet = solution.cycle_meets()[0];

        assert_eq!(kempe_meet_move(&mut solution, e1, cycle_meet, 0, None), None);
        assert_eq!(solution.meet_assignment(e1), Some((cycle_meet, 3)));
    }

    #[test]
    fn overlapping_frames_are_rejected() {
        let (mut solution, [e0, _, _]) = placed_solution();
        let cycle_meet = solution.cycle_meets()[0];
        let root = solution.root_monitor();

        assert_eq!(kempe_meet_move(&mut solution, e0, cycle_meet, 1, Some(root)), None);
        assert_eq!(solution.meet_assignment(e0), Some((cycle_meet, 0)));
    }
}

use crate::solution::Solution;

/// Runs `solver` on `threads` copies of `solution` at once, copy `i` with diversifier `i`, and
/// returns the copy with the lowest cost. Ties go to the lower diversifier, so the result does
/// not depend on which thread finishes first.
///
/// With zero threads the solution is returned unchanged. A panic in one of the threads is
/// resumed on the calling thread.
pub fn parallel_solve<F>(solution: &Solution, threads: usize, solver: F) -> Solution
where
    F: Fn(&mut Solution) + Sync,
{
    let solver = &solver;
    let results = std::thread::scope(|scope| {
        let handles = (0..threads)
            .map(|index| {
                let mut copy = solution.clone();
                copy.set_diversifier(index as u64);
                scope.spawn(move || {
                    solver(&mut copy);
                    log::debug!(
                        "diversifier {} finished at cost {}",
                        copy.diversifier(),
                        copy.cost()
                    );
                    copy
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(copy) => copy,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect::<Vec<_>>()
    });

    let best = results
        .into_iter()
        .min_by_key(|copy| (copy.cost(), copy.diversifier()));
    match best {
        Some(best) => {
            log::info!(
                "best of {threads} threads: diversifier {} at cost {}",
                best.diversifier(),
                best.cost()
            );
            best
        }
        None => solution.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::general_solve;
    use crate::solvers::GeneralSolveOptions;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn the_cheapest_copy_wins() {
        let solution = two_teacher_solution();
        let options = GeneralSolveOptions::default();
        let best = parallel_solve(&solution, 3, |copy| general_solve(copy, &options));

        assert!(best.cost().is_zero());
        assert_eq!(best.diversifier(), 0);
    }

    #[test]
    fn the_lower_cost_beats_the_lower_diversifier() {
        let solution = two_teacher_solution();
        let best = parallel_solve(&solution, 2, |copy| {
            if copy.diversifier() == 1 {
                let meet = copy.event_meets(crate::instance::EventId(2))[0];
                let cycle_meet = copy.cycle_meets()[0];
                assert!(copy.meet_assign(meet, cycle_meet, 0));
            }
        });

        assert_eq!(best.diversifier(), 1);
        assert!(best.cost() < solution.cost());
    }

    #[test]
    fn diversifiers_rotate_the_order_of_alternatives() {
        let solution = two_teacher_solution();
        let natural = (0..24).collect::<Vec<usize>>();
        let order_for = |diversifier: u64| {
            let mut copy = solution.clone();
            copy.set_diversifier(diversifier);
            let mut order = natural.clone();
            copy.diversify(&mut order);
            order
        };
        let orders = (0..6).map(&order_for).collect::<Vec<_>>();

        assert_eq!(orders[0], natural);
        for order in orders.iter() {
            let start = order[0];
            assert!(order
                .iter()
                .enumerate()
                .all(|(position, &element)| element == (start + position) % 24));
        }
        assert!(orders[1..].iter().any(|order| *order != natural));
        assert_eq!(order_for(3), orders[3]);
    }

    #[test]
    fn no_threads_leave_the_solution_alone() {
        let solution = two_teacher_solution();
        let best = parallel_solve(&solution, 0, |_| unreachable!());

        assert_eq!(best.cost(), solution.cost());
    }
}

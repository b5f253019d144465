use std::cell::RefCell;
use std::rc::Rc;

use enumset::EnumSet;

use super::kempe::kempe_meet_move;
use super::kempe::KempeStatistics;
use super::simple::meet_positions;
use crate::ejector::Augment;
use crate::ejector::Ejector;
use crate::ejector::EjectorContext;
use crate::instance::ConstraintKind;
use crate::instance::EventId;
use crate::instance::ResourceId;
use crate::instance::TimeId;
use crate::monitors::MonitorKind;
use crate::monitors::MonitorTag;
use crate::solution::MeetId;
use crate::solution::MonitorId;
use crate::solution::Solution;

/// The tags of the monitors which the time repairs target.
pub fn time_repair_tags() -> EnumSet<MonitorTag> {
    MonitorTag::AssignTime
        | MonitorTag::PreferTimes
        | MonitorTag::SplitEvents
        | MonitorTag::DistributeSplitEvents
        | MonitorTag::SpreadEvents
        | MonitorTag::LinkEvents
        | MonitorTag::OrderEvents
        | MonitorTag::AvoidClashes
        | MonitorTag::AvoidUnavailableTimes
        | MonitorTag::LimitIdleTimes
        | MonitorTag::ClusterBusyTimes
        | MonitorTag::LimitBusyTimes
        | MonitorTag::OrdinaryDemand
        | MonitorTag::WorkloadDemand
        | MonitorTag::Evenness
}

/// Repairs a time defect by moving one of the meets it concerns: an unassigned meet is
/// assigned, an assigned one is moved within its target or to another one, and, when Kempe
/// moves are enabled, moved within its target by a Kempe meet move.
#[derive(Clone, Debug, Default)]
pub struct TimeAugment {
    kempe: bool,
    kempe_statistics: Rc<RefCell<KempeStatistics>>,
}

impl TimeAugment {
    pub fn new(kempe: bool) -> TimeAugment {
        TimeAugment {
            kempe,
            kempe_statistics: Rc::default(),
        }
    }

    pub fn kempe_statistics(&self) -> KempeStatistics {
        *self.kempe_statistics.borrow()
    }

    /// Registers a copy of this augment for every time repair tag.
    pub fn register(&self, ejector: &mut Ejector) {
        for tag in time_repair_tags() {
            ejector.set_augment(tag, self.clone());
        }
    }

    fn repair_meet(&self, context: &mut EjectorContext<'_>, meet: MeetId) -> bool {
        if !context.visit_meet(meet) {
            return false;
        }
        let current = context.solution().meet_assignment(meet);
        let mut positions = meet_positions(context.solution(), meet);
        context.diversify(&mut positions);
        for (target, offset) in positions {
            let repaired = match current {
                None => context.try_repair(|solution| solution.meet_assign(meet, target, offset)),
                Some(_) => context.try_repair(|solution| solution.meet_move(meet, target, offset)),
            };
            if repaired {
                return true;
            }

            let same_target = current.is_some_and(|(current_target, _)| current_target == target);
            if self.kempe && same_target {
                let anchor = Some(context.group());
                let statistics = Rc::clone(&self.kempe_statistics);
                let repaired = context.try_repair(|solution| {
                    let outcome = kempe_meet_move(solution, meet, target, offset, anchor);
                    statistics.borrow_mut().record(outcome);
                    outcome.is_some()
                });
                if repaired {
                    return true;
                }
            }
        }
        false
    }
}

impl Augment for TimeAugment {
    fn augment(&self, context: &mut EjectorContext<'_>, defect: MonitorId) -> bool {
        for meet in defect_meets(context.solution(), defect) {
            if self.repair_meet(context, meet) {
                return true;
            }
        }
        false
    }
}

/// The meet which is moved in place of `meet`: the highest meet reached from it through meets
/// without a node.
fn movable_meet(solution: &Solution, mut meet: MeetId) -> MeetId {
    while solution.meet_node(meet).is_none() {
        match solution.meet_target(meet) {
            Some(target) if !solution.meet_is_cycle(target) => meet = target,
            _ => break,
        }
    }
    meet
}

fn event_meets(solution: &Solution, events: impl IntoIterator<Item = EventId>) -> Vec<MeetId> {
    events
        .into_iter()
        .flat_map(|event| solution.event_meets(event).iter().copied())
        .collect()
}

/// The meets holding a task of `resource` which is busy at one of `times`, or at any time
/// when `times` is `None`.
fn resource_meets(
    solution: &Solution,
    resource: ResourceId,
    times: Option<&[TimeId]>,
) -> Vec<MeetId> {
    let all_times;
    let times = match times {
        Some(times) => times,
        None => {
            all_times = solution.instance().times().collect::<Vec<_>>();
            &all_times
        }
    };
    let mut meets = vec![];
    for &time in times {
        for &task in solution.resource_tasks_at(resource, time) {
            if let Some(meet) = solution.task_meet(task) {
                if !meets.contains(&meet) {
                    meets.push(meet);
                }
            }
        }
    }
    meets
}

/// The meets whose movement may lower the cost of `defect`, with duplicates removed.
pub(crate) fn defect_meets(solution: &Solution, defect: MonitorId) -> Vec<MeetId> {
    let instance = solution.instance();
    let meets = match solution.monitor_kind(defect) {
        MonitorKind::AssignTime { event, .. }
        | MonitorKind::PreferTimes { event, .. }
        | MonitorKind::SplitEvents { event, .. }
        | MonitorKind::DistributeSplitEvents { event, .. } => event_meets(solution, [*event]),
        MonitorKind::SpreadEvents { event_group, .. }
        | MonitorKind::LinkEvents { event_group, .. } => {
            event_meets(solution, instance.event_group(*event_group).events.iter().copied())
        }
        MonitorKind::OrderEvents { constraint, point } => {
            match &instance.constraint(*constraint).kind {
                ConstraintKind::OrderEvents { pairs, .. } => match pairs.get(*point) {
                    Some(&(first, second)) => event_meets(solution, [first, second]),
                    None => vec![],
                },
                _ => vec![],
            }
        }
        MonitorKind::AvoidClashes { resource, .. } => {
            let clashing = instance
                .times()
                .filter(|&time| solution.resource_tasks_at(*resource, time).len() > 1)
                .collect::<Vec<_>>();
            resource_meets(solution, *resource, Some(clashing.as_slice()))
        }
        MonitorKind::AvoidUnavailableTimes {
            constraint,
            resource,
        } => match &instance.constraint(*constraint).kind {
            ConstraintKind::AvoidUnavailableTimes { times, .. } => {
                resource_meets(solution, *resource, Some(times.as_slice()))
            }
            _ => vec![],
        },
        MonitorKind::LimitIdleTimes { resource, .. }
        | MonitorKind::ClusterBusyTimes { resource, .. }
        | MonitorKind::LimitBusyTimes { resource, .. }
        | MonitorKind::WorkloadDemand { resource } => resource_meets(solution, *resource, None),
        MonitorKind::OrdinaryDemand { .. } => {
            let mut meets = vec![];
            for competitor in solution.demand_competitors(defect) {
                if let MonitorKind::OrdinaryDemand { task } = solution.monitor_kind(competitor) {
                    if let Some(meet) = solution.task_meet(*task) {
                        meets.push(meet);
                    }
                }
            }
            meets
        }
        MonitorKind::Evenness { partition, time } => {
            let resources = &instance.resource_group(*partition).resources;
            resources
                .iter()
                .flat_map(|resource| {
                    resource_meets(solution, resource, Some(std::slice::from_ref(time)))
                })
                .collect()
        }
        _ => vec![],
    };

    let mut movable = vec![];
    for meet in meets {
        let meet = movable_meet(solution, meet);
        if !solution.meet_is_cycle(meet) && !movable.contains(&meet) {
            movable.push(meet);
        }
    }
    movable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Cost;
    use crate::ejector::EjectorOptions;
    use crate::instance::EventId;
    use crate::solvers::layer_tree_make;
    use crate::solvers::LayerTreeOptions;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn clashes_are_repaired_by_moving_a_meet() {
        let mut solution = two_teacher_solution();
        let _ = layer_tree_make(&mut solution, &LayerTreeOptions::default());
        let cycle_meet = solution.cycle_meets()[0];
        let e0 = solution.event_meets(EventId(0))[0];
        let e1 = solution.event_meets(EventId(1))[0];
        for meet in [e0, e1] {
            let task = solution.meet_tasks(meet)[0];
            assert!(solution.task_assign_resource(task, ResourceId(0)));
        }
        assert!(solution.meet_assign(e0, cycle_meet, 0));
        assert!(solution.meet_assign(e1, cycle_meet, 1));
        // Two clashing times, and e2 has no time and no teacher.
        assert_eq!(solution.cost(), Cost::hard(4));

        let augment = TimeAugment::new(true);
        let mut ejector = Ejector::new(EjectorOptions::default());
        augment.register(&mut ejector);
        let root = solution.root_monitor();

        assert!(ejector.solve(&mut solution, root, None));
        assert_eq!(solution.cost(), Cost::hard(1));
        assert!(solution.check_costs().is_empty());
    }

    #[test]
    fn follower_meets_are_moved_through_their_leader() {
        let mut solution = two_teacher_solution();
        let e0 = solution.event_meets(EventId(0))[0];
        let e1 = solution.event_meets(EventId(1))[0];
        let rest = solution.meet_split(e0, 2).expect("e0 splits");
        assert!(solution.meet_assign(rest, e1, 0));

        let node = solution.node_make();
        assert!(solution.node_add_meet(node, e1));
        assert_eq!(movable_meet(&solution, rest), e1);
    }
}

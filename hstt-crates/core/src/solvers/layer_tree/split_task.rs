use crate::basic_types::Cost;
use crate::instance::ConstraintKind;
use crate::instance::EventId;
use crate::instance::ResourceId;
use crate::instance::TimeId;
use crate::instance::TimeSet;
use crate::solution::Solution;

/// One proposal on how events are to be split into meets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SplitTaskKind {
    /// The event already has meets; their durations stay.
    Assigned {
        event: EventId,
        durations: Vec<usize>,
    },
    /// The event has a preassigned time, so it is one meet starting then.
    Preassigned { event: EventId, time: TimeId },
    /// A required prefer times constraint limits the start times of the event.
    Domain { event: EventId, times: TimeSet },
    Split {
        event: EventId,
        min_duration: usize,
        max_duration: usize,
        min_amount: usize,
        max_amount: usize,
    },
    DistributeSplit {
        event: EventId,
        duration: usize,
        minimum: usize,
        maximum: usize,
    },
    /// No event of the group may have more meets than the spread limits allow in total.
    Spread {
        events: Vec<EventId>,
        max_meets: usize,
    },
    /// The events are to be split identically and held at the same times.
    Link { events: Vec<EventId> },
    /// The events attended by a preassigned resource must fit into the cycle together.
    AvoidClashes { resource: ResourceId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SplitTask {
    pub(crate) priority: Cost,
    pub(crate) kind: SplitTaskKind,
}

/// The split tasks of `solution`, sorted by decreasing priority. Facts about the solution come
/// first; constraint tasks follow in the order of their combined weights, required ones first.
pub(crate) fn split_tasks_make(solution: &Solution) -> Vec<SplitTask> {
    let instance = solution.instance();
    let mut tasks = vec![];

    for event in instance.events() {
        let meets = solution.event_meets(event);
        let definition = instance.event(event);
        let untouched = meets.len() == 1
            && solution.meet_duration(meets[0]) == definition.duration
            && solution.meet_assignment(meets[0]).is_none();
        if !meets.is_empty() && !untouched {
            tasks.push(SplitTask {
                priority: Cost::MAX,
                kind: SplitTaskKind::Assigned {
                    event,
                    durations: meets.iter().map(|&meet| solution.meet_duration(meet)).collect(),
                },
            });
        }
        if let Some(time) = definition.preassigned_time {
            tasks.push(SplitTask {
                priority: Cost::MAX,
                kind: SplitTaskKind::Preassigned { event, time },
            });
        }
    }

    for (_, constraint) in instance.constraints() {
        let priority = constraint.combined_weight();
        match &constraint.kind {
            ConstraintKind::SplitEvents {
                events,
                min_duration,
                max_duration,
                min_amount,
                max_amount,
            } => tasks.extend(events.iter().map(|&event| SplitTask {
                priority,
                kind: SplitTaskKind::Split {
                    event,
                    min_duration: *min_duration,
                    max_duration: *max_duration,
                    min_amount: *min_amount,
                    max_amount: *max_amount,
                },
            })),
            ConstraintKind::DistributeSplitEvents {
                events,
                duration,
                minimum,
                maximum,
            } => tasks.extend(events.iter().map(|&event| SplitTask {
                priority,
                kind: SplitTaskKind::DistributeSplit {
                    event,
                    duration: *duration,
                    minimum: *minimum,
                    maximum: *maximum,
                },
            })),
            ConstraintKind::PreferTimes {
                events,
                times,
                duration: None,
            } if constraint.required => {
                let times = instance.time_set(times.iter().copied());
                tasks.extend(events.iter().map(|&event| SplitTask {
                    priority,
                    kind: SplitTaskKind::Domain {
                        event,
                        times: times.clone(),
                    },
                }));
            }
            ConstraintKind::SpreadEvents {
                event_groups,
                limits,
            } => {
                let max_meets = limits.iter().map(|limit| limit.maximum).sum::<usize>();
                tasks.extend(event_groups.iter().map(|&event_group| SplitTask {
                    priority,
                    kind: SplitTaskKind::Spread {
                        events: instance.event_group(event_group).events.clone(),
                        max_meets,
                    },
                }));
            }
            ConstraintKind::LinkEvents { event_groups } => {
                tasks.extend(event_groups.iter().map(|&event_group| SplitTask {
                    priority,
                    kind: SplitTaskKind::Link {
                        events: instance.event_group(event_group).events.clone(),
                    },
                }));
            }
            ConstraintKind::AvoidClashes { resources } => {
                tasks.extend(resources.iter().map(|&resource| SplitTask {
                    priority,
                    kind: SplitTaskKind::AvoidClashes { resource },
                }));
            }
            _ => {}
        }
    }

    // Stable, so that equal priorities keep the order of the constraints.
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
    tasks
}

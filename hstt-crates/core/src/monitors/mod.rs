//! Monitors: the incrementally maintained costs of a solution.
//!
//! Every constraint point of application becomes one leaf monitor; structural concerns (the
//! demand matching and evenness) add further leaves. Leaves hang below group monitors, and the
//! cost of a group is the sum of the costs of its attached children, so the cost of the root
//! group is the cost of the solution. Groups keep the list of their children with a positive
//! cost, their defects, which is what the ejector repairs.
mod evaluate;
mod evenness;
mod group;
mod matching;

use enum_map::Enum;
use enumset::EnumSetType;
pub(crate) use evenness::Evenness;
pub use evenness::EvennessOptions;
pub(crate) use matching::Matching;
pub use matching::MatchingOptions;
pub use matching::MatchingStatistics;

use crate::basic_types::Cost;
use crate::basic_types::Deviations;
use crate::instance::ConstraintId;
use crate::instance::ConstraintKind;
use crate::instance::EventGroupId;
use crate::instance::EventId;
use crate::instance::EventResourceId;
use crate::instance::ResourceGroupId;
use crate::instance::ResourceId;
use crate::instance::TimeId;
use crate::solution::MonitorId;
use crate::solution::Solution;
use crate::solution::TaskId;

/// The category of a monitor, used to dispatch repairs and to break costs down.
#[derive(Debug, Hash, Enum, EnumSetType)]
pub enum MonitorTag {
    AssignResource,
    AssignTime,
    SplitEvents,
    DistributeSplitEvents,
    PreferResources,
    PreferTimes,
    AvoidSplitAssignments,
    SpreadEvents,
    LinkEvents,
    OrderEvents,
    AvoidClashes,
    AvoidUnavailableTimes,
    LimitIdleTimes,
    ClusterBusyTimes,
    LimitBusyTimes,
    LimitWorkload,
    OrdinaryDemand,
    WorkloadDemand,
    Evenness,
    Group,
}

/// What a monitor observes.
///
/// Constraint monitors refer to their constraint and to their point of application; points of
/// application which are not an entity of the instance are referred to by their position in the
/// constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorKind {
    AssignResource {
        constraint: ConstraintId,
        event_resource: EventResourceId,
    },
    AssignTime {
        constraint: ConstraintId,
        event: EventId,
    },
    SplitEvents {
        constraint: ConstraintId,
        event: EventId,
    },
    DistributeSplitEvents {
        constraint: ConstraintId,
        event: EventId,
    },
    PreferResources {
        constraint: ConstraintId,
        event_resource: EventResourceId,
    },
    PreferTimes {
        constraint: ConstraintId,
        event: EventId,
    },
    AvoidSplitAssignments {
        constraint: ConstraintId,
        point: usize,
    },
    SpreadEvents {
        constraint: ConstraintId,
        event_group: EventGroupId,
    },
    LinkEvents {
        constraint: ConstraintId,
        event_group: EventGroupId,
    },
    OrderEvents {
        constraint: ConstraintId,
        point: usize,
    },
    AvoidClashes {
        constraint: ConstraintId,
        resource: ResourceId,
    },
    AvoidUnavailableTimes {
        constraint: ConstraintId,
        resource: ResourceId,
    },
    LimitIdleTimes {
        constraint: ConstraintId,
        resource: ResourceId,
    },
    ClusterBusyTimes {
        constraint: ConstraintId,
        resource: ResourceId,
    },
    LimitBusyTimes {
        constraint: ConstraintId,
        resource: ResourceId,
    },
    LimitWorkload {
        constraint: ConstraintId,
        resource: ResourceId,
    },
    /// The demand of one task: one demand node per offset of its meet.
    OrdinaryDemand { task: TaskId },
    /// The demand nodes reserving the unavailable times of one resource.
    WorkloadDemand { resource: ResourceId },
    Evenness {
        partition: ResourceGroupId,
        time: TimeId,
    },
    Group { sub_tag: usize, name: String },
}

impl MonitorKind {
    pub fn tag(&self) -> MonitorTag {
        match self {
            MonitorKind::AssignResource { .. } => MonitorTag::AssignResource,
            MonitorKind::AssignTime { .. } => MonitorTag::AssignTime,
            MonitorKind::SplitEvents { .. } => MonitorTag::SplitEvents,
            MonitorKind::DistributeSplitEvents { .. } => MonitorTag::DistributeSplitEvents,
            MonitorKind::PreferResources { .. } => MonitorTag::PreferResources,
            MonitorKind::PreferTimes { .. } => MonitorTag::PreferTimes,
            MonitorKind::AvoidSplitAssignments { .. } => MonitorTag::AvoidSplitAssignments,
            MonitorKind::SpreadEvents { .. } => MonitorTag::SpreadEvents,
            MonitorKind::LinkEvents { .. } => MonitorTag::LinkEvents,
            MonitorKind::OrderEvents { .. } => MonitorTag::OrderEvents,
            MonitorKind::AvoidClashes { .. } => MonitorTag::AvoidClashes,
            MonitorKind::AvoidUnavailableTimes { .. } => MonitorTag::AvoidUnavailableTimes,
            MonitorKind::LimitIdleTimes { .. } => MonitorTag::LimitIdleTimes,
            MonitorKind::ClusterBusyTimes { .. } => MonitorTag::ClusterBusyTimes,
            MonitorKind::LimitBusyTimes { .. } => MonitorTag::LimitBusyTimes,
            MonitorKind::LimitWorkload { .. } => MonitorTag::LimitWorkload,
            MonitorKind::OrdinaryDemand { .. } => MonitorTag::OrdinaryDemand,
            MonitorKind::WorkloadDemand { .. } => MonitorTag::WorkloadDemand,
            MonitorKind::Evenness { .. } => MonitorTag::Evenness,
            MonitorKind::Group { .. } => MonitorTag::Group,
        }
    }

    /// The constraint of a constraint monitor.
    pub fn constraint(&self) -> Option<ConstraintId> {
        match *self {
            MonitorKind::AssignResource { constraint, .. }
            | MonitorKind::AssignTime { constraint, .. }
            | MonitorKind::SplitEvents { constraint, .. }
            | MonitorKind::DistributeSplitEvents { constraint, .. }
            | MonitorKind::PreferResources { constraint, .. }
            | MonitorKind::PreferTimes { constraint, .. }
            | MonitorKind::AvoidSplitAssignments { constraint, .. }
            | MonitorKind::SpreadEvents { constraint, .. }
            | MonitorKind::LinkEvents { constraint, .. }
            | MonitorKind::OrderEvents { constraint, .. }
            | MonitorKind::AvoidClashes { constraint, .. }
            | MonitorKind::AvoidUnavailableTimes { constraint, .. }
            | MonitorKind::LimitIdleTimes { constraint, .. }
            | MonitorKind::ClusterBusyTimes { constraint, .. }
            | MonitorKind::LimitBusyTimes { constraint, .. }
            | MonitorKind::LimitWorkload { constraint, .. } => Some(constraint),
            MonitorKind::OrdinaryDemand { .. }
            | MonitorKind::WorkloadDemand { .. }
            | MonitorKind::Evenness { .. }
            | MonitorKind::Group { .. } => None,
        }
    }

    /// The resource observed by a resource monitor.
    pub fn resource(&self) -> Option<ResourceId> {
        match *self {
            MonitorKind::AvoidClashes { resource, .. }
            | MonitorKind::AvoidUnavailableTimes { resource, .. }
            | MonitorKind::LimitIdleTimes { resource, .. }
            | MonitorKind::ClusterBusyTimes { resource, .. }
            | MonitorKind::LimitBusyTimes { resource, .. }
            | MonitorKind::LimitWorkload { resource, .. }
            | MonitorKind::WorkloadDemand { resource } => Some(resource),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Monitor {
    pub(crate) kind: MonitorKind,
    pub(crate) parent: Option<MonitorId>,
    pub(crate) attached: bool,
    /// Queued for recomputation when the current mutation completes.
    pub(crate) dirty: bool,
    pub(crate) cost: Cost,
    pub(crate) deviations: Deviations,
    /// The children of a group monitor.
    pub(crate) children: Vec<MonitorId>,
    /// The children of a group monitor with a positive cost.
    pub(crate) defects: Vec<MonitorId>,
    /// The position of this monitor in the defect list of its parent, while it is a defect.
    pub(crate) defect_index: Option<usize>,
    pub(crate) deleted: bool,
}

impl Monitor {
    fn leaf(kind: MonitorKind, parent: Option<MonitorId>) -> Monitor {
        Monitor {
            kind,
            parent,
            attached: false,
            dirty: false,
            cost: Cost::ZERO,
            deviations: Deviations::default(),
            children: vec![],
            defects: vec![],
            defect_index: None,
            deleted: false,
        }
    }

    /// An attached group monitor without children.
    pub(crate) fn group(sub_tag: usize, name: &str, parent: Option<MonitorId>) -> Monitor {
        Monitor {
            attached: true,
            ..Monitor::leaf(
                MonitorKind::Group {
                    sub_tag,
                    name: name.to_owned(),
                },
                parent,
            )
        }
    }
}

impl Solution {
    pub fn monitors(&self) -> impl Iterator<Item = MonitorId> + '_ {
        self.monitors
            .iter_with_keys()
            .filter(|(_, monitor)| !monitor.deleted)
            .map(|(id, _)| id)
    }

    pub fn monitor_kind(&self, monitor: MonitorId) -> &MonitorKind {
        &self.monitors[monitor].kind
    }

    pub fn monitor_tag(&self, monitor: MonitorId) -> MonitorTag {
        self.monitors[monitor].kind.tag()
    }

    /// The cached cost of `monitor`; zero while it is detached.
    pub fn monitor_cost(&self, monitor: MonitorId) -> Cost {
        self.monitors[monitor].cost
    }

    pub fn monitor_deviations(&self, monitor: MonitorId) -> Deviations {
        self.monitors[monitor].deviations
    }

    pub fn monitor_parent(&self, monitor: MonitorId) -> Option<MonitorId> {
        self.monitors[monitor].parent
    }

    pub fn monitor_is_attached(&self, monitor: MonitorId) -> bool {
        self.monitors[monitor].attached
    }

    /// The sum of the weights the constraint of `monitor` gives one unit of deviation.
    pub fn monitor_combined_weight(&self, monitor: MonitorId) -> Cost {
        match &self.monitors[monitor].kind {
            MonitorKind::OrdinaryDemand { .. } | MonitorKind::WorkloadDemand { .. } => self
                .matching
                .as_ref()
                .map_or(Cost::hard(1), |matching| matching.weight()),
            MonitorKind::Evenness { .. } => self
                .evenness
                .as_ref()
                .map_or(Cost::soft(1), |evenness| evenness.weight()),
            kind => kind.constraint().map_or(Cost::ZERO, |constraint| {
                self.instance.constraint(constraint).combined_weight()
            }),
        }
    }

    /// Whether `monitor` is `ancestor` or lies below it.
    pub fn monitor_is_below(&self, monitor: MonitorId, ancestor: MonitorId) -> bool {
        let mut current = Some(monitor);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.monitors[candidate].parent;
        }
        false
    }

    /// Adds a detached leaf monitor below `parent` and attaches it.
    pub(crate) fn monitor_make(&mut self, kind: MonitorKind, parent: MonitorId) -> MonitorId {
        let monitor = self.monitors.push(Monitor::leaf(kind, Some(parent)));
        self.monitors[parent].children.push(monitor);
        self.monitor_attach(monitor);
        monitor
    }

    /// Removes a leaf monitor for good.
    pub(crate) fn monitor_delete(&mut self, monitor: MonitorId) {
        self.monitor_detach(monitor);
        if let Some(parent) = self.monitors[monitor].parent.take() {
            self.monitors[parent].children.retain(|&child| child != monitor);
        }
        self.monitors[monitor].deleted = true;
    }

    /// Makes one attached monitor below the root for every point of application of every
    /// constraint.
    pub(crate) fn monitors_make_from_constraints(&mut self) {
        let root = self.root_monitor;
        let mut kinds = vec![];
        for (constraint, definition) in self.instance.constraints() {
            match &definition.kind {
                ConstraintKind::AssignResource { event_resources } => {
                    kinds.extend(event_resources.iter().map(|&event_resource| {
                        MonitorKind::AssignResource {
                            constraint,
                            event_resource,
                        }
                    }))
                }
                ConstraintKind::AssignTime { events } => kinds.extend(
                    events
                        .iter()
                        .map(|&event| MonitorKind::AssignTime { constraint, event }),
                ),
                ConstraintKind::SplitEvents { events, .. } => kinds.extend(
                    events
                        .iter()
                        .map(|&event| MonitorKind::SplitEvents { constraint, event }),
                ),
                ConstraintKind::DistributeSplitEvents { events, .. } => {
                    kinds.extend(events.iter().map(|&event| {
                        MonitorKind::DistributeSplitEvents { constraint, event }
                    }))
                }
                ConstraintKind::PreferResources {
                    event_resources, ..
                } => kinds.extend(event_resources.iter().map(|&event_resource| {
                    MonitorKind::PreferResources {
                        constraint,
                        event_resource,
                    }
                })),
                ConstraintKind::PreferTimes { events, .. } => kinds.extend(
                    events
                        .iter()
                        .map(|&event| MonitorKind::PreferTimes { constraint, event }),
                ),
                ConstraintKind::AvoidSplitAssignments {
                    event_resource_groups,
                } => kinds.extend(
                    (0..event_resource_groups.len())
                        .map(|point| MonitorKind::AvoidSplitAssignments { constraint, point }),
                ),
                ConstraintKind::SpreadEvents { event_groups, .. } => {
                    kinds.extend(event_groups.iter().map(|&event_group| {
                        MonitorKind::SpreadEvents {
                            constraint,
                            event_group,
                        }
                    }))
                }
                ConstraintKind::LinkEvents { event_groups } => {
                    kinds.extend(event_groups.iter().map(|&event_group| {
                        MonitorKind::LinkEvents {
                            constraint,
                            event_group,
                        }
                    }))
                }
                ConstraintKind::OrderEvents { pairs, .. } => kinds.extend(
                    (0..pairs.len()).map(|point| MonitorKind::OrderEvents { constraint, point }),
                ),
                ConstraintKind::AvoidClashes { resources } => kinds.extend(
                    resources
                        .iter()
                        .map(|&resource| MonitorKind::AvoidClashes {
                            constraint,
                            resource,
                        }),
                ),
                ConstraintKind::AvoidUnavailableTimes { resources, .. } => {
                    kinds.extend(resources.iter().map(|&resource| {
                        MonitorKind::AvoidUnavailableTimes {
                            constraint,
                            resource,
                        }
                    }))
                }
                ConstraintKind::LimitIdleTimes { resources, .. } => {
                    kinds.extend(resources.iter().map(|&resource| {
                        MonitorKind::LimitIdleTimes {
                            constraint,
                            resource,
                        }
                    }))
                }
                ConstraintKind::ClusterBusyTimes { resources, .. } => {
                    kinds.extend(resources.iter().map(|&resource| {
                        MonitorKind::ClusterBusyTimes {
                            constraint,
                            resource,
                        }
                    }))
                }
                ConstraintKind::LimitBusyTimes { resources, .. } => {
                    kinds.extend(resources.iter().map(|&resource| {
                        MonitorKind::LimitBusyTimes {
                            constraint,
                            resource,
                        }
                    }))
                }
                ConstraintKind::LimitWorkload { resources, .. } => {
                    kinds.extend(resources.iter().map(|&resource| {
                        MonitorKind::LimitWorkload {
                            constraint,
                            resource,
                        }
                    }))
                }
            }
        }

        for kind in kinds {
            let _ = self.monitor_make(kind, root);
        }
    }

    /// The constraint monitors of the solution, attached or not.
    pub fn constraint_monitors(&self) -> impl Iterator<Item = MonitorId> + '_ {
        self.monitors()
            .filter(|&monitor| self.monitors[monitor].kind.constraint().is_some())
    }
}

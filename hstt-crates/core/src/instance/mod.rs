//! The immutable instance read by the solution: times, resources, events and constraints.
//!
//! Instances are assembled with an [`InstanceBuilder`], which validates every cross reference
//! once so that the rest of the engine can index without checking.
mod builder;
mod constraint;
mod error;
mod ids;

pub use builder::InstanceBuilder;
pub use constraint::*;
pub use error::InstanceError;
pub use ids::*;

use crate::containers::KeyedVec;
use crate::containers::StorageKey;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeGroupKind {
    /// The times of one day; the cycle meet is split at day boundaries.
    Day,
    Week,
    #[default]
    Ordinary,
}

#[derive(Clone, Debug)]
pub struct Time {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct TimeGroup {
    pub name: String,
    pub kind: TimeGroupKind,
    pub times: TimeSet,
}

#[derive(Clone, Debug)]
pub struct ResourceType {
    pub name: String,
    pub resources: Vec<ResourceId>,
    /// The resource groups of this type flagged as partitions.
    pub partitions: Vec<ResourceGroupId>,
}

#[derive(Clone, Debug)]
pub struct Resource {
    pub name: String,
    pub resource_type: ResourceTypeId,
}

#[derive(Clone, Debug)]
pub struct ResourceGroup {
    pub name: String,
    pub resource_type: ResourceTypeId,
    pub resources: ResourceSet,
    pub is_partition: bool,
}

#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub duration: usize,
    pub workload: i64,
    pub preassigned_time: Option<TimeId>,
    pub event_resources: Vec<EventResourceId>,
}

#[derive(Clone, Debug)]
pub struct EventGroup {
    pub name: String,
    pub events: Vec<EventId>,
}

#[derive(Clone, Debug)]
pub struct EventResource {
    pub event: EventId,
    pub resource_type: ResourceTypeId,
    pub role: Option<String>,
    pub preassigned: Option<ResourceId>,
    pub workload: i64,
}

#[derive(Debug)]
pub struct Instance {
    pub(crate) name: String,
    pub(crate) times: KeyedVec<TimeId, Time>,
    pub(crate) time_groups: KeyedVec<TimeGroupId, TimeGroup>,
    pub(crate) resource_types: KeyedVec<ResourceTypeId, ResourceType>,
    pub(crate) resources: KeyedVec<ResourceId, Resource>,
    pub(crate) resource_groups: KeyedVec<ResourceGroupId, ResourceGroup>,
    pub(crate) events: KeyedVec<EventId, Event>,
    pub(crate) event_groups: KeyedVec<EventGroupId, EventGroup>,
    pub(crate) event_resources: KeyedVec<EventResourceId, EventResource>,
    pub(crate) constraints: KeyedVec<ConstraintId, Constraint>,
    /// For every resource, the event resources which preassign it.
    pub(crate) preassignments: KeyedVec<ResourceId, Vec<EventResourceId>>,
}

impl Instance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time_count(&self) -> usize {
        self.times.len()
    }

    pub fn time(&self, time: TimeId) -> &Time {
        &self.times[time]
    }

    pub fn times(&self) -> impl Iterator<Item = TimeId> {
        self.times.keys()
    }

    pub fn time_group(&self, time_group: TimeGroupId) -> &TimeGroup {
        &self.time_groups[time_group]
    }

    pub fn time_groups(&self) -> impl Iterator<Item = (TimeGroupId, &TimeGroup)> {
        self.time_groups.iter_with_keys()
    }

    /// The day time groups ordered by their first time.
    pub fn days(&self) -> Vec<TimeGroupId> {
        let mut days = self
            .time_groups
            .iter_with_keys()
            .filter(|(_, group)| group.kind == TimeGroupKind::Day && !group.times.is_empty())
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        days.sort_by_key(|&day| self.time_groups[day].times.first());
        days
    }

    pub fn resource_type_count(&self) -> usize {
        self.resource_types.len()
    }

    pub fn resource_type(&self, resource_type: ResourceTypeId) -> &ResourceType {
        &self.resource_types[resource_type]
    }

    pub fn resource_types(&self) -> impl Iterator<Item = ResourceTypeId> {
        self.resource_types.keys()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn resource(&self, resource: ResourceId) -> &Resource {
        &self.resources[resource]
    }

    pub fn resources(&self) -> impl Iterator<Item = ResourceId> {
        self.resources.keys()
    }

    pub fn resource_group(&self, resource_group: ResourceGroupId) -> &ResourceGroup {
        &self.resource_groups[resource_group]
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, event: EventId) -> &Event {
        &self.events[event]
    }

    pub fn events(&self) -> impl Iterator<Item = EventId> {
        self.events.keys()
    }

    pub fn event_group(&self, event_group: EventGroupId) -> &EventGroup {
        &self.event_groups[event_group]
    }

    pub fn event_resource_count(&self) -> usize {
        self.event_resources.len()
    }

    pub fn event_resource(&self, event_resource: EventResourceId) -> &EventResource {
        &self.event_resources[event_resource]
    }

    pub fn event_resources(&self) -> impl Iterator<Item = EventResourceId> {
        self.event_resources.keys()
    }

    pub fn constraint(&self, constraint: ConstraintId) -> &Constraint {
        &self.constraints[constraint]
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints.iter_with_keys()
    }

    /// The event resources which preassign `resource`.
    pub fn preassignments(&self, resource: ResourceId) -> &[EventResourceId] {
        &self.preassignments[resource]
    }

    pub fn empty_time_set(&self) -> TimeSet {
        TimeSet::empty(self.time_count())
    }

    pub fn full_time_set(&self) -> TimeSet {
        TimeSet::full(self.time_count())
    }

    pub fn time_set(&self, times: impl IntoIterator<Item = TimeId>) -> TimeSet {
        TimeSet::from_keys(self.time_count(), times)
    }

    pub fn empty_resource_set(&self) -> ResourceSet {
        ResourceSet::empty(self.resource_count())
    }

    pub fn resource_set(&self, resources: impl IntoIterator<Item = ResourceId>) -> ResourceSet {
        ResourceSet::from_keys(self.resource_count(), resources)
    }

    /// All resources of `resource_type`.
    pub fn resource_type_set(&self, resource_type: ResourceTypeId) -> ResourceSet {
        self.resource_set(self.resource_types[resource_type].resources.iter().copied())
    }

    /// The partition of `resource_type` which contains all of `resources`, if any.
    pub fn partition_containing(
        &self,
        resource_type: ResourceTypeId,
        resources: &ResourceSet,
    ) -> Option<ResourceGroupId> {
        self.resource_types[resource_type]
            .partitions
            .iter()
            .copied()
            .find(|&group| resources.is_subset(&self.resource_groups[group].resources))
    }

    /// The time which lies `offset` after `time`, if it exists.
    pub fn time_after(&self, time: TimeId, offset: usize) -> Option<TimeId> {
        let index = time.index() + offset;
        (index < self.time_count()).then(|| TimeId::create_from_index(index))
    }
}

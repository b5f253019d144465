use super::*;

#[derive(Clone, Debug)]
struct PendingTimeGroup {
    name: String,
    kind: TimeGroupKind,
    times: Vec<TimeId>,
}

#[derive(Clone, Debug)]
struct PendingResourceGroup {
    name: String,
    resource_type: ResourceTypeId,
    resources: Vec<ResourceId>,
    is_partition: bool,
}

/// Assembles an [`Instance`], checking every reference when [`InstanceBuilder::build`] is
/// called.
///
/// # Example
/// ```
/// # use hstt_core::instance::*;
/// let mut builder = InstanceBuilder::new("tiny");
/// let monday_1 = builder.add_time("Mon1");
/// let _ = builder.add_time("Mon2");
/// let teachers = builder.add_resource_type("Teacher");
/// let smith = builder.add_resource("Smith", teachers);
/// let maths = builder.add_event("Maths", 2, Some(monday_1));
/// let _ = builder.add_event_resource(maths, teachers, None, Some(smith));
///
/// let instance = builder.build().unwrap();
/// assert_eq!(instance.time_count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InstanceBuilder {
    name: String,
    times: Vec<Time>,
    time_groups: Vec<PendingTimeGroup>,
    resource_types: Vec<String>,
    resources: Vec<Resource>,
    resource_groups: Vec<PendingResourceGroup>,
    events: Vec<Event>,
    event_groups: Vec<EventGroup>,
    event_resources: Vec<EventResource>,
    constraints: Vec<Constraint>,
}

impl InstanceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        InstanceBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_time(&mut self, name: impl Into<String>) -> TimeId {
        self.times.push(Time { name: name.into() });
        TimeId::create_from_index(self.times.len() - 1)
    }

    pub fn add_time_group(
        &mut self,
        name: impl Into<String>,
        kind: TimeGroupKind,
        times: impl IntoIterator<Item = TimeId>,
    ) -> TimeGroupId {
        self.time_groups.push(PendingTimeGroup {
            name: name.into(),
            kind,
            times: times.into_iter().collect(),
        });
        TimeGroupId::create_from_index(self.time_groups.len() - 1)
    }

    pub fn add_resource_type(&mut self, name: impl Into<String>) -> ResourceTypeId {
        self.resource_types.push(name.into());
        ResourceTypeId::create_from_index(self.resource_types.len() - 1)
    }

    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        resource_type: ResourceTypeId,
    ) -> ResourceId {
        self.resources.push(Resource {
            name: name.into(),
            resource_type,
        });
        ResourceId::create_from_index(self.resources.len() - 1)
    }

    pub fn add_resource_group(
        &mut self,
        name: impl Into<String>,
        resource_type: ResourceTypeId,
        resources: impl IntoIterator<Item = ResourceId>,
        is_partition: bool,
    ) -> ResourceGroupId {
        self.resource_groups.push(PendingResourceGroup {
            name: name.into(),
            resource_type,
            resources: resources.into_iter().collect(),
            is_partition,
        });
        ResourceGroupId::create_from_index(self.resource_groups.len() - 1)
    }

    /// Adds an event whose workload equals its duration.
    pub fn add_event(
        &mut self,
        name: impl Into<String>,
        duration: usize,
        preassigned_time: Option<TimeId>,
    ) -> EventId {
        self.events.push(Event {
            name: name.into(),
            duration,
            workload: duration as i64,
            preassigned_time,
            event_resources: vec![],
        });
        EventId::create_from_index(self.events.len() - 1)
    }

    pub fn set_event_workload(&mut self, event: EventId, workload: i64) {
        self.events[event.index()].workload = workload;
    }

    pub fn add_event_group(
        &mut self,
        name: impl Into<String>,
        events: impl IntoIterator<Item = EventId>,
    ) -> EventGroupId {
        self.event_groups.push(EventGroup {
            name: name.into(),
            events: events.into_iter().collect(),
        });
        EventGroupId::create_from_index(self.event_groups.len() - 1)
    }

    /// Adds an event resource whose workload is that of its event.
    ///
    /// # Panics
    /// When `event` was not returned by [`InstanceBuilder::add_event`].
    pub fn add_event_resource(
        &mut self,
        event: EventId,
        resource_type: ResourceTypeId,
        role: Option<&str>,
        preassigned: Option<ResourceId>,
    ) -> EventResourceId {
        let id = EventResourceId::create_from_index(self.event_resources.len());
        let workload = self.events[event.index()].workload;
        self.events[event.index()].event_resources.push(id);
        self.event_resources.push(EventResource {
            event,
            resource_type,
            role: role.map(str::to_owned),
            preassigned,
            workload,
        });
        id
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> ConstraintId {
        self.constraints.push(constraint);
        ConstraintId::create_from_index(self.constraints.len() - 1)
    }

    pub fn build(self) -> Result<Instance, InstanceError> {
        if self.times.is_empty() {
            return Err(InstanceError::NoTimes);
        }

        let checker = ReferenceChecker {
            times: self.times.len(),
            time_groups: self.time_groups.len(),
            resource_types: self.resource_types.len(),
            resources: self.resources.len(),
            events: self.events.len(),
            event_groups: self.event_groups.len(),
            event_resources: self.event_resources.len(),
        };

        for resource in self.resources.iter() {
            checker.resource_type(&resource.name, resource.resource_type)?;
        }
        for group in self.time_groups.iter() {
            for &time in group.times.iter() {
                checker.time(&group.name, time)?;
            }
        }
        for group in self.resource_groups.iter() {
            checker.resource_type(&group.name, group.resource_type)?;
            for &resource in group.resources.iter() {
                checker.resource(&group.name, resource)?;
                self.check_resource_type(&group.name, group.resource_type, resource)?;
            }
        }
        for event in self.events.iter() {
            if event.duration == 0 {
                return Err(InstanceError::ZeroDuration {
                    event: event.name.clone(),
                });
            }
            if let Some(time) = event.preassigned_time {
                checker.time(&event.name, time)?;
                if time.index() + event.duration > self.times.len() {
                    return Err(InstanceError::PreassignedTimeOutOfRange {
                        event: event.name.clone(),
                        duration: event.duration,
                        time: time.index(),
                    });
                }
            }
        }
        for group in self.event_groups.iter() {
            for &event in group.events.iter() {
                checker.event(&group.name, event)?;
            }
        }
        for event_resource in self.event_resources.iter() {
            let event = &self.events[event_resource.event.index()];
            let context = format!("event resource of '{}'", event.name);
            checker.resource_type(&context, event_resource.resource_type)?;
            if let Some(resource) = event_resource.preassigned {
                checker.resource(&context, resource)?;
                self.check_resource_type(&context, event_resource.resource_type, resource)?;
            }
        }
        for constraint in self.constraints.iter() {
            checker.constraint(constraint)?;
        }

        let time_count = self.times.len();
        let resource_count = self.resources.len();

        let mut resource_types: KeyedVec<ResourceTypeId, ResourceType> = self
            .resource_types
            .into_iter()
            .map(|name| ResourceType {
                name,
                resources: vec![],
                partitions: vec![],
            })
            .collect::<Vec<_>>()
            .into();
        for (index, resource) in self.resources.iter().enumerate() {
            resource_types[resource.resource_type]
                .resources
                .push(ResourceId::create_from_index(index));
        }

        let resource_groups: KeyedVec<ResourceGroupId, ResourceGroup> = self
            .resource_groups
            .into_iter()
            .map(|group| ResourceGroup {
                name: group.name,
                resource_type: group.resource_type,
                resources: ResourceSet::from_keys(resource_count, group.resources),
                is_partition: group.is_partition,
            })
            .collect::<Vec<_>>()
            .into();
        for (id, group) in resource_groups.iter_with_keys() {
            if group.is_partition {
                resource_types[group.resource_type].partitions.push(id);
            }
        }

        let time_groups: KeyedVec<TimeGroupId, TimeGroup> = self
            .time_groups
            .into_iter()
            .map(|group| TimeGroup {
                name: group.name,
                kind: group.kind,
                times: TimeSet::from_keys(time_count, group.times),
            })
            .collect::<Vec<_>>()
            .into();

        let mut preassignments: KeyedVec<ResourceId, Vec<EventResourceId>> = KeyedVec::default();
        preassignments.resize(resource_count, vec![]);
        for (index, event_resource) in self.event_resources.iter().enumerate() {
            if let Some(resource) = event_resource.preassigned {
                preassignments[resource].push(EventResourceId::create_from_index(index));
            }
        }

        Ok(Instance {
            name: self.name,
            times: self.times.into(),
            time_groups,
            resource_types,
            resources: self.resources.into(),
            resource_groups,
            events: self.events.into(),
            event_groups: self.event_groups.into(),
            event_resources: self.event_resources.into(),
            constraints: self.constraints.into(),
            preassignments,
        })
    }

    fn check_resource_type(
        &self,
        context: &str,
        expected: ResourceTypeId,
        resource: ResourceId,
    ) -> Result<(), InstanceError> {
        let actual = self.resources[resource.index()].resource_type;
        if actual != expected {
            return Err(InstanceError::ResourceTypeMismatch {
                context: context.to_owned(),
                expected: self.resource_types[expected.index()].clone(),
                resource: self.resources[resource.index()].name.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct ReferenceChecker {
    times: usize,
    time_groups: usize,
    resource_types: usize,
    resources: usize,
    events: usize,
    event_groups: usize,
    event_resources: usize,
}

impl ReferenceChecker {
    fn check(
        context: &str,
        kind: &'static str,
        index: usize,
        bound: usize,
    ) -> Result<(), InstanceError> {
        if index >= bound {
            return Err(InstanceError::UnknownReference {
                context: context.to_owned(),
                kind,
                index,
            });
        }
        Ok(())
    }

    fn time(&self, context: &str, time: TimeId) -> Result<(), InstanceError> {
        Self::check(context, "time", time.index(), self.times)
    }

    fn time_group(&self, context: &str, time_group: TimeGroupId) -> Result<(), InstanceError> {
        Self::check(context, "time group", time_group.index(), self.time_groups)
    }

    fn resource_type(
        &self,
        context: &str,
        resource_type: ResourceTypeId,
    ) -> Result<(), InstanceError> {
        Self::check(
            context,
            "resource type",
            resource_type.index(),
            self.resource_types,
        )
    }

    fn resource(&self, context: &str, resource: ResourceId) -> Result<(), InstanceError> {
        Self::check(context, "resource", resource.index(), self.resources)
    }

    fn event(&self, context: &str, event: EventId) -> Result<(), InstanceError> {
        Self::check(context, "event", event.index(), self.events)
    }

    fn event_group(&self, context: &str, event_group: EventGroupId) -> Result<(), InstanceError> {
        Self::check(context, "event group", event_group.index(), self.event_groups)
    }

    fn event_resource(
        &self,
        context: &str,
        event_resource: EventResourceId,
    ) -> Result<(), InstanceError> {
        Self::check(
            context,
            "event resource",
            event_resource.index(),
            self.event_resources,
        )
    }

    fn limits(constraint: &Constraint, minimum: i64, maximum: i64) -> Result<(), InstanceError> {
        if minimum > maximum {
            return Err(InstanceError::InvalidLimits {
                constraint: constraint.name.clone(),
                minimum,
                maximum,
            });
        }
        Ok(())
    }

    fn constraint(&self, constraint: &Constraint) -> Result<(), InstanceError> {
        let name = constraint.name.as_str();
        if constraint.weight < 0 {
            return Err(InstanceError::NegativeWeight {
                constraint: constraint.name.clone(),
                weight: constraint.weight,
            });
        }

        match &constraint.kind {
            ConstraintKind::AssignResource { event_resources } => {
                for &event_resource in event_resources {
                    self.event_resource(name, event_resource)?;
                }
            }
            ConstraintKind::AssignTime { events } => {
                for &event in events {
                    self.event(name, event)?;
                }
            }
            ConstraintKind::SplitEvents {
                events,
                min_duration,
                max_duration,
                min_amount,
                max_amount,
            } => {
                Self::limits(constraint, *min_duration as i64, *max_duration as i64)?;
                Self::limits(constraint, *min_amount as i64, *max_amount as i64)?;
                for &event in events {
                    self.event(name, event)?;
                }
            }
            ConstraintKind::DistributeSplitEvents {
                events,
                minimum,
                maximum,
                ..
            } => {
                Self::limits(constraint, *minimum as i64, *maximum as i64)?;
                for &event in events {
                    self.event(name, event)?;
                }
            }
            ConstraintKind::PreferResources {
                event_resources,
                resources,
            } => {
                for &event_resource in event_resources {
                    self.event_resource(name, event_resource)?;
                }
                for &resource in resources {
                    self.resource(name, resource)?;
                }
            }
            ConstraintKind::PreferTimes { events, times, .. } => {
                for &event in events {
                    self.event(name, event)?;
                }
                for &time in times {
                    self.time(name, time)?;
                }
            }
            ConstraintKind::AvoidSplitAssignments {
                event_resource_groups,
            } => {
                for &event_resource in event_resource_groups.iter().flatten() {
                    self.event_resource(name, event_resource)?;
                }
            }
            ConstraintKind::SpreadEvents {
                event_groups,
                limits,
            } => {
                for &event_group in event_groups {
                    self.event_group(name, event_group)?;
                }
                for limit in limits {
                    self.time_group(name, limit.time_group)?;
                    Self::limits(constraint, limit.minimum as i64, limit.maximum as i64)?;
                }
            }
            ConstraintKind::LinkEvents { event_groups } => {
                for &event_group in event_groups {
                    self.event_group(name, event_group)?;
                }
            }
            ConstraintKind::OrderEvents {
                pairs,
                min_separation,
                max_separation,
            } => {
                Self::limits(constraint, *min_separation as i64, *max_separation as i64)?;
                for &(first, second) in pairs {
                    self.event(name, first)?;
                    self.event(name, second)?;
                }
            }
            ConstraintKind::AvoidClashes { resources } => {
                for &resource in resources {
                    self.resource(name, resource)?;
                }
            }
            ConstraintKind::AvoidUnavailableTimes { resources, times } => {
                for &resource in resources {
                    self.resource(name, resource)?;
                }
                for &time in times {
                    self.time(name, time)?;
                }
            }
            ConstraintKind::LimitIdleTimes {
                resources,
                time_groups,
                minimum,
                maximum,
            }
            | ConstraintKind::ClusterBusyTimes {
                resources,
                time_groups,
                minimum,
                maximum,
            }
            | ConstraintKind::LimitBusyTimes {
                resources,
                time_groups,
                minimum,
                maximum,
            } => {
                Self::limits(constraint, *minimum as i64, *maximum as i64)?;
                for &resource in resources {
                    self.resource(name, resource)?;
                }
                for &time_group in time_groups {
                    self.time_group(name, time_group)?;
                }
            }
            ConstraintKind::LimitWorkload {
                resources,
                minimum,
                maximum,
            } => {
                Self::limits(constraint, *minimum, *maximum)?;
                for &resource in resources {
                    self.resource(name, resource)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_references_are_rejected() {
        let mut builder = InstanceBuilder::new("dangling");
        let _ = builder.add_time("t0");
        let _ = builder.add_constraint(Constraint::new(
            "clashes",
            true,
            1,
            ConstraintKind::AvoidClashes {
                resources: vec![ResourceId(3)],
            },
        ));

        let error = builder.build().unwrap_err();
        assert_eq!(
            error,
            InstanceError::UnknownReference {
                context: "clashes".to_owned(),
                kind: "resource",
                index: 3,
            }
        );
    }

    #[test]
    fn preassigned_time_must_leave_room_for_the_duration() {
        let mut builder = InstanceBuilder::new("late");
        let _ = builder.add_time("t0");
        let last = builder.add_time("t1");
        let _ = builder.add_event("double", 2, Some(last));

        assert!(matches!(
            builder.build(),
            Err(InstanceError::PreassignedTimeOutOfRange { duration: 2, .. })
        ));
    }

    #[test]
    fn preassigned_resources_must_have_the_required_type() {
        let mut builder = InstanceBuilder::new("types");
        let _ = builder.add_time("t0");
        let teachers = builder.add_resource_type("Teacher");
        let rooms = builder.add_resource_type("Room");
        let room = builder.add_resource("R1", rooms);
        let event = builder.add_event("lesson", 1, None);
        let _ = builder.add_event_resource(event, teachers, None, Some(room));

        assert!(matches!(
            builder.build(),
            Err(InstanceError::ResourceTypeMismatch { .. })
        ));
    }

    #[test]
    fn partitions_and_preassignments_are_indexed() {
        let mut builder = InstanceBuilder::new("indexed");
        let _ = builder.add_time("t0");
        let teachers = builder.add_resource_type("Teacher");
        let a = builder.add_resource("A", teachers);
        let b = builder.add_resource("B", teachers);
        let _ = builder.add_resource_group("Science", teachers, [a], true);
        let _ = builder.add_resource_group("All", teachers, [a, b], false);
        let event = builder.add_event("lesson", 1, None);
        let event_resource = builder.add_event_resource(event, teachers, None, Some(b));

        let instance = builder.build().unwrap();

        assert_eq!(instance.resource_type(teachers).partitions.len(), 1);
        assert_eq!(instance.preassignments(b), &[event_resource]);
        assert!(instance.preassignments(a).is_empty());
        assert_eq!(
            instance.partition_containing(teachers, &instance.resource_set([a])),
            Some(ResourceGroupId(0))
        );
    }
}

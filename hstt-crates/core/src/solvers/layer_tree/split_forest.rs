use super::SplitTask;
use super::SplitTaskKind;
use crate::containers::HashMap;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::instance::EventId;
use crate::instance::Instance;
use crate::instance::ResourceId;
use crate::instance::TimeSet;

/// The restrictions recorded so far on how the events of one split class are cut into meets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SplitBounds {
    pub(crate) min_duration: usize,
    pub(crate) max_duration: usize,
    pub(crate) min_amount: usize,
    pub(crate) max_amount: usize,
    /// `(duration, minimum, maximum)`: how many meets of exactly that duration are wanted.
    pub(crate) distribution: Vec<(usize, usize, usize)>,
    /// The durations of existing meets, which may not be changed.
    pub(crate) fixed: Option<Vec<usize>>,
    /// The times at which the meets may start.
    pub(crate) domain: TimeSet,
}

impl SplitBounds {
    fn new(duration: usize, longest_part: usize, domain: TimeSet) -> SplitBounds {
        SplitBounds {
            min_duration: 1,
            max_duration: duration.min(longest_part).max(1),
            min_amount: 1,
            max_amount: duration,
            distribution: vec![],
            fixed: None,
            domain,
        }
    }

    /// Whether `parts`, sorted by decreasing duration, is an acceptable partition.
    pub(crate) fn admits(&self, parts: &[usize]) -> bool {
        if let Some(fixed) = &self.fixed {
            return fixed == parts;
        }
        parts.len() >= self.min_amount
            && parts.len() <= self.max_amount
            && parts
                .iter()
                .all(|&part| part >= self.min_duration && part <= self.max_duration)
            && self.distribution.iter().all(|&(duration, minimum, maximum)| {
                let count = parts.iter().filter(|&&part| part == duration).count();
                count >= minimum && count <= maximum
            })
    }

    /// The acceptable partitions of `duration` into parts sorted by decreasing duration, fewest
    /// parts first and, among equally many parts, the most even first.
    pub(crate) fn partitions(&self, duration: usize) -> Vec<Vec<usize>> {
        if let Some(fixed) = &self.fixed {
            return if fixed.iter().sum::<usize>() == duration {
                vec![fixed.clone()]
            } else {
                vec![]
            };
        }
        let mut partitions = vec![];
        let mut parts = vec![];
        self.extend(duration, self.max_duration, &mut parts, &mut partitions);
        partitions.sort_by(|a, b| {
            (a.len(), a.first())
                .cmp(&(b.len(), b.first()))
                .then_with(|| b.cmp(a))
        });
        partitions
    }

    fn extend(
        &self,
        remaining: usize,
        largest: usize,
        parts: &mut Vec<usize>,
        partitions: &mut Vec<Vec<usize>>,
    ) {
        if remaining == 0 {
            if self.admits(parts) {
                partitions.push(parts.clone());
            }
            return;
        }
        if parts.len() >= self.max_amount {
            return;
        }
        for part in (self.min_duration..=largest.min(remaining)).rev() {
            parts.push(part);
            self.extend(remaining - part, part, parts, partitions);
            let _ = parts.pop();
        }
    }

    pub(crate) fn first_partition(&self, duration: usize) -> Option<Vec<usize>> {
        self.partitions(duration).into_iter().next()
    }

    /// The bounds admitting exactly the partitions both `self` and `other` admit.
    fn intersect(&self, other: &SplitBounds) -> Option<SplitBounds> {
        let fixed = match (&self.fixed, &other.fixed) {
            (Some(a), Some(b)) if a != b => return None,
            (Some(a), _) | (_, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };
        let domain = self.domain.intersection(&other.domain);
        if domain.is_empty() {
            return None;
        }
        let mut distribution = self.distribution.clone();
        distribution.extend(other.distribution.iter().copied());
        Some(SplitBounds {
            min_duration: self.min_duration.max(other.min_duration),
            max_duration: self.max_duration.min(other.max_duration),
            min_amount: self.min_amount.max(other.min_amount),
            max_amount: self.max_amount.min(other.max_amount),
            distribution,
            fixed,
            domain,
        })
    }
}

crate::storage_key!(SplitClassId, "sc");

/// A set of events which are split identically, usually one event; linked events share one.
#[derive(Clone, Debug)]
pub(crate) struct SplitClass {
    pub(crate) events: Vec<EventId>,
    pub(crate) duration: usize,
    pub(crate) bounds: SplitBounds,
}

/// The events whose meets one preassigned resource attends, which must not overlap.
#[derive(Clone, Debug)]
pub(crate) struct SplitLayer {
    pub(crate) resource: ResourceId,
    pub(crate) events: Vec<EventId>,
    /// Set once an avoid clashes task accepted the layer; from then on every task must leave
    /// the layer's events with partitions that pack into the cycle meets.
    pub(crate) packed: bool,
    /// The combined parts of the partitions the layer currently packs with, longest first.
    pub(crate) parts: Vec<usize>,
}

/// How many partitions one packing search may try before giving up.
const PACK_SEARCH_LIMIT: usize = 10_000;

/// Whether `parts` fit into bins of sizes `bins` when placed first fit, longest first.
fn packs(parts: &[usize], bins: &[usize]) -> bool {
    let mut parts = parts.to_vec();
    parts.sort_by(|a, b| b.cmp(a));
    let mut free = bins.to_vec();
    parts.iter().all(|&part| match free.iter_mut().find(|room| **room >= part) {
        Some(room) => {
            *room -= part;
            true
        }
        None => false,
    })
}

/// A search for one partition per layer class, taken from `candidates`, such that the
/// partitions repeated by their multiplicities pack into `bins` with at most `max_parts` parts.
struct PackSearch<'a> {
    candidates: &'a [(usize, Vec<Vec<usize>>)],
    bins: &'a [usize],
    max_parts: usize,
    budget: usize,
    parts: Vec<usize>,
    picked: Vec<usize>,
}

impl PackSearch<'_> {
    fn run(&mut self, index: usize) -> bool {
        let candidates = self.candidates;
        let Some((multiplicity, partitions)) = candidates.get(index) else {
            return true;
        };
        for (choice, partition) in partitions.iter().enumerate() {
            if self.budget == 0 {
                return false;
            }
            self.budget -= 1;
            let before = self.parts.len();
            for _ in 0..*multiplicity {
                self.parts.extend(partition.iter().copied());
            }
            if self.parts.len() <= self.max_parts && packs(&self.parts, self.bins) {
                self.picked.push(choice);
                if self.run(index + 1) {
                    return true;
                }
                let _ = self.picked.pop();
            }
            self.parts.truncate(before);
        }
        false
    }
}

/// The shared state of layer tree construction: split classes, merged like a union-find
/// structure, and split layers.
#[derive(Clone, Debug)]
pub(crate) struct SplitForest {
    /// The class of each event, following merges up to the representative.
    class_parent: KeyedVec<SplitClassId, SplitClassId>,
    classes: KeyedVec<SplitClassId, Option<SplitClass>>,
    pub(crate) layers: Vec<SplitLayer>,
    /// The durations of the cycle meets, into which each packed layer must fit.
    bins: Vec<usize>,
}

impl SplitForest {
    /// One class per event, with bounds allowing any partition whose parts fit inside the
    /// longest of the cycle meets with durations `bins`, and one layer per preassigned resource.
    pub(crate) fn new(instance: &Instance, bins: Vec<usize>) -> SplitForest {
        let longest_part = bins.iter().copied().max().unwrap_or(0);
        let mut class_parent = KeyedVec::default();
        let mut classes = KeyedVec::default();
        for event in instance.events() {
            let duration = instance.event(event).duration;
            let _ = class_parent.push(SplitClassId::create_from_index(event.index()));
            let _ = classes.push(Some(SplitClass {
                events: vec![event],
                duration,
                bounds: SplitBounds::new(duration, longest_part, instance.full_time_set()),
            }));
        }

        let layers = instance
            .resources()
            .filter_map(|resource| {
                let mut events = instance
                    .preassignments(resource)
                    .iter()
                    .map(|&event_resource| instance.event_resource(event_resource).event)
                    .collect::<Vec<_>>();
                events.sort();
                events.dedup();
                (!events.is_empty()).then_some(SplitLayer {
                    resource,
                    events,
                    packed: false,
                    parts: vec![],
                })
            })
            .collect();

        SplitForest {
            class_parent,
            classes,
            layers,
            bins,
        }
    }

    pub(crate) fn class_of(&self, event: EventId) -> SplitClassId {
        let mut current = SplitClassId::create_from_index(event.index());
        while self.class_parent[current] != current {
            current = self.class_parent[current];
        }
        current
    }

    pub(crate) fn class(&self, class: SplitClassId) -> Option<&SplitClass> {
        self.classes[class].as_ref()
    }

    /// The representatives of all classes, in event order.
    pub(crate) fn class_ids(&self) -> Vec<SplitClassId> {
        self.classes
            .keys()
            .filter(|&class| self.classes[class].is_some())
            .collect()
    }

    fn bounds_of(&self, event: EventId) -> Option<(SplitClassId, SplitBounds, usize)> {
        let class = self.class_of(event);
        let data = self.classes[class].as_ref()?;
        Some((class, data.bounds.clone(), data.duration))
    }

    /// Replaces the bounds of the class of `event` by `narrow` applied to them, when the result
    /// still admits a partition.
    fn narrow(&mut self, event: EventId, narrow: impl FnOnce(&mut SplitBounds)) -> bool {
        let Some((class, mut bounds, duration)) = self.bounds_of(event) else {
            return false;
        };
        narrow(&mut bounds);
        if bounds.domain.is_empty() || bounds.first_partition(duration).is_none() {
            return false;
        }
        if let Some(data) = self.classes[class].as_mut() {
            data.bounds = bounds;
        }
        true
    }

    /// Applies `task`; a task which would leave some class without an acceptable partition, or
    /// some packed layer without partitions that pack, changes nothing and returns `false`.
    pub(crate) fn try_task(&mut self, task: &SplitTask) -> bool {
        let saved = (
            self.class_parent.clone(),
            self.classes.clone(),
            self.layers.clone(),
        );
        let applied = self.apply(task) && self.repack();
        if !applied {
            (self.class_parent, self.classes, self.layers) = saved;
        }
        applied
    }

    fn apply(&mut self, task: &SplitTask) -> bool {
        match &task.kind {
            SplitTaskKind::Assigned { event, durations } => {
                let mut durations = durations.clone();
                durations.sort_by(|a, b| b.cmp(a));
                self.narrow(*event, |bounds| bounds.fixed = Some(durations))
            }
            SplitTaskKind::Preassigned { event, time } => self.narrow(*event, |bounds| {
                bounds.max_amount = 1;
                let mut domain = bounds.domain.clone();
                domain.intersect_with(&TimeSet::singleton(domain.capacity(), *time));
                bounds.domain = domain;
            }),
            SplitTaskKind::Domain { event, times } => {
                self.narrow(*event, |bounds| bounds.domain.intersect_with(times))
            }
            SplitTaskKind::Split {
                event,
                min_duration,
                max_duration,
                min_amount,
                max_amount,
            } => self.narrow(*event, |bounds| {
                bounds.min_duration = bounds.min_duration.max(*min_duration);
                bounds.max_duration = bounds.max_duration.min(*max_duration);
                bounds.min_amount = bounds.min_amount.max(*min_amount);
                bounds.max_amount = bounds.max_amount.min(*max_amount);
            }),
            SplitTaskKind::DistributeSplit {
                event,
                duration,
                minimum,
                maximum,
            } => self.narrow(*event, |bounds| {
                bounds.distribution.push((*duration, *minimum, *maximum))
            }),
            SplitTaskKind::Spread { events, max_meets } => events.iter().all(|&event| {
                self.narrow(event, |bounds| {
                    bounds.max_amount = bounds.max_amount.min(*max_meets)
                })
            }),
            SplitTaskKind::Link { events } => self.link(events),
            SplitTaskKind::AvoidClashes { resource } => self.pack(*resource),
        }
    }

    /// Merges the classes of `events`, which must have equal durations and compatible bounds.
    fn link(&mut self, events: &[EventId]) -> bool {
        let mut roots = events
            .iter()
            .map(|&event| self.class_of(event))
            .collect::<Vec<_>>();
        roots.sort();
        roots.dedup();
        let Some((&leader, others)) = roots.split_first() else {
            return false;
        };
        let Some(leader_class) = self.classes[leader].clone() else {
            return false;
        };

        let mut merged = leader_class;
        for &other in others {
            let Some(other_class) = self.classes[other].as_ref() else {
                return false;
            };
            if other_class.duration != merged.duration {
                return false;
            }
            let Some(bounds) = merged.bounds.intersect(&other_class.bounds) else {
                return false;
            };
            merged.bounds = bounds;
            merged.events.extend(other_class.events.iter().copied());
        }
        if merged.bounds.first_partition(merged.duration).is_none() {
            return false;
        }

        merged.events.sort();
        for &other in others {
            self.class_parent[other] = leader;
            self.classes[other] = None;
        }
        self.classes[leader] = Some(merged);
        true
    }

    /// Marks the layer of `resource` as packed; [`SplitForest::repack`] then decides whether
    /// its events fit into the cycle meets together.
    fn pack(&mut self, resource: ResourceId) -> bool {
        match self.layers.iter_mut().find(|layer| layer.resource == resource) {
            Some(layer) => {
                layer.packed = true;
                true
            }
            None => false,
        }
    }

    /// The classes of the events of `layer` with the number of its events in each.
    fn layer_classes(&self, layer: &SplitLayer) -> Vec<(SplitClassId, usize)> {
        let mut classes: Vec<(SplitClassId, usize)> = vec![];
        for &event in layer.events.iter() {
            let class = self.class_of(event);
            match classes.iter_mut().find(|(other, _)| *other == class) {
                Some((_, count)) => *count += 1,
                None => classes.push((class, 1)),
            }
        }
        classes
    }

    /// One acceptable partition per class of `classes` such that all their parts pack into the
    /// cycle meets, using as few parts as possible; classes found in `chosen` keep theirs.
    fn layer_partitions(
        &self,
        classes: &[(SplitClassId, usize)],
        chosen: &HashMap<SplitClassId, Vec<usize>>,
    ) -> Option<Vec<Vec<usize>>> {
        let mut candidates = vec![];
        for &(class, multiplicity) in classes.iter() {
            let data = self.classes[class].as_ref()?;
            let partitions = match chosen.get(&class) {
                Some(partition) => vec![partition.clone()],
                None => data.bounds.partitions(data.duration),
            };
            candidates.push((multiplicity, partitions));
        }
        let fewest = candidates
            .iter()
            .map(|(multiplicity, partitions)| {
                multiplicity * partitions.iter().map(Vec::len).min().unwrap_or(0)
            })
            .sum::<usize>();
        let most = candidates
            .iter()
            .map(|(multiplicity, partitions)| {
                multiplicity * partitions.iter().map(Vec::len).max().unwrap_or(0)
            })
            .sum::<usize>();

        let mut budget = PACK_SEARCH_LIMIT;
        for max_parts in fewest..=most {
            let mut search = PackSearch {
                candidates: &candidates,
                bins: &self.bins,
                max_parts,
                budget,
                parts: vec![],
                picked: vec![],
            };
            if search.run(0) {
                return Some(
                    search
                        .picked
                        .iter()
                        .zip(candidates.iter())
                        .map(|(&choice, (_, partitions))| partitions[choice].clone())
                        .collect(),
                );
            }
            budget = search.budget;
            if budget == 0 {
                break;
            }
        }
        None
    }

    /// Recomputes the parts of every packed layer. Returns `false`, leaving the layers alone,
    /// when some packed layer no longer packs.
    fn repack(&mut self) -> bool {
        let mut all_parts = vec![];
        for layer in self.layers.iter() {
            if !layer.packed {
                all_parts.push(vec![]);
                continue;
            }
            let classes = self.layer_classes(layer);
            let Some(partitions) = self.layer_partitions(&classes, &HashMap::default()) else {
                return false;
            };
            let mut parts = vec![];
            for ((_, multiplicity), partition) in classes.iter().zip(partitions.iter()) {
                for _ in 0..*multiplicity {
                    parts.extend(partition.iter().copied());
                }
            }
            parts.sort_by(|a, b| b.cmp(a));
            all_parts.push(parts);
        }
        for (layer, parts) in self.layers.iter_mut().zip(all_parts) {
            layer.parts = parts;
        }
        true
    }

    /// The partition each class is to be split into. Packed layers are settled first, one at a
    /// time, with the partitions of classes settled by earlier layers kept; every other class
    /// takes its first acceptable partition.
    pub(crate) fn chosen_partitions(&self) -> HashMap<SplitClassId, Vec<usize>> {
        let mut chosen: HashMap<SplitClassId, Vec<usize>> = HashMap::default();
        for layer in self.layers.iter().filter(|layer| layer.packed) {
            let classes = self.layer_classes(layer);
            match self.layer_partitions(&classes, &chosen) {
                Some(partitions) => {
                    for ((class, _), partition) in classes.iter().zip(partitions) {
                        let _ = chosen.entry(*class).or_insert(partition);
                    }
                }
                None => log::debug!("the layer of {} no longer packs", layer.resource),
            }
        }
        for class in self.class_ids() {
            if chosen.contains_key(&class) {
                continue;
            }
            if let Some(partition) = self.classes[class]
                .as_ref()
                .and_then(|data| data.bounds.first_partition(data.duration))
            {
                let _ = chosen.insert(class, partition);
            }
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Cost;
    use crate::instance::InstanceBuilder;

    fn bounds(max_duration: usize) -> SplitBounds {
        SplitBounds::new(6, max_duration, TimeSet::full(6))
    }

    #[test]
    fn partitions_prefer_few_even_parts() {
        let mut bounds = bounds(2);
        assert_eq!(bounds.first_partition(5), Some(vec![2, 2, 1]));

        bounds.max_duration = 3;
        bounds.min_amount = 3;
        assert_eq!(bounds.first_partition(6), Some(vec![2, 2, 2]));
    }

    #[test]
    fn distribution_limits_are_respected() {
        let mut bounds = bounds(6);
        bounds.distribution.push((1, 2, 2));
        assert_eq!(bounds.first_partition(4), Some(vec![2, 1, 1]));

        bounds.max_amount = 2;
        assert_eq!(bounds.first_partition(4), None);
    }

    #[test]
    fn fixed_partitions_admit_only_themselves() {
        let mut bounds = bounds(6);
        bounds.fixed = Some(vec![2, 1]);
        assert_eq!(bounds.partitions(3), vec![vec![2, 1]]);
        assert!(bounds.partitions(4).is_empty());
    }

    #[test]
    fn parts_are_packed_longest_first() {
        assert!(packs(&[1, 2, 3], &[3, 3]));
        assert!(!packs(&[2, 2, 2], &[3, 3]));
        assert!(packs(&[], &[]));
        assert!(!packs(&[1], &[]));
    }

    /// Two days of three times; Smith attends Maths (duration 4) and History (duration 2).
    fn smith_forest() -> (SplitForest, ResourceId, [EventId; 2]) {
        let mut builder = InstanceBuilder::new("days");
        for index in 0..6 {
            let _ = builder.add_time(format!("t{index}"));
        }
        let teacher = builder.add_resource_type("Teacher");
        let smith = builder.add_resource("Smith", teacher);
        let maths = builder.add_event("Maths", 4, None);
        let _ = builder.add_event_resource(maths, teacher, None, Some(smith));
        let history = builder.add_event("History", 2, None);
        let _ = builder.add_event_resource(history, teacher, None, Some(smith));
        let instance = builder.build().expect("valid instance");
        (SplitForest::new(&instance, vec![3, 3]), smith, [maths, history])
    }

    fn task(kind: SplitTaskKind) -> SplitTask {
        SplitTask {
            priority: Cost::hard(1),
            kind,
        }
    }

    fn chosen(forest: &SplitForest, event: EventId) -> Vec<usize> {
        forest.chosen_partitions()[&forest.class_of(event)].clone()
    }

    #[test]
    fn a_packed_layer_cuts_its_events_to_fit_the_days() {
        let (mut forest, smith, [maths, history]) = smith_forest();
        assert_eq!(chosen(&forest, maths), vec![2, 2]);

        assert!(forest.try_task(&task(SplitTaskKind::AvoidClashes { resource: smith })));

        assert_eq!(chosen(&forest, maths), vec![3, 1]);
        assert_eq!(chosen(&forest, history), vec![2]);
        assert_eq!(forest.layers[0].parts, vec![3, 2, 1]);
    }

    #[test]
    fn tasks_which_break_a_packed_layer_are_dropped() {
        let (mut forest, smith, [maths, history]) = smith_forest();
        assert!(forest.try_task(&task(SplitTaskKind::AvoidClashes { resource: smith })));

        // Maths in two-time meets still fits when History is taught in single times.
        assert!(forest.try_task(&task(SplitTaskKind::Split {
            event: maths,
            min_duration: 1,
            max_duration: 2,
            min_amount: 1,
            max_amount: 2,
        })));
        assert_eq!(chosen(&forest, maths), vec![2, 2]);
        assert_eq!(chosen(&forest, history), vec![1, 1]);

        // History in one meet no longer fits.
        assert!(!forest.try_task(&task(SplitTaskKind::Split {
            event: history,
            min_duration: 1,
            max_duration: 2,
            min_amount: 1,
            max_amount: 1,
        })));
        assert_eq!(chosen(&forest, history), vec![1, 1]);
        assert_eq!(forest.layers[0].parts, vec![2, 2, 1, 1]);
    }

    #[test]
    fn an_overloaded_layer_is_not_packed() {
        let (mut forest, smith, [maths, _]) = smith_forest();
        assert!(forest.try_task(&task(SplitTaskKind::Assigned {
            event: maths,
            durations: vec![2, 2],
        })));
        forest.bins = vec![3, 2];

        assert!(!forest.try_task(&task(SplitTaskKind::AvoidClashes { resource: smith })));
        assert!(!forest.layers[0].packed);
    }
}

use std::fmt::Debug;

use enum_map::EnumMap;

use super::EjectorContext;
use crate::containers::HashMap;
use crate::monitors::MonitorTag;
use crate::solution::MonitorId;

/// A repair strategy for one category of defect.
///
/// An augment tries a number of repairs of `defect` through [`EjectorContext::try_repair`] and
/// returns `true` as soon as one of them reports that the chain succeeded. When all repairs fail
/// it returns `false` and leaves the solution as it found it.
pub trait Augment: Debug {
    fn augment(&self, context: &mut EjectorContext<'_>, defect: MonitorId) -> bool;
}

/// The augments of an ejector, keyed by the tag of leaf monitors and by the sub-tag of group
/// monitors.
#[derive(Debug, Default)]
pub struct AugmentRegistry {
    by_tag: EnumMap<MonitorTag, Option<Box<dyn Augment>>>,
    by_sub_tag: HashMap<usize, Box<dyn Augment>>,
}

impl AugmentRegistry {
    pub fn set(&mut self, tag: MonitorTag, augment: Box<dyn Augment>) {
        self.by_tag[tag] = Some(augment);
    }

    pub fn set_group(&mut self, sub_tag: usize, augment: Box<dyn Augment>) {
        let _ = self.by_sub_tag.insert(sub_tag, augment);
    }

    pub fn get(&self, tag: MonitorTag) -> Option<&dyn Augment> {
        self.by_tag[tag].as_deref()
    }

    pub fn get_group(&self, sub_tag: usize) -> Option<&dyn Augment> {
        self.by_sub_tag.get(&sub_tag).map(Box::as_ref)
    }
}

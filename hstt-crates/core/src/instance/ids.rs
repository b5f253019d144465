use crate::containers::IdSet;
use crate::storage_key;

storage_key!(
    /// A time of the instance; times are numbered chronologically.
    TimeId,
    "t"
);
storage_key!(TimeGroupId, "tg");
storage_key!(ResourceTypeId, "rt");
storage_key!(ResourceId, "r");
storage_key!(ResourceGroupId, "rg");
storage_key!(EventId, "e");
storage_key!(EventGroupId, "eg");
storage_key!(
    /// One resource requirement of an event, e.g. "a teacher of this class".
    EventResourceId,
    "er"
);
storage_key!(ConstraintId, "c");

/// A set of times, e.g. a meet domain.
pub type TimeSet = IdSet<TimeId>;
/// A set of resources, e.g. a task domain.
pub type ResourceSet = IdSet<ResourceId>;

impl TimeId {
    /// The time `offset` steps later; callers check the result against the number of times.
    pub fn offset(self, offset: usize) -> TimeId {
        TimeId(self.0 + offset as u32)
    }
}

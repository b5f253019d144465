use crate::storage_key;

storage_key!(
    /// A meet: a block of consecutive times, possibly assigned into another meet.
    MeetId,
    "m"
);
storage_key!(
    /// A task: the requirement of one meet for one resource.
    TaskId,
    "k"
);
storage_key!(NodeId, "n");
storage_key!(LayerId, "l");
storage_key!(ZoneId, "z");
storage_key!(MonitorId, "M");

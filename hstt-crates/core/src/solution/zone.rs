use super::*;
use crate::containers::HashSet;

#[derive(Clone, Debug)]
pub(crate) struct Zone {
    pub(crate) node: NodeId,
    pub(crate) meet_offsets: Vec<(MeetId, usize)>,
    pub(crate) deleted: bool,
}

impl Solution {
    pub fn zone_node(&self, zone: ZoneId) -> NodeId {
        self.zones[zone].node
    }

    pub fn zone_meet_offsets(&self, zone: ZoneId) -> &[(MeetId, usize)] {
        &self.zones[zone].meet_offsets
    }

    /// The zone of `offset` in `meet`, if any.
    pub fn meet_offset_zone(&self, meet: MeetId, offset: usize) -> Option<ZoneId> {
        self.meets[meet].zones.get(offset).copied().flatten()
    }

    pub fn zone_make(&mut self, node: NodeId) -> ZoneId {
        let zone = self.zones.push(Zone {
            node,
            meet_offsets: vec![],
            deleted: false,
        });
        self.nodes[node].zones.push(zone);
        zone
    }

    pub fn zone_delete(&mut self, zone: ZoneId) {
        if self.zones[zone].deleted {
            return;
        }
        for (meet, offset) in std::mem::take(&mut self.zones[zone].meet_offsets) {
            self.meets[meet].zones[offset] = None;
        }
        let node = self.zones[zone].node;
        self.nodes[node].zones.retain(|&other| other != zone);
        self.zones[zone].deleted = true;
    }

    /// Puts `offset` of `meet` into `zone`; declines when `meet` does not lie in the node of
    /// `zone` or when that offset already has a zone.
    pub fn zone_add_meet_offset(&mut self, zone: ZoneId, meet: MeetId, offset: usize) -> bool {
        let node = self.zones[zone].node;
        if self.zones[zone].deleted
            || self.meets[meet].node != Some(node)
            || offset >= self.meets[meet].duration
            || self.meets[meet].zones[offset].is_some()
        {
            return false;
        }
        self.meets[meet].zones[offset] = Some(zone);
        self.zones[zone].meet_offsets.push((meet, offset));
        true
    }

    /// Takes `offset` of `meet` out of its zone, if it has one.
    pub fn zone_delete_meet_offset(&mut self, meet: MeetId, offset: usize) {
        let Some(zone) = self.meet_offset_zone(meet, offset) else {
            return;
        };
        self.meets[meet].zones[offset] = None;
        self.zones[zone]
            .meet_offsets
            .retain(|&entry| entry != (meet, offset));
    }

    /// How badly `meet` would fit the zones of `target` at `offset`: the number of covered
    /// offsets without a zone plus the number of distinct zones covered beyond the first.
    pub fn zone_irregularity(&self, meet: MeetId, target: MeetId, offset: usize) -> usize {
        let duration = self.meets[meet].duration;
        let mut zones: HashSet<ZoneId> = HashSet::default();
        let mut unzoned = 0;
        for position in offset..offset + duration {
            match self.meet_offset_zone(target, position) {
                Some(zone) => {
                    let _ = zones.insert(zone);
                }
                None => unzoned += 1,
            }
        }
        unzoned + zones.len().saturating_sub(1)
    }

    /// The total irregularity of the assigned meets of the child nodes of `node`, measured
    /// against the zones of `node`. Zero when `node` has no zones.
    pub fn node_irregularity(&self, node: NodeId) -> usize {
        if self.nodes[node].zones.is_empty() {
            return 0;
        }
        self.nodes[node]
            .children
            .iter()
            .flat_map(|&child| self.nodes[child].meets.iter())
            .filter_map(|&meet| {
                let (target, offset) = self.meets[meet].assignment?;
                (self.meets[target].node == Some(node))
                    .then(|| self.zone_irregularity(meet, target, offset))
            })
            .sum()
    }

    /// Replaces the zones of `node` by one zone per meet of the child nodes of `layer` assigned
    /// to a meet of `node`, covering the offsets that meet occupies.
    pub fn node_zones_make_from_layer(&mut self, node: NodeId, layer: LayerId) {
        while let Some(&zone) = self.nodes[node].zones.last() {
            self.zone_delete(zone);
        }
        let placements = self.layers[layer]
            .children
            .iter()
            .flat_map(|&child| self.nodes[child].meets.iter().copied())
            .filter_map(|meet| {
                let (target, offset) = self.meets[meet].assignment?;
                (self.meets[target].node == Some(node))
                    .then_some((target, offset, self.meets[meet].duration))
            })
            .collect::<Vec<_>>();
        for (target, offset, duration) in placements {
            let zone = self.zone_make(node);
            for position in offset..offset + duration {
                let _ = self.zone_add_meet_offset(zone, target, position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_instances;

    #[test]
    fn irregularity_counts_unzoned_and_extra_zones() {
        let mut solution = test_instances::two_teacher_solution();
        let node = solution.node_make();
        let target = solution.meet_make(4, None);
        let meet = solution.meet_make(2, None);
        assert!(solution.node_add_meet(node, target));

        let first = solution.zone_make(node);
        let second = solution.zone_make(node);
        assert!(solution.zone_add_meet_offset(first, target, 0));
        assert!(solution.zone_add_meet_offset(first, target, 1));
        assert!(solution.zone_add_meet_offset(second, target, 2));

        assert_eq!(solution.zone_irregularity(meet, target, 0), 0);
        assert_eq!(solution.zone_irregularity(meet, target, 1), 1);
        assert_eq!(solution.zone_irregularity(meet, target, 2), 1);
    }

    #[test]
    fn zones_follow_a_split_meet() {
        let mut solution = test_instances::two_teacher_solution();
        let node = solution.node_make();
        let meet = solution.meet_make(3, None);
        assert!(solution.node_add_meet(node, meet));
        let zone = solution.zone_make(node);
        assert!(solution.zone_add_meet_offset(zone, meet, 2));

        let other = solution.meet_split(meet, 1).unwrap();

        assert_eq!(solution.meet_offset_zone(other, 1), Some(zone));
        assert_eq!(solution.zone_meet_offsets(zone), &[(other, 1)]);
    }
}

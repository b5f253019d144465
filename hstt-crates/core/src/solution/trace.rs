use super::*;
use crate::basic_types::Cost;
use crate::containers::HashMap;
use crate::hstt_assert_simple;

/// Handle of an open trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceId(usize);

#[derive(Clone, Debug)]
pub(crate) struct TraceState {
    group: MonitorId,
    initial: HashMap<MonitorId, Cost>,
    order: Vec<MonitorId>,
}

/// One monitor whose cost changed while a trace was open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub monitor: MonitorId,
    pub initial_cost: Cost,
    pub final_cost: Cost,
}

/// The monitors below the traced group whose cost differs between the start and the end of
/// the trace, in the order in which they first changed.
#[derive(Clone, Debug)]
pub struct TraceReport {
    group: MonitorId,
    entries: Vec<TraceEntry>,
}

impl TraceReport {
    pub fn group(&self) -> MonitorId {
        self.group
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// The monitors whose cost went up.
    pub fn increased(&self) -> impl Iterator<Item = &TraceEntry> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.final_cost > entry.initial_cost)
    }
}

impl Solution {
    /// Starts recording the initial cost of every monitor below `group` whose cost changes.
    pub fn trace_begin(&mut self, group: MonitorId) -> TraceId {
        let state = TraceState {
            group,
            initial: HashMap::default(),
            order: vec![],
        };
        self.active_traces += 1;
        if let Some(slot) = self.traces.iter().position(Option::is_none) {
            self.traces[slot] = Some(state);
            TraceId(slot)
        } else {
            self.traces.push(Some(state));
            TraceId(self.traces.len() - 1)
        }
    }

    pub fn trace_end(&mut self, trace: TraceId) -> TraceReport {
        let state = self.traces[trace.0].take();
        hstt_assert_simple!(state.is_some(), "trace {trace:?} is not open");
        self.active_traces -= 1;
        let Some(state) = state else {
            return TraceReport {
                group: self.root_monitor,
                entries: vec![],
            };
        };

        let entries = state
            .order
            .iter()
            .filter(|&&monitor| {
                monitor != state.group && self.monitor_is_below(monitor, state.group)
            })
            .filter_map(|&monitor| {
                let initial_cost = state.initial[&monitor];
                let final_cost = self.monitors[monitor].cost;
                (initial_cost != final_cost).then_some(TraceEntry {
                    monitor,
                    initial_cost,
                    final_cost,
                })
            })
            .collect();
        TraceReport {
            group: state.group,
            entries,
        }
    }

    /// Notes the cost of `monitor` before a change, in every open trace which has not seen it yet.
    pub(crate) fn trace_note(&mut self, monitor: MonitorId, old_cost: Cost) {
        if self.active_traces == 0 {
            return;
        }
        for trace in self.traces.iter_mut().flatten() {
            if let std::collections::hash_map::Entry::Vacant(entry) = trace.initial.entry(monitor) {
                let _ = entry.insert(old_cost);
                trace.order.push(monitor);
            }
        }
    }
}

use std::fmt::Write;

use enum_map::EnumMap;

use super::*;
use crate::basic_types::Cost;
use crate::containers::StorageKey;
use crate::monitors::MonitorTag;

/// The total cost and the number of defects of the attached leaf monitors of one tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CostSummary {
    pub cost: Cost,
    pub defects: usize,
}

impl Solution {
    /// Breaks the cost of the solution down by monitor tag.
    pub fn cost_by_tag(&self) -> EnumMap<MonitorTag, CostSummary> {
        let mut summaries = EnumMap::<MonitorTag, CostSummary>::default();
        for monitor in self.monitors() {
            let state = &self.monitors[monitor];
            let tag = state.kind.tag();
            if !state.attached || tag == MonitorTag::Group {
                continue;
            }
            summaries[tag].cost += state.cost;
            if state.cost.is_positive() {
                summaries[tag].defects += 1;
            }
        }
        summaries
    }

    /// Logs the non-zero entries of [`Solution::cost_by_tag`].
    pub fn log_cost_breakdown(&self) {
        for (tag, summary) in self.cost_by_tag() {
            if summary.defects > 0 {
                log::debug!("{tag:?}: {} in {} defects", summary.cost, summary.defects);
            }
        }
    }

    /// The timetable of `resource` as text, one line per time listing the events of the tasks
    /// running there.
    pub fn debug_timetable(&self, resource: ResourceId) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "{}:", self.instance.resource(resource).name);
        for time in self.instance.times() {
            let _ = write!(text, "  {:>8}", self.instance.time(time).name);
            for &task in self.timetables[resource].cells[time.index()].iter() {
                let event = self.tasks[task]
                    .meet
                    .and_then(|meet| self.meets[meet].event)
                    .map_or("-", |event| self.instance.event(event).name.as_str());
                let _ = write!(text, " {event}");
            }
            let _ = writeln!(text);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use crate::basic_types::Cost;
    use crate::instance::ResourceId;
    use crate::monitors::MonitorTag;
    use crate::test_instances;

    #[test]
    fn breakdown_adds_up_to_the_cost() {
        let solution = test_instances::two_teacher_solution();
        let breakdown = solution.cost_by_tag();

        assert_eq!(breakdown[MonitorTag::AssignTime].defects, 3);
        assert_eq!(
            breakdown.values().map(|summary| summary.cost).sum::<Cost>(),
            solution.cost()
        );
    }

    #[test]
    fn timetable_lists_running_events() {
        let mut solution = test_instances::two_teacher_solution();
        let cycle = solution.cycle_meets()[0];
        let meet = solution.event_meets(crate::instance::EventId(2))[0];
        let task = solution.meet_tasks(meet)[0];
        assert!(solution.meet_assign(meet, cycle, 1));
        assert!(solution.task_assign_resource(task, ResourceId(1)));

        let text = solution.debug_timetable(ResourceId(1));
        assert!(text.lines().nth(2).unwrap().ends_with("e2"));
    }
}

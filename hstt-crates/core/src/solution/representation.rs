use super::*;

impl Solution {
    /// Gives every event without meets one meet spanning its whole duration, restricted to its
    /// preassigned time if it has one, and gives every meet of an event one task per event
    /// resource it lacks.
    pub fn make_complete_representation(&mut self) {
        let instance = Arc::clone(&self.instance);
        for event in instance.events() {
            let definition = instance.event(event);
            if self.event_meets[event].is_empty() {
                let meet = self.meet_make(definition.duration, Some(event));
                if let Some(time) = definition.preassigned_time {
                    let changed = self.meet_set_domain(meet, instance.time_set([time]));
                    crate::hstt_assert_simple!(changed, "a fresh meet accepts any domain");
                }
            }

            for index in 0..self.event_meets[event].len() {
                let meet = self.event_meets[event][index];
                for &event_resource in definition.event_resources.iter() {
                    let has_task = self.meets[meet]
                        .tasks
                        .iter()
                        .any(|&task| self.tasks[task].event_resource == Some(event_resource));
                    if !has_task {
                        let _ = self.task_make(meet, event_resource);
                    }
                }
            }
        }
        log::debug!(
            "complete representation: {} meets, {} tasks",
            self.meets().count(),
            self.tasks().count()
        );
    }
}

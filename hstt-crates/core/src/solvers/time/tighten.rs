use crate::containers::HashMap;
use crate::instance::ResourceGroupId;
use crate::solution::Solution;
use crate::solution::TaskId;

/// Tightens the domain of every unassigned task which could be given resources from more than
/// one partition to a single partition, so that demand for resources of one partition is not
/// counted against the supply of another.
///
/// Tasks are taken longest first; each goes to the partition with the smallest load per
/// resource, where the load of a partition is the total duration of the tasks already confined
/// to it. Returns the number of tasks tightened.
pub fn tighten_to_partition(solution: &mut Solution) -> usize {
    let instance = std::sync::Arc::clone(solution.instance_arc());
    let mut loads: HashMap<ResourceGroupId, usize> = HashMap::default();

    let mut open = vec![];
    for task in solution.tasks().collect::<Vec<_>>() {
        if solution.task_is_cycle(task) || solution.task_meet(task).is_none() {
            continue;
        }
        let resource_type = solution.task_resource_type(task);
        let domain = solution.task_domain(task);
        match instance.partition_containing(resource_type, domain) {
            Some(partition) => *loads.entry(partition).or_default() += solution.task_duration(task),
            None if solution.task_assignment(task).is_none()
                && !instance.resource_type(resource_type).partitions.is_empty() =>
            {
                open.push(task);
            }
            None => {}
        }
    }
    open.sort_by_key(|&task: &TaskId| (std::cmp::Reverse(solution.task_duration(task)), task));

    let mut tightened = 0;
    for task in open {
        let resource_type = solution.task_resource_type(task);
        let best = instance
            .resource_type(resource_type)
            .partitions
            .iter()
            .copied()
            .filter_map(|partition| {
                let resources = &instance.resource_group(partition).resources;
                let size = resources.intersection(solution.task_domain(task)).len();
                (size > 0).then(|| (partition, loads.get(&partition).copied().unwrap_or(0), size))
            })
            // Compares load / size without division.
            .min_by(|&(a, a_load, a_size), &(b, b_load, b_size)| {
                (a_load * b_size)
                    .cmp(&(b_load * a_size))
                    .then(a.cmp(&b))
            });
        let Some((partition, _, _)) = best else {
            continue;
        };
        let resources = instance.resource_group(partition).resources.clone();
        if solution.task_tighten_domain(task, &resources) {
            *loads.entry(partition).or_default() += solution.task_duration(task);
            tightened += 1;
        }
    }
    log::debug!("tightened {tightened} task domains to a partition");
    tightened
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::instance::InstanceBuilder;

    #[test]
    fn tasks_spread_over_the_partitions() {
        let mut builder = InstanceBuilder::new("rooms");
        for index in 0..2 {
            let _ = builder.add_time(format!("t{index}"));
        }
        let room = builder.add_resource_type("Room");
        let rooms = (0..4)
            .map(|index| builder.add_resource(format!("r{index}"), room))
            .collect::<Vec<_>>();
        let _ = builder.add_resource_group("north", room, rooms[..2].to_vec(), true);
        let _ = builder.add_resource_group("south", room, rooms[2..].to_vec(), true);
        for index in 0..2 {
            let event = builder.add_event(format!("e{index}"), 1, None);
            let _ = builder.add_event_resource(event, room, None, None);
        }
        let instance = builder.build().expect("valid instance");
        let mut solution = Solution::new(Arc::new(instance));
        solution.make_complete_representation();

        assert_eq!(tighten_to_partition(&mut solution), 2);

        let domains = solution
            .tasks()
            .filter(|&task| !solution.task_is_cycle(task))
            .map(|task| solution.task_domain(task).clone())
            .collect::<Vec<_>>();
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[0].len(), 2);
        assert_eq!(domains[1].len(), 2);
        assert!(domains[0].is_disjoint(&domains[1]));
    }
}

use super::layer_tree_make;
use super::resource::task_tree_make;
use super::resource::tasking_assign_resources;
use super::resource::ResourceSolveOptions;
use super::time::cycle_node_assign_times;
use super::time::TimeSolveOptions;
use super::LayerTreeOptions;
use crate::instance::ConstraintKind;
use crate::instance::EventResourceId;
use crate::instance::Instance;
use crate::instance::ResourceTypeId;
use crate::monitors::EvennessOptions;
use crate::monitors::MatchingOptions;
use crate::solution::Solution;

/// Which resource types [`general_solve`] assigns resources for.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssignResourcesPolicy {
    /// Every resource type.
    Always,
    /// The resource types of event resources which a constraint asks to be assigned, preferred
    /// or kept together.
    #[default]
    IfConstrained,
    /// None; only times are assigned.
    Never,
}

#[derive(Clone, Debug)]
pub struct GeneralSolveOptions {
    pub layer_tree: LayerTreeOptions,
    pub time: TimeSolveOptions,
    pub resource: ResourceSolveOptions,
    pub assign_resources: AssignResourcesPolicy,
    /// Install the demand matching while solving; `None` leaves it out.
    pub matching: Option<MatchingOptions>,
    /// Install the evenness monitors while solving; `None` leaves them out.
    pub evenness: Option<EvennessOptions>,
    /// Split the cycle meet at day boundaries first.
    pub split_cycle_meet: bool,
    /// Merge adjacent meets of the same event at the end when this does not raise the cost.
    pub merge_meets: bool,
}

impl Default for GeneralSolveOptions {
    fn default() -> Self {
        GeneralSolveOptions {
            layer_tree: LayerTreeOptions::default(),
            time: TimeSolveOptions::default(),
            resource: ResourceSolveOptions::default(),
            assign_resources: AssignResourcesPolicy::default(),
            matching: Some(MatchingOptions::default()),
            evenness: Some(EvennessOptions::default()),
            split_cycle_meet: true,
            merge_meets: true,
        }
    }
}

/// Whether a constraint asks for the event resources of `resource_type` to be assigned,
/// assigned particular resources, or assigned one resource together.
fn resource_type_is_constrained(instance: &Instance, resource_type: ResourceTypeId) -> bool {
    let of_type = |event_resource: EventResourceId| {
        instance.event_resource(event_resource).resource_type == resource_type
    };
    instance
        .constraints()
        .any(|(_, constraint)| match &constraint.kind {
            ConstraintKind::AssignResource { event_resources }
            | ConstraintKind::PreferResources {
                event_resources, ..
            } => event_resources.iter().copied().any(of_type),
            ConstraintKind::AvoidSplitAssignments {
                event_resource_groups,
            } => event_resource_groups
                .iter()
                .flatten()
                .copied()
                .any(of_type),
            _ => false,
        })
}

/// Merges adjacent meets of the same event wherever the merge keeps the cost. Returns the
/// number of merges.
pub fn merge_meets(solution: &mut Solution) -> usize {
    let instance = std::sync::Arc::clone(solution.instance_arc());
    let mut merged = 0;
    for event in instance.events() {
        let mut changed = true;
        while changed {
            changed = false;
            let meets = solution.event_meets(event).to_vec();
            'pairs: for &first in meets.iter() {
                for &second in meets.iter() {
                    if !solution.meet_merge_check(first, second) {
                        continue;
                    }
                    let cost = solution.cost();
                    let mark = solution.transaction_begin();
                    if solution.meet_merge(first, second) && solution.cost() <= cost {
                        solution.transaction_commit(mark);
                        merged += 1;
                        changed = true;
                        break 'pairs;
                    }
                    solution.transaction_rollback(mark);
                }
            }
        }
    }
    log::debug!("{merged} meets merged");
    merged
}

/// Removes the demand and evenness monitors and attaches every constraint monitor directly
/// below the root, so that the cost of the solution is the cost the constraints define.
pub fn ensure_official_cost(solution: &mut Solution) {
    solution.matching_uninstall();
    solution.evenness_uninstall();
    let root = solution.root_monitor();
    for monitor in solution.constraint_monitors().collect::<Vec<_>>() {
        if solution.monitor_parent(monitor) != Some(root) {
            solution.monitor_set_parent(monitor, root);
        }
        solution.monitor_attach(monitor);
    }
}

/// Solves `solution` from whatever state it is in: splits the cycle meet, completes the
/// representation, builds the task and layer trees, installs the structural monitors, assigns
/// times, assigns resources as the options ask, restores the official cost and merges meets.
pub fn general_solve(solution: &mut Solution, options: &GeneralSolveOptions) {
    let instance = std::sync::Arc::clone(solution.instance_arc());
    log::info!("solving {} from cost {}", instance.name(), solution.cost());

    let untouched = solution.cycle_node().is_none()
        && solution
            .cycle_meets()
            .iter()
            .all(|&meet| solution.meet_assigned_children(meet).is_empty());
    if options.split_cycle_meet && untouched {
        solution.split_cycle_meet();
    }
    solution.make_complete_representation();
    let _ = task_tree_make(solution);
    let _ = layer_tree_make(solution, &options.layer_tree);

    if let Some(matching) = options.matching {
        solution.matching_install(matching);
    }
    if let Some(evenness) = options.evenness {
        solution.evenness_install(evenness);
    }

    let _ = cycle_node_assign_times(solution, &options.time);

    for resource_type in instance.resource_types() {
        let assign = match options.assign_resources {
            AssignResourcesPolicy::Always => true,
            AssignResourcesPolicy::IfConstrained => {
                resource_type_is_constrained(&instance, resource_type)
            }
            AssignResourcesPolicy::Never => false,
        };
        if !assign {
            log::info!(
                "resources of {} are not assigned",
                instance.resource_type(resource_type).name
            );
            continue;
        }
        let _ = tasking_assign_resources(solution, resource_type, &options.resource);
    }

    ensure_official_cost(solution);
    if options.merge_meets {
        let _ = merge_meets(solution);
    }
    log::info!("solved {} at cost {}", instance.name(), solution.cost());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Cost;
    use crate::instance::ResourceId;
    use crate::test_instances::two_teacher_solution;

    #[test]
    fn the_two_teacher_instance_is_solved() {
        let mut solution = two_teacher_solution();
        general_solve(&mut solution, &GeneralSolveOptions::default());

        assert_eq!(solution.cost(), Cost::ZERO);
        assert!(solution.check_costs().is_empty());
        assert!(!solution.has_matching());
    }

    #[test]
    fn resources_can_be_left_alone() {
        let mut solution = two_teacher_solution();
        let options = GeneralSolveOptions {
            assign_resources: AssignResourcesPolicy::Never,
            ..Default::default()
        };
        general_solve(&mut solution, &options);

        // The task tree still gives e0 and e1 their teacher; e2 has none.
        assert_eq!(solution.cost(), Cost::hard(1));
        let teacher = solution.instance().resource(ResourceId(0)).resource_type;
        assert!(resource_type_is_constrained(solution.instance(), teacher));
    }
}

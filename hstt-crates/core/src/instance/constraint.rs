use super::EventGroupId;
use super::EventId;
use super::EventResourceId;
use super::ResourceId;
use super::TimeGroupId;
use super::TimeId;
use crate::basic_types::Cost;
use crate::basic_types::Deviations;

/// How the deviations of one point of application are combined into a single number before the
/// weight is applied.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CostFunction {
    /// The sum of the deviations.
    #[default]
    Sum,
    /// The number of non-zero deviations.
    SumSteps,
    /// One if the sum of the deviations is non-zero, zero otherwise.
    StepSum,
    /// The sum of the squared deviations.
    SumSquares,
    /// The square of the sum of the deviations.
    SquareSum,
}

impl CostFunction {
    pub fn apply(self, deviations: &Deviations) -> i64 {
        match self {
            CostFunction::Sum => deviations.sum(),
            CostFunction::SumSteps => deviations.non_zero(),
            CostFunction::StepSum => i64::from(deviations.sum() > 0),
            CostFunction::SumSquares => deviations.sum_of_squares(),
            CostFunction::SquareSum => deviations.sum() * deviations.sum(),
        }
    }
}

/// A lower and upper bound on the number of meets starting in one time group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeGroupLimit {
    pub time_group: TimeGroupId,
    pub minimum: usize,
    pub maximum: usize,
}

/// The category of a constraint together with its parameters and points of application.
///
/// Every point of application becomes one monitor of the solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    AssignResource {
        event_resources: Vec<EventResourceId>,
    },
    AssignTime {
        events: Vec<EventId>,
    },
    SplitEvents {
        events: Vec<EventId>,
        min_duration: usize,
        max_duration: usize,
        min_amount: usize,
        max_amount: usize,
    },
    DistributeSplitEvents {
        events: Vec<EventId>,
        duration: usize,
        minimum: usize,
        maximum: usize,
    },
    PreferResources {
        event_resources: Vec<EventResourceId>,
        resources: Vec<ResourceId>,
    },
    PreferTimes {
        events: Vec<EventId>,
        times: Vec<TimeId>,
        /// When present, only meets of exactly this duration are constrained.
        duration: Option<usize>,
    },
    AvoidSplitAssignments {
        /// Each inner list is one point of application: these event resources should all be
        /// assigned the same resource.
        event_resource_groups: Vec<Vec<EventResourceId>>,
    },
    SpreadEvents {
        event_groups: Vec<EventGroupId>,
        limits: Vec<TimeGroupLimit>,
    },
    LinkEvents {
        event_groups: Vec<EventGroupId>,
    },
    OrderEvents {
        pairs: Vec<(EventId, EventId)>,
        min_separation: usize,
        max_separation: usize,
    },
    AvoidClashes {
        resources: Vec<ResourceId>,
    },
    AvoidUnavailableTimes {
        resources: Vec<ResourceId>,
        times: Vec<TimeId>,
    },
    LimitIdleTimes {
        resources: Vec<ResourceId>,
        time_groups: Vec<TimeGroupId>,
        minimum: usize,
        maximum: usize,
    },
    ClusterBusyTimes {
        resources: Vec<ResourceId>,
        time_groups: Vec<TimeGroupId>,
        minimum: usize,
        maximum: usize,
    },
    LimitBusyTimes {
        resources: Vec<ResourceId>,
        time_groups: Vec<TimeGroupId>,
        minimum: usize,
        maximum: usize,
    },
    LimitWorkload {
        resources: Vec<ResourceId>,
        minimum: i64,
        maximum: i64,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub required: bool,
    pub weight: i64,
    pub cost_function: CostFunction,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(name: impl Into<String>, required: bool, weight: i64, kind: ConstraintKind) -> Self {
        Constraint {
            name: name.into(),
            required,
            weight,
            cost_function: CostFunction::default(),
            kind,
        }
    }

    pub fn with_cost_function(mut self, cost_function: CostFunction) -> Self {
        self.cost_function = cost_function;
        self
    }

    /// The cost of a point of application with the given deviations: hard when the constraint
    /// is required, soft otherwise.
    pub fn cost(&self, deviations: &Deviations) -> Cost {
        let value = self.weight * self.cost_function.apply(deviations);
        if self.required {
            Cost::hard(value)
        } else {
            Cost::soft(value)
        }
    }

    /// The weight as a cost, used to order split tasks and as the combined weight of demand
    /// monitors.
    pub fn combined_weight(&self) -> Cost {
        if self.required {
            Cost::hard(self.weight)
        } else {
            Cost::soft(self.weight)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_functions_are_applied_to_the_tally() {
        let deviations = Deviations::from_values([1, 3]);

        assert_eq!(CostFunction::Sum.apply(&deviations), 4);
        assert_eq!(CostFunction::SumSteps.apply(&deviations), 2);
        assert_eq!(CostFunction::StepSum.apply(&deviations), 1);
        assert_eq!(CostFunction::SumSquares.apply(&deviations), 10);
        assert_eq!(CostFunction::SquareSum.apply(&deviations), 16);
    }

    #[test]
    fn required_constraints_cost_hard_units() {
        let kind = ConstraintKind::AvoidClashes { resources: vec![] };
        let hard = Constraint::new("clashes", true, 2, kind.clone());
        let soft = Constraint::new("clashes", false, 2, kind);
        let deviations = Deviations::from_values([3]);

        assert_eq!(hard.cost(&deviations), Cost::hard(6));
        assert_eq!(soft.cost(&deviations), Cost::soft(6));
    }
}

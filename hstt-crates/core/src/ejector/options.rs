use super::EjectorSchedules;

/// When a chain is accepted.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolveType {
    /// Keep the first chain which lowers the cost of the group.
    #[default]
    FirstSuccess,
    /// Search every chain from a defect and keep the one with the lowest cost, preferring the
    /// least disruptive one among equals.
    MinCost,
    /// Search every chain from a defect and keep the least disruptive one, preferring the lowest
    /// cost among equals.
    MinDisruptionThenCost,
}

/// The options of an [`Ejector`](super::Ejector).
#[derive(Clone, Debug, Default)]
pub struct EjectorOptions {
    pub schedules: EjectorSchedules,
    pub solve_type: SolveType,
}

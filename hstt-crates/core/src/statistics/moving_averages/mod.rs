mod cumulative_moving_average;

pub use cumulative_moving_average::CumulativeMovingAverage;

/// An average which can be updated one term at a time.
pub trait MovingAverage<Term> {
    fn add_term(&mut self, new_term: Term);

    fn value(&self) -> f64;
}

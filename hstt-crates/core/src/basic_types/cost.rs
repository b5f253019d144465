use std::fmt::Display;
use std::fmt::Formatter;
use std::iter::Sum;
use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Mul;
use std::ops::Neg;
use std::ops::Sub;
use std::ops::SubAssign;

const HARD_SHIFT: u32 = 32;

/// The cost of a solution, a monitor or a cost delta.
///
/// A single 64-bit value which packs hard cost in the high 32 bits and soft cost in the low 32
/// bits, so that comparing two costs compares hard cost first. Deltas may be negative, in which
/// case the packing is that of two's complement arithmetic on the combined value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(i64);

impl Cost {
    pub const ZERO: Cost = Cost(0);
    pub const MAX: Cost = Cost(i64::MAX);

    pub const fn new(hard: i64, soft: i64) -> Cost {
        Cost((hard << HARD_SHIFT) + soft)
    }

    pub const fn hard(hard: i64) -> Cost {
        Cost::new(hard, 0)
    }

    pub const fn soft(soft: i64) -> Cost {
        Cost::new(0, soft)
    }

    /// The hard component, rounding towards minus infinity for negative deltas.
    pub const fn hard_cost(self) -> i64 {
        self.0 >> HARD_SHIFT
    }

    pub const fn soft_cost(self) -> i64 {
        self.0 - (self.hard_cost() << HARD_SHIFT)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:05}", self.hard_cost(), self.soft_cost())
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0 + rhs.0)
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.0 += rhs.0;
    }
}

impl Sub for Cost {
    type Output = Cost;

    fn sub(self, rhs: Cost) -> Cost {
        Cost(self.0 - rhs.0)
    }
}

impl SubAssign for Cost {
    fn sub_assign(&mut self, rhs: Cost) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cost {
    type Output = Cost;

    fn neg(self) -> Cost {
        Cost(-self.0)
    }
}

impl Mul<i64> for Cost {
    type Output = Cost;

    fn mul(self, rhs: i64) -> Cost {
        Cost(self.0 * rhs)
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_cost_dominates_soft_cost() {
        assert!(Cost::new(1, 0) > Cost::new(0, 1_000_000));
        assert!(Cost::new(0, 2) > Cost::new(0, 1));
    }

    #[test]
    fn components_are_recovered() {
        let cost = Cost::new(3, 17) + Cost::soft(5);

        assert_eq!(cost.hard_cost(), 3);
        assert_eq!(cost.soft_cost(), 22);
        assert_eq!(cost.to_string(), "3.00022");
    }

    #[test]
    fn deltas_cancel() {
        let before = Cost::new(2, 40);
        let after = Cost::new(1, 90);

        assert_eq!(before + (after - before), after);
        assert_eq!([before, after - before].into_iter().sum::<Cost>(), after);
    }
}

use std::fmt::Debug;
use std::ops::Range;

use rand::Rng;
use rand::SeedableRng;

use crate::hstt_assert_moderate;

/// Abstraction for randomness, in order to swap out different source of randomness.
///
/// The solvers only use randomness to diversify the order in which they consider alternatives;
/// every solution carries its own generator seeded from its diversifier, so two runs with the same
/// diversifier make the same choices.
pub trait Random: Debug {
    /// Generates a bool with probability `probability` of being true. It should hold that
    /// `probability ∈ [0, 1]`, this method will panic if this is not the case.
    fn generate_bool(&mut self, probability: f64) -> bool;

    /// Generates a random usize in the provided range with equal probability; this can be seen as
    /// sampling from a uniform distribution in the range `[range.start, range.end)`
    fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize;

    /// Rotates `elements` left by a random amount, keeping their cyclic order.
    fn rotate<T>(&mut self, elements: &mut [T])
    where
        Self: Sized,
    {
        if elements.len() > 1 {
            let amount = self.generate_usize_in_range(0..elements.len());
            elements.rotate_left(amount);
        }
    }
}

impl<T> Random for T
where
    T: SeedableRng + Rng + Debug,
{
    fn generate_bool(&mut self, probability: f64) -> bool {
        hstt_assert_moderate!(
            (0.0..=1.0).contains(&probability),
            "It should hold that 0.0 <= {probability} <= 1.0"
        );

        self.gen_bool(probability)
    }

    fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize {
        self.gen_range(range)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::Random;

    #[test]
    fn rotation_keeps_cyclic_order() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut elements = vec![0, 1, 2, 3, 4];
        rng.rotate(&mut elements);

        let start = elements[0];
        for (position, element) in elements.iter().enumerate() {
            assert_eq!(*element, (start + position) % 5);
        }
    }
}

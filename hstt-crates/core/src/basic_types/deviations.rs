/// A running summary of the deviations of one monitor.
///
/// Cost functions only ever look at the sum, the number of non-zero deviations and the sum of
/// squares, so the summary can be updated in constant time when a single deviation changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Deviations {
    sum: i64,
    non_zero: i64,
    sum_of_squares: i64,
}

impl Deviations {
    pub fn from_values(values: impl IntoIterator<Item = i64>) -> Deviations {
        let mut deviations = Deviations::default();
        for value in values {
            deviations.add(value);
        }
        deviations
    }

    pub fn add(&mut self, deviation: i64) {
        if deviation != 0 {
            self.sum += deviation;
            self.non_zero += 1;
            self.sum_of_squares += deviation * deviation;
        }
    }

    pub fn remove(&mut self, deviation: i64) {
        if deviation != 0 {
            self.sum -= deviation;
            self.non_zero -= 1;
            self.sum_of_squares -= deviation * deviation;
        }
    }

    pub fn replace(&mut self, old: i64, new: i64) {
        self.remove(old);
        self.add(new);
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn non_zero(&self) -> i64 {
        self.non_zero
    }

    pub fn sum_of_squares(&self) -> i64 {
        self.sum_of_squares
    }

    pub fn is_zero(&self) -> bool {
        self.non_zero == 0
    }
}

#[cfg(test)]
mod tests {
    use super::Deviations;

    #[test]
    fn zero_deviations_are_not_counted() {
        let deviations = Deviations::from_values([0, 2, 0, 3]);

        assert_eq!(deviations.sum(), 5);
        assert_eq!(deviations.non_zero(), 2);
        assert_eq!(deviations.sum_of_squares(), 13);
    }

    #[test]
    fn replacing_matches_rebuilding() {
        let mut deviations = Deviations::from_values([1, 4]);
        deviations.replace(4, 0);
        deviations.replace(0, 2);

        assert_eq!(deviations, Deviations::from_values([1, 2]));
    }
}

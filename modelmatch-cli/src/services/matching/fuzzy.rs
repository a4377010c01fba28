//! Fuzzy-logic combinators on scores in [0, 1]

/// Probabilistic OR: `a + b - ab`
pub fn soft_or(a: f64, b: f64) -> f64 {
    a + b - a * b
}

/// Product AND: `ab`
pub fn soft_and(a: f64, b: f64) -> f64 {
    a * b
}

/// OR over all values; 0 for none
pub fn soft_or_all(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, soft_or)
}

/// AND over all values; 1 for none
pub fn soft_and_all(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(1.0, soft_and)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_known_values() {
        assert_eq!(soft_or(0.5, 0.5), 0.75);
        assert_eq!(soft_and(0.5, 0.5), 0.25);
        assert_eq!(soft_or_all([]), 0.0);
        assert_eq!(soft_and_all([]), 1.0);
        assert!((soft_or_all([0.9, 0.9]) - 0.99).abs() < EPSILON);
    }

    proptest! {
        #[test]
        fn prop_commutative(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            prop_assert!((soft_or(a, b) - soft_or(b, a)).abs() < EPSILON);
            prop_assert!((soft_and(a, b) - soft_and(b, a)).abs() < EPSILON);
        }

        #[test]
        fn prop_identities(a in 0.0f64..=1.0) {
            prop_assert!((soft_or(a, 0.0) - a).abs() < EPSILON);
            prop_assert!((soft_and(a, 1.0) - a).abs() < EPSILON);
        }

        #[test]
        fn prop_absorption(a in 0.0f64..=1.0) {
            prop_assert!((soft_or(a, 1.0) - 1.0).abs() < EPSILON);
            prop_assert!(soft_and(a, 0.0).abs() < EPSILON);
        }

        #[test]
        fn prop_folds_stay_in_unit_interval(
            values in proptest::collection::vec(0.0f64..=1.0, 0..8)
        ) {
            let or = soft_or_all(values.iter().copied());
            let and = soft_and_all(values.iter().copied());
            prop_assert!((-EPSILON..=1.0 + EPSILON).contains(&or));
            prop_assert!((-EPSILON..=1.0 + EPSILON).contains(&and));
            prop_assert!(or + EPSILON >= values.iter().copied().fold(0.0, f64::max));
        }
    }
}

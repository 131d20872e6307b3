//! Property tests for the correlation helpers.

use proptest::prelude::*;
use sentilab_runner::correlation::{average_ranks, pearson, CorrelationPair};

fn column(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1000.0f64..1000.0, len)
}

fn paired() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (3usize..60).prop_flat_map(|n| (column(n), column(n)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn coefficients_stay_in_unit_interval((x, y) in paired()) {
        let r = pearson(&x, &y);
        prop_assert!((-1.0..=1.0).contains(&r));

        let pair = CorrelationPair::compute(&x, &y);
        prop_assert!((-1.0..=1.0).contains(&pair.spearman.coefficient));
        prop_assert!((0.0..=1.0).contains(&pair.pearson.p_value));
        prop_assert!((0.0..=1.0).contains(&pair.spearman.p_value));
        prop_assert_eq!(pair.pearson.sample_size, x.len());
    }

    #[test]
    fn ranks_sum_to_triangular_number(values in prop::collection::vec(-5i32..5, 1..80)) {
        // Small integer range forces plenty of ties
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        let ranks = average_ranks(&values);
        let n = values.len() as f64;
        prop_assert!((ranks.iter().sum::<f64>() - n * (n + 1.0) / 2.0).abs() < 1e-9);
        for (i, &r) in ranks.iter().enumerate() {
            prop_assert!(r >= 1.0 && r <= n);
            for (j, &s) in ranks.iter().enumerate() {
                if values[i] < values[j] {
                    prop_assert!(r < s);
                }
            }
        }
    }

    #[test]
    fn monotone_transform_has_unit_spearman(x in column(20)) {
        prop_assume!(x.windows(2).any(|w| w[0] != w[1]));
        let y: Vec<f64> = x.iter().map(|v| v.powi(3) + 2.0 * v).collect();
        let pair = CorrelationPair::compute(&x, &y);
        prop_assert!((pair.spearman.coefficient - 1.0).abs() < 1e-9);
    }
}

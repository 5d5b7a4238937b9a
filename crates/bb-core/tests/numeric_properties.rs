use bb_core::{CoreError, Tolerances, ensure_finite, ensure_positive, nearly_equal};
use proptest::prelude::*;

proptest! {
    #[test]
    fn nearly_equal_is_symmetric(a in -1e6..1e6f64, b in -1e6..1e6f64) {
        let tol = Tolerances::default();
        prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
    }

    #[test]
    fn nearly_equal_accepts_relative_noise(a in 1.0..1e9f64) {
        prop_assert!(nearly_equal(a, a * (1.0 + 1e-12), Tolerances::default()));
        prop_assert!(!nearly_equal(a, a * (1.0 + 1e-6), Tolerances::default()));
    }

    #[test]
    fn positive_values_pass_through(v in 1e-12..1e12f64) {
        prop_assert_eq!(ensure_positive(v, "v"), Ok(v));
        prop_assert_eq!(ensure_finite(v, "v"), Ok(v));
    }

    #[test]
    fn non_positive_values_rejected(v in -1e12..=0.0f64) {
        prop_assert_eq!(ensure_positive(v, "v"), Err(CoreError::InvalidArg { what: "v" }));
    }
}

#[test]
fn non_finite_values_rejected() {
    for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(matches!(
            ensure_positive(v, "v"),
            Err(CoreError::NonFinite { .. })
        ));
    }
}

//! Property-based tests for error classification and context preservation.

use crashlab_errors::{
    CrashlabError, ErrorContext, ErrorDisposition, ResultExt, SimulatorError, ValidationError,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_context_never_changes_disposition(depth in 1usize..6, timeout_ms in 1u64..100_000) {
        let mut result: Result<(), CrashlabError> =
            Err(SimulatorError::timeout("get_damage_data", timeout_ms).into());
        for level in 0..depth {
            result = result.context(ErrorContext::new(format!("level-{level}")));
        }
        let err = result.err();
        prop_assert!(err.is_some());
        if let Some(err) = err {
            prop_assert_eq!(err.disposition(), ErrorDisposition::Retry);
            prop_assert!(err.to_string().contains(&timeout_ms.to_string()));
        }
    }

    #[test]
    fn test_out_of_range_mentions_field(field in "[a-z_]{1,16}", value in -1000.0f64..1000.0) {
        let err = ValidationError::out_of_range(field.clone(), value, 0.0, 200.0);
        prop_assert!(err.to_string().starts_with(&field));
    }
}

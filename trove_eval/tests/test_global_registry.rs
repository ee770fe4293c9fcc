//! The process-wide registry lives in its own test binary so no other test
//! can initialise it first.

use trove_eval::metrics::{forecast, Direction, Metric};
use trove_eval::{global_registry, init_global_registry, EvalError, MetricRegistry, TaskFamily};

#[test]
fn test_global_registry_is_set_once() {
    let mut registry = MetricRegistry::with_defaults();
    registry
        .register(Metric::forecast(
            "mae_copy",
            Direction::LowerIsBetter,
            forecast::mean_absolute_error,
        ))
        .unwrap();
    init_global_registry(registry).unwrap();

    let global = global_registry();
    assert!(global.get(TaskFamily::Forecasting, "mae_copy").is_some());
    assert_eq!(global.metrics(TaskFamily::Forecasting).len(), 6);

    let again = init_global_registry(MetricRegistry::new());
    assert!(matches!(again, Err(EvalError::Config(_))));
    // The first registry stays in place
    assert!(global_registry().get(TaskFamily::Forecasting, "mae_copy").is_some());
}

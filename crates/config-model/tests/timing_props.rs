use aebridge_config_model::ShotTiming;
use proptest::prelude::*;

proptest! {
    #[test]
    fn layer_span_matches_frame_count(
        global_first in -500i64..5000,
        offset in 0i64..2000,
        len in 1i64..2000,
        fps in prop::sample::select(vec![23.976, 24.0, 25.0, 29.97, 30.0, 48.0, 60.0]),
    ) {
        let first = global_first + offset;
        let last = first + len - 1;
        let timing = ShotTiming::new(first, last, global_first, fps);

        prop_assert!(((timing.end - timing.start) - len as f64 / fps).abs() < 0.01);
        prop_assert!((timing.start - offset as f64 / fps).abs() < 1e-9);
        prop_assert!(timing.start >= 0.0);
    }
}

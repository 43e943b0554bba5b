use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vellum_core::viewport::ViewportMetrics;
use vellum_core::{OverscanPolicy, Viewport, compute_visible_range};

#[test]
fn test_materialized_range_covers_visible_lines() {
    let mut rng = StdRng::seed_from_u64(42);
    let policy = OverscanPolicy::default();

    for _ in 0..500 {
        let line_count = rng.gen_range(1..5_000);
        let line_height = rng.gen_range(8.0..40.0);
        let viewport_height = rng.gen_range(0.0..2_000.0);
        let max_scroll = (line_count as f64 * line_height - viewport_height).max(0.0);
        let scroll_top = rng.gen_range(0.0..=max_scroll);

        let metrics = ViewportMetrics {
            scroll_top,
            viewport_height,
            line_height,
            line_count,
        };
        let range = compute_visible_range(&metrics, &policy);

        let first = ((scroll_top / line_height).floor() as usize).min(line_count);
        let last = (((scroll_top + viewport_height) / line_height).ceil() as usize).min(line_count);
        assert!(range.start <= first, "{metrics:?} -> {range:?}");
        assert!(range.end >= last, "{metrics:?} -> {range:?}");
        assert!(range.end <= line_count);
        assert!(range.start <= range.end);
    }
}

#[test]
fn test_large_document_materializes_a_small_window() {
    let viewport = Viewport::new(600.0, 20.0, 1_000_000);
    let range = viewport.visible_range();
    // 30 visible lines, overscan max(5, 15) below.
    assert_eq!(range.lines(), 0..45);
}

#[test]
fn test_programmatic_scroll_never_overrides_user_scroll() {
    let start = Instant::now();
    let mut viewport = Viewport::new(100.0, 10.0, 1_000);

    viewport.on_host_scroll(500.0, start);
    assert_eq!(viewport.request_scroll(0.0), 0.0);
    assert!(!viewport.set_scroll_top(0.0));
    assert_eq!(viewport.scroll_top(), 500.0);

    // Still inside the settle window.
    assert!(!viewport.settle(start + Duration::from_millis(100)));
    assert!(viewport.settle(start + Duration::from_millis(200)));
    assert_eq!(viewport.pending_request(), None);
    assert_eq!(viewport.scroll_top(), 500.0);

    assert!(viewport.set_scroll_top(30.0));
    assert_eq!(viewport.visible_range().visible_lines(), 3..13);
}

//! Viewport Virtualizer
//!
//! Decides which lines need to be materialized for the current scroll offset.
//!
//! [`compute_visible_range`] is a pure function of the scroll metrics. [`Viewport`] wraps it with
//! the scroll-ownership rules of a native scroller:
//!
//! - the offset reported by the host ([`Viewport::on_host_scroll`]) is authoritative,
//! - programmatic requests ([`Viewport::request_scroll`]) are only recorded until the host reports
//!   back,
//! - while the user is actively scrolling, nothing writes the offset back; once no event has
//!   arrived for the settle window the last *reported* offset becomes ground truth.

use std::ops::Range;
use std::time::{Duration, Instant};

use tracing::trace;

/// Lower bound for the overscan margin on each side.
pub const MIN_OVERSCAN: usize = 5;
/// Overscan margin as a fraction of the visible line count.
pub const OVERSCAN_RATIO: f64 = 0.5;
/// Time without scroll events after which scrolling is considered settled.
pub const SCROLL_SETTLE_WINDOW: Duration = Duration::from_millis(150);

/// Inputs for [`compute_visible_range`], in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Current vertical scroll offset.
    pub scroll_top: f64,
    /// Height of the visible area.
    pub viewport_height: f64,
    /// Fixed height of one line.
    pub line_height: f64,
    /// Number of lines in the document.
    pub line_count: usize,
}

/// How many extra lines to render above and below the visible window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverscanPolicy {
    /// Minimum margin in lines.
    pub min_overscan: usize,
    /// Margin relative to the number of visible lines.
    pub overscan_ratio: f64,
}

impl Default for OverscanPolicy {
    fn default() -> Self {
        Self {
            min_overscan: MIN_OVERSCAN,
            overscan_ratio: OVERSCAN_RATIO,
        }
    }
}

impl OverscanPolicy {
    /// Margin for a window of `visible_lines` lines.
    pub fn margin(&self, visible_lines: usize) -> usize {
        let relative = (visible_lines as f64 * self.overscan_ratio.max(0.0)).ceil() as usize;
        self.min_overscan.max(relative)
    }
}

/// The lines to render: `[start, end)` including overscan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    /// First rendered line.
    pub start: usize,
    /// One past the last rendered line.
    pub end: usize,
    /// First line that actually intersects the viewport.
    pub first_visible: usize,
    /// One past the last line that intersects the viewport.
    pub last_visible: usize,
    /// Overscan margin applied on each side.
    pub overscan: usize,
}

impl VisibleRange {
    /// Rendered line indices.
    pub fn lines(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Line indices that intersect the viewport.
    pub fn visible_lines(&self) -> Range<usize> {
        self.first_visible..self.last_visible
    }

    /// Returns `true` if `line` is rendered.
    pub fn contains(&self, line: usize) -> bool {
        self.lines().contains(&line)
    }

    /// Number of rendered lines.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if nothing is rendered.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Compute the rendered line window for the given metrics.
///
/// The window always contains every line intersecting `[scroll_top, scroll_top + viewport_height]`
/// (clamped to the document) plus an overscan margin on both sides.
pub fn compute_visible_range(metrics: &ViewportMetrics, policy: &OverscanPolicy) -> VisibleRange {
    if metrics.line_height <= 0.0 || metrics.line_count == 0 {
        return VisibleRange::default();
    }

    let scroll_top = metrics.scroll_top.max(0.0);
    let height = metrics.viewport_height.max(0.0);
    let count = metrics.line_count;

    let first = (scroll_top / metrics.line_height).floor() as usize;
    let last = ((scroll_top + height) / metrics.line_height).ceil() as usize;
    let overscan = policy.margin(last.saturating_sub(first));

    let first_visible = first.min(count);
    let last_visible = last.min(count).max(first_visible);

    VisibleRange {
        start: first.saturating_sub(overscan).min(count),
        end: last.saturating_add(overscan).min(count),
        first_visible,
        last_visible,
        overscan,
    }
}

/// Scroll state of one editor view.
#[derive(Debug, Clone)]
pub struct Viewport {
    scroll_top: f64,
    viewport_height: f64,
    line_height: f64,
    line_count: usize,
    policy: OverscanPolicy,
    settle_window: Duration,
    last_scroll_event: Option<Instant>,
    pending_request: Option<f64>,
}

impl Viewport {
    /// Create a viewport scrolled to the top.
    pub fn new(viewport_height: f64, line_height: f64, line_count: usize) -> Self {
        Self {
            scroll_top: 0.0,
            viewport_height,
            line_height,
            line_count,
            policy: OverscanPolicy::default(),
            settle_window: SCROLL_SETTLE_WINDOW,
            last_scroll_event: None,
            pending_request: None,
        }
    }

    /// Use a custom overscan policy.
    pub fn with_policy(mut self, policy: OverscanPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a custom settle window.
    pub fn with_settle_window(mut self, window: Duration) -> Self {
        self.settle_window = window;
        self
    }

    /// Current authoritative scroll offset.
    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Height of the visible area.
    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Height of one line.
    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    /// Number of lines being virtualized.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Overscan policy in use.
    pub fn policy(&self) -> OverscanPolicy {
        self.policy
    }

    /// Returns `true` while host scroll events are still arriving.
    pub fn is_scrolling(&self) -> bool {
        self.last_scroll_event.is_some()
    }

    /// Last programmatic scroll request not yet confirmed by the host.
    pub fn pending_request(&self) -> Option<f64> {
        self.pending_request
    }

    /// Full document height.
    pub fn total_height(&self) -> f64 {
        self.line_count as f64 * self.line_height
    }

    /// Largest valid scroll offset.
    pub fn max_scroll_top(&self) -> f64 {
        (self.total_height() - self.viewport_height).max(0.0)
    }

    fn clamp_scroll(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll_top())
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> ViewportMetrics {
        ViewportMetrics {
            scroll_top: self.scroll_top,
            viewport_height: self.viewport_height,
            line_height: self.line_height,
            line_count: self.line_count,
        }
    }

    /// Lines to render right now.
    pub fn visible_range(&self) -> VisibleRange {
        compute_visible_range(&self.metrics(), &self.policy)
    }

    /// Record a scroll offset reported by the host scroller.
    ///
    /// The reported value wins over anything requested programmatically.
    pub fn on_host_scroll(&mut self, actual: f64, now: Instant) -> VisibleRange {
        self.scroll_top = self.clamp_scroll(actual);
        self.last_scroll_event = Some(now);
        trace!(scroll_top = self.scroll_top, "host scroll");
        self.visible_range()
    }

    /// End the scrolling phase if no event arrived within the settle window.
    ///
    /// Returns `true` if the viewport settled during this call.
    pub fn settle(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_scroll_event else {
            return false;
        };
        if now.saturating_duration_since(last) < self.settle_window {
            return false;
        }

        self.last_scroll_event = None;
        if let Some(requested) = self.pending_request.take() {
            trace!(
                requested,
                actual = self.scroll_top,
                "scroll settled; dropping stale request"
            );
        }
        true
    }

    /// Ask the host to scroll to `target`. Returns the clamped offset to hand to the host.
    ///
    /// The authoritative offset does not change until the host reports it back.
    pub fn request_scroll(&mut self, target: f64) -> f64 {
        let target = self.clamp_scroll(target);
        self.pending_request = Some(target);
        target
    }

    /// Apply a programmatic offset immediately (for hosts without a native scroller).
    ///
    /// Ignored while the user is scrolling.
    pub fn set_scroll_top(&mut self, offset: f64) -> bool {
        if self.is_scrolling() {
            return false;
        }
        self.scroll_top = self.clamp_scroll(offset);
        self.pending_request = None;
        true
    }

    /// Offset that would bring `line` fully into view, or `None` if it already is.
    pub fn ensure_line_visible(&self, line: usize) -> Option<f64> {
        let top = line.min(self.line_count.saturating_sub(1)) as f64 * self.line_height;
        let bottom = top + self.line_height;

        if top < self.scroll_top {
            Some(self.clamp_scroll(top))
        } else if bottom > self.scroll_top + self.viewport_height {
            Some(self.clamp_scroll(bottom - self.viewport_height))
        } else {
            None
        }
    }

    /// Update the viewport height.
    pub fn resize(&mut self, viewport_height: f64) {
        self.viewport_height = viewport_height.max(0.0);
        self.scroll_top = self.clamp_scroll(self.scroll_top);
    }

    /// Update the line height (for example after a font change).
    pub fn set_line_height(&mut self, line_height: f64) {
        self.line_height = line_height;
        self.scroll_top = self.clamp_scroll(self.scroll_top);
    }

    /// Update the line count after a content change.
    pub fn set_line_count(&mut self, line_count: usize) {
        self.line_count = line_count;
        self.scroll_top = self.clamp_scroll(self.scroll_top);
    }

    /// Replace the overscan policy.
    pub fn set_policy(&mut self, policy: OverscanPolicy) {
        self.policy = policy;
    }

    /// Replace the settle window.
    pub fn set_settle_window(&mut self, window: Duration) {
        self.settle_window = window;
    }
}

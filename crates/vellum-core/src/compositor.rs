//! Decoration Compositor
//!
//! Turns decorations from every source into renderer-ready geometry for the visible lines.
//!
//! Inputs are layered in a fixed order (selection, API decorations, extension providers) and
//! later inputs paint above earlier ones. Syntax tokens travel per line next to the frame. The
//! compositor itself does not reorder anything: the output rectangles keep input order, so the
//! renderer can draw them front to back.
//!
//! Multi-line [`DecorationKind::Inline`] ranges are split per line:
//!
//! ```text
//!   line 3:        [start col ......... line end]     partial
//!   line 4:  [.............. full width .........]     full width
//!   line 5:  [0 ........ end col]                      partial
//! ```

use std::ops::Range;

use crate::decorations::{Decoration, DecorationKind};
use crate::layout::{line_width, visual_x_for_column};
use crate::position::Position;

/// Pixel metrics needed to place decorations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Height of one line.
    pub line_height: f64,
    /// Width of one cell (monospace advance).
    pub char_width: f64,
    /// Tab stop interval in cells.
    pub tab_size: usize,
    /// Width used for full-width rectangles.
    pub content_width: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            line_height: 20.0,
            char_width: 8.0,
            tab_size: 4,
            content_width: 800.0,
        }
    }
}

/// Axis-aligned rectangle in document pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width (may be zero).
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Whether a rectangle covers part of a line or the whole content width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectSpan {
    /// Bounded by character columns.
    Partial,
    /// Spans the full content width.
    FullWidth,
}

/// One painted rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationRect {
    /// Line the rectangle sits on.
    pub line: usize,
    /// Geometry.
    pub rect: Rect,
    /// Kind of the source decoration.
    pub kind: DecorationKind,
    /// Style class of the source decoration.
    pub class_name: String,
    /// Partial or full width.
    pub span: RectSpan,
}

/// A gutter marker for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterMark {
    /// Line the marker belongs to.
    pub line: usize,
    /// Style class.
    pub class_name: String,
    /// Optional glyph or label.
    pub content: Option<String>,
}

/// An overlay anchored at a document position.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlacement {
    /// Anchor position (start of the decoration range).
    pub anchor: Position,
    /// Pixel location of the anchor.
    pub rect: Rect,
    /// Style class.
    pub class_name: String,
    /// Overlay body.
    pub content: Option<String>,
}

/// Everything the renderer needs to paint decorations for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeFrame {
    /// Inline and line rectangles in paint order.
    pub rects: Vec<DecorationRect>,
    /// Gutter markers in paint order.
    pub gutter: Vec<GutterMark>,
    /// Overlays in paint order.
    pub overlays: Vec<OverlayPlacement>,
}

impl CompositeFrame {
    /// Rectangles on `line`.
    pub fn rects_on_line(&self, line: usize) -> impl Iterator<Item = &DecorationRect> {
        self.rects.iter().filter(move |r| r.line == line)
    }

    /// Rectangles with the given class.
    pub fn rects_with_class<'a>(
        &'a self,
        class_name: &'a str,
    ) -> impl Iterator<Item = &'a DecorationRect> {
        self.rects.iter().filter(move |r| r.class_name == class_name)
    }
}

/// Stateless geometry builder.
#[derive(Debug, Clone, Default)]
pub struct DecorationCompositor {
    metrics: LayoutMetrics,
}

impl DecorationCompositor {
    /// Create a compositor.
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self { metrics }
    }

    /// Current metrics.
    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    /// Replace the metrics (after a settings or resize change).
    pub fn set_metrics(&mut self, metrics: LayoutMetrics) {
        self.metrics = metrics;
    }

    /// Pixel x of `column` on `line`.
    pub fn column_x(&self, line: &str, column: usize) -> f64 {
        visual_x_for_column(line, column, self.metrics.tab_size) as f64 * self.metrics.char_width
    }

    /// Pixel x of the end of `line`.
    pub fn line_end_x(&self, line: &str) -> f64 {
        line_width(line, self.metrics.tab_size) as f64 * self.metrics.char_width
    }

    /// Zero-width caret rectangle at `position`.
    pub fn caret_rect(&self, position: Position, lines: &[String]) -> Rect {
        let text = lines.get(position.line).map(String::as_str).unwrap_or_default();
        Rect {
            x: self.column_x(text, position.column),
            y: self.line_y(position.line),
            width: 0.0,
            height: self.metrics.line_height,
        }
    }

    fn line_y(&self, line: usize) -> f64 {
        line as f64 * self.metrics.line_height
    }

    fn rect(&self, line: usize, x0: f64, x1: f64) -> Rect {
        Rect {
            x: x0,
            y: self.line_y(line),
            width: (x1 - x0).max(0.0),
            height: self.metrics.line_height,
        }
    }

    /// Compose `decorations` (already in paint order) for the lines in `visible`.
    ///
    /// Decorations outside the visible window produce no output.
    pub fn compose<'a, I>(
        &self,
        decorations: I,
        lines: &[String],
        visible: Range<usize>,
    ) -> CompositeFrame
    where
        I: IntoIterator<Item = &'a Decoration>,
    {
        let mut frame = CompositeFrame::default();
        if lines.is_empty() {
            return frame;
        }
        let last_line = lines.len() - 1;
        let visible = visible.start.min(lines.len())..visible.end.min(lines.len());

        for decoration in decorations {
            let range = decoration.range.normalized();
            let start_line = range.start.line.min(last_line);
            let end_line = range.end.line.min(last_line);

            let covered = start_line.max(visible.start)..(end_line + 1).min(visible.end);
            if covered.is_empty() {
                continue;
            }

            match decoration.kind {
                DecorationKind::Inline => {
                    for line in covered {
                        let text = lines[line].as_str();
                        let (rect, span) = if start_line == end_line {
                            (
                                self.rect(
                                    line,
                                    self.column_x(text, range.start.column),
                                    self.column_x(text, range.end.column),
                                ),
                                RectSpan::Partial,
                            )
                        } else if line == start_line {
                            (
                                self.rect(
                                    line,
                                    self.column_x(text, range.start.column),
                                    self.line_end_x(text),
                                ),
                                RectSpan::Partial,
                            )
                        } else if line == end_line {
                            (
                                self.rect(line, 0.0, self.column_x(text, range.end.column)),
                                RectSpan::Partial,
                            )
                        } else {
                            (
                                self.rect(line, 0.0, self.metrics.content_width),
                                RectSpan::FullWidth,
                            )
                        };
                        frame.rects.push(DecorationRect {
                            line,
                            rect,
                            kind: DecorationKind::Inline,
                            class_name: decoration.class_name.clone(),
                            span,
                        });
                    }
                }
                DecorationKind::Line => {
                    for line in covered {
                        frame.rects.push(DecorationRect {
                            line,
                            rect: self.rect(line, 0.0, self.metrics.content_width),
                            kind: DecorationKind::Line,
                            class_name: decoration.class_name.clone(),
                            span: RectSpan::FullWidth,
                        });
                    }
                }
                DecorationKind::Gutter => {
                    for line in covered {
                        frame.gutter.push(GutterMark {
                            line,
                            class_name: decoration.class_name.clone(),
                            content: decoration.content.clone(),
                        });
                    }
                }
                DecorationKind::Overlay => {
                    frame.overlays.push(OverlayPlacement {
                        anchor: range.start,
                        rect: self.caret_rect(range.start, lines),
                        class_name: decoration.class_name.clone(),
                        content: decoration.content.clone(),
                    });
                }
            }
        }

        frame
    }
}

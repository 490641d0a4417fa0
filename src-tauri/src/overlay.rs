//! Overlay scenes: serializable draw lists the UI paints onto a transparent
//! canvas sized 1:1 with the video element.
//!
//! Scenes are a pure function of the issue list, the surface size, and the
//! style, so the UI painter holds no state between frames.

use serde::{Deserialize, Serialize};

use crate::analysis::PostureIssue;

const WARNING_RED: &str = "#ef4444";
const BADGE_RED: &str = "rgba(239, 68, 68, 0.9)";
const COUNT_BADGE_RED: &str = "rgba(239, 68, 68, 0.8)";
const GOOD_GREEN: &str = "rgba(34, 197, 94, 0.9)";
const LABEL_WHITE: &str = "white";
const BORDER_WIDTH: f64 = 4.0;

/// One canvas 2D operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    /// Clear the whole surface.
    Clear,
    StrokeRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        line_width: f64,
        /// Empty for a solid line
        dash: Vec<f64>,
    },
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        font: String,
        color: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayStyle {
    /// Uploaded video playback
    Playback,
    /// Live camera feed, with an issue-count badge
    Live,
}

struct WarningLayout {
    inset: f64,
    dash: f64,
    badge: (f64, f64, f64, f64),
    label: &'static str,
    label_font: &'static str,
    label_at: (f64, f64),
}

impl OverlayStyle {
    fn warning_layout(self) -> WarningLayout {
        match self {
            OverlayStyle::Playback => WarningLayout {
                inset: 20.0,
                dash: 10.0,
                badge: (30.0, 30.0, 200.0, 40.0),
                label: "⚠️ Posture Issues",
                label_font: "16px Arial",
                label_at: (40.0, 55.0),
            },
            OverlayStyle::Live => WarningLayout {
                inset: 10.0,
                dash: 15.0,
                badge: (20.0, 20.0, 250.0, 50.0),
                label: "⚠️ Posture Alert",
                label_font: "18px Arial",
                label_at: (30.0, 50.0),
            },
        }
    }
}

/// A complete overlay frame. An empty `ops` list paints nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayScene {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

impl OverlayScene {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Scene that only wipes the surface.
pub fn cleared(size: Option<SurfaceSize>) -> OverlayScene {
    match size {
        Some(size) => OverlayScene {
            width: size.width,
            height: size.height,
            ops: vec![DrawOp::Clear],
        },
        None => OverlayScene::default(),
    }
}

pub fn render_overlay(
    issues: &[PostureIssue],
    size: Option<SurfaceSize>,
    style: OverlayStyle,
) -> OverlayScene {
    let mut scene = cleared(size);
    let Some(size) = size else {
        return scene;
    };
    let (w, h) = (size.width as f64, size.height as f64);

    if issues.is_empty() {
        scene.ops.push(fill(20.0, 20.0, 200.0, 50.0, GOOD_GREEN));
        scene.ops.push(text("✅ Good Posture", 30.0, 50.0, "18px Arial"));
        return scene;
    }

    let layout = style.warning_layout();
    scene.ops.push(DrawOp::StrokeRect {
        x: layout.inset,
        y: layout.inset,
        width: w - 2.0 * layout.inset,
        height: h - 2.0 * layout.inset,
        color: WARNING_RED.to_string(),
        line_width: BORDER_WIDTH,
        dash: vec![layout.dash, layout.dash],
    });
    let (bx, by, bw, bh) = layout.badge;
    scene.ops.push(fill(bx, by, bw, bh, BADGE_RED));
    scene
        .ops
        .push(text(layout.label, layout.label_at.0, layout.label_at.1, layout.label_font));

    if style == OverlayStyle::Live {
        scene.ops.push(fill(w - 80.0, 20.0, 60.0, 30.0, COUNT_BADGE_RED));
        scene.ops.push(text(
            &format!("{} issues", issues.len()),
            w - 75.0,
            40.0,
            "14px Arial",
        ));
    }

    scene
}

fn fill(x: f64, y: f64, width: f64, height: f64, color: &str) -> DrawOp {
    DrawOp::FillRect {
        x,
        y,
        width,
        height,
        color: color.to_string(),
    }
}

fn text(text: &str, x: f64, y: f64, font: &str) -> DrawOp {
    DrawOp::Text {
        text: text.to_string(),
        x,
        y,
        font: font.to_string(),
        color: LABEL_WHITE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{tags, Severity};

    fn issues(n: usize) -> Vec<PostureIssue> {
        (0..n)
            .map(|_| PostureIssue::new(tags::NECK_FORWARD, "neck", Severity::Medium))
            .collect()
    }

    fn size() -> Option<SurfaceSize> {
        SurfaceSize::new(640, 480)
    }

    #[test]
    fn test_every_scene_starts_with_clear() {
        for style in [OverlayStyle::Playback, OverlayStyle::Live] {
            for n in [0, 1, 3] {
                let scene = render_overlay(&issues(n), size(), style);
                assert_eq!(scene.ops[0], DrawOp::Clear);
            }
        }
    }

    #[test]
    fn test_live_warning_layout() {
        let scene = render_overlay(&issues(2), size(), OverlayStyle::Live);
        assert_eq!(scene.ops.len(), 6);
        assert_eq!(
            scene.ops[1],
            DrawOp::StrokeRect {
                x: 10.0,
                y: 10.0,
                width: 620.0,
                height: 460.0,
                color: "#ef4444".to_string(),
                line_width: 4.0,
                dash: vec![15.0, 15.0],
            }
        );
        match &scene.ops[5] {
            DrawOp::Text { text, x, y, .. } => {
                assert_eq!(text, "2 issues");
                assert_eq!((*x, *y), (565.0, 40.0));
            }
            other => panic!("expected count text, got {:?}", other),
        }
    }

    #[test]
    fn test_playback_warning_has_no_count_badge() {
        let scene = render_overlay(&issues(4), size(), OverlayStyle::Playback);
        assert_eq!(scene.ops.len(), 4);
        match &scene.ops[1] {
            DrawOp::StrokeRect { x, width, dash, .. } => {
                assert_eq!(*x, 20.0);
                assert_eq!(*width, 600.0);
                assert_eq!(dash, &vec![10.0, 10.0]);
            }
            other => panic!("expected border, got {:?}", other),
        }
        assert!(matches!(&scene.ops[3], DrawOp::Text { text, .. } if text == "⚠️ Posture Issues"));
    }

    #[test]
    fn test_good_posture_badge() {
        let scene = render_overlay(&[], size(), OverlayStyle::Live);
        assert_eq!(scene.ops.len(), 3);
        assert!(!scene.ops.iter().any(|op| matches!(op, DrawOp::StrokeRect { .. })));
        assert!(matches!(&scene.ops[1], DrawOp::FillRect { color, .. } if color == "rgba(34, 197, 94, 0.9)"));
        assert!(matches!(&scene.ops[2], DrawOp::Text { text, .. } if text == "✅ Good Posture"));
    }

    #[test]
    fn test_unknown_surface_is_empty_scene() {
        assert_eq!(SurfaceSize::new(0, 480), None);
        let scene = render_overlay(&issues(1), None, OverlayStyle::Live);
        assert!(scene.is_empty());
        assert!(cleared(None).is_empty());
    }

    #[test]
    fn test_draw_op_wire_format() {
        let json = serde_json::to_value(DrawOp::Clear).unwrap();
        assert_eq!(json, serde_json::json!({"op": "clear"}));

        let json = serde_json::to_value(fill(1.0, 2.0, 3.0, 4.0, "red")).unwrap();
        assert_eq!(json["op"], "fill_rect");
        assert_eq!(json["color"], "red");
    }
}

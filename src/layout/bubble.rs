use crate::config::BubbleConfig;
use crate::ir::{Message, Side};
use crate::text_metrics::TextMeasurer;

use super::text::{OverflowPolicy, wrap_to_width_with};
use super::{BadgeAnchor, Circle, Decoration, Layout, LayoutBlock, LayoutMode, Rect, TextBlock};

pub fn compute_bubble_layout(
    messages: &[Message],
    measurer: &TextMeasurer,
    config: &BubbleConfig,
) -> Layout {
    let pad = config.padding;
    let max_text_width = config.max_text_width();
    let mut blocks = Vec::with_capacity(messages.len());
    let mut y = pad;

    for (index, message) in messages.iter().enumerate() {
        let lines = wrap_to_width_with(
            &message.content,
            max_text_width,
            measurer,
            OverflowPolicy::Ellipsize,
        );
        let text_size = measurer.block_size(&lines, config.line_spacing);
        let width = text_size.width + 2.0 * pad;
        let height = text_size.height + 2.0 * pad;
        let x = match message.side {
            Side::Left => pad,
            Side::Right => config.canvas_width - width - pad,
        };
        let frame = Rect::new(x, y, width, height);

        let decoration = if message.unsent {
            Decoration::UnsentDots(unsent_dots(&frame, message.side, config))
        } else {
            Decoration::Tail(tail_points(&frame, message.side, config))
        };
        let badge = message.classification.map(|classification| BadgeAnchor {
            classification,
            rect: badge_rect(&frame, message.side, config),
        });

        blocks.push(LayoutBlock {
            index,
            side: message.side,
            frame,
            text: TextBlock {
                lines,
                x: x + pad,
                y: y + pad - config.text_offset,
                width: text_size.width,
                height: text_size.height,
                line_height: measurer.line_height(),
                line_spacing: config.line_spacing,
            },
            badge,
            avatar: None,
            username: None,
            decoration,
        });

        y += height;
        if let Some(next) = messages.get(index + 1) {
            y += config.gap_after(next.side == message.side);
        }
    }

    Layout {
        mode: LayoutMode::Bubble,
        width: config.canvas_width,
        height: y + pad,
        blocks,
    }
}

/// Bottom corner facing away from the canvas center, and the sign of
/// "outward" along x.
fn outer_corner(frame: &Rect, side: Side) -> (f32, f32, f32) {
    match side {
        Side::Left => (frame.x, frame.bottom(), -1.0),
        Side::Right => (frame.right(), frame.bottom(), 1.0),
    }
}

fn tail_points(frame: &Rect, side: Side, config: &BubbleConfig) -> [(f32, f32); 3] {
    let (cx, cy, dir) = outer_corner(frame, side);
    config
        .tail_points
        .map(|(outward, up)| (cx + dir * outward, cy - up))
}

fn unsent_dots(frame: &Rect, side: Side, config: &BubbleConfig) -> [Circle; 2] {
    let (cx, cy, dir) = outer_corner(frame, side);
    config.unsent_dots.map(|(outward, down, radius)| Circle {
        cx: cx + dir * outward,
        cy: cy + down,
        radius,
    })
}

/// Badge hugs the bubble edge nearer the canvas center.
fn badge_rect(frame: &Rect, side: Side, config: &BubbleConfig) -> Rect {
    let size = config.badge_size;
    let x = match side {
        Side::Left => frame.right() + config.badge_margin - size,
        Side::Right => frame.x - config.badge_margin,
    };
    let y = frame.y + (frame.height - size) / 2.0;
    Rect::new(x, y, size, size)
}

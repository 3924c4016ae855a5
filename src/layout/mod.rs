//! Measure pass: turns messages into positioned blocks and a canvas size.
//!
//! Both modes walk the message list once, front to back. Nothing here
//! touches pixels; the compositor consumes the resulting [`Layout`].

mod bubble;
mod chain;
pub mod text;

pub use bubble::compute_bubble_layout;
pub use chain::compute_chain_layout;
pub use text::{OverflowPolicy, ellipsize_to_width, wrap_to_width, wrap_to_width_with};

use crate::ir::{Classification, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Bubble,
    Chain,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
}

/// Wrapped lines with the origin of the first line's top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub line_height: f32,
    pub line_spacing: f32,
}

impl TextBlock {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Top edge of line `index`.
    pub fn line_top(&self, index: usize) -> f32 {
        self.y + index as f32 * (self.line_height + self.line_spacing)
    }
}

/// Bubble ornament. A message gets exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    None,
    Tail([(f32, f32); 3]),
    UnsentDots([Circle; 2]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeAnchor {
    pub classification: Classification,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBlock {
    pub index: usize,
    pub side: Side,
    /// Bubble rectangle in bubble mode, the whole message extent in chain mode.
    pub frame: Rect,
    pub text: TextBlock,
    pub badge: Option<BadgeAnchor>,
    pub avatar: Option<Rect>,
    pub username: Option<TextBlock>,
    pub decoration: Decoration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub mode: LayoutMode,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<LayoutBlock>,
}

impl Layout {
    /// Whole-pixel canvas size.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.width.ceil().max(1.0) as u32,
            self.height.ceil().max(1.0) as u32,
        )
    }
}

//! Draw pass: paints a [`Layout`] onto a tiny-skia pixmap and encodes it.

use crate::assets::{AssetProvider, resolve_font};
use crate::avatar::{AvatarSource, fetch_avatars, prepare_avatar};
use crate::config::{BubbleConfig, ChainConfig, RenderConfig};
use crate::error::{RenderError, Result};
use crate::ir::{BadgeVariant, Message};
use crate::layout::{
    BadgeAnchor, Decoration, Layout, LayoutBlock, Rect, TextBlock, compute_bubble_layout,
    compute_chain_layout,
};
use crate::raster::pixmap_from_rgba;
use crate::text_metrics::{TextMeasurer, Typeface, is_emoji_cluster};
use crate::theme::{BubblePalette, BubbleTheme, ChainPalette, ChainTheme, Color};
use image::RgbaImage;
use log::debug;
use resvg::tiny_skia::{
    FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Transform,
};
use std::collections::HashMap;
use std::io::Write;
use unicode_segmentation::UnicodeSegmentation;

/// Encoded output of one render call.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

pub fn render_bubbles(
    messages: &[Message],
    theme: &BubbleTheme,
    config: &BubbleConfig,
    assets: &dyn AssetProvider,
) -> Result<RenderedImage> {
    config.validate()?;
    let palette = BubblePalette::resolve(theme)?;
    let measurer = TextMeasurer::new(resolve_font(
        assets,
        &config.font_family,
        config.font_size,
    )?);
    let layout = compute_bubble_layout(messages, &measurer, config);
    debug!(
        "bubble layout: {} blocks, {}x{}",
        layout.blocks.len(),
        layout.width,
        layout.height
    );

    let mut canvas = Canvas::new(&layout)?;
    canvas.fill(palette.background);
    for block in &layout.blocks {
        let shape = bubble_shape(block, config.corner_radius);
        canvas.fill_shape(&shape, palette.bubble(block.side));
        if let Some(badge) = &block.badge {
            canvas.draw_badge(assets, badge, BadgeVariant::for_side(block.side));
        }
        canvas.draw_text(&block.text, &measurer, palette.text(block.side), assets);
    }
    canvas.finish()
}

pub fn render_chain(
    messages: &[Message],
    theme: &ChainTheme,
    config: &ChainConfig,
    render: &RenderConfig,
    assets: &dyn AssetProvider,
    avatars: &dyn AvatarSource,
) -> Result<RenderedImage> {
    config.validate()?;
    let avatar_px = config.avatar_size.round().max(1.0) as u32;
    render.validate(avatar_px)?;
    let palette = ChainPalette::resolve(theme)?;
    let text = TextMeasurer::new(resolve_font(
        assets,
        &config.font_family,
        config.font_size,
    )?);
    let label = TextMeasurer::new(resolve_font(
        assets,
        &config.font_family,
        config.username_font_size,
    )?);
    let layout = compute_chain_layout(messages, &text, &label, config)?;
    debug!(
        "chain layout: {} blocks, {}x{}",
        layout.blocks.len(),
        layout.width,
        layout.height
    );

    let fetched = fetch_avatars(
        avatars,
        messages.iter().filter_map(|m| m.avatar_url.as_deref()),
    );
    let mut prepared: HashMap<Option<&str>, RgbaImage> = HashMap::new();

    let mut canvas = Canvas::new(&layout)?;
    canvas.fill(palette.background);
    for block in &layout.blocks {
        let message = &messages[block.index];
        if let Some(slot) = block.avatar {
            let uri = message.avatar_url.as_deref();
            let avatar = prepared.entry(uri).or_insert_with(|| {
                let bytes = uri.and_then(|u| fetched.get(u)).map(Vec::as_slice);
                prepare_avatar(
                    bytes,
                    avatar_px,
                    render.avatar_supersample,
                    palette.avatar_matte,
                    palette.avatar_placeholder,
                )
            });
            canvas.draw_image(avatar, slot);
        }
        if let Some(name) = &block.username {
            canvas.draw_text(name, &label, palette.username, assets);
        }
        canvas.draw_text(&block.text, &text, palette.text, assets);
        if let Some(badge) = &block.badge {
            canvas.draw_badge(assets, badge, BadgeVariant::for_side(block.side));
        }
    }
    canvas.finish()
}

/// Writes PNG bytes to `output`, or to stdout when there is none.
pub fn write_output_png(image: &RenderedImage, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, &image.png)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&image.png)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    fn new(layout: &Layout) -> Result<Self> {
        let (width, height) = layout.canvas_size();
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::Canvas { width, height })?;
        Ok(Self { pixmap })
    }

    fn fill(&mut self, color: Color) {
        self.pixmap.fill(color.to_skia());
    }

    /// Fills the union of `parts`. A translucent color is painted opaque on
    /// a layer first so overlapping parts blend with the canvas only once.
    fn fill_shape(&mut self, parts: &[Path], color: Color) {
        if parts.is_empty() {
            return;
        }
        let paint = solid_paint(color.opaque());
        if color.is_opaque() {
            for part in parts {
                self.pixmap
                    .fill_path(part, &paint, FillRule::Winding, Transform::identity(), None);
            }
            return;
        }

        let (mut left, mut top, mut right, mut bottom) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for part in parts {
            let b = part.bounds();
            left = left.min(b.left());
            top = top.min(b.top());
            right = right.max(b.right());
            bottom = bottom.max(b.bottom());
        }
        let (ox, oy) = (left.floor(), top.floor());
        let width = (right.ceil() - ox).max(1.0) as u32;
        let height = (bottom.ceil() - oy).max(1.0) as u32;
        let Some(mut layer) = Pixmap::new(width, height) else {
            return;
        };
        let offset = Transform::from_translate(-ox, -oy);
        for part in parts {
            layer.fill_path(part, &paint, FillRule::Winding, offset, None);
        }
        let blend = PixmapPaint {
            opacity: color.a as f32 / 255.0,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            ox as i32,
            oy as i32,
            layer.as_ref(),
            &blend,
            Transform::identity(),
            None,
        );
    }

    /// Resamples `image` into `rect` with a bicubic filter.
    fn draw_image(&mut self, image: &RgbaImage, rect: Rect) {
        let Some(src) = pixmap_from_rgba(image) else {
            return;
        };
        let sx = rect.width / src.width() as f32;
        let sy = rect.height / src.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            src.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, rect.x, rect.y),
            None,
        );
    }

    fn draw_badge(&mut self, assets: &dyn AssetProvider, badge: &BadgeAnchor, variant: BadgeVariant) {
        match assets.badge(badge.classification, variant) {
            Ok(icon) => self.draw_image(&icon, badge.rect),
            Err(missing) => debug!("{missing}; skipping badge"),
        }
    }

    fn draw_text(
        &mut self,
        block: &TextBlock,
        measurer: &TextMeasurer,
        color: Color,
        assets: &dyn AssetProvider,
    ) {
        let paint = solid_paint(color);
        let em = measurer.font_size();
        for (index, line) in block.lines.iter().enumerate() {
            let top = block.line_top(index);
            let baseline = top + measurer.ascent();
            let mut pen = block.x;
            for cluster in line.graphemes(true) {
                let advance = measurer.cluster_advance(cluster);
                if is_emoji_cluster(cluster) {
                    match assets.emoji(cluster) {
                        Ok(bitmap) => {
                            let box_top = top + (block.line_height - em) / 2.0;
                            self.draw_image(&bitmap, Rect::new(pen, box_top, em, em));
                            pen += advance;
                            continue;
                        }
                        Err(missing) => debug!("{missing}; drawing outlines"),
                    }
                }
                self.fill_glyphs(cluster, measurer.typeface(), pen, baseline, &paint);
                pen += advance;
            }
        }
    }

    fn fill_glyphs(&mut self, cluster: &str, face: &dyn Typeface, x: f32, baseline: f32, paint: &Paint) {
        let mut pen = x;
        for ch in cluster.chars() {
            if let Some(outline) = face.outline(ch) {
                self.pixmap.fill_path(
                    &outline,
                    paint,
                    FillRule::Winding,
                    Transform::from_translate(pen, baseline),
                    None,
                );
            }
            pen += face.advance(ch);
        }
    }

    fn finish(self) -> Result<RenderedImage> {
        let png = self
            .pixmap
            .encode_png()
            .map_err(|err| RenderError::Encode(err.to_string()))?;
        Ok(RenderedImage {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            png,
        })
    }
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

/// Rounded rectangle plus either the tail or the two unsent dots.
fn bubble_shape(block: &LayoutBlock, radius: f32) -> Vec<Path> {
    let mut parts = Vec::with_capacity(3);
    parts.extend(rounded_rect(block.frame, radius));
    match &block.decoration {
        Decoration::Tail(points) => {
            let mut pb = PathBuilder::new();
            pb.move_to(points[0].0, points[0].1);
            pb.line_to(points[1].0, points[1].1);
            pb.line_to(points[2].0, points[2].1);
            pb.close();
            parts.extend(pb.finish());
        }
        Decoration::UnsentDots(dots) => {
            for dot in dots {
                parts.extend(PathBuilder::from_circle(dot.cx, dot.cy, dot.radius));
            }
        }
        Decoration::None => {}
    }
    parts
}

fn rounded_rect(rect: Rect, radius: f32) -> Option<Path> {
    // cubic approximation of a quarter circle
    const K: f32 = 0.552_284_8;
    let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let c = r * K;
    let (x, y, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + c, y, right, y + r - c, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + c, right - r + c, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - c, bottom, x, bottom - r + c, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - c, x + r - c, y, x + r, y);
    pb.close();
    pb.finish()
}

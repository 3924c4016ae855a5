use crate::config::ChainConfig;
use crate::error::{RenderError, Result};
use crate::ir::Message;
use crate::text_metrics::TextMeasurer;

use super::text::wrap_to_width;
use super::{BadgeAnchor, Decoration, Layout, LayoutBlock, LayoutMode, Rect, TextBlock};

/// Lays out a reply chain. `text` measures message bodies, `label` measures
/// usernames. Every message must carry a username.
pub fn compute_chain_layout(
    messages: &[Message],
    text: &TextMeasurer,
    label: &TextMeasurer,
    config: &ChainConfig,
) -> Result<Layout> {
    let content_x = config.content_x();
    let max_text_width = config.max_text_width();
    let mut blocks = Vec::with_capacity(messages.len());
    let mut y = config.margin;
    let mut bottom = config.margin;

    for (index, message) in messages.iter().enumerate() {
        let username = message
            .username
            .as_deref()
            .ok_or(RenderError::MissingField {
                index,
                field: "username",
            })?;

        let avatar = Rect::new(config.margin, y, config.avatar_size, config.avatar_size);

        let name_size = label.measure(username);
        let name_y = y + (config.avatar_size - name_size.height) / 2.0;
        let name_block = TextBlock {
            lines: vec![username.to_string()],
            x: content_x,
            y: name_y,
            width: name_size.width,
            height: name_size.height,
            line_height: label.line_height(),
            line_spacing: 0.0,
        };

        let lines = wrap_to_width(&message.content, max_text_width, text);
        let text_size = text.block_size(&lines, config.line_spacing);
        let text_y = avatar.bottom() + config.text_gap;
        let text_block = TextBlock {
            lines,
            x: content_x,
            y: text_y,
            width: text_size.width,
            height: text_size.height,
            line_height: text.line_height(),
            line_spacing: config.line_spacing,
        };

        // An empty body still centers the badge on one line.
        let reference_height = if text_block.lines.is_empty() {
            text.line_height()
        } else {
            text_block.height
        };
        let badge = message.classification.map(|classification| BadgeAnchor {
            classification,
            rect: Rect::new(
                config.canvas_width - config.margin - config.badge_size,
                text_y + (reference_height - config.badge_size) / 2.0,
                config.badge_size,
                config.badge_size,
            ),
        });

        bottom = [
            avatar.bottom(),
            name_block.bottom(),
            text_block.bottom(),
            badge.as_ref().map_or(f32::MIN, |b| b.rect.bottom()),
        ]
        .into_iter()
        .fold(f32::MIN, f32::max);

        blocks.push(LayoutBlock {
            index,
            side: message.side,
            frame: Rect::new(0.0, y, config.canvas_width, bottom - y),
            text: text_block,
            badge,
            avatar: Some(avatar),
            username: Some(name_block),
            decoration: Decoration::None,
        });

        y = bottom + config.block_spacing;
    }

    Ok(Layout {
        mode: LayoutMode::Chain,
        width: config.canvas_width,
        height: bottom + config.bottom_padding,
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Classification, Side};
    use crate::text_metrics::ApproxMetrics;
    use std::sync::Arc;

    fn measurers(config: &ChainConfig) -> (TextMeasurer, TextMeasurer) {
        (
            TextMeasurer::new(Arc::new(ApproxMetrics::fixed(config.font_size, 20.0))),
            TextMeasurer::new(Arc::new(ApproxMetrics::fixed(config.username_font_size, 16.0))),
        )
    }

    fn reply(user: &str, text: &str) -> Message {
        Message::new(Side::Right, text).by(user, Some("https://example.invalid/a.png"))
    }

    #[test]
    fn block_bottom_is_max_of_parts() {
        let config = ChainConfig::default();
        let (text, label) = measurers(&config);
        let messages = vec![
            reply("alice", "short").classified(Classification::Good),
            reply("bob", &"long words here ".repeat(40)),
        ];
        let layout = compute_chain_layout(&messages, &text, &label, &config).unwrap();
        for block in &layout.blocks {
            let mut parts = vec![
                block.avatar.unwrap().bottom(),
                block.username.as_ref().unwrap().bottom(),
                block.text.bottom(),
            ];
            if let Some(badge) = &block.badge {
                parts.push(badge.rect.bottom());
            }
            let expected = parts.into_iter().fold(f32::MIN, f32::max);
            assert!((block.frame.bottom() - expected).abs() < 1e-3);
        }
        // single short line: the badge overhangs the text
        let first = &layout.blocks[0];
        assert!((first.frame.bottom() - first.badge.as_ref().unwrap().rect.bottom()).abs() < 1e-3);
        // long reply: the text is the lowest part
        let second = &layout.blocks[1];
        assert!((second.frame.bottom() - second.text.bottom()).abs() < 1e-3);
        assert!((second.frame.y - (first.frame.bottom() + config.block_spacing)).abs() < 1e-3);
        assert!((layout.height - (second.frame.bottom() + config.bottom_padding)).abs() < 1e-3);
    }

    #[test]
    fn empty_body_centers_badge_on_one_line() {
        let config = ChainConfig::default();
        let (text, label) = measurers(&config);
        let messages = vec![reply("carol", "").classified(Classification::Blunder)];
        let layout = compute_chain_layout(&messages, &text, &label, &config).unwrap();
        let block = &layout.blocks[0];
        assert!(block.text.lines.is_empty());
        let badge = block.badge.as_ref().unwrap().rect;
        let center = badge.y + badge.height / 2.0;
        let line_center = block.text.y + text.line_height() / 2.0;
        assert!((center - line_center).abs() < 1e-3);
        assert!(badge.y < block.text.y);
    }

    #[test]
    fn username_is_centered_on_avatar() {
        let config = ChainConfig::default();
        let (text, label) = measurers(&config);
        let layout = compute_chain_layout(&[reply("dave", "hi")], &text, &label, &config).unwrap();
        let block = &layout.blocks[0];
        let avatar = block.avatar.unwrap();
        let name = block.username.as_ref().unwrap();
        let avatar_center = avatar.y + avatar.height / 2.0;
        let name_center = name.y + name.height / 2.0;
        assert!((avatar_center - name_center).abs() < 1e-3);
        assert_eq!(avatar.x, config.margin);
        assert_eq!(name.x, config.content_x());
        assert_eq!(block.text.y, avatar.bottom() + config.text_gap);
    }

    #[test]
    fn text_wraps_inside_avatar_and_badge_columns() {
        let config = ChainConfig::default();
        let (text, label) = measurers(&config);
        let token = "z".repeat(120);
        let layout = compute_chain_layout(&[reply("erin", &token)], &text, &label, &config).unwrap();
        let block = &layout.blocks[0];
        assert!(block.text.lines.len() > 1);
        assert!(block.text.width <= config.max_text_width());
        assert_eq!(block.text.lines.concat(), token);
    }

    #[test]
    fn missing_username_is_fatal() {
        let config = ChainConfig::default();
        let (text, label) = measurers(&config);
        let messages = vec![reply("f", "ok"), Message::new(Side::Left, "who?")];
        let err = compute_chain_layout(&messages, &text, &label, &config).unwrap_err();
        assert!(matches!(err, RenderError::MissingField { index: 1, field: "username" }));
    }

    #[test]
    fn empty_chain_is_margins_only() {
        let config = ChainConfig::default();
        let (text, label) = measurers(&config);
        let layout = compute_chain_layout(&[], &text, &label, &config).unwrap();
        assert_eq!(layout.height, config.margin + config.bottom_padding);
    }
}

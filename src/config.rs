use crate::error::{RenderError, Result};
use crate::theme::{BubbleTheme, ChainTheme};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of the two-column bubble mode. Every length is in output pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BubbleConfig {
    pub canvas_width: f32,
    pub padding: f32,
    pub font_family: String,
    pub font_size: f32,
    pub line_spacing: f32,
    pub corner_radius: f32,
    pub max_bubble_ratio: f32,
    pub same_side_gap_ratio: f32,
    pub cross_side_gap_ratio: f32,
    pub badge_size: f32,
    pub badge_margin: f32,
    pub text_offset: f32,
    /// Tail polygon as `(outward, up)` offsets from the bubble's bottom-outer
    /// corner. `outward` points away from the canvas center.
    pub tail_points: [(f32, f32); 3],
    /// Centers of the unsent circles as `(outward, down)` offsets from the
    /// bottom-outer corner, with their radii.
    pub unsent_dots: [(f32, f32, f32); 2],
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280.0,
            padding: 48.0,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            font_size: 56.0,
            line_spacing: 24.0,
            corner_radius: 48.0,
            max_bubble_ratio: 0.75,
            same_side_gap_ratio: 0.2,
            cross_side_gap_ratio: 0.67,
            badge_size: 144.0,
            badge_margin: 168.0,
            text_offset: 8.0,
            tail_points: [(-8.0, 64.0), (24.0, 0.0), (-40.0, 16.0)],
            unsent_dots: [(4.0, 4.0, 16.0), (28.0, 28.0, 8.0)],
        }
    }
}

impl BubbleConfig {
    pub fn max_text_width(&self) -> f32 {
        self.canvas_width * self.max_bubble_ratio - 2.0 * self.padding
    }

    pub fn gap_after(&self, same_side: bool) -> f32 {
        if same_side {
            self.padding * self.same_side_gap_ratio
        } else {
            self.padding * self.cross_side_gap_ratio
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.canvas_width > 0.0) || !(self.font_size > 0.0) {
            return Err(RenderError::InvalidConfig(
                "bubble canvas width and font size must be positive".to_string(),
            ));
        }
        if !(self.max_text_width() > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "bubble padding {} leaves no room for text in a {} px canvas",
                self.padding, self.canvas_width
            )));
        }
        Ok(())
    }
}

/// Geometry of the reply-chain mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainConfig {
    pub canvas_width: f32,
    pub margin: f32,
    pub bottom_padding: f32,
    pub avatar_size: f32,
    pub avatar_gap: f32,
    pub font_family: String,
    pub font_size: f32,
    pub username_font_size: f32,
    pub line_spacing: f32,
    pub text_gap: f32,
    pub badge_size: f32,
    pub badge_gap: f32,
    pub block_spacing: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280.0,
            margin: 48.0,
            bottom_padding: 48.0,
            avatar_size: 128.0,
            avatar_gap: 32.0,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            font_size: 56.0,
            username_font_size: 48.0,
            line_spacing: 24.0,
            text_gap: 24.0,
            badge_size: 144.0,
            badge_gap: 32.0,
            block_spacing: 64.0,
        }
    }
}

impl ChainConfig {
    pub fn content_x(&self) -> f32 {
        self.margin + self.avatar_size + self.avatar_gap
    }

    pub fn max_text_width(&self) -> f32 {
        self.canvas_width
            - self.avatar_size
            - self.badge_size
            - 2.0 * self.margin
            - self.avatar_gap
            - self.badge_gap
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.canvas_width > 0.0) || !(self.font_size > 0.0) || !(self.username_font_size > 0.0)
        {
            return Err(RenderError::InvalidConfig(
                "chain canvas width and font sizes must be positive".to_string(),
            ));
        }
        if !(self.max_text_width() > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "chain avatar/badge sizes leave no room for text in a {} px canvas",
                self.canvas_width
            )));
        }
        Ok(())
    }
}

/// Settings that are not geometry: avatar acquisition and resampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub avatar_timeout_ms: u64,
    pub avatar_supersample: u32,
    pub user_agent: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            avatar_timeout_ms: 3000,
            avatar_supersample: 4,
            user_agent: concat!("convo-renderer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Upper bound for `avatarSupersample`; beyond it the resampling work buys nothing.
pub const MAX_AVATAR_SUPERSAMPLE: u32 = 16;

impl RenderConfig {
    /// Checks the supersample factor against an avatar edge of `avatar_px`.
    pub fn validate(&self, avatar_px: u32) -> Result<()> {
        let factor = self.avatar_supersample;
        if !(1..=MAX_AVATAR_SUPERSAMPLE).contains(&factor) {
            return Err(RenderError::InvalidConfig(format!(
                "avatarSupersample must be between 1 and {MAX_AVATAR_SUPERSAMPLE}, got {factor}"
            )));
        }
        if avatar_px.checked_mul(factor).is_none() {
            return Err(RenderError::InvalidConfig(format!(
                "avatar of {avatar_px} px cannot be supersampled {factor}x"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bubble_theme: BubbleTheme,
    pub chain_theme: ChainTheme,
    pub bubble: BubbleConfig,
    pub chain: ChainConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bubble_theme: BubbleTheme::imessage(),
            chain_theme: ChainTheme::reddit_dark(),
            bubble: BubbleConfig::default(),
            chain: ChainConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    left_bubble: Option<String>,
    left_text: Option<String>,
    right_bubble: Option<String>,
    right_text: Option<String>,
    background: Option<String>,
    chain_background: Option<String>,
    username_color: Option<String>,
    text_color: Option<String>,
    avatar_matte: Option<String>,
    avatar_placeholder: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    bubble: Option<BubbleConfig>,
    chain: Option<ChainConfig>,
    render: Option<RenderConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "light" | "imessage" | "default" => {
                config.bubble_theme = BubbleTheme::imessage();
                config.chain_theme = ChainTheme::reddit_light();
            }
            "dark" => {
                config.bubble_theme = BubbleTheme::dark();
                config.chain_theme = ChainTheme::reddit_dark();
            }
            other => anyhow::bail!("unknown theme preset {other:?}"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let bubble = &mut config.bubble_theme;
        if let Some(v) = vars.left_bubble {
            bubble.left.bubble = v;
        }
        if let Some(v) = vars.left_text {
            bubble.left.text = v;
        }
        if let Some(v) = vars.right_bubble {
            bubble.right.bubble = v;
        }
        if let Some(v) = vars.right_text {
            bubble.right.text = v;
        }
        if let Some(v) = vars.background {
            bubble.background = v;
        }
        let chain = &mut config.chain_theme;
        if let Some(v) = vars.chain_background {
            chain.background = v;
        }
        if let Some(v) = vars.username_color {
            chain.username = v;
        }
        if let Some(v) = vars.text_color {
            chain.text = v;
        }
        if let Some(v) = vars.avatar_matte {
            chain.avatar_matte = v;
        }
        if let Some(v) = vars.avatar_placeholder {
            chain.avatar_placeholder = v;
        }
    }

    if let Some(bubble) = parsed.bubble {
        config.bubble = bubble;
    }
    if let Some(chain) = parsed.chain {
        config.chain = chain;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    Ok(config)
}

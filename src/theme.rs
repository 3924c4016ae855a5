use crate::error::{RenderError, Result};
use crate::ir::{ColorData, Side};
use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is optional).
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || RenderError::InvalidColor(value.to_string());
        let hex = value.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let mut out = [0u8; 3];
                for (idx, ch) in hex.chars().enumerate() {
                    let v = channel(&ch.to_string())?;
                    out[idx] = v * 17;
                }
                Ok(Color::rgb(out[0], out[1], out[2]))
            }
            6 | 8 => {
                let r = channel(&hex[0..2])?;
                let g = channel(&hex[2..4])?;
                let b = channel(&hex[4..6])?;
                let a = if hex.len() == 8 { channel(&hex[6..8])? } else { 255 };
                Ok(Color { r, g, b, a })
            }
            _ => Err(invalid()),
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }

    pub fn to_skia(self) -> resvg::tiny_skia::Color {
        resvg::tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideColors {
    pub bubble: String,
    pub text: String,
}

/// Colors for the two-column bubble mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleTheme {
    pub left: SideColors,
    pub right: SideColors,
    pub background: String,
}

impl BubbleTheme {
    pub fn imessage() -> Self {
        Self {
            left: SideColors {
                bubble: "#E9E9EB".to_string(),
                text: "#000000".to_string(),
            },
            right: SideColors {
                bubble: "#0B84FE".to_string(),
                text: "#FFFFFF".to_string(),
            },
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            left: SideColors {
                bubble: "#262629".to_string(),
                text: "#FFFFFF".to_string(),
            },
            right: SideColors {
                bubble: "#0B84FE".to_string(),
                text: "#FFFFFF".to_string(),
            },
            background: "#000000".to_string(),
        }
    }

    pub fn side(&self, side: Side) -> &SideColors {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Applies the colors reported by the upstream producer, keeping ours
    /// for whatever it left out.
    pub fn with_color_data(mut self, data: &ColorData) -> Self {
        if let Some(left) = &data.left {
            self.left = SideColors {
                bubble: left.bubble_hex.clone(),
                text: left.text_hex.clone(),
            };
        }
        if let Some(right) = &data.right {
            self.right = SideColors {
                bubble: right.bubble_hex.clone(),
                text: right.text_hex.clone(),
            };
        }
        if let Some(bg) = &data.background_hex {
            self.background = bg.clone();
        }
        self
    }
}

/// Colors for the single-column reply chain mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTheme {
    pub background: String,
    pub username: String,
    pub text: String,
    pub avatar_matte: String,
    pub avatar_placeholder: String,
}

impl ChainTheme {
    pub fn reddit_dark() -> Self {
        Self {
            background: "#0E1113".to_string(),
            username: "#B7CAD4".to_string(),
            text: "#EEF1F3".to_string(),
            avatar_matte: "#0E1113".to_string(),
            avatar_placeholder: "#3C4A53".to_string(),
        }
    }

    pub fn reddit_light() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            username: "#576F76".to_string(),
            text: "#0F1A1C".to_string(),
            avatar_matte: "#FFFFFF".to_string(),
            avatar_placeholder: "#C9D3D8".to_string(),
        }
    }
}

pub(crate) struct BubblePalette {
    pub left_bubble: Color,
    pub left_text: Color,
    pub right_bubble: Color,
    pub right_text: Color,
    pub background: Color,
}

impl BubblePalette {
    pub fn resolve(theme: &BubbleTheme) -> Result<Self> {
        Ok(Self {
            left_bubble: Color::parse(&theme.left.bubble)?,
            left_text: Color::parse(&theme.left.text)?,
            right_bubble: Color::parse(&theme.right.bubble)?,
            right_text: Color::parse(&theme.right.text)?,
            background: Color::parse(&theme.background)?,
        })
    }

    pub fn bubble(&self, side: Side) -> Color {
        match side {
            Side::Left => self.left_bubble,
            Side::Right => self.right_bubble,
        }
    }

    pub fn text(&self, side: Side) -> Color {
        match side {
            Side::Left => self.left_text,
            Side::Right => self.right_text,
        }
    }
}

pub(crate) struct ChainPalette {
    pub background: Color,
    pub username: Color,
    pub text: Color,
    pub avatar_matte: Color,
    pub avatar_placeholder: Color,
}

impl ChainPalette {
    pub fn resolve(theme: &ChainTheme) -> Result<Self> {
        Ok(Self {
            background: Color::parse(&theme.background)?,
            username: Color::parse(&theme.username)?,
            text: Color::parse(&theme.text)?,
            avatar_matte: Color::parse(&theme.avatar_matte)?,
            avatar_placeholder: Color::parse(&theme.avatar_placeholder)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SideColorData;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::parse("#fff").unwrap(), Color::rgb(255, 255, 255));
        assert_eq!(Color::parse("0B84FE").unwrap(), Color::rgb(11, 132, 254));
        let translucent = Color::parse("#00000080").unwrap();
        assert_eq!(translucent.a, 128);
        assert!(!translucent.is_opaque());
    }

    #[test]
    fn rejects_malformed_colors() {
        for bad in ["", "#12", "#ggg", "#12345", "blue", "#ééé"] {
            assert!(
                matches!(Color::parse(bad), Err(RenderError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn color_data_overrides_only_given_sides() {
        let data = ColorData {
            left: Some(SideColorData {
                bubble_hex: "#123456".to_string(),
                text_hex: "#abcdef".to_string(),
                label: None,
            }),
            right: None,
            background_hex: Some("#000000".to_string()),
        };
        let theme = BubbleTheme::imessage().with_color_data(&data);
        assert_eq!(theme.left.bubble, "#123456");
        assert_eq!(theme.right, BubbleTheme::imessage().right);
        assert_eq!(theme.background, "#000000");
    }

    #[test]
    fn palette_surfaces_bad_theme_color() {
        let mut theme = ChainTheme::reddit_dark();
        theme.text = "nope".to_string();
        assert!(ChainPalette::resolve(&theme).is_err());
    }
}

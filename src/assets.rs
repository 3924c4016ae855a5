//! Badge icons, emoji bitmaps and fonts.
//!
//! Rendering code only sees [`AssetProvider`]. [`DirAssets`] serves a
//! directory tree plus system fonts; [`MemoryAssets`] holds everything in
//! memory and is what tests and benches use.

use crate::error::{AssetMissing, RenderError, Result};
use crate::ir::{BadgeVariant, Classification};
use crate::raster::rgba_from_pixmap;
use crate::text_metrics::{ApproxMetrics, Font, Typeface, emoji_key};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use image::RgbaImage;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use resvg::tiny_skia::{Pixmap, Transform};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait AssetProvider: Send + Sync {
    fn badge(
        &self,
        classification: Classification,
        variant: BadgeVariant,
    ) -> std::result::Result<RgbaImage, AssetMissing>;

    /// `family` is a CSS-style family list. Unknown families yield
    /// [`RenderError::AssetMissing`]; unreadable font data is
    /// [`RenderError::InvalidFont`].
    fn font(&self, family: &str, size: f32) -> Result<Arc<dyn Typeface>>;

    fn default_font(&self, size: f32) -> Result<Arc<dyn Typeface>>;

    fn emoji(&self, cluster: &str) -> std::result::Result<RgbaImage, AssetMissing>;
}

/// Looks up `family`, falling back to the provider's default font when the
/// family is unknown. Broken font data is still an error.
pub fn resolve_font(
    assets: &dyn AssetProvider,
    family: &str,
    size: f32,
) -> Result<Arc<dyn Typeface>> {
    match assets.font(family, size) {
        Ok(face) => Ok(face),
        Err(RenderError::AssetMissing(missing)) => {
            warn!("{missing}; using default font");
            assets.default_font(size)
        }
        Err(err) => Err(err),
    }
}

type FaceData = (String, Arc<Vec<u8>>, u32);

/// Assets laid out as `badges/`, `emoji/` and `fonts/` under one root.
/// Fonts in `fonts/` take part in family lookup next to system fonts.
pub struct DirAssets {
    root: PathBuf,
    fonts: OnceCell<Database>,
    faces: Mutex<HashMap<String, Option<FaceData>>>,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fonts: OnceCell::new(),
            faces: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database(&self) -> &Database {
        self.fonts.get_or_init(|| {
            let mut db = Database::new();
            let dir = self.root.join("fonts");
            if dir.is_dir() {
                db.load_fonts_dir(&dir);
            }
            db.load_system_fonts();
            debug!("font database holds {} faces", db.len());
            db
        })
    }

    fn face_data(&self, family: &str) -> Option<FaceData> {
        let key = normalize_family_key(family);
        if let Ok(cache) = self.faces.lock()
            && let Some(hit) = cache.get(&key)
        {
            return hit.clone();
        }
        let loaded = self.query_face(family);
        if let Ok(mut cache) = self.faces.lock() {
            cache.insert(key, loaded.clone());
        }
        loaded
    }

    fn query_face(&self, family: &str) -> Option<FaceData> {
        let tokens = parse_family_list(family);
        let families: Vec<Family<'_>> = tokens.iter().map(FamilyToken::as_family).collect();
        let db = self.database();
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = db.query(&query)?;
        let name = db
            .face(id)
            .and_then(|info| info.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| family.to_string());
        db.with_face_data(id, |data, index| (name, Arc::new(data.to_vec()), index))
    }

    fn load_image(&self, dir: &str, stem: &str) -> Option<RgbaImage> {
        let base = self.root.join(dir);
        let png = base.join(format!("{stem}.png"));
        if png.is_file() {
            match image::open(&png) {
                Ok(image) => return Some(image.to_rgba8()),
                Err(err) => warn!("cannot decode {}: {err}", png.display()),
            }
        }
        let svg = base.join(format!("{stem}.svg"));
        if svg.is_file() {
            match std::fs::read(&svg) {
                Ok(data) => return rasterize_svg(&data),
                Err(err) => warn!("cannot read {}: {err}", svg.display()),
            }
        }
        None
    }
}

impl AssetProvider for DirAssets {
    fn badge(
        &self,
        classification: Classification,
        variant: BadgeVariant,
    ) -> std::result::Result<RgbaImage, AssetMissing> {
        let path = classification.icon_path(variant);
        let stem = path.trim_end_matches(".png");
        self.load_image("badges", stem)
            .ok_or(AssetMissing::Badge(path))
    }

    fn font(&self, family: &str, size: f32) -> Result<Arc<dyn Typeface>> {
        let (name, data, index) = self
            .face_data(family)
            .ok_or_else(|| AssetMissing::Font(family.to_string()))?;
        Ok(Arc::new(Font::from_data(&name, data, index, size)?))
    }

    fn default_font(&self, size: f32) -> Result<Arc<dyn Typeface>> {
        if let Some((name, data, index)) = self.face_data("sans-serif") {
            return Ok(Arc::new(Font::from_data(&name, data, index, size)?));
        }
        let db = self.database();
        let id = db
            .faces()
            .next()
            .map(|info| info.id)
            .ok_or(RenderError::NoDefaultFont)?;
        let (data, index) = db
            .with_face_data(id, |data, index| (Arc::new(data.to_vec()), index))
            .ok_or(RenderError::NoDefaultFont)?;
        Ok(Arc::new(Font::from_data("default", data, index, size)?))
    }

    fn emoji(&self, cluster: &str) -> std::result::Result<RgbaImage, AssetMissing> {
        let key = emoji_key(cluster);
        self.load_image("emoji", &key)
            .ok_or(AssetMissing::Emoji(key))
    }
}

/// In-memory assets. Without registered font data every family resolves to
/// metric-only [`ApproxMetrics`], which lays out correctly but draws no
/// glyphs.
#[derive(Default)]
pub struct MemoryAssets {
    fonts: HashMap<String, Arc<Vec<u8>>>,
    badges: HashMap<String, RgbaImage>,
    emoji: HashMap<String, RgbaImage>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, family: &str, data: Vec<u8>) -> Self {
        self.fonts.insert(normalize_family_key(family), Arc::new(data));
        self
    }

    /// Registers a badge under its icon path, e.g. `"winner_white.png"`.
    pub fn with_badge(mut self, path: &str, image: RgbaImage) -> Self {
        self.badges.insert(path.to_string(), image);
        self
    }

    pub fn with_emoji(mut self, cluster: &str, image: RgbaImage) -> Self {
        self.emoji.insert(emoji_key(cluster), image);
        self
    }
}

impl AssetProvider for MemoryAssets {
    fn badge(
        &self,
        classification: Classification,
        variant: BadgeVariant,
    ) -> std::result::Result<RgbaImage, AssetMissing> {
        let path = classification.icon_path(variant);
        self.badges
            .get(&path)
            .cloned()
            .ok_or(AssetMissing::Badge(path))
    }

    fn font(&self, family: &str, size: f32) -> Result<Arc<dyn Typeface>> {
        if self.fonts.is_empty() {
            return Ok(Arc::new(ApproxMetrics::new(size)));
        }
        for token in family.split(',') {
            let key = normalize_family_key(token);
            if let Some(data) = self.fonts.get(&key) {
                return Ok(Arc::new(Font::from_data(&key, data.clone(), 0, size)?));
            }
        }
        Err(AssetMissing::Font(family.to_string()).into())
    }

    fn default_font(&self, size: f32) -> Result<Arc<dyn Typeface>> {
        let mut registered: Vec<_> = self.fonts.iter().collect();
        registered.sort_by(|a, b| a.0.cmp(b.0));
        match registered.first() {
            Some((name, data)) => Ok(Arc::new(Font::from_data(name, (*data).clone(), 0, size)?)),
            None => Ok(Arc::new(ApproxMetrics::new(size))),
        }
    }

    fn emoji(&self, cluster: &str) -> std::result::Result<RgbaImage, AssetMissing> {
        let key = emoji_key(cluster);
        self.emoji.get(&key).cloned().ok_or(AssetMissing::Emoji(key))
    }
}

enum FamilyToken {
    Generic(Family<'static>),
    Name(String),
}

impl FamilyToken {
    fn as_family(&self) -> Family<'_> {
        match self {
            FamilyToken::Generic(family) => *family,
            FamilyToken::Name(name) => Family::Name(name),
        }
    }
}

fn parse_family_list(font_family: &str) -> Vec<FamilyToken> {
    let mut order = Vec::new();
    for part in font_family.split(',') {
        let raw = part.trim().trim_matches('"').trim_matches('\'');
        if raw.is_empty() {
            continue;
        }
        let token = match raw.to_ascii_lowercase().as_str() {
            "serif" => FamilyToken::Generic(Family::Serif),
            "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                FamilyToken::Generic(Family::SansSerif)
            }
            "monospace" | "ui-monospace" => FamilyToken::Generic(Family::Monospace),
            "cursive" => FamilyToken::Generic(Family::Cursive),
            "fantasy" => FamilyToken::Generic(Family::Fantasy),
            _ => FamilyToken::Name(raw.to_string()),
        };
        order.push(token);
    }
    if order.is_empty() {
        order.push(FamilyToken::Generic(Family::SansSerif));
    }
    order
}

fn normalize_family_key(font_family: &str) -> String {
    font_family
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_ascii_lowercase())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders an SVG document at its intrinsic size.
fn rasterize_svg(data: &[u8]) -> Option<RgbaImage> {
    let tree = match usvg::Tree::from_data(data, &usvg::Options::default()) {
        Ok(tree) => tree,
        Err(err) => {
            warn!("cannot parse svg asset: {err}");
            return None;
        }
    };
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    Some(rgba_from_pixmap(&pixmap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn family_list_maps_generics_and_names() {
        let tokens = parse_family_list("\"Helvetica Neue\", Arial, sans-serif, ui-monospace");
        let families: Vec<Family<'_>> = tokens.iter().map(FamilyToken::as_family).collect();
        assert_eq!(
            families,
            vec![
                Family::Name("Helvetica Neue"),
                Family::Name("Arial"),
                Family::SansSerif,
                Family::Monospace,
            ]
        );
        assert!(matches!(
            parse_family_list(" , ").as_slice(),
            [FamilyToken::Generic(Family::SansSerif)]
        ));
    }

    #[test]
    fn family_key_ignores_quotes_and_case() {
        assert_eq!(normalize_family_key("'Arial' , Sans-Serif"), "arial,sans-serif");
    }

    #[test]
    fn memory_badges_resolve_by_icon_path() {
        let icon = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let assets = MemoryAssets::new()
            .with_badge("winner_white.png", icon.clone())
            .with_badge("brilliant.png", icon);
        assert!(assets.badge(Classification::Winner, BadgeVariant::White).is_ok());
        assert_eq!(
            assets.badge(Classification::Winner, BadgeVariant::Black),
            Err(AssetMissing::Badge("winner_black.png".into()))
        );
        assert!(assets.badge(Classification::Brilliant, BadgeVariant::Black).is_ok());
    }

    #[test]
    fn memory_emoji_keyed_without_presentation_selector() {
        let assets = MemoryAssets::new().with_emoji("\u{2764}\u{FE0F}", RgbaImage::new(4, 4));
        assert!(assets.emoji("\u{2764}").is_ok());
        assert_eq!(
            assets.emoji("\u{1F525}"),
            Err(AssetMissing::Emoji("1f525".into()))
        );
    }

    #[test]
    fn memory_fonts_fall_back_to_metrics() {
        let assets = MemoryAssets::new();
        let face = resolve_font(&assets, "Arial", 30.0).unwrap();
        assert_eq!(face.size(), 30.0);
    }

    #[test]
    fn unknown_family_uses_default_but_broken_data_is_fatal() {
        let assets = MemoryAssets::new().with_font("Broken", vec![0u8; 32]);
        let err = resolve_font(&assets, "Broken", 12.0).err();
        assert!(matches!(err, Some(RenderError::InvalidFont { .. })));
        // unknown family falls through to the default, which is the same bad data
        let err = resolve_font(&assets, "Nope", 12.0).err();
        assert!(matches!(err, Some(RenderError::InvalidFont { .. })));
    }

    #[test]
    fn dir_assets_reads_png_badges_and_reports_missing() {
        let root = std::env::temp_dir().join(format!("convo-assets-{}", std::process::id()));
        let badges = root.join("badges");
        std::fs::create_dir_all(&badges).unwrap();
        RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]))
            .save(badges.join("great.png"))
            .unwrap();
        let assets = DirAssets::new(&root);
        let icon = assets.badge(Classification::Great, BadgeVariant::White).unwrap();
        assert_eq!(icon.dimensions(), (3, 3));
        assert_eq!(
            assets.badge(Classification::Resign, BadgeVariant::Black),
            Err(AssetMissing::Badge("resign_black.png".into()))
        );
        assert!(assets.emoji("\u{1F600}").is_err());
        let _ = std::fs::remove_dir_all(&root);
    }
}

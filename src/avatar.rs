//! Avatar acquisition and preparation for reply chains.
//!
//! A failed fetch is never fatal: the avatar slot gets the placeholder
//! fill and rendering carries on.

use crate::config::{MAX_AVATAR_SUPERSAMPLE, RenderConfig};
use crate::error::{FetchError, RenderError, Result};
use crate::theme::Color;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use rayon::prelude::*;
use reqwest::blocking::Client;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub trait AvatarSource: Send + Sync {
    fn fetch(&self, uri: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Fetches avatars over HTTP(S) with a per-request timeout.
pub struct HttpAvatarSource {
    client: Client,
    user_agent: String,
}

impl HttpAvatarSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RenderError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        Self::new(
            Duration::from_millis(config.avatar_timeout_ms),
            &config.user_agent,
        )
    }
}

impl AvatarSource for HttpAvatarSource {
    fn fetch(&self, uri: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let res = self
            .client
            .get(uri)
            .header("User-Agent", self.user_agent.clone())
            .send()
            .map_err(|e| FetchError::new(uri, format!("HTTP GET failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::new(uri, format!("HTTP status {status}")));
        }
        let body = res
            .bytes()
            .map_err(|e| FetchError::new(uri, format!("failed to read body: {e}")))?;
        Ok(body.to_vec())
    }
}

/// Fetches every distinct URI once, in parallel. Failed URIs are logged and
/// left out of the result.
pub fn fetch_avatars<'a>(
    source: &dyn AvatarSource,
    uris: impl IntoIterator<Item = &'a str>,
) -> HashMap<String, Vec<u8>> {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = uris.into_iter().filter(|uri| seen.insert(*uri)).collect();
    debug!("fetching {} avatar(s)", unique.len());
    unique
        .par_iter()
        .filter_map(|uri| match source.fetch(uri) {
            Ok(bytes) => Some((uri.to_string(), bytes)),
            Err(err) => {
                warn!("{err}; using placeholder");
                None
            }
        })
        .collect()
}

/// Decodes `bytes` (or falls back to a placeholder fill), flattens it onto
/// the matte and crops it to a circle. Work happens at `size * supersample`
/// and is downscaled at the end for a smooth edge.
pub fn prepare_avatar(
    bytes: Option<&[u8]>,
    size: u32,
    supersample: u32,
    matte: Color,
    placeholder: Color,
) -> RgbaImage {
    let size = size.max(1);
    let factor = supersample.clamp(1, MAX_AVATAR_SUPERSAMPLE);
    let large = size.checked_mul(factor).unwrap_or(size);

    let source = match bytes.map(image::load_from_memory) {
        Some(Ok(decoded)) => decoded.to_rgba8(),
        Some(Err(err)) => {
            warn!("undecodable avatar image: {err}; using placeholder");
            solid(1, 1, placeholder.opaque())
        }
        None => solid(1, 1, placeholder.opaque()),
    };

    let upscaled = imageops::resize(&source, large, large, FilterType::Lanczos3);
    let mut flat = solid(large, large, matte.opaque());
    imageops::overlay(&mut flat, &upscaled, 0, 0);
    mask_circle(&mut flat);

    if large == size {
        flat
    } else {
        imageops::resize(&flat, size, size, FilterType::Lanczos3)
    }
}

fn solid(width: u32, height: u32, color: Color) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([color.r, color.g, color.b, color.a]))
}

fn mask_circle(img: &mut RgbaImage) {
    let (w, h) = img.dimensions();
    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let r = w.min(h) as f32 / 2.0;
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        if dx * dx + dy * dy > r * r {
            pixel.0[3] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl AvatarSource for Counting {
        fn fetch(&self, uri: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if uri.contains("bad") {
                Err(FetchError::new(uri, "refused"))
            } else {
                Ok(uri.as_bytes().to_vec())
            }
        }
    }

    fn png(color: Rgba<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        RgbaImage::from_pixel(8, 8, color)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn duplicate_uris_are_fetched_once() {
        let source = Counting {
            calls: AtomicUsize::new(0),
        };
        let fetched = fetch_avatars(&source, ["a", "b", "a", "bad", "a"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched["a"], b"a".to_vec());
        assert!(!fetched.contains_key("bad"));
    }

    #[test]
    fn avatar_is_circular_and_sized() {
        let bytes = png(Rgba([200, 10, 10, 255]));
        let out = prepare_avatar(Some(&bytes), 32, 4, Color::rgb(0, 0, 0), Color::rgb(9, 9, 9));
        assert_eq!(out.dimensions(), (32, 32));
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        let center = out.get_pixel(16, 16).0;
        assert_eq!(center[3], 255);
        assert!(center[0] > 150 && center[1] < 60);
    }

    #[test]
    fn oversized_supersample_is_clamped() {
        let out = prepare_avatar(None, 24, u32::MAX, Color::rgb(0, 0, 0), Color::rgb(9, 9, 9));
        assert_eq!(out.dimensions(), (24, 24));
        assert_eq!(out.get_pixel(12, 12).0, [9, 9, 9, 255]);
    }

    #[test]
    fn translucent_avatar_is_flattened_onto_matte() {
        let bytes = png(Rgba([0, 0, 0, 0]));
        let matte = Color::rgb(40, 80, 120);
        let out = prepare_avatar(Some(&bytes), 16, 2, matte, Color::rgb(255, 255, 255));
        assert_eq!(out.get_pixel(8, 8).0, [40, 80, 120, 255]);
    }

    #[test]
    fn undecodable_or_missing_bytes_use_placeholder() {
        let placeholder = Color::rgb(30, 144, 255);
        for bytes in [Some(&b"not an image"[..]), None] {
            let out = prepare_avatar(bytes, 20, 3, Color::rgb(0, 0, 0), placeholder);
            assert_eq!(out.get_pixel(10, 10).0, [30, 144, 255, 255]);
        }
    }
}

pub mod assets;
pub mod avatar;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
mod raster;
pub mod render;
pub mod review;
pub mod text_metrics;
pub mod theme;

pub use assets::{AssetProvider, DirAssets, MemoryAssets};
pub use avatar::{AvatarSource, HttpAvatarSource};
#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{AssetMissing, FetchError, RenderError};
pub use ir::{Classification, Message, Side};
pub use render::{RenderedImage, render_bubbles, render_chain};

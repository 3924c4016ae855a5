use crate::assets::DirAssets;
use crate::avatar::HttpAvatarSource;
use crate::config::{Config, load_config};
use crate::ir::{ColorData, Conversation};
use crate::render::{RenderedImage, render_bubbles, render_chain, write_output_png};
use crate::review::{ReviewTally, normalize_classifications};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "convo-render", version, about = "Render annotated chat conversations to PNG")]
pub struct Args {
    /// Conversation JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output PNG file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout mode
    #[arg(short = 'm', long = "mode", value_enum, default_value = "bubble")]
    pub mode: Mode,

    /// Config JSON file (theme preset, themeVariables, geometry)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Asset directory with badges/, emoji/ and fonts/
    #[arg(short = 'a', long = "assets", default_value = "assets")]
    pub assets: PathBuf,

    /// Canvas width, overrides the config file
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Print a per-side classification table
    #[arg(long = "summary")]
    pub summary: bool,

    /// Render labels exactly as given, without clean-up
    #[arg(long = "raw")]
    pub raw: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Bubble,
    Chain,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.bubble.canvas_width = width;
        config.chain.canvas_width = width;
    }

    let input = read_input(args.input.as_deref())?;
    let mut conversation: Conversation =
        serde_json::from_str(&input).context("invalid conversation JSON")?;
    if !args.raw {
        normalize_classifications(&mut conversation.messages);
    }

    let assets = DirAssets::new(&args.assets);
    let image = render(args.mode, &conversation, &config, &assets)?;
    write_output_png(&image, args.output.as_deref())?;

    if args.summary {
        let (left, right) = side_labels(conversation.color.as_ref());
        let elo = conversation.elo.unwrap_or_default();
        let table = ReviewTally::from_messages(&conversation.messages)
            .with_elo(elo.left, elo.right)
            .to_markdown(&left, &right);
        // keep stdout clean when it carries the image
        if args.output.is_some() {
            print!("{table}");
        } else {
            eprint!("{table}");
        }
    }
    Ok(())
}

fn render(
    mode: Mode,
    conversation: &Conversation,
    config: &Config,
    assets: &DirAssets,
) -> Result<RenderedImage> {
    let image = match mode {
        Mode::Bubble => {
            let theme = match &conversation.color {
                Some(color) => config.bubble_theme.clone().with_color_data(color),
                None => config.bubble_theme.clone(),
            };
            render_bubbles(&conversation.messages, &theme, &config.bubble, assets)?
        }
        Mode::Chain => {
            let avatars = HttpAvatarSource::from_config(&config.render)?;
            render_chain(
                &conversation.messages,
                &config.chain_theme,
                &config.chain,
                &config.render,
                assets,
                &avatars,
            )?
        }
    };
    Ok(image)
}

fn side_labels(color: Option<&ColorData>) -> (String, String) {
    let label = |side: Option<&crate::ir::SideColorData>, fallback: &str| {
        side.and_then(|s| s.label.clone())
            .unwrap_or_else(|| fallback.to_string())
    };
    match color {
        Some(color) => (
            label(color.left.as_ref(), "Left"),
            label(color.right.as_ref(), "Right"),
        ),
        None => ("Left".to_string(), "Right".to_string()),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

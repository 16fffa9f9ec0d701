use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{ArgAction, Parser};

use iv::config::parse_time_code;
use iv::{
    CancelToken, Engines, FontPreview, FontStyle, FontVariant, Pipeline, RenderConfig, Rgba8,
    TerminalCapabilities, encoder_for,
};

/// Render images, documents, video, fonts, archives and more inline in the terminal.
#[derive(Parser, Debug)]
#[command(name = "iv", version, disable_help_flag = true)]
struct Cli {
    /// Files, directories or URLs to render.
    #[arg(required = true)]
    targets: Vec<String>,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Display width in pixels.
    #[arg(short = 'W', long, default_value_t = 0)]
    width: u32,

    /// Display height in pixels.
    #[arg(short = 'H', long, default_value_t = 0)]
    height: u32,

    /// Minimum display width.
    #[arg(short = 'w', long, default_value_t = 64)]
    min_width: u32,

    /// Minimum display height.
    #[arg(short = 'h', long, default_value_t = 64)]
    min_height: u32,

    /// Document rendering density.
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Page to render (1-based).
    #[arg(short, long, default_value_t = 0)]
    page: u32,

    /// Matrix-code foreground.
    #[arg(long, default_value = "dimgray")]
    fg: Rgba8,

    /// Background color.
    #[arg(long, default_value = "transparent")]
    bg: Rgba8,

    /// Matrix-code border in pixels.
    #[arg(long, default_value_t = 30)]
    border: u32,

    /// Font preview size in points.
    #[arg(long, default_value_t = 48.0)]
    font_size: f32,

    /// Font preview style.
    #[arg(long, value_enum, default_value_t = FontStyle::Normal)]
    font_style: FontStyle,

    /// Font preview variant.
    #[arg(long, value_enum, default_value_t = FontVariant::Normal)]
    font_variant: FontVariant,

    /// Font preview foreground.
    #[arg(long, default_value = "black")]
    font_fg: Rgba8,

    /// Font preview background.
    #[arg(long, default_value = "white")]
    font_bg: Rgba8,

    /// Font preview density.
    #[arg(long, default_value_t = 100.0)]
    font_dpi: f32,

    /// Font preview margin in points.
    #[arg(long, default_value_t = 5.0)]
    font_margin: f32,

    /// Video snapshot offset (SS, MM:SS, HH:MM:SS, 90s, 2m, 1h).
    #[arg(short = 't', long, value_parser = parse_time_code)]
    time_code: Option<Duration>,

    /// Raster engine worker count.
    #[arg(long)]
    vips_concurrency: Option<usize>,

    /// Extra Mermaid icon packs.
    #[arg(long)]
    mermaid_icons: Vec<String>,

    /// Diagram background.
    #[arg(long, default_value = "white")]
    mermaid_bg: Rgba8,

    /// Root directory for temporary workspaces.
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> RenderConfig {
        let defaults = RenderConfig::default();
        RenderConfig {
            width: self.width,
            height: self.height,
            min_width: self.min_width,
            min_height: self.min_height,
            dpi: self.dpi,
            page: self.page,
            fg: self.fg,
            bg: None,
            border: self.border,
            font: FontPreview {
                size: self.font_size,
                style: self.font_style,
                variant: self.font_variant,
                fg: self.font_fg,
                bg: self.font_bg,
                dpi: self.font_dpi,
                margin: self.font_margin,
            },
            time_code: self.time_code,
            concurrency: self.vips_concurrency.unwrap_or(defaults.concurrency),
            mermaid_icons: self.mermaid_icons.clone(),
            mermaid_bg: self.mermaid_bg,
            temp_dir: self.temp_dir.clone(),
        }
        .with_bg(self.bg)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = cli.config();
    config.validate().context("invalid options")?;

    let caps = TerminalCapabilities::detect();
    tracing::debug!(terminal = %caps.terminal_name, "detected terminal");
    let protocol = caps
        .preferred()
        .with_context(|| format!("terminal {:?} does not support graphics", caps.terminal_name))?;
    let encoder = encoder_for(protocol);

    let cancel = CancelToken::from_signals()?;
    let engines = Engines::default();
    let pipeline = Pipeline::new(&config, &engines, &cancel, encoder.as_ref());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = pipeline.run(&mut out, &cli.targets)?;
    out.flush().context("flush stdout")?;
    tracing::debug!(?summary, "done");

    if summary.cancelled {
        anyhow::bail!("cancelled");
    }
    Ok(())
}

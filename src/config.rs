use std::path::PathBuf;
use std::time::Duration;

use crate::foundation::color::Rgba8;
use crate::foundation::error::{IvError, IvResult};

/// Font slant used by the font preview.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    /// CSS `font-style` keyword.
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        }
    }
}

/// Font variant used by the font preview.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FontVariant {
    #[default]
    Normal,
    SmallCaps,
}

impl FontVariant {
    /// CSS `font-variant` keyword.
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::SmallCaps => "small-caps",
        }
    }
}

/// Font preview parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FontPreview {
    /// Text size in points.
    pub size: f32,
    pub style: FontStyle,
    pub variant: FontVariant,
    pub fg: Rgba8,
    pub bg: Rgba8,
    /// Preview density; points are scaled by `dpi / 72`.
    pub dpi: f32,
    /// Margin around the text block in points.
    pub margin: f32,
}

impl Default for FontPreview {
    fn default() -> Self {
        Self {
            size: 48.0,
            style: FontStyle::Normal,
            variant: FontVariant::Normal,
            fg: Rgba8::BLACK,
            bg: Rgba8::WHITE,
            dpi: 100.0,
            margin: 5.0,
        }
    }
}

/// Immutable snapshot of every tunable for a run.
///
/// Built once at startup (from CLI args in the binary) and shared by reference with every
/// stage of the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Display width in pixels; `0` means unset.
    pub width: u32,
    /// Display height in pixels; `0` means unset.
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    /// Density used when rasterizing documents.
    pub dpi: u32,
    /// 1-based page; `0` picks the first page.
    pub page: u32,
    /// Matrix-code foreground.
    pub fg: Rgba8,
    /// Background; `None` when unset or transparent.
    pub bg: Option<Rgba8>,
    /// Matrix-code border in pixels.
    pub border: u32,
    pub font: FontPreview,
    /// Explicit video snapshot offset.
    pub time_code: Option<Duration>,
    /// Raster engine worker count.
    pub concurrency: usize,
    /// Extra Mermaid icon packs.
    pub mermaid_icons: Vec<String>,
    /// Diagram background used when no `bg` is set.
    pub mermaid_bg: Rgba8,
    /// Root for temp workspaces; `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            min_width: 64,
            min_height: 64,
            dpi: 300,
            page: 0,
            fg: Rgba8::rgb(105, 105, 105),
            bg: None,
            border: 30,
            font: FontPreview::default(),
            time_code: None,
            concurrency: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
            mermaid_icons: Vec::new(),
            mermaid_bg: Rgba8::WHITE,
            temp_dir: None,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> IvResult<()> {
        if self.dpi == 0 {
            return Err(IvError::Other(anyhow::anyhow!("dpi must be > 0")));
        }
        if !(self.font.size.is_finite() && self.font.size > 0.0) {
            return Err(IvError::Other(anyhow::anyhow!(
                "font size must be finite and > 0"
            )));
        }
        if !(self.font.dpi.is_finite() && self.font.dpi > 0.0) {
            return Err(IvError::Other(anyhow::anyhow!(
                "font dpi must be finite and > 0"
            )));
        }
        if !(self.font.margin.is_finite() && self.font.margin >= 0.0) {
            return Err(IvError::Other(anyhow::anyhow!(
                "font margin must be finite and >= 0"
            )));
        }
        if self.concurrency == 0 {
            return Err(IvError::Other(anyhow::anyhow!("concurrency must be > 0")));
        }
        Ok(())
    }

    /// Normalize a parsed background: transparent means "no background".
    pub fn with_bg(mut self, bg: Rgba8) -> Self {
        self.bg = (!bg.is_transparent()).then_some(bg);
        self
    }

    /// Display bounds clamped to the configured minimums, when any bound is set.
    pub fn fit_bounds(&self) -> Option<(u32, u32)> {
        if self.width == 0 && self.height == 0 {
            return None;
        }
        Some((
            self.width.max(self.min_width),
            self.height.max(self.min_height),
        ))
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Parse a video snapshot offset.
///
/// Accepts `SS`, `MM:SS`, `HH:MM:SS` and unit-suffixed values such as `90s`, `2m` or `1h`.
pub fn parse_time_code(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty time code".to_owned());
    }

    if let Some((num, scale)) = split_unit(s) {
        let v: f64 = num
            .parse()
            .map_err(|_| format!("invalid time code \"{s}\""))?;
        if !v.is_finite() || v < 0.0 {
            return Err(format!("invalid time code \"{s}\""));
        }
        return Ok(Duration::from_secs_f64(v * scale));
    }

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return Err(format!("invalid time code \"{s}\""));
    }
    let mut total = 0f64;
    for (i, part) in parts.iter().enumerate() {
        let v: f64 = part
            .parse()
            .map_err(|_| format!("invalid time code \"{s}\""))?;
        if !v.is_finite() || v < 0.0 {
            return Err(format!("invalid time code \"{s}\""));
        }
        // Only the last field may be fractional; minutes and seconds stay below 60.
        let last = i + 1 == parts.len();
        if !last && v.fract() != 0.0 {
            return Err(format!("invalid time code \"{s}\""));
        }
        if i > 0 && v >= 60.0 {
            return Err(format!("invalid time code \"{s}\""));
        }
        total = total * 60.0 + v;
    }
    Ok(Duration::from_secs_f64(total))
}

fn split_unit(s: &str) -> Option<(&str, f64)> {
    let scale = match s.as_bytes().last()? {
        b's' => 1.0,
        b'm' => 60.0,
        b'h' => 3600.0,
        _ => return None,
    };
    Some((&s[..s.len() - 1], scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_table() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.min_width, 64);
        assert_eq!(cfg.min_height, 64);
        assert_eq!(cfg.dpi, 300);
        assert_eq!(cfg.border, 30);
        assert_eq!(cfg.fg, "dimgray".parse().unwrap());
        assert!(cfg.bg.is_none());
        assert_eq!(cfg.font.size, 48.0);
        assert_eq!(cfg.font.dpi, 100.0);
        assert!(cfg.concurrency >= 1);
        cfg.validate().unwrap();
    }

    #[test]
    fn transparent_bg_is_unset() {
        let cfg = RenderConfig::default().with_bg(Rgba8::TRANSPARENT);
        assert!(cfg.bg.is_none());
        let cfg = RenderConfig::default().with_bg(Rgba8::WHITE);
        assert_eq!(cfg.bg, Some(Rgba8::WHITE));
    }

    #[test]
    fn fit_bounds_clamps_to_minimums() {
        let mut cfg = RenderConfig::default();
        assert_eq!(cfg.fit_bounds(), None);
        cfg.width = 800;
        assert_eq!(cfg.fit_bounds(), Some((800, 64)));
    }

    #[test]
    fn validation_catches_bad_values() {
        let cfg = RenderConfig {
            dpi: 0,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = RenderConfig::default();
        cfg.font.size = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn time_code_forms() {
        assert_eq!(parse_time_code("42").unwrap(), Duration::from_secs(42));
        assert_eq!(parse_time_code("01:30").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_time_code("1:02:03").unwrap(), Duration::from_secs(3723));
        assert_eq!(parse_time_code("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_time_code("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_time_code("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn time_code_rejects_garbage() {
        assert!(parse_time_code("").is_err());
        assert!(parse_time_code("abc").is_err());
        assert!(parse_time_code("1:2:3:4").is_err());
        assert!(parse_time_code("00:75").is_err());
        assert!(parse_time_code("-5s").is_err());
    }
}

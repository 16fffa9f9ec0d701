use std::path::Path;

use serde::Deserialize;

use crate::decode::{DecodeContext, Source, builtin};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::IvResult;
use crate::process::timecode::{format_timecode, snapshot_timecode};
use crate::process::{Invocation, Tool};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Grab a single frame with ffmpeg at a heuristic offset.
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let path = src.handle.into_path()?;
    let ffmpeg = Invocation::new(ctx.tools(), Tool::Ffmpeg)?;
    let tc = timecode(ctx, path);
    tracing::debug!("snapshot at {tc}");

    let out = ffmpeg
        .args(["-hide_banner", "-ss", tc.as_str(), "-i"])
        .arg(path)
        .args(["-vframes", "1", "-q:v", "1", "-f", "apng", "-"])
        .run(ctx.cancel)?;
    builtin::decode_bytes(&out.stdout)
}

fn timecode(ctx: &DecodeContext<'_>, path: &Path) -> String {
    if let Some(tc) = ctx.config.time_code {
        return format_timecode(tc);
    }
    let duration = probe_duration(ctx, path);
    if let Some(d) = duration {
        tracing::debug!("ffprobe duration: {d}s");
    }
    snapshot_timecode(duration).to_owned()
}

/// Container duration in seconds; `None` when ffprobe is missing or says nothing useful.
fn probe_duration(ctx: &DecodeContext<'_>, path: &Path) -> Option<f64> {
    let inv = Invocation::new(ctx.tools(), Tool::Ffprobe).ok()?;
    let out = inv
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .run(ctx.cancel)
        .map_err(|e| tracing::debug!("ffprobe failed: {e}"))
        .ok()?;
    parse_duration(&out.stdout)
}

pub fn parse_duration(json: &[u8]) -> Option<f64> {
    let probe: ProbeOutput = serde_json::from_slice(json).ok()?;
    probe.format?.duration?.trim().parse::<f64>().ok()
}

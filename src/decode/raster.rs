use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use crate::classify::ClassifiedContent;
use crate::decode::{DecodeContext, Source, builtin};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{NormalizedImage, select_page};
use crate::foundation::error::{IvError, IvResult};
use crate::process::{Invocation, Tool, Tools};

/// Bounds PDF pages are fitted into when no display size is configured.
pub const PDF_FIT: u32 = 2000;

/// One-time libvips setup.
///
/// [`RasterEngine::ensure_initialized`] locates `vips` and `vipsheader` and records the
/// engine version the first time it completes; later calls return the cached outcome. A
/// probe interrupted by cancellation is not cached.
#[derive(Debug, Default)]
pub struct RasterEngine {
    state: OnceLock<Result<String, Tool>>,
}

impl RasterEngine {
    pub fn ensure_initialized(&self, tools: &Tools, cancel: &CancelToken) -> IvResult<()> {
        if self.state.get().is_none() {
            cancel.check()?;
            let outcome = Self::probe(tools, cancel)?;
            let _ = self.state.set(outcome);
        }
        match self.state.get() {
            Some(Ok(_)) => Ok(()),
            Some(Err(tool)) => Err(IvError::tool_unavailable(tool.name())),
            None => Err(IvError::decode("vips initialization state missing")),
        }
    }

    fn probe(tools: &Tools, cancel: &CancelToken) -> IvResult<Result<String, Tool>> {
        let start = Instant::now();
        if tools.locate(Tool::VipsHeader).is_err() {
            return Ok(Err(Tool::VipsHeader));
        }
        let Ok(inv) = Invocation::new(tools, Tool::Vips) else {
            return Ok(Err(Tool::Vips));
        };
        let version = match inv.arg("--version").run(cancel) {
            Ok(out) => String::from_utf8_lossy(&out.stdout).trim().to_owned(),
            Err(IvError::Cancelled) => return Err(IvError::Cancelled),
            Err(e) => {
                tracing::debug!("vips --version failed: {e}");
                String::from("unknown")
            }
        };
        tracing::debug!(%version, elapsed = ?start.elapsed(), "vips init");
        Ok(Ok(version))
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }
}

pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    ctx.engines.raster.ensure_initialized(ctx.tools(), ctx.cancel)?;
    let class = src.class;
    let content = src.handle.into_stream()?;
    ctx.with_local_path(content, class, |path| render_path(ctx, path, class))
}

fn render_path(
    ctx: &DecodeContext<'_>,
    path: &Path,
    class: &ClassifiedContent,
) -> IvResult<NormalizedImage> {
    let is_pdf = class.media_type == "application/pdf";
    let page = if ctx.config.page > 0 {
        select_page(ctx.config.page, page_count(ctx, path)?)
    } else {
        0
    };
    let input = format!(
        "{}{}",
        path.display(),
        load_options(page, is_pdf.then_some(ctx.config.dpi))
    );

    let ws = ctx.workspace()?;
    let out = ws.join("out.png");
    let res = vips(ctx, Tool::Vips)
        .and_then(|inv| {
            inv.arg("copy")
                .arg(&input)
                .arg(&out)
                .run(ctx.cancel)
                .map_err(|e| annotate(e, path))
        })
        .and_then(|_| {
            std::fs::read(&out).map_err(|e| IvError::decode(format!("vips produced no output: {e}")))
        });
    let bytes = ws.finish(res)?;

    let img = builtin::decode_bytes(&bytes)?;
    if is_pdf {
        let (bw, bh) = ctx.config.fit_bounds().unwrap_or((PDF_FIT, PDF_FIT));
        return Ok(fit(img, bw, bh));
    }
    Ok(img)
}

/// `[page=N,dpi=D]` load options; `page` is 0-based and only emitted when non-zero.
pub fn load_options(page: usize, dpi: Option<u32>) -> String {
    let mut opts = Vec::new();
    if page > 0 {
        opts.push(format!("page={page}"));
    }
    if let Some(dpi) = dpi {
        opts.push(format!("dpi={dpi}"));
    }
    if opts.is_empty() {
        String::new()
    } else {
        format!("[{}]", opts.join(","))
    }
}

fn page_count(ctx: &DecodeContext<'_>, path: &Path) -> IvResult<usize> {
    let out = vips(ctx, Tool::VipsHeader)?
        .args(["-f", "n-pages"])
        .arg(path)
        .run(ctx.cancel)
        .map_err(|e| annotate(e, path))?;
    let text = String::from_utf8_lossy(&out.stdout);
    let pages = text.trim().parse::<usize>().unwrap_or(1).max(1);
    tracing::debug!(pages, "vips pages");
    Ok(pages)
}

fn vips(ctx: &DecodeContext<'_>, tool: Tool) -> IvResult<Invocation> {
    Ok(Invocation::new(ctx.tools(), tool)?
        .env("VIPS_CONCURRENCY", ctx.config.concurrency.to_string()))
}

fn annotate(e: IvError, path: &Path) -> IvError {
    match e {
        IvError::Subprocess { tool, status, stderr } => IvError::Subprocess {
            tool: format!("{tool} can't load {}", path.display()),
            status,
            stderr,
        },
        other => other,
    }
}

/// Scale so the image fits `(w, h)` exactly on one axis, preserving aspect.
pub fn fit(img: NormalizedImage, w: u32, h: u32) -> NormalizedImage {
    let (iw, ih) = img.bounds();
    if iw == 0 || ih == 0 {
        return img;
    }
    let scale = (w as f64 / iw as f64).min(h as f64 / ih as f64);
    if (scale - 1.0).abs() < f64::EPSILON {
        return img;
    }
    let nw = ((iw as f64 * scale).round() as u32).max(1);
    let nh = ((ih as f64 * scale).round() as u32).max(1);
    let start = Instant::now();
    let resized = image::imageops::resize(
        img.pixels(),
        nw,
        nh,
        image::imageops::FilterType::Lanczos3,
    );
    tracing::debug!(elapsed = ?start.elapsed(), "resize {iw}x{ih} -> {nw}x{nh}");
    NormalizedImage::new(resized)
}

use std::path::Path;

use crate::decode::{DecodeContext, Source, builtin};
use crate::foundation::core::{NormalizedImage, select_page};
use crate::foundation::error::{IvError, IvResult};
use crate::process::{Invocation, Tool};

/// Render one page with MuPDF.
///
/// MuPDF picks its document handler from the file extension, so content is reached through
/// a path that carries one (spooled when necessary).
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let class = src.class;
    let content = src.handle.into_stream()?;
    ctx.with_local_path(content, class, |path| render_path(ctx, path))
}

fn render_path(ctx: &DecodeContext<'_>, path: &Path) -> IvResult<NormalizedImage> {
    let pages = page_count(ctx, path)?;
    let page = select_page(ctx.config.page, pages) + 1;
    tracing::debug!(pages, page, "mutool");

    let ws = ctx.workspace()?;
    let out = ws.join("page.png");
    let res = Invocation::new(ctx.tools(), Tool::Mutool)
        .and_then(|inv| {
            inv.args(["draw", "-q", "-F", "png", "-r"])
                .arg(ctx.config.dpi.to_string())
                .arg("-o")
                .arg(&out)
                .arg(path)
                .arg(page.to_string())
                .run(ctx.cancel)
        })
        .and_then(|_| {
            std::fs::read(&out)
                .map_err(|e| IvError::decode(format!("mutool produced no output: {e}")))
        });
    let bytes = ws.finish(res)?;
    builtin::decode_bytes(&bytes)
}

fn page_count(ctx: &DecodeContext<'_>, path: &Path) -> IvResult<usize> {
    let out = Invocation::new(ctx.tools(), Tool::Mutool)?
        .arg("pages")
        .arg(path)
        .run(ctx.cancel)?;
    Ok(count_pages(&String::from_utf8_lossy(&out.stdout)))
}

/// Number of `<page ...>` records in `mutool pages` output.
pub fn count_pages(listing: &str) -> usize {
    listing
        .lines()
        .filter(|l| l.trim_start().starts_with("<page "))
        .count()
}

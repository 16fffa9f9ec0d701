use std::path::Path;

use crate::classify::ClassifiedContent;
use crate::content::FileContent;
use crate::decode::{DecodeContext, Handle, Source};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::IvResult;
use crate::process::{Invocation, Tool};

/// Convert with LibreOffice to PDF and render that through the raster engine.
///
/// The workspace holding the PDF is removed on every exit path.
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let path = src.handle.into_path()?;
    let inv = Invocation::new(ctx.tools(), Tool::Soffice)?;
    let ws = ctx.workspace()?;
    let res = convert(ctx, inv, path, ws.path());
    ws.finish(res)
}

fn convert(
    ctx: &DecodeContext<'_>,
    inv: Invocation,
    path: &Path,
    outdir: &Path,
) -> IvResult<NormalizedImage> {
    inv.args(["--headless", "--convert-to", "pdf", "--outdir"])
        .arg(outdir)
        .arg(path)
        .run(ctx.cancel)?;

    let pdf = outdir.join(pdf_name(path));
    tracing::debug!(pdf = %pdf.display(), "rendering soffice output");
    let mut content = FileContent::open(&pdf)?;
    let id = pdf.display().to_string();
    ctx.decode(&id, &ClassifiedContent::pdf(), Handle::Stream(&mut content))
}

/// `<stem>.pdf` for an input path.
pub fn pdf_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.pdf")
}

use crate::classify::ClassifiedContent;
use crate::content::MemoryContent;
use crate::decode::{DecodeContext, Handle, Source};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::IvResult;
use crate::process::{Invocation, Tool};

/// Icon pack always handed to `mmdc`.
pub const DEFAULT_ICON_PACK: &str = "@iconify-json/logos";

/// Render Mermaid source to SVG with `mmdc`, then rasterize the SVG.
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let path = src.handle.into_path()?;
    let out = Invocation::new(ctx.tools(), Tool::Mmdc)?
        .args(["--outputFormat", "svg", "--input"])
        .arg(path)
        .args(["--output", "-", "--iconPacks", DEFAULT_ICON_PACK])
        .args(&ctx.config.mermaid_icons)
        .run(ctx.cancel)?;

    for line in String::from_utf8_lossy(&out.stderr).trim().lines() {
        tracing::debug!("mmdc: {line}");
    }

    let id = format!("{}.svg", src.identifier);
    let mut svg = MemoryContent::new(id.clone(), out.stdout);
    ctx.decode(&id, &ClassifiedContent::svg(), Handle::Stream(&mut svg))
}

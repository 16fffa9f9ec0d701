use std::fmt::Write as _;
use std::sync::Arc;

use resvg::tiny_skia;

use crate::config::FontPreview;
use crate::decode::vector::{pixmap_to_image, skia_color};
use crate::decode::{DecodeContext, Source};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};

const LINES: &[&str] = &[
    "abcdefghijklmnopqrstuvwxyz",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "0123456789.:,;(*!?')",
    "The quick brown fox jumps over the lazy dog.",
];

const LINE_HEIGHT: f32 = 1.25;

/// Specimen sheet for a font file: family name, alphabet, digits and a pangram.
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let content = src.handle.into_stream()?;
    let bytes = content.read_all()?;
    render_preview(&ctx.config.font, bytes)
}

pub fn render_preview(opts: &FontPreview, bytes: Vec<u8>) -> IvResult<NormalizedImage> {
    let mut db = usvg::fontdb::Database::new();
    db.load_font_data(bytes);
    let family = db
        .faces()
        .flat_map(|face| face.families.first())
        .map(|(name, _)| name.clone())
        .next()
        .ok_or_else(|| IvError::decode("no usable font faces"))?;
    tracing::debug!(faces = db.len(), "font family {family:?}");

    let scale = opts.dpi / 72.0;
    let px = opts.size * scale;
    let margin = (opts.margin * scale).ceil();
    let svg = specimen_svg(&family, px, opts);

    let usvg_opts = usvg::Options {
        fontdb: Arc::new(db),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &usvg_opts)
        .map_err(|e| IvError::decode(format!("font specimen: {e}")))?;

    let bbox = tree.root().abs_bounding_box();
    if bbox.width() < 1.0 || bbox.height() < 1.0 {
        return Err(IvError::decode("font has no renderable glyphs"));
    }
    let w = (bbox.width() + 2.0 * margin).ceil() as u32;
    let h = (bbox.height() + 2.0 * margin).ceil() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| IvError::decode("failed to allocate font pixmap"))?;
    pixmap.fill(skia_color(opts.bg));
    let xform = tiny_skia::Transform::from_translate(margin - bbox.x(), margin - bbox.y());
    resvg::render(&tree, xform, &mut pixmap.as_mut());
    pixmap_to_image(&pixmap)
}

/// SVG laying out the specimen lines at `px` pixels per em.
pub fn specimen_svg(family: &str, px: f32, opts: &FontPreview) -> String {
    let css_family = xml_escape(&css_string(family));
    let family = xml_escape(family);
    let advance = px * LINE_HEIGHT;
    let longest = LINES
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(family.chars().count()))
        .max()
        .unwrap_or(1);
    let width = (px * longest as f32).ceil();
    let height = (advance * (LINES.len() + 1) as f32 + px).ceil();

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
    );
    let _ = write!(
        svg,
        r#"<g font-family="{css_family}" font-size="{px}" font-style="{}" font-variant="{}" fill="{}">"#,
        opts.style.as_css(),
        opts.variant.as_css(),
        opts.fg.to_hex(),
    );
    let mut y = advance;
    for line in std::iter::once(family.clone()).chain(LINES.iter().map(|l| xml_escape(l))) {
        let _ = write!(svg, r#"<text x="0" y="{y}">{line}</text>"#);
        y += advance;
    }
    svg.push_str("</g></svg>");
    svg
}

/// CSS string literal for a family name, quoted with a character the name does not use.
fn css_string(family: &str) -> String {
    if family.contains('\'') {
        format!("\"{}\"", family.replace('"', ""))
    } else {
        format!("'{family}'")
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

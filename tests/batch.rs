use std::io::{Cursor, Write};
use std::path::Path;

use iv::process::Tools;
use iv::{
    CancelToken, Engines, GraphicsEncoder, IvResult, NormalizedImage, Pipeline, Protocol,
    RenderConfig, Rgba8, Target,
};

/// Writes `<w>x<h>` instead of an escape sequence.
struct SizeEncoder;

impl GraphicsEncoder for SizeEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Kitty
    }

    fn encode(&self, w: &mut dyn Write, img: &NormalizedImage) -> IvResult<()> {
        write!(w, "{}x{}", img.width(), img.height()).map_err(|e| iv::IvError::Other(e.into()))
    }
}

fn write_png(path: &Path, w: u32, h: u32) {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 10, 10, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, buf).unwrap();
}

fn offline_engines() -> Engines {
    Engines::new(Tools::with_search_path(Vec::new()))
}

#[test]
fn middle_failure_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let c = dir.path().join("c.png");
    let b = dir.path().join("b.d");
    write_png(&a, 3, 2);
    write_png(&c, 5, 4);
    std::fs::create_dir(&b).unwrap();

    let config = RenderConfig::default();
    let engines = offline_engines();
    let cancel = CancelToken::new();
    let pipeline = Pipeline::new(&config, &engines, &cancel, &SizeEncoder);

    let queue = vec![
        Target::File(a.clone()),
        Target::File(b.clone()),
        Target::File(c.clone()),
    ];
    let mut out = Vec::new();
    let summary = pipeline.render_all(&mut out, &queue).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(summary.rendered, 2);
    assert_eq!(summary.failed, 1);
    assert!(!summary.cancelled);
    assert_eq!(text.matches("error: ").count(), 1);
    assert!(text.contains(&format!(
        "error: unable to render {:?}: mime detection failed",
        b.display().to_string()
    )));

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], format!("{}:", a.display()));
    assert_eq!(lines[1], "3x2");
    assert_eq!(lines.last().copied(), Some("5x4"));
}

#[test]
fn unresolvable_argument_is_reported_as_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    write_png(&a, 1, 1);

    let config = RenderConfig::default();
    let engines = offline_engines();
    let cancel = CancelToken::new();
    let pipeline = Pipeline::new(&config, &engines, &cancel, &SizeEncoder);

    let missing = dir.path().join("missing.png").display().to_string();
    let args = vec![missing.clone(), a.display().to_string()];
    let mut out = Vec::new();
    let summary = pipeline.run(&mut out, &args).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(summary.rendered, 1);
    assert_eq!(summary.failed, 1);
    assert!(text.starts_with(&format!("error: unable to open {missing:?}: ")));
    assert!(text.ends_with("1x1\n"));
}

#[test]
fn cancelled_batch_renders_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    write_png(&a, 1, 1);

    let config = RenderConfig::default();
    let engines = offline_engines();
    let cancel = CancelToken::new();
    cancel.cancel();
    let pipeline = Pipeline::new(&config, &engines, &cancel, &SizeEncoder);

    let mut out = Vec::new();
    let summary = pipeline.render_all(&mut out, &[Target::File(a)]).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.rendered, 0);
    assert!(out.is_empty());
}

#[test]
fn url_targets_render_as_bordered_codes_with_background() {
    let config = RenderConfig {
        border: 4,
        ..RenderConfig::default()
    }
    .with_bg(Rgba8::WHITE);
    let engines = offline_engines();
    let cancel = CancelToken::new();
    let pipeline = Pipeline::new(&config, &engines, &cancel, &SizeEncoder);

    let img = pipeline
        .render_target(&Target::Url("https://example.com".to_owned()))
        .unwrap();
    assert_eq!(img.pixels().get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!((img.width() - 8) % 10, 0);
}

#[test]
fn background_is_applied_to_builtin_images() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("t.png");
    let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 0]));
    img.save(&p).unwrap();

    let config = RenderConfig::default().with_bg(Rgba8::rgb(0, 128, 0));
    let engines = offline_engines();
    let cancel = CancelToken::new();
    let pipeline = Pipeline::new(&config, &engines, &cancel, &SizeEncoder);

    let out = pipeline.render_target(&Target::File(p)).unwrap();
    assert_eq!(out.pixels().get_pixel(0, 0).0, [0, 128, 0, 255]);
}

//! Batch renderer: targets in, terminal graphics out.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use crate::classify::classify;
use crate::composite::composite;
use crate::config::RenderConfig;
use crate::content::{Content, FileContent};
use crate::decode::{DecodeContext, Engines, Handle, Source, qr};
use crate::encode::GraphicsEncoder;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};
use crate::registry::{self, Mode};
use crate::targets::{self, Target};

/// Outcome counts of a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub rendered: usize,
    pub failed: usize,
    pub cancelled: bool,
}

pub struct Pipeline<'a> {
    config: &'a RenderConfig,
    engines: &'a Engines,
    cancel: &'a CancelToken,
    encoder: &'a dyn GraphicsEncoder,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a RenderConfig,
        engines: &'a Engines,
        cancel: &'a CancelToken,
        encoder: &'a dyn GraphicsEncoder,
    ) -> Self {
        Self {
            config,
            engines,
            cancel,
            encoder,
        }
    }

    fn context(&self) -> DecodeContext<'a> {
        DecodeContext::new(self.config, self.engines, self.cancel)
    }

    /// Resolve every argument, then render the queue in order.
    ///
    /// Per-target failures are written to `out` and never stop the batch; cancellation does.
    pub fn run(&self, out: &mut dyn Write, args: &[String]) -> IvResult<Summary> {
        let mut summary = Summary::default();
        let mut queue = Vec::new();
        for arg in args {
            match targets::resolve(arg) {
                Ok(t) => queue.extend(t),
                Err(e) => {
                    summary.failed += 1;
                    report(out, "open", arg, &e)?;
                }
            }
        }

        let rendered = self.render_all(out, &queue)?;
        Ok(Summary {
            failed: summary.failed + rendered.failed,
            ..rendered
        })
    }

    /// Render an already resolved queue in order.
    pub fn render_all(&self, out: &mut dyn Write, queue: &[Target]) -> IvResult<Summary> {
        let mut summary = Summary::default();
        for target in queue {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let name = target.display_name();
            match self.render(out, target) {
                Ok(()) => summary.rendered += 1,
                Err(IvError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    report(out, "render", &name, &e)?;
                }
            }
        }
        Ok(summary)
    }

    /// Header line, encoded image, newline.
    fn render(&self, out: &mut dyn Write, target: &Target) -> IvResult<()> {
        writeln!(out, "{}:", target.display_name()).map_err(io_err)?;
        let start = Instant::now();
        let img = self.render_target(target)?;
        let encode_start = Instant::now();
        self.encoder.encode(out, &img)?;
        writeln!(out).map_err(io_err)?;
        tracing::debug!("encode out: {:?}", encode_start.elapsed());
        tracing::debug!("total: {:?}", start.elapsed());
        Ok(())
    }

    /// Decode and composite one target.
    pub fn render_target(&self, target: &Target) -> IvResult<NormalizedImage> {
        match target {
            Target::File(path) => self.render_file(path),
            Target::Url(text) => {
                let img = qr::render_url(self.config, text)?;
                Ok(composite(self.config, None, qr::MEDIA_TYPE, img))
            }
        }
    }

    fn render_file(&self, path: &Path) -> IvResult<NormalizedImage> {
        let identifier = path.display().to_string();
        let mut content = FileContent::open(path)?;
        let class = classify(&mut content, &identifier)?;
        tracing::debug!("mime: {} ext: {:?}", class.media_type, class.extension);
        let entry = registry::lookup(&class)?;
        let ctx = self.context();

        let img = match entry.mode {
            Mode::Path => {
                drop(content);
                ctx.invoke(
                    entry,
                    Source {
                        identifier: &identifier,
                        class: &class,
                        handle: Handle::Path(path),
                    },
                )?
            }
            Mode::Stream => {
                content.rewind_start()?;
                ctx.invoke(
                    entry,
                    Source {
                        identifier: &identifier,
                        class: &class,
                        handle: Handle::Stream(&mut content),
                    },
                )?
            }
        };
        Ok(composite(
            self.config,
            Some(entry.strategy),
            &class.media_type,
            img,
        ))
    }
}

/// `error: unable to <action> "<target>": <cause>` followed by a blank line.
pub fn report(out: &mut dyn Write, action: &str, target: &str, e: &IvError) -> IvResult<()> {
    writeln!(out, "error: unable to {action} {target:?}: {}\n", describe(e)).map_err(io_err)
}

/// Error text including the context chain of wrapped errors.
pub fn describe(e: &IvError) -> String {
    match e {
        IvError::Other(inner) => format!("{inner:#}"),
        other => other.to_string(),
    }
}

fn io_err(e: std::io::Error) -> IvError {
    IvError::Other(anyhow::Error::new(e).context("write output"))
}

//! Decoder adapters.
//!
//! Every adapter has the same shape: it receives the target identifier, its classification
//! and a content handle, and returns a [`NormalizedImage`]. Adapters that produce an
//! intermediate PDF or SVG re-enter the registry through [`DecodeContext::decode`].

pub mod archive;
pub mod audio;
pub mod builtin;
pub mod diagram;
pub mod document;
pub mod font;
pub mod markdown;
pub mod office;
pub mod pe;
pub mod qr;
pub mod raster;
pub mod vector;
pub mod video;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::classify::ClassifiedContent;
use crate::config::RenderConfig;
use crate::content::{Content, FileContent, MemoryContent};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};
use crate::process::{TempWorkspace, Tools};
use crate::registry::{self, Entry, Mode, Strategy};

pub use raster::RasterEngine;

/// Process-wide engine state shared by every target of a run.
pub struct Engines {
    pub tools: Tools,
    pub raster: RasterEngine,
    fonts: OnceLock<Arc<usvg::fontdb::Database>>,
    http: OnceLock<Result<reqwest::blocking::Client, String>>,
}

impl Engines {
    pub fn new(tools: Tools) -> Self {
        Self {
            tools,
            raster: RasterEngine::default(),
            fonts: OnceLock::new(),
            http: OnceLock::new(),
        }
    }

    /// System font database, loaded on first use.
    pub fn system_fonts(&self) -> Arc<usvg::fontdb::Database> {
        Arc::clone(self.fonts.get_or_init(|| {
            let start = Instant::now();
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), elapsed = ?start.elapsed(), "system fonts loaded");
            Arc::new(db)
        }))
    }

    /// Shared HTTP client used for markdown images.
    pub fn http(&self) -> IvResult<&reqwest::blocking::Client> {
        self.http
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(markdown::FETCH_TIMEOUT)
                    .user_agent(concat!("iv/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| IvError::Other(anyhow::anyhow!("http client: {e}")))
    }
}

impl std::fmt::Debug for Engines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engines")
            .field("tools", &self.tools)
            .field("raster", &self.raster)
            .field("fonts_loaded", &self.fonts.get().is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Engines {
    fn default() -> Self {
        Self::new(Tools::from_env())
    }
}

/// How an adapter receives its content.
pub enum Handle<'a> {
    /// Open, rewound handle.
    Stream(&'a mut dyn Content),
    /// Path on disk; no handle is held.
    Path(&'a Path),
}

impl<'a> Handle<'a> {
    pub fn into_stream(self) -> IvResult<&'a mut dyn Content> {
        match self {
            Handle::Stream(c) => Ok(c),
            Handle::Path(p) => Err(IvError::Other(anyhow::anyhow!(
                "expected an open stream for {}",
                p.display()
            ))),
        }
    }

    pub fn into_path(self) -> IvResult<&'a Path> {
        match self {
            Handle::Path(p) => Ok(p),
            Handle::Stream(c) => Err(IvError::Other(anyhow::anyhow!(
                "expected a path for {}",
                c.identifier()
            ))),
        }
    }
}

/// Adapter input.
pub struct Source<'a> {
    pub identifier: &'a str,
    pub class: &'a ClassifiedContent,
    pub handle: Handle<'a>,
}

/// Uniform adapter signature.
pub type Adapter = fn(&DecodeContext<'_>, Source<'_>) -> IvResult<NormalizedImage>;

/// Adapter implementing `strategy`.
pub fn adapter(strategy: Strategy) -> Adapter {
    match strategy {
        Strategy::Vector => vector::decode,
        Strategy::Builtin => builtin::decode,
        Strategy::Office => office::decode,
        Strategy::Raster => raster::decode,
        Strategy::Document => document::decode,
        Strategy::Diagram => diagram::decode,
        Strategy::Markdown => markdown::decode,
        Strategy::Font => font::decode,
        Strategy::Video => video::decode,
        Strategy::CoverArt => audio::decode,
        Strategy::ComicArchive => archive::decode,
        Strategy::PeIcon => pe::decode,
    }
}

/// Everything an adapter may consult while decoding one target.
pub struct DecodeContext<'a> {
    pub config: &'a RenderConfig,
    pub engines: &'a Engines,
    pub cancel: &'a CancelToken,
}

impl<'a> DecodeContext<'a> {
    pub fn new(config: &'a RenderConfig, engines: &'a Engines, cancel: &'a CancelToken) -> Self {
        Self {
            config,
            engines,
            cancel,
        }
    }

    pub fn tools(&self) -> &Tools {
        &self.engines.tools
    }

    /// Look up the strategy for `class` and run it.
    pub fn decode<'b>(
        &self,
        identifier: &'b str,
        class: &'b ClassifiedContent,
        handle: Handle<'b>,
    ) -> IvResult<NormalizedImage> {
        let entry = registry::lookup(class)?;
        self.invoke(
            entry,
            Source {
                identifier,
                class,
                handle,
            },
        )
    }

    /// Decode in-memory bytes of any supported type.
    pub fn decode_bytes(&self, identifier: &str, bytes: Vec<u8>) -> IvResult<NormalizedImage> {
        let mut content = MemoryContent::new(identifier, bytes);
        let class = crate::classify::classify(&mut content, identifier)?;
        content.rewind_start()?;
        self.decode(identifier, &class, Handle::Stream(&mut content))
    }

    /// Run `entry` against `src`, converting between stream and path handles as the entry's
    /// mode requires.
    pub fn invoke(&self, entry: &Entry, src: Source<'_>) -> IvResult<NormalizedImage> {
        self.cancel.check()?;
        let Source {
            identifier,
            class,
            handle,
        } = src;
        tracing::debug!(strategy = ?entry.strategy, mode = ?entry.mode, "{identifier}");
        let start = Instant::now();
        let run = adapter(entry.strategy);

        let img = match (entry.mode, handle) {
            (Mode::Path, Handle::Stream(content)) => {
                self.with_local_path(content, class, |path| {
                    run(
                        self,
                        Source {
                            identifier,
                            class,
                            handle: Handle::Path(path),
                        },
                    )
                })?
            }
            (Mode::Stream, Handle::Path(path)) => {
                let mut content = FileContent::open(path)?;
                run(
                    self,
                    Source {
                        identifier,
                        class,
                        handle: Handle::Stream(&mut content),
                    },
                )?
            }
            (_, handle) => run(
                self,
                Source {
                    identifier,
                    class,
                    handle,
                },
            )?,
        };

        tracing::debug!(
            strategy = ?entry.strategy,
            elapsed = ?start.elapsed(),
            "dimensions: {}x{}",
            img.width(),
            img.height()
        );
        Ok(img)
    }

    /// Fresh workspace under the configured temp root.
    pub fn workspace(&self) -> IvResult<TempWorkspace> {
        TempWorkspace::create(&self.config.temp_root())
    }

    /// Run `f` with a path to `content`: the backing file when the content is a named file
    /// carrying an extension, otherwise a copy spooled into a workspace.
    pub fn with_local_path<R>(
        &self,
        content: &mut dyn Content,
        class: &ClassifiedContent,
        f: impl FnOnce(&Path) -> IvResult<R>,
    ) -> IvResult<R> {
        let named: Option<PathBuf> = content
            .as_named()
            .map(|n| n.path.to_path_buf())
            .filter(|p| p.extension().is_some());
        if let Some(path) = named {
            return f(&path);
        }

        let ws = self.workspace()?;
        content.rewind_start()?;
        let spooled = ws.spool(content, &spool_name(class));
        let res = spooled.and_then(|p| f(&p));
        ws.finish(res)
    }
}

/// File name used when spooling content whose engine keys formats by extension.
pub fn spool_name(class: &ClassifiedContent) -> String {
    let ext = if class.extension.is_empty() {
        extension_for(&class.media_type)
    } else {
        class.extension.as_str()
    };
    format!("input.{ext}")
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "application/pdf" => "pdf",
        "image/svg" => "svg",
        "application/epub+zip" => "epub",
        "application/x-mobipocket-ebook" => "mobi",
        "text/xml" | "text/fb2" => "fb2",
        "image/vnd.adobe.photoshop" => "psd",
        "application/zip" => "xps",
        "image/x-portable-bitmap" => "pbm",
        "image/x-portable-graymap" => "pgm",
        "image/x-portable-pixmap" => "ppm",
        "image/x-portable-arbitrarymap" => "pam",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/tiff" => "tiff",
        "image/heif" => "heif",
        "image/avif" => "avif",
        "image/jxl" => "jxl",
        _ => "bin",
    }
}

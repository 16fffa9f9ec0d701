#![forbid(unsafe_code)]

pub mod classify;
pub mod composite;
pub mod config;
pub mod content;
pub mod decode;
pub mod encode;
pub mod foundation;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod targets;

pub use classify::{ClassifiedContent, classify};
pub use config::{FontPreview, FontStyle, FontVariant, RenderConfig};
pub use content::{Content, FileContent, MemoryContent};
pub use decode::{DecodeContext, Engines};
pub use encode::{GraphicsEncoder, Protocol, TerminalCapabilities, encoder_for};
pub use foundation::cancel::CancelToken;
pub use foundation::color::Rgba8;
pub use foundation::core::NormalizedImage;
pub use foundation::error::{IvError, IvResult};
pub use pipeline::{Pipeline, Summary};
pub use registry::{Mode, Strategy};
pub use targets::Target;

use std::io::{BufReader, Seek, SeekFrom};

use lofty::file::TaggedFileExt as _;

use crate::content::require_named;
use crate::decode::{DecodeContext, Source, builtin};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};

/// First picture embedded in the audio file's tags (album art).
pub fn decode(_ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let content = src.handle.into_stream()?;
    let named = require_named(content)?;
    named
        .file
        .seek(SeekFrom::Start(0))
        .map_err(|e| IvError::Other(e.into()))?;

    let tagged = lofty::probe::Probe::new(BufReader::new(&mut *named.file))
        .guess_file_type()
        .map_err(|e| IvError::decode(format!("probe {}: {e}", named.path.display())))?
        .read()
        .map_err(|e| IvError::decode(e.to_string()))?;

    let picture = tagged
        .tags()
        .iter()
        .flat_map(|tag| tag.pictures())
        .next()
        .ok_or_else(|| IvError::decode("no embedded picture"))?;
    tracing::debug!(mime = ?picture.mime_type(), bytes = picture.data().len(), "cover art");
    builtin::decode_bytes(picture.data())
}

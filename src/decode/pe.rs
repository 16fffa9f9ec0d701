use std::io::{Read, Seek, SeekFrom};

use pelite::pe32::Pe as _;
use pelite::pe64::Pe as _;
use pelite::resources::Resources;

use crate::content::require_named;
use crate::decode::{DecodeContext, Source, builtin};
use crate::foundation::core::{NormalizedImage, select_page};
use crate::foundation::error::{IvError, IvResult};

/// Icon groups of a Windows executable; the configured page picks one.
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let content = src.handle.into_stream()?;
    let named = require_named(content)?;
    let mut bytes = Vec::new();
    named
        .file
        .seek(SeekFrom::Start(0))
        .and_then(|_| named.file.read_to_end(&mut bytes))
        .map_err(|e| IvError::Other(e.into()))?;

    let mut icons = icons(&bytes)?;
    if icons.is_empty() {
        return Err(IvError::decode("no icons found"));
    }
    let idx = select_page(ctx.config.page, icons.len());
    tracing::debug!("icon {} of {}", idx + 1, icons.len());
    Ok(icons.swap_remove(idx))
}

/// Decode every icon group in the resource table, skipping the ones that fail.
pub fn icons(bytes: &[u8]) -> IvResult<Vec<NormalizedImage>> {
    let resources = resources(bytes)?;
    let mut out = Vec::new();
    for group in resources.icons() {
        let (name, group) = match group {
            Ok(g) => g,
            Err(e) => {
                tracing::debug!("skipping icon group: {e}");
                continue;
            }
        };
        let mut ico = Vec::new();
        if let Err(e) = group.write(&mut ico) {
            tracing::debug!("icon {name}: {e}");
            continue;
        }
        match builtin::decode_bytes(&ico) {
            Ok(img) => {
                tracing::debug!("icon {name}: {}x{}", img.width(), img.height());
                out.push(img);
            }
            Err(e) => tracing::debug!("icon {name}: {e}"),
        }
    }
    Ok(out)
}

fn resources(bytes: &[u8]) -> IvResult<Resources<'_>> {
    let res = match pelite::pe64::PeFile::from_bytes(bytes) {
        Ok(file) => file.resources(),
        Err(_) => pelite::pe32::PeFile::from_bytes(bytes)
            .map_err(|e| IvError::decode(format!("parse executable: {e}")))?
            .resources(),
    };
    res.map_err(|e| IvError::decode(format!("resources: {e}")))
}

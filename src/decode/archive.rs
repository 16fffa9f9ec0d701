use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::classify::file_ext;
use crate::content::require_named;
use crate::decode::{DecodeContext, Source, builtin};
use crate::foundation::core::{NormalizedImage, select_page};
use crate::foundation::error::{IvError, IvResult};
use crate::process::{Invocation, Tool};

/// Extensions of archive members considered pages.
pub const PAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "bmp", "png", "webp", "tiff", "tif"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Zip,
    Tar,
    SevenZip,
}

impl Kind {
    fn for_media_type(t: &str) -> IvResult<Self> {
        match t {
            "application/zip" => Ok(Kind::Zip),
            "application/x-tar" => Ok(Kind::Tar),
            "application/x-7z-compressed" | "application/x-rar-compressed" => Ok(Kind::SevenZip),
            other => Err(IvError::unsupported(other)),
        }
    }
}

/// Render one page of a comic book archive (cbz, cbt, cb7, cbr).
///
/// Pages are the image members sorted by name; the configured page picks one.
pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let kind = Kind::for_media_type(&src.class.media_type)?;
    let content = src.handle.into_stream()?;
    let named = require_named(content)?;
    let file = named.file;
    let path = named.path;

    let pages = match kind {
        Kind::Zip => zip_members(file)?,
        Kind::Tar => tar_members(file)?,
        Kind::SevenZip => seven_zip_members(ctx, path)?,
    };
    let pages = page_members(pages);
    for (i, p) in pages.iter().enumerate() {
        tracing::debug!("page {}: {p}", i + 1);
    }
    if pages.is_empty() {
        return Err(IvError::decode("no pages found in archive"));
    }
    let name = &pages[select_page(ctx.config.page, pages.len())];

    let bytes = match kind {
        Kind::Zip => zip_read(file, name)?,
        Kind::Tar => tar_read(file, name)?,
        Kind::SevenZip => seven_zip_read(ctx, path, name)?,
    };
    builtin::decode_bytes(&bytes)
}

/// Image members, sorted.
pub fn page_members(names: Vec<String>) -> Vec<String> {
    let mut pages: Vec<String> = names
        .into_iter()
        .filter(|n| !n.ends_with('/') && PAGE_EXTENSIONS.contains(&file_ext(n).as_str()))
        .collect();
    pages.sort();
    pages
}

fn archive_err(e: impl std::fmt::Display) -> IvError {
    IvError::decode(format!("archive: {e}"))
}

fn zip_members(file: &mut File) -> IvResult<Vec<String>> {
    file.seek(SeekFrom::Start(0)).map_err(archive_err)?;
    let archive = zip::ZipArchive::new(&mut *file).map_err(archive_err)?;
    Ok(archive.file_names().map(str::to_owned).collect())
}

fn zip_read(file: &mut File, name: &str) -> IvResult<Vec<u8>> {
    file.seek(SeekFrom::Start(0)).map_err(archive_err)?;
    let mut archive = zip::ZipArchive::new(&mut *file).map_err(archive_err)?;
    let mut member = archive.by_name(name).map_err(archive_err)?;
    let mut buf = Vec::new();
    member.read_to_end(&mut buf).map_err(archive_err)?;
    Ok(buf)
}

fn tar_members(file: &mut File) -> IvResult<Vec<String>> {
    file.seek(SeekFrom::Start(0)).map_err(archive_err)?;
    let mut archive = tar::Archive::new(&mut *file);
    let mut names = Vec::new();
    for entry in archive.entries().map_err(archive_err)? {
        let entry = entry.map_err(archive_err)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(archive_err)?;
        names.push(path.to_string_lossy().into_owned());
    }
    Ok(names)
}

fn tar_read(file: &mut File, name: &str) -> IvResult<Vec<u8>> {
    file.seek(SeekFrom::Start(0)).map_err(archive_err)?;
    let mut archive = tar::Archive::new(&mut *file);
    for entry in archive.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy() == name)
            .unwrap_or(false);
        if matches {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).map_err(archive_err)?;
            return Ok(buf);
        }
    }
    Err(archive_err(format!("{name} vanished")))
}

fn seven_zip_members(ctx: &DecodeContext<'_>, path: &Path) -> IvResult<Vec<String>> {
    let out = Invocation::new(ctx.tools(), Tool::SevenZip)?
        .args(["l", "-slt", "-ba"])
        .arg(path)
        .run(ctx.cancel)?;
    Ok(parse_slt_listing(&String::from_utf8_lossy(&out.stdout)))
}

fn seven_zip_read(ctx: &DecodeContext<'_>, path: &Path, name: &str) -> IvResult<Vec<u8>> {
    let out = Invocation::new(ctx.tools(), Tool::SevenZip)?
        .args(["e", "-so"])
        .arg(path)
        .arg(name)
        .run(ctx.cancel)?;
    Ok(out.stdout)
}

/// File member names from `7z l -slt` technical listing; directories are skipped.
pub fn parse_slt_listing(listing: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current: Option<String> = None;
    let mut is_dir = false;

    let mut flush = |current: &mut Option<String>, is_dir: &mut bool| {
        if let Some(name) = current.take()
            && !*is_dir
        {
            names.push(name);
        }
        *is_dir = false;
    };

    for line in listing.lines() {
        if let Some(name) = line.strip_prefix("Path = ") {
            flush(&mut current, &mut is_dir);
            current = Some(name.to_owned());
        } else if line == "Folder = +" {
            is_dir = true;
        } else if let Some(attrs) = line.strip_prefix("Attributes = ")
            && attrs.starts_with('D')
        {
            is_dir = true;
        }
    }
    flush(&mut current, &mut is_dir);
    names
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn pages_are_filtered_and_sorted() {
        let names = vec![
            "comic/010.png".to_owned(),
            "comic/".to_owned(),
            "comic/002.JPG".to_owned(),
            "comic/info.txt".to_owned(),
            "comic/001.webp".to_owned(),
        ];
        assert_eq!(
            page_members(names),
            vec!["comic/001.webp", "comic/002.JPG", "comic/010.png"]
        );
    }

    #[test]
    fn slt_listing_skips_folders() {
        let listing = "Path = pages\nFolder = +\nSize = 0\n\nPath = pages/b.png\nFolder = -\nSize = 10\n\nPath = pages/a.png\nAttributes = A\n";
        assert_eq!(parse_slt_listing(listing), vec!["pages/b.png", "pages/a.png"]);
    }

    fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn zip_round_trip_picks_sorted_member() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("book.cbz");
        {
            let f = File::create(&p).unwrap();
            let mut w = zip::ZipWriter::new(f);
            let opts = zip::write::SimpleFileOptions::default();
            w.start_file("b.png", opts).unwrap();
            w.write_all(&png_bytes([0, 0, 255, 255])).unwrap();
            w.start_file("a.png", opts).unwrap();
            w.write_all(&png_bytes([255, 0, 0, 255])).unwrap();
            w.finish().unwrap();
        }
        let mut f = File::open(&p).unwrap();
        let pages = page_members(zip_members(&mut f).unwrap());
        assert_eq!(pages, vec!["a.png", "b.png"]);
        let img = builtin::decode_bytes(&zip_read(&mut f, &pages[0]).unwrap()).unwrap();
        assert_eq!(img.pixels().get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn tar_members_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("book.cbt");
        {
            let f = File::create(&p).unwrap();
            let mut b = tar::Builder::new(f);
            let data = png_bytes([0, 255, 0, 255]);
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            b.append_data(&mut header, "p/001.png", data.as_slice()).unwrap();
            b.finish().unwrap();
        }
        let mut f = File::open(&p).unwrap();
        let pages = page_members(tar_members(&mut f).unwrap());
        assert_eq!(pages, vec!["p/001.png"]);
        let img = builtin::decode_bytes(&tar_read(&mut f, &pages[0]).unwrap()).unwrap();
        assert_eq!(img.pixels().get_pixel(0, 0).0, [0, 255, 0, 255]);
    }
}

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, Stream, dictionary};

use super::layout::{Document, Font, Item, PAGE_HEIGHT, PAGE_WIDTH};
use crate::foundation::error::{IvError, IvResult};

fn int(v: f32) -> Object {
    Object::Integer(v.round() as i64)
}

fn name(s: &str) -> Object {
    Object::Name(s.as_bytes().to_vec())
}

fn pdf_err(e: impl std::fmt::Display) -> IvError {
    IvError::decode(format!("markdown pdf: {e}"))
}

/// Serialize a laid-out document as a compressed PDF.
pub fn write(layout: &Document) -> IvResult<Vec<u8>> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), id);
    }

    let mut xobjects = Dictionary::new();
    for (i, img) in layout.images.iter().enumerate() {
        let (w, h) = img.dimensions();
        let mut rgb = Vec::with_capacity(plane_len(w, h, 3));
        let mut alpha = Vec::with_capacity(plane_len(w, h, 1));
        for px in img.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(w),
                "Height" => i64::from(h),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(w),
                "Height" => i64::from(h),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        ));
        xobjects.set(image_name(i), image_id);
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let mut ops = Vec::new();
        for item in &page.items {
            push_item(&mut ops, item);
        }
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(pdf_err)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![int(0.0), int(0.0), int(PAGE_WIDTH), int(PAGE_HEIGHT)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_err)?;
    Ok(out)
}

fn image_name(i: usize) -> String {
    format!("Im{}", i + 1)
}

fn push_item(ops: &mut Vec<Operation>, item: &Item) {
    match item {
        Item::Text {
            x,
            y,
            font,
            size,
            text,
        } => {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![name(font.resource_name()), int(*size)],
            ));
            ops.push(Operation::new("Td", vec![int(*x), int(*y)]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(win_ansi(text))],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
        Item::Rule { x1, x2, y } => {
            ops.push(Operation::new("w", vec![int(1.0)]));
            ops.push(Operation::new("m", vec![int(*x1), int(*y)]));
            ops.push(Operation::new("l", vec![int(*x2), int(*y)]));
            ops.push(Operation::new("S", vec![]));
        }
        Item::Image { index, x, y, w, h } => {
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![int(*w), int(0.0), int(0.0), int(*h), int(*x), int(*y)],
            ));
            ops.push(Operation::new("Do", vec![name(&image_name(*index))]));
            ops.push(Operation::new("Q", vec![]));
        }
    }
}

/// Encode text for the standard fonts' WinAnsi encoding; unmappable characters become `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2026}' => 0x85,
            '\u{20ac}' => 0x80,
            _ => b'?',
        })
        .collect()
}

/// Byte length of a `w`×`h` sample plane with `channels` bytes per pixel.
fn plane_len(w: u32, h: u32, channels: usize) -> usize {
    w as usize * h as usize * channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::markdown::layout::{Page, layout};

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn plane_len_does_not_wrap_for_large_images() {
        assert_eq!(plane_len(40_000, 40_000, 3), 4_800_000_000);
        assert_eq!(plane_len(u32::MAX, 1, 1), u32::MAX as usize);
        assert_eq!(plane_len(2, 3, 1), 6);
    }

    #[test]
    fn win_ansi_maps_latin1_and_punctuation() {
        assert_eq!(win_ansi("a\u{e9}\u{2022}\u{2014}\u{4e2d}"), vec![b'a', 0xe9, 0x95, 0x97, b'?']);
    }

    #[test]
    fn written_pdf_reloads_with_page_count() {
        let md = (0..120).map(|i| format!("para {i}\n\n")).collect::<String>();
        let mut skip = |_: &str| -> IvResult<Option<image::RgbaImage>> { Ok(None) };
        let laid = layout(&md, &mut skip).unwrap();
        let bytes = write(&laid).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), laid.pages.len());
    }

    #[test]
    fn images_become_xobjects_with_soft_mask() {
        let laid = Document {
            pages: vec![Page {
                items: vec![Item::Image {
                    index: 0,
                    x: 72.0,
                    y: 600.0,
                    w: 30.0,
                    h: 15.0,
                }],
            }],
            images: vec![image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 4]))],
        };
        let bytes = write(&laid).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let smasks = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"SMask").is_ok())
            .count();
        assert_eq!(smasks, 1);
    }
}

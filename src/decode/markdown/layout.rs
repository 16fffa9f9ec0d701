//! Markdown to positioned page items.
//!
//! Coordinates are PDF points with the origin at the bottom-left of a US Letter page.

use image::RgbaImage;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::foundation::error::IvResult;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 10.0;
const LEADING: f32 = 1.3;
const INDENT: f32 = 18.0;
/// Nominal screen density of fetched images.
const IMAGE_PT_PER_PX: f32 = 0.75;

/// Base-14 fonts used on the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl Font {
    pub const ALL: [Font; 5] = [
        Font::Regular,
        Font::Bold,
        Font::Italic,
        Font::BoldItalic,
        Font::Mono,
    ];

    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
            Font::BoldItalic => "F4",
            Font::Mono => "F5",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
            Font::BoldItalic => "Helvetica-BoldOblique",
            Font::Mono => "Courier",
        }
    }

    fn styled(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Font::Regular,
            (true, false) => Font::Bold,
            (false, true) => Font::Italic,
            (true, true) => Font::BoldItalic,
        }
    }
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

fn char_width(font: Font, c: char) -> f32 {
    if font == Font::Mono {
        return 600.0;
    }
    let base = match c {
        ' '..='~' => HELVETICA[c as usize - 32],
        _ => 556,
    };
    match font {
        Font::Bold | Font::BoldItalic => f32::from(base) * 1.08,
        _ => f32::from(base),
    }
}

/// Width of `text` in points.
pub fn text_width(font: Font, size: f32, text: &str) -> f32 {
    text.chars().map(|c| char_width(font, c)).sum::<f32>() * size / 1000.0
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
    /// `index` into [`Document::images`]; `(x, y)` is the bottom-left corner.
    Image {
        index: usize,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
}

#[derive(Debug, Default)]
pub struct Document {
    pub pages: Vec<Page>,
    pub images: Vec<RgbaImage>,
}

/// Image loader for `http(s)` image links. `Ok(None)` skips the image.
pub type FetchImage<'a> = dyn FnMut(&str) -> IvResult<Option<RgbaImage>> + 'a;

#[derive(Clone, Debug)]
enum Token {
    Word {
        font: Font,
        text: String,
        space_before: bool,
    },
    Break,
}

struct Writer<'f, 'a> {
    doc: Document,
    page: Page,
    y: f32,
    tokens: Vec<Token>,
    space_pending: bool,
    bold: u32,
    italic: u32,
    heading: Option<HeadingLevel>,
    code_block: bool,
    quote_depth: u32,
    lists: Vec<Option<u64>>,
    image: Option<String>,
    fetch: &'f mut FetchImage<'a>,
}

/// Lay out `markdown` onto Letter pages.
pub fn layout(markdown: &str, fetch: &mut FetchImage<'_>) -> IvResult<Document> {
    let mut w = Writer {
        doc: Document::default(),
        page: Page::default(),
        y: PAGE_HEIGHT - MARGIN,
        tokens: Vec::new(),
        space_pending: false,
        bold: 0,
        italic: 0,
        heading: None,
        code_block: false,
        quote_depth: 0,
        lists: Vec::new(),
        image: None,
        fetch,
    };
    let opts = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    for event in Parser::new_ext(markdown, opts) {
        w.event(event)?;
    }
    Ok(w.finish())
}

impl Writer<'_, '_> {
    fn event(&mut self, event: Event<'_>) -> IvResult<()> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag)?,
            // Alt text of an image is not rendered.
            Event::Text(_) if self.image.is_some() => {}
            Event::Text(text) if self.code_block => self.code_text(&text),
            Event::Text(text) => {
                let font = self.font();
                self.push_text(font, &text);
            }
            Event::Code(code) => self.push_text(Font::Mono, &code),
            Event::SoftBreak => self.space_pending = true,
            Event::HardBreak => {
                self.tokens.push(Token::Break);
                self.space_pending = false;
            }
            Event::Rule => {
                self.flush(BODY_SIZE, 0.0);
                self.rule();
            }
            Event::TaskListMarker(done) => {
                self.push_text(Font::Mono, if done { "[x] " } else { "[ ] " });
            }
            _ => {}
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush(BODY_SIZE, 0.0);
                self.heading = Some(level);
            }
            Tag::Paragraph => {}
            Tag::BlockQuote(_) => {
                self.flush(BODY_SIZE, 0.0);
                self.quote_depth += 1;
                self.italic += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush(BODY_SIZE, 0.0);
                if let CodeBlockKind::Fenced(lang) = kind
                    && !lang.is_empty()
                {
                    tracing::trace!("code block: {lang}");
                }
                self.code_block = true;
            }
            Tag::List(start) => {
                self.flush(BODY_SIZE, 0.0);
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush(BODY_SIZE, 0.0);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{n}.");
                        *n += 1;
                        m
                    }
                    _ => "\u{2022}".to_owned(),
                };
                self.push_text(Font::Regular, &marker);
                self.space_pending = true;
            }
            Tag::TableHead => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Image { dest_url, .. } => {
                self.flush(BODY_SIZE, 0.0);
                self.image = Some(dest_url.into_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) -> IvResult<()> {
        match tag {
            TagEnd::Heading(level) => {
                self.heading = None;
                let size = heading_size(level as usize);
                self.flush(size, size * 0.5);
            }
            TagEnd::Paragraph => self.flush(BODY_SIZE, BODY_SIZE * 0.6),
            TagEnd::BlockQuote(_) => {
                self.flush(BODY_SIZE, BODY_SIZE * 0.6);
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.italic = self.italic.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.y -= CODE_SIZE * 0.6;
            }
            TagEnd::List(_) => {
                self.flush(BODY_SIZE, 0.0);
                self.lists.pop();
                if self.lists.is_empty() {
                    self.y -= BODY_SIZE * 0.6;
                }
            }
            TagEnd::Item => self.flush(BODY_SIZE, 0.0),
            TagEnd::TableCell => self.push_text(Font::Regular, " | "),
            TagEnd::TableHead => {
                self.bold = self.bold.saturating_sub(1);
                self.flush(BODY_SIZE, 0.0);
            }
            TagEnd::TableRow => self.flush(BODY_SIZE, 0.0),
            TagEnd::Table => self.y -= BODY_SIZE * 0.6,
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Image => {
                if let Some(url) = self.image.take() {
                    self.embed(&url)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn font(&self) -> Font {
        Font::styled(self.bold > 0 || self.heading.is_some(), self.italic > 0)
    }

    fn indent(&self) -> f32 {
        INDENT * (self.lists.len() as f32 + self.quote_depth as f32)
    }

    fn avail(&self) -> f32 {
        (PAGE_WIDTH - 2.0 * MARGIN - self.indent()).max(INDENT)
    }

    fn push_text(&mut self, font: Font, text: &str) {
        let mut space_before = self.space_pending || text.starts_with(char::is_whitespace);
        for word in text.split_whitespace() {
            self.tokens.push(Token::Word {
                font,
                text: word.to_owned(),
                space_before,
            });
            space_before = true;
        }
        self.space_pending = if text.trim().is_empty() {
            space_before
        } else {
            text.ends_with(char::is_whitespace)
        };
    }

    /// Wrap pending tokens into lines at `size`, then advance by `space_after`.
    fn flush(&mut self, size: f32, space_after: f32) {
        if self.tokens.is_empty() {
            return;
        }
        let tokens = std::mem::take(&mut self.tokens);
        self.space_pending = false;
        let avail = self.avail();
        let mut line: Vec<(f32, Font, String)> = Vec::new();
        let mut x = 0.0;
        for tok in tokens {
            let (font, text, space_before) = match tok {
                Token::Break => {
                    self.emit_line(std::mem::take(&mut line), size);
                    x = 0.0;
                    continue;
                }
                Token::Word {
                    font,
                    text,
                    space_before,
                } => (font, text, space_before),
            };
            for piece in split_to_fit(font, size, &text, avail) {
                let w = text_width(font, size, &piece);
                let mut space = if space_before && !line.is_empty() {
                    text_width(font, size, " ")
                } else {
                    0.0
                };
                if !line.is_empty() && x + space + w > avail {
                    self.emit_line(std::mem::take(&mut line), size);
                    x = 0.0;
                    space = 0.0;
                }
                line.push((x + space, font, piece));
                x += space + w;
            }
        }
        self.emit_line(line, size);
        self.y -= space_after;
    }

    fn emit_line(&mut self, line: Vec<(f32, Font, String)>, size: f32) {
        let height = size * LEADING;
        self.ensure(height);
        let left = MARGIN + self.indent();
        let baseline = self.y - size;
        for (x, font, text) in line {
            self.page.items.push(Item::Text {
                x: left + x,
                y: baseline,
                font,
                size,
                text,
            });
        }
        self.y -= height;
    }

    fn code_text(&mut self, text: &str) {
        let cols = ((self.avail() / (0.6 * CODE_SIZE)).floor() as usize).max(1);
        for raw in text.lines() {
            let expanded = raw.replace('\t', "    ");
            let chars: Vec<char> = expanded.chars().collect();
            if chars.is_empty() {
                self.emit_line(Vec::new(), CODE_SIZE);
                continue;
            }
            for chunk in chars.chunks(cols) {
                let s: String = chunk.iter().collect();
                self.emit_line(vec![(0.0, Font::Mono, s)], CODE_SIZE);
            }
        }
    }

    fn rule(&mut self) {
        self.ensure(BODY_SIZE);
        let y = self.y - BODY_SIZE / 2.0;
        self.page.items.push(Item::Rule {
            x1: MARGIN + self.indent(),
            x2: PAGE_WIDTH - MARGIN,
            y,
        });
        self.y -= BODY_SIZE;
    }

    fn embed(&mut self, url: &str) -> IvResult<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            tracing::debug!("skipping non-http image {url}");
            return Ok(());
        }
        let Some(img) = (self.fetch)(url)? else {
            return Ok(());
        };
        let (pw, ph) = img.dimensions();
        if pw == 0 || ph == 0 {
            return Ok(());
        }
        let mut w = pw as f32 * IMAGE_PT_PER_PX;
        let mut h = ph as f32 * IMAGE_PT_PER_PX;
        let scale = (self.avail() / w)
            .min((PAGE_HEIGHT - 2.0 * MARGIN) / h)
            .min(1.0);
        w *= scale;
        h *= scale;

        self.ensure(h);
        let index = self.doc.images.len();
        self.doc.images.push(img);
        self.page.items.push(Item::Image {
            index,
            x: MARGIN + self.indent(),
            y: self.y - h,
            w,
            h,
        });
        self.y -= h + BODY_SIZE * 0.6;
        Ok(())
    }

    /// Start a new page unless `height` more points fit on this one.
    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.page.items.is_empty() {
            let page = std::mem::take(&mut self.page);
            self.doc.pages.push(page);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn finish(mut self) -> Document {
        self.flush(BODY_SIZE, 0.0);
        if !self.page.items.is_empty() || self.doc.pages.is_empty() {
            let page = std::mem::take(&mut self.page);
            self.doc.pages.push(page);
        }
        self.doc
    }
}

fn heading_size(level: usize) -> f32 {
    match level {
        1 => 24.0,
        2 => 20.0,
        3 => 16.0,
        4 => 14.0,
        5 => 12.0,
        _ => BODY_SIZE,
    }
}

/// Split a word wider than `avail` into pieces that fit.
fn split_to_fit(font: Font, size: f32, word: &str, avail: f32) -> Vec<String> {
    if text_width(font, size, word) <= avail {
        return vec![word.to_owned()];
    }
    let mut pieces = Vec::new();
    let mut cur = String::new();
    for c in word.chars() {
        cur.push(c);
        if text_width(font, size, &cur) > avail && cur.chars().count() > 1 {
            cur.pop();
            pieces.push(std::mem::take(&mut cur));
            cur.push(c);
        }
    }
    if !cur.is_empty() {
        pieces.push(cur);
    }
    pieces
}

use anyhow::{Context, Result, anyhow};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::cmap::ToUnicodeMap;
use super::layout::{Fragment, group_lines};
use super::{BBox, ImageData, ImageRegion, Page, PageSize};

const DEFAULT_GLYPH_WIDTH: f32 = 500.0;
const DEFAULT_CID_WIDTH: f32 = 1000.0;
const MAX_TREE_DEPTH: usize = 32;
const MAX_FORM_DEPTH: usize = 8;

/// Parses a PDF and returns its pages in order with positioned lines and images.
pub fn extract_pages(pdf_bytes: &[u8]) -> Result<Vec<Page>> {
    let document = Document::load_mem(pdf_bytes).with_context(|| "failed to parse pdf")?;
    let pages_map = document.get_pages();
    if pages_map.is_empty() {
        return Err(anyhow!("no pages found in pdf"));
    }

    let mut pages = Vec::with_capacity(pages_map.len());
    for (index, page_id) in pages_map.values().enumerate() {
        let media_box = media_box(&document, *page_id);
        let (fragments, images) = match scan_page(&document, *page_id, &media_box) {
            Ok(found) => found,
            Err(err) => {
                warn!("page {}: unreadable content ({:#})", index + 1, err);
                (Vec::new(), Vec::new())
            }
        };
        let lines = group_lines(fragments);
        debug!(
            "page {}: {} lines, {} images",
            index + 1,
            lines.len(),
            images.len()
        );
        pages.push(Page {
            index,
            size: media_box.size(),
            lines,
            images,
        });
    }
    Ok(pages)
}

#[derive(Debug, Clone, Copy)]
struct MediaBox {
    llx: f32,
    lly: f32,
    urx: f32,
    ury: f32,
}

impl MediaBox {
    fn size(&self) -> PageSize {
        PageSize {
            width: self.urx - self.llx,
            height: self.ury - self.lly,
        }
    }

    fn to_page_x(&self, x: f32) -> f32 {
        x - self.llx
    }

    fn to_page_top(&self, y: f32) -> f32 {
        self.ury - y
    }
}

fn media_box(document: &Document, page_id: ObjectId) -> MediaBox {
    let found = inherited_entry(document, page_id, b"MediaBox")
        .and_then(|object| resolve(document, object).as_array().ok())
        .and_then(|values| {
            let coords = numbers(values);
            (coords.len() == 4).then(|| MediaBox {
                llx: coords[0].min(coords[2]),
                lly: coords[1].min(coords[3]),
                urx: coords[0].max(coords[2]),
                ury: coords[1].max(coords[3]),
            })
        })
        .filter(|rect| rect.urx > rect.llx && rect.ury > rect.lly);
    found.unwrap_or(MediaBox {
        llx: 0.0,
        lly: 0.0,
        urx: PageSize::LETTER.width,
        ury: PageSize::LETTER.height,
    })
}

/// Looks up `key` on the page, then up the page tree.
fn inherited_entry<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = document.get_object(page_id).ok()?.as_dict().ok();
    for _ in 0..MAX_TREE_DEPTH {
        let dict = current?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| parent.as_reference().ok())
            .and_then(|id| document.get_object(id).ok())
            .and_then(|object| object.as_dict().ok());
    }
    None
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(values: &[f32]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// `self` applied first, then `next`.
    fn then(self, next: Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn x_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn y_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

struct FontInfo<'a> {
    encoding: &'a str,
    first_char: i64,
    widths: Vec<f32>,
    two_byte: bool,
    cid_widths: BTreeMap<u32, f32>,
    default_cid_width: f32,
    to_unicode: Option<ToUnicodeMap>,
}

impl FontInfo<'_> {
    /// Text for the shown bytes plus the character codes that drive glyph advances.
    fn decode(&self, bytes: &[u8]) -> (String, Vec<u32>) {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0u32, |code, byte| (code << 8) | *byte as u32))
                .collect()
        } else {
            bytes.iter().map(|byte| *byte as u32).collect()
        };

        let text = match &self.to_unicode {
            Some(map) => {
                let mut text = String::new();
                for (index, code) in codes.iter().enumerate() {
                    match map.get(*code) {
                        Some(mapped) => text.push_str(mapped),
                        None if self.two_byte => {
                            text.extend(char::from_u32(*code).filter(|ch| !ch.is_control()))
                        }
                        None => text.push_str(&self.decode_with_encoding(&bytes[index..=index])),
                    }
                }
                text
            }
            None if self.two_byte => codes
                .iter()
                .filter_map(|code| char::from_u32(*code))
                .filter(|ch| !ch.is_control())
                .collect(),
            None => self.decode_with_encoding(bytes),
        };
        (text, codes)
    }

    fn decode_with_encoding(&self, bytes: &[u8]) -> String {
        let decoded = Document::decode_text(Some(self.encoding), bytes);
        if decoded.contains("Unimplemented") {
            return String::from_utf8_lossy(bytes)
                .chars()
                .filter(|ch| !ch.is_control())
                .collect();
        }
        decoded
    }

    /// Width of one glyph code in thousandths of text space.
    fn glyph_width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_cid_width);
        }
        let index = code as i64 - self.first_char;
        if index < 0 {
            return DEFAULT_GLYPH_WIDTH;
        }
        self.widths
            .get(index as usize)
            .copied()
            .filter(|width| *width > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }
}

fn font_info<'a>(document: &'a Document, font: &'a Dictionary) -> FontInfo<'a> {
    let subtype = font
        .get(b"Subtype")
        .ok()
        .and_then(|value| value.as_name().ok())
        .unwrap_or(b"");
    let encoding = font.get_font_encoding();
    let first_char = font
        .get(b"FirstChar")
        .ok()
        .and_then(|value| value.as_i64().ok())
        .unwrap_or(0);
    let widths = font
        .get(b"Widths")
        .ok()
        .map(|value| resolve(document, value))
        .and_then(|value| value.as_array().ok())
        .map(|values| values.iter().map(|v| number(v).unwrap_or(0.0)).collect())
        .unwrap_or_default();
    let two_byte = subtype == b"Type0" || encoding.starts_with("Identity");
    let (cid_widths, default_cid_width) = if two_byte {
        cid_widths(document, font)
    } else {
        (BTreeMap::new(), DEFAULT_CID_WIDTH)
    };
    FontInfo {
        encoding,
        first_char,
        widths,
        two_byte,
        cid_widths,
        default_cid_width,
        to_unicode: to_unicode(document, font),
    }
}

/// Reads the descendant font's `/W` array: `c [w1 w2 ...]` runs and
/// `c_first c_last w` ranges.
fn cid_widths(document: &Document, font: &Dictionary) -> (BTreeMap<u32, f32>, f32) {
    let mut widths = BTreeMap::new();
    let Some(descendant) = font
        .get(b"DescendantFonts")
        .ok()
        .map(|value| resolve(document, value))
        .and_then(|value| value.as_array().ok())
        .and_then(|fonts| fonts.first())
        .map(|value| resolve(document, value))
        .and_then(|value| value.as_dict().ok())
    else {
        return (widths, DEFAULT_CID_WIDTH);
    };
    let default_width = descendant
        .get(b"DW")
        .ok()
        .and_then(number)
        .unwrap_or(DEFAULT_CID_WIDTH);
    let Some(items) = descendant
        .get(b"W")
        .ok()
        .map(|value| resolve(document, value))
        .and_then(|value| value.as_array().ok())
    else {
        return (widths, default_width);
    };

    let mut index = 0;
    while let Some(first) = items.get(index).and_then(number) {
        let first = first as u32;
        match items.get(index + 1).map(|value| resolve(document, value)) {
            Some(Object::Array(run)) => {
                for (offset, width) in run.iter().enumerate() {
                    if let Some(width) = number(width) {
                        widths.insert(first.saturating_add(offset as u32), width);
                    }
                }
                index += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) = (number(last), items.get(index + 2).and_then(number))
                else {
                    break;
                };
                let last = last as u32;
                if last >= first && last - first <= u16::MAX as u32 {
                    for cid in first..=last {
                        widths.insert(cid, width);
                    }
                }
                index += 3;
            }
            None => break,
        }
    }
    (widths, default_width)
}

fn to_unicode(document: &Document, font: &Dictionary) -> Option<ToUnicodeMap> {
    let stream = font
        .get(b"ToUnicode")
        .ok()
        .map(|value| resolve(document, value))
        .and_then(|value| value.as_stream().ok())?;
    let data = stream_bytes(stream)?;
    match ToUnicodeMap::parse(&data) {
        Ok(map) if !map.is_empty() => Some(map),
        Ok(_) => None,
        Err(err) => {
            debug!("ignoring unreadable ToUnicode map: {:#}", err);
            None
        }
    }
}

fn resource_fonts<'a>(
    document: &'a Document,
    resources: Option<&'a Dictionary>,
) -> BTreeMap<Vec<u8>, FontInfo<'a>> {
    let Some(fonts) = resource_dict(document, resources, b"Font") else {
        return BTreeMap::new();
    };
    fonts
        .iter()
        .filter_map(|(name, font)| {
            let font = resolve(document, font).as_dict().ok()?;
            Some((name.clone(), font_info(document, font)))
        })
        .collect()
}

fn resource_dict<'a>(
    document: &'a Document,
    resources: Option<&'a Dictionary>,
    key: &[u8],
) -> Option<&'a Dictionary> {
    resources?
        .get(key)
        .ok()
        .map(|value| resolve(document, value))
        .and_then(|value| value.as_dict().ok())
}

/// Stream payload with any Flate/LZW filters undone.
fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream_filters(stream).is_empty() {
        return Some(stream.content.clone());
    }
    match stream.decompressed_content() {
        Ok(data) => Some(data),
        Err(err) => {
            debug!("undecodable stream: {}", err);
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
        }
    }
}

struct PageScanner<'a> {
    document: &'a Document,
    media_box: &'a MediaBox,
    fonts: BTreeMap<Vec<u8>, FontInfo<'a>>,
    xobjects: Option<&'a Dictionary>,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    state: TextState,
    font: Option<Vec<u8>>,
    form_depth: usize,
    fragments: Vec<Fragment>,
    images: Vec<ImageRegion>,
}

fn scan_page(
    document: &Document,
    page_id: ObjectId,
    media_box: &MediaBox,
) -> Result<(Vec<Fragment>, Vec<ImageRegion>)> {
    let raw_content = document
        .get_page_content(page_id)
        .with_context(|| "failed to read page content")?;
    let content = Content::decode(&raw_content).with_context(|| "failed to decode page content")?;

    let resources = inherited_entry(document, page_id, b"Resources")
        .and_then(|resources| resolve(document, resources).as_dict().ok());

    let mut scanner = PageScanner {
        document,
        media_box,
        fonts: resource_fonts(document, resources),
        xobjects: resource_dict(document, resources, b"XObject"),
        ctm: Matrix::IDENTITY,
        ctm_stack: Vec::new(),
        text_matrix: Matrix::IDENTITY,
        line_matrix: Matrix::IDENTITY,
        state: TextState::default(),
        font: None,
        form_depth: 0,
        fragments: Vec::new(),
        images: Vec::new(),
    };
    for operation in &content.operations {
        scanner.apply(&operation.operator, &operation.operands);
    }
    Ok((scanner.fragments, scanner.images))
}

impl<'a> PageScanner<'a> {
    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(matrix) = Matrix::from_operands(&numbers(operands)) {
                    self.ctm = matrix.then(self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                self.font = operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .map(|name| name.to_vec());
                if let Some(size) = operands.get(1).and_then(number) {
                    self.state.font_size = size;
                }
            }
            "Tc" => {
                if let Some(value) = operands.first().and_then(number) {
                    self.state.char_spacing = value;
                }
            }
            "Tw" => {
                if let Some(value) = operands.first().and_then(number) {
                    self.state.word_spacing = value;
                }
            }
            "Tz" => {
                if let Some(value) = operands.first().and_then(number) {
                    self.state.horizontal_scale = value / 100.0;
                }
            }
            "TL" => {
                if let Some(value) = operands.first().and_then(number) {
                    self.state.leading = value;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = numbers(operands)[..] {
                    if operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(matrix) = Matrix::from_operands(&numbers(operands)) {
                    self.text_matrix = matrix;
                    self.line_matrix = matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let [word, char_spacing, ..] = numbers(operands)[..] {
                    self.state.word_spacing = word;
                    self.state.char_spacing = char_spacing;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let tx = -adjust / 1000.0
                                        * self.state.font_size
                                        * self.state.horizontal_scale;
                                    self.advance(tx);
                                }
                            }
                        }
                    }
                }
            }
            "Do" => {
                if let Some(name) = operands.first().and_then(|operand| operand.as_name().ok()) {
                    self.place_xobject(name);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        let font = self.font.as_ref().and_then(|name| self.fonts.get(name));
        let (text, width) = match font {
            Some(font) => {
                let (text, codes) = font.decode(bytes);
                (text, self.string_width(font, &codes))
            }
            None => (
                String::from_utf8_lossy(bytes).to_string(),
                self.fallback_width(bytes.len()),
            ),
        };

        let rendering = self.text_matrix.then(self.ctm);
        let (x, y) = rendering.apply(0.0, 0.0);
        let size = self.state.font_size * rendering.y_scale();
        let advance_x = width * rendering.x_scale();
        let x0 = self.media_box.to_page_x(x.min(x + advance_x));
        let x1 = self.media_box.to_page_x(x.max(x + advance_x));
        let bottom = self.media_box.to_page_top(y);

        self.fragments.push(Fragment {
            text,
            x0,
            x1,
            top: bottom - size,
            bottom,
            size,
        });
        self.advance(width);
    }

    /// Horizontal advance of a shown string in unscaled text space.
    fn string_width(&self, font: &FontInfo<'_>, codes: &[u32]) -> f32 {
        let state = &self.state;
        let mut total = 0.0;
        for code in codes {
            total += font.glyph_width(*code) / 1000.0 * state.font_size + state.char_spacing;
            // Word spacing only applies to the single-byte space code.
            if !font.two_byte && *code == b' ' as u32 {
                total += state.word_spacing;
            }
        }
        total * state.horizontal_scale
    }

    fn fallback_width(&self, glyphs: usize) -> f32 {
        glyphs as f32 * DEFAULT_GLYPH_WIDTH / 1000.0
            * self.state.font_size
            * self.state.horizontal_scale
    }

    fn place_xobject(&mut self, name: &[u8]) {
        let Some(stream) = self
            .xobjects
            .and_then(|xobjects| xobjects.get(name).ok())
            .map(|object| resolve(self.document, object))
            .and_then(|object| object.as_stream().ok())
        else {
            debug!("unknown xobject {}", String::from_utf8_lossy(name));
            return;
        };
        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|value| value.as_name().ok());
        match subtype {
            Some(b"Image") => self.place_image(stream),
            Some(b"Form") => self.run_form(name, stream),
            _ => debug!("skipping xobject {}", String::from_utf8_lossy(name)),
        }
    }

    fn place_image(&mut self, stream: &Stream) {
        let corners =
            [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(x, y)| self.ctm.apply(x, y));
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

        self.images.push(ImageRegion {
            bbox: BBox {
                x0: self.media_box.to_page_x(min_x),
                top: self.media_box.to_page_top(max_y),
                x1: self.media_box.to_page_x(max_x),
                bottom: self.media_box.to_page_top(min_y),
            },
            data: image_data(self.document, stream),
        });
    }

    /// Runs a form XObject's content under its `/Matrix`, with its own
    /// resources when it has them and the caller's otherwise.
    fn run_form(&mut self, name: &[u8], form: &'a Stream) {
        if self.form_depth >= MAX_FORM_DEPTH {
            debug!("form {} nested too deeply", String::from_utf8_lossy(name));
            return;
        }
        let Some(data) = stream_bytes(form) else {
            return;
        };
        let content = match Content::decode(&data) {
            Ok(content) => content,
            Err(err) => {
                debug!("unreadable form {}: {}", String::from_utf8_lossy(name), err);
                return;
            }
        };
        let matrix = form
            .dict
            .get(b"Matrix")
            .ok()
            .map(|value| resolve(self.document, value))
            .and_then(|value| value.as_array().ok())
            .and_then(|values| Matrix::from_operands(&numbers(values)))
            .unwrap_or(Matrix::IDENTITY);
        let resources = form
            .dict
            .get(b"Resources")
            .ok()
            .map(|value| resolve(self.document, value))
            .and_then(|value| value.as_dict().ok());

        let saved_ctm = self.ctm;
        let saved_stack = self.ctm_stack.len();
        let saved_text = (self.text_matrix, self.line_matrix);
        let saved_state = self.state;
        let saved_font = self.font.clone();
        let saved_resources = match resources {
            Some(resources) => {
                let fonts = resource_fonts(self.document, Some(resources));
                let xobjects = resource_dict(self.document, Some(resources), b"XObject");
                Some((
                    std::mem::replace(&mut self.fonts, fonts),
                    std::mem::replace(&mut self.xobjects, xobjects),
                ))
            }
            None => None,
        };

        self.ctm = matrix.then(self.ctm);
        self.form_depth += 1;
        for operation in &content.operations {
            self.apply(&operation.operator, &operation.operands);
        }
        self.form_depth -= 1;

        self.ctm = saved_ctm;
        self.ctm_stack.truncate(saved_stack);
        (self.text_matrix, self.line_matrix) = saved_text;
        self.state = saved_state;
        self.font = saved_font;
        if let Some((fonts, xobjects)) = saved_resources {
            self.fonts = fonts;
            self.xobjects = xobjects;
        }
    }
}

fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|name| name.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn color_components(document: &Document, space: Option<&Object>) -> Option<u8> {
    let space = resolve(document, space?);
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first().and_then(|item| item.as_name().ok())?;
            match family {
                b"ICCBased" => {
                    let profile = resolve(document, items.get(1)?).as_stream().ok()?;
                    profile
                        .dict
                        .get(b"N")
                        .ok()
                        .and_then(|n| n.as_i64().ok())
                        .and_then(|n| u8::try_from(n).ok())
                }
                b"CalRGB" => Some(3),
                b"CalGray" => Some(1),
                _ => None,
            }
        }
        _ => None,
    }
}

fn image_data(document: &Document, stream: &Stream) -> ImageData {
    let filters = stream_filters(stream);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return ImageData::Encoded(stream.content.clone());
        }
        Some(b"DCTDecode") | Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            return ImageData::Unsupported(format!(
                "unsupported image filter {}",
                String::from_utf8_lossy(filters.last().map(Vec::as_slice).unwrap_or_default())
            ));
        }
        _ => {}
    }

    let dict = &stream.dict;
    let dimension = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|value| value.as_i64().ok())
            .and_then(|value| u32::try_from(value).ok())
            .filter(|value| *value > 0)
    };
    let (Some(width), Some(height)) = (dimension(b"Width"), dimension(b"Height")) else {
        return ImageData::Unsupported("image without dimensions".to_string());
    };
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|value| value.as_i64().ok())
        .and_then(|value| u8::try_from(value).ok())
        .unwrap_or(8);
    let Some(components) = color_components(document, dict.get(b"ColorSpace").ok()) else {
        return ImageData::Unsupported("unsupported image colour space".to_string());
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        match stream.decompressed_content() {
            Ok(samples) => samples,
            Err(err) => return ImageData::Unsupported(format!("image stream: {}", err)),
        }
    };
    ImageData::Raw {
        width,
        height,
        components,
        bits,
        samples,
    }
}

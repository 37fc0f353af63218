use anyhow::{Context, Result, anyhow};
use printpdf::image_crate::{self, DynamicImage, GrayImage, RgbImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::io::Cursor;
use tracing::{debug, warn};

use super::{BBox, ImageData, ImageRegion, Page, PageSize, TextLine};
use crate::fonts::FontRegistry;
use crate::settings::PageSizeMode;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub font_size: f32,
    pub page_size: PageSizeMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            page_size: PageSizeMode::Source,
        }
    }
}

/// Outcome of drawing one line or image.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Drawn with its origin at `(x, y)` on the bottom-left-origin canvas.
    Drawn { x: f32, y: f32 },
    Skipped(String),
}

/// What happened on one output page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    pub lines_drawn: usize,
    pub images_drawn: usize,
    pub skipped: Vec<String>,
}

/// Baseline origin of a line on a canvas of height `page_height`.
pub fn text_origin(line: &TextLine, page_height: f32) -> (f32, f32) {
    (line.x0, page_height - line.top)
}

/// `(x, y, width, height)` of an image on the canvas, or why it is off-page.
pub fn image_origin(bbox: &BBox, page: PageSize) -> Result<(f32, f32, f32, f32), String> {
    let width = bbox.width();
    let height = bbox.height();
    let y = page.height - bbox.top - height;
    if !(0.0..=page.width).contains(&bbox.x0) || !(0.0..=page.height).contains(&y) {
        return Err(format!(
            "image at ({:.1}, {:.1}) falls outside {:.0}x{:.0} page",
            bbox.x0, y, page.width, page.height
        ));
    }
    Ok((bbox.x0, y, width, height))
}

/// Encoding printpdf uses for its builtin fonts.
const BUILTIN_ENCODING: &str = "WinAnsiEncoding";

#[derive(Clone)]
struct ActiveFont {
    font: IndirectFontRef,
    builtin: bool,
}

/// Rebuilds a document page by page with translated text in place.
pub struct Reconstructor<'a> {
    fonts: &'a FontRegistry,
    lang: String,
    options: RenderOptions,
    doc: Option<PdfDocumentReference>,
    font: Option<ActiveFont>,
    pages: usize,
}

impl<'a> Reconstructor<'a> {
    pub fn new(fonts: &'a FontRegistry, lang: &str, options: RenderOptions) -> Self {
        Self {
            fonts,
            lang: lang.to_string(),
            options,
            doc: None,
            font: None,
            pages: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Draws `page` (whose lines already carry translated text) onto a new
    /// output page. Individual lines and images that fail are skipped.
    pub fn draw_page(&mut self, page: &Page) -> PageReport {
        let size = match self.options.page_size {
            PageSizeMode::Source => page.size,
            PageSizeMode::Letter => PageSize::LETTER,
        };
        let layer = self.open_page(size);
        let mut report = PageReport::default();

        for line in &page.lines {
            match self.draw_line(&layer, line, size) {
                Placement::Drawn { x, y } => {
                    debug!("line at ({:.1}, {:.1}): {}", x, y, line.text);
                    report.lines_drawn += 1;
                }
                Placement::Skipped(reason) => {
                    warn!("error processing line: {}", reason);
                    report.skipped.push(reason);
                }
            }
        }

        for region in &page.images {
            match self.draw_image(&layer, region, size) {
                Placement::Drawn { .. } => report.images_drawn += 1,
                Placement::Skipped(reason) => {
                    warn!("error processing image: {}", reason);
                    report.skipped.push(reason);
                }
            }
        }

        report
    }

    /// Serializes every drawn page.
    pub fn finish(self) -> Result<Vec<u8>> {
        let doc = self.doc.ok_or_else(|| anyhow!("no pages to render"))?;
        let mut buffer = Vec::new();
        {
            let mut writer = std::io::BufWriter::new(&mut buffer);
            doc.save(&mut writer)
                .with_context(|| "failed to write pdf")?;
        }
        Ok(buffer)
    }

    fn open_page(&mut self, size: PageSize) -> PdfLayerReference {
        let width = Mm(pt_to_mm(size.width));
        let height = Mm(pt_to_mm(size.height));
        self.pages += 1;
        let layer_name = format!("Page {}", self.pages);
        match self.doc.as_ref() {
            Some(doc) => {
                let (page, layer) = doc.add_page(width, height, layer_name);
                doc.get_page(page).get_layer(layer)
            }
            None => {
                let (doc, page, layer) = PdfDocument::new("translated", width, height, layer_name);
                let current = doc.get_page(page).get_layer(layer);
                self.doc = Some(doc);
                current
            }
        }
    }

    fn draw_line(&mut self, layer: &PdfLayerReference, line: &TextLine, size: PageSize) -> Placement {
        if line.text.trim().is_empty() {
            return Placement::Skipped(format!("empty text at ({:.1}, {:.1})", line.x0, line.top));
        }
        let active = match self.font() {
            Ok(active) => active,
            Err(err) => return Placement::Skipped(format!("{:#}", err)),
        };
        if active.builtin && !builtin_can_render(&line.text) {
            return Placement::Skipped(format!(
                "Helvetica cannot draw \"{}\" and no usable font is registered for '{}'",
                line.text, self.lang
            ));
        }
        let (x, y) = text_origin(line, size.height);
        layer.use_text(
            line.text.as_str(),
            self.options.font_size,
            Mm(pt_to_mm(x)),
            Mm(pt_to_mm(y)),
            &active.font,
        );
        Placement::Drawn { x, y }
    }

    fn draw_image(&self, layer: &PdfLayerReference, region: &ImageRegion, size: PageSize) -> Placement {
        let (x, y, width, height) = match image_origin(&region.bbox, size) {
            Ok(origin) => origin,
            Err(reason) => return Placement::Skipped(reason),
        };
        let image = match decode_image(&region.data) {
            Ok(image) => image,
            Err(err) => return Placement::Skipped(format!("{:#}", err)),
        };
        let rgb = image.to_rgb8();
        let (px_w, px_h) = rgb.dimensions();
        let pdf_image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb));
        pdf_image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(pt_to_mm(x))),
                translate_y: Some(Mm(pt_to_mm(y))),
                rotate: None,
                scale_x: Some(width / px_w.max(1) as f32),
                scale_y: Some(height / px_h.max(1) as f32),
                dpi: Some(72.0),
            },
        );
        Placement::Drawn { x, y }
    }

    /// Font for the target language, added to the document on first use.
    /// Helvetica stands in when no usable font is registered.
    fn font(&mut self) -> Result<ActiveFont> {
        if let Some(active) = self.font.as_ref() {
            return Ok(active.clone());
        }
        let doc = self
            .doc
            .as_ref()
            .ok_or_else(|| anyhow!("no open page"))?;
        let external = match self.fonts.font_for(&self.lang) {
            Some(loaded) => match doc.add_external_font(Cursor::new(loaded.data().to_vec())) {
                Ok(font) => Some(font),
                Err(err) => {
                    warn!(
                        "failed to embed font for '{}' ({}); using Helvetica",
                        self.lang, err
                    );
                    None
                }
            },
            None => {
                debug!("no font registered for '{}'; using Helvetica", self.lang);
                None
            }
        };
        let active = match external {
            Some(font) => ActiveFont {
                font,
                builtin: false,
            },
            None => ActiveFont {
                font: doc
                    .add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(|err| anyhow!("failed to add builtin font: {}", err))?,
                builtin: true,
            },
        };
        self.font = Some(active.clone());
        Ok(active)
    }
}

/// Whether every visible character of `text` exists in the builtin encoding.
/// printpdf silently drops the ones that do not.
fn builtin_can_render(text: &str) -> bool {
    let visible: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    let encoded = lopdf::Document::encode_text(Some(BUILTIN_ENCODING), &visible);
    lopdf::Document::decode_text(Some(BUILTIN_ENCODING), &encoded) == visible
}

fn decode_image(data: &ImageData) -> Result<DynamicImage> {
    match data {
        ImageData::Encoded(bytes) => {
            image_crate::load_from_memory(bytes).with_context(|| "failed to decode image")
        }
        ImageData::Raw {
            width,
            height,
            components,
            bits,
            samples,
        } => {
            if *bits != 8 {
                return Err(anyhow!("unsupported image depth: {} bits", bits));
            }
            let expected = (*width as usize)
                .checked_mul(*height as usize)
                .and_then(|pixels| pixels.checked_mul(*components as usize))
                .ok_or_else(|| anyhow!("image dimensions overflow: {}x{}", width, height))?;
            if samples.len() < expected {
                return Err(anyhow!(
                    "image data too short ({} of {} bytes)",
                    samples.len(),
                    expected
                ));
            }
            let samples = &samples[..expected];
            let image = match components {
                1 => GrayImage::from_raw(*width, *height, samples.to_vec()).map(DynamicImage::ImageLuma8),
                3 => RgbImage::from_raw(*width, *height, samples.to_vec()).map(DynamicImage::ImageRgb8),
                4 => RgbImage::from_raw(*width, *height, cmyk_to_rgb(samples))
                    .map(DynamicImage::ImageRgb8),
                other => return Err(anyhow!("unsupported colour components: {}", other)),
            };
            image.ok_or_else(|| anyhow!("image buffer does not match dimensions"))
        }
        ImageData::Unsupported(reason) => Err(anyhow!("{}", reason)),
    }
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u16;
            [px[0], px[1], px[2]].map(|c| ((255 - c as u16) * k / 255) as u8)
        })
        .collect()
}

pub(crate) fn pt_to_mm(pt: f32) -> f32 {
    pt * 25.4 / 72.0
}

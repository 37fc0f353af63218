mod cmap;
mod extract;
mod layout;
mod render;

pub use extract::extract_pages;
pub use render::{
    PageReport, Placement, Reconstructor, RenderOptions, image_origin, text_origin,
};

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
}

/// Rectangle in page-local, top-left-origin coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
    pub font_size: f32,
}

impl TextLine {
    /// Same position, new text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Pixel content of an image XObject as found in the source file.
#[derive(Debug, Clone)]
pub enum ImageData {
    /// A self-describing encoded stream (JPEG).
    Encoded(Vec<u8>),
    /// Decoded samples.
    Raw {
        width: u32,
        height: u32,
        components: u8,
        bits: u8,
        samples: Vec<u8>,
    },
    /// Content that cannot be re-embedded; the reason is reported on skip.
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct ImageRegion {
    pub bbox: BBox,
    pub data: ImageData,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub size: PageSize,
    pub lines: Vec<TextLine>,
    pub images: Vec<ImageRegion>,
}

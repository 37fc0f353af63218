#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only mutated while HOME_MUTEX is held.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    match old_home {
        Some(old) => unsafe { std::env::set_var("HOME", old) },
        None => unsafe { std::env::remove_var("HOME") },
    }
    result
}

#[cfg(test)]
pub(crate) use fakes::*;

#[cfg(test)]
mod fakes {
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    use crate::providers::{ProviderFuture, SpeechProvider, TranslationProvider};

    /// Translates by prefixing, recording every `(text, lang)` it is sent.
    #[derive(Clone)]
    pub(crate) struct FakeTranslate {
        prefix: String,
        seen: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeTranslate {
        pub(crate) fn prefixing(prefix: &str) -> Self {
            Self {
                prefix: prefix.to_string(),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn seen(&self) -> Vec<(String, String)> {
            self.seen.lock().expect("seen lock").clone()
        }

        pub(crate) fn calls(&self) -> usize {
            self.seen.lock().expect("seen lock").len()
        }
    }

    impl TranslationProvider for FakeTranslate {
        fn translate(&self, text: String, target_lang: String) -> ProviderFuture<String> {
            let output = format!("{}{}", self.prefix, text);
            self.seen
                .lock()
                .expect("seen lock")
                .push((text, target_lang));
            Box::pin(async move { Ok(output) })
        }
    }

    #[derive(Clone)]
    pub(crate) struct FailingTranslate;

    impl TranslationProvider for FailingTranslate {
        fn translate(&self, _text: String, _target_lang: String) -> ProviderFuture<String> {
            Box::pin(async move { Err(anyhow!("service unavailable")) })
        }
    }

    /// Returns fixed audio bytes, recording the language it was asked for.
    #[derive(Clone)]
    pub(crate) struct FakeSpeech {
        langs: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSpeech {
        pub(crate) fn new() -> Self {
            Self {
                langs: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn langs(&self) -> Vec<String> {
            self.langs.lock().expect("langs lock").clone()
        }
    }

    impl SpeechProvider for FakeSpeech {
        fn synthesize(&self, _text: String, lang: String) -> ProviderFuture<Vec<u8>> {
            self.langs.lock().expect("langs lock").push(lang);
            Box::pin(async move { Ok(b"ID3fake-mp3".to_vec()) })
        }
    }

    #[derive(Clone)]
    pub(crate) struct FailingSpeech;

    impl SpeechProvider for FailingSpeech {
        fn synthesize(&self, _text: String, _lang: String) -> ProviderFuture<Vec<u8>> {
            Box::pin(async move { Err(anyhow!("tts quota exceeded")) })
        }
    }
}

#[cfg(test)]
pub(crate) use samples::*;

#[cfg(test)]
mod samples {
    use printpdf::image_crate::{DynamicImage, RgbImage};
    use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};

    use crate::pdf::PageSize;

    /// A real TrueType face for tests that need an embedded font.
    pub(crate) const ROBOTO: &[u8] = include_bytes!("../tests/fixtures/RobotoMedium.ttf");

    const SAMPLE_FONT_SIZE: f32 = 12.0;
    const SAMPLE_IMAGE_PX: u32 = 4;

    /// Square RGB image, positioned by its top-left corner.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct SampleImage {
        pub(crate) x0: f32,
        pub(crate) top: f32,
        pub(crate) size: f32,
    }

    /// Source page for tests; positions are top-left-origin points.
    #[derive(Debug, Clone)]
    pub(crate) struct SamplePage {
        size: PageSize,
        lines: Vec<(String, f32, f32)>,
        images: Vec<SampleImage>,
    }

    impl SamplePage {
        pub(crate) fn letter() -> Self {
            Self::sized(PageSize::LETTER.width, PageSize::LETTER.height)
        }

        pub(crate) fn sized(width: f32, height: f32) -> Self {
            Self {
                size: PageSize { width, height },
                lines: Vec::new(),
                images: Vec::new(),
            }
        }

        /// 12pt text whose glyph box starts at `top`.
        pub(crate) fn line(mut self, text: &str, x0: f32, top: f32) -> Self {
            self.lines.push((text.to_string(), x0, top));
            self
        }

        pub(crate) fn image(mut self, image: SampleImage) -> Self {
            self.images.push(image);
            self
        }
    }

    fn mm(pt: f32) -> Mm {
        Mm(pt * 25.4 / 72.0)
    }

    pub(crate) fn sample_pdf(pages: &[SamplePage]) -> Vec<u8> {
        build_pdf(pages, None)
    }

    /// Like [`sample_pdf`], with every line set in an embedded TrueType font.
    pub(crate) fn sample_pdf_with_font(pages: &[SamplePage], font: &[u8]) -> Vec<u8> {
        build_pdf(pages, Some(font))
    }

    fn build_pdf(pages: &[SamplePage], font: Option<&[u8]>) -> Vec<u8> {
        let first = pages.first().expect("at least one page");
        let (doc, page, layer) = PdfDocument::new(
            "sample",
            mm(first.size.width),
            mm(first.size.height),
            "Page 1",
        );
        let font = match font {
            Some(bytes) => doc
                .add_external_font(std::io::Cursor::new(bytes.to_vec()))
                .expect("external font"),
            None => doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .expect("builtin font"),
        };

        let mut current = doc.get_page(page).get_layer(layer);
        for (index, sample) in pages.iter().enumerate() {
            if index > 0 {
                let (page, layer) = doc.add_page(
                    mm(sample.size.width),
                    mm(sample.size.height),
                    format!("Page {}", index + 1),
                );
                current = doc.get_page(page).get_layer(layer);
            }
            let height = sample.size.height;
            for (text, x0, top) in &sample.lines {
                let baseline = height - top - SAMPLE_FONT_SIZE;
                current.use_text(text.as_str(), SAMPLE_FONT_SIZE, mm(*x0), mm(baseline), &font);
            }
            for image in &sample.images {
                let pixels = RgbImage::from_pixel(
                    SAMPLE_IMAGE_PX,
                    SAMPLE_IMAGE_PX,
                    printpdf::image_crate::Rgb([200, 40, 40]),
                );
                let scale = image.size / SAMPLE_IMAGE_PX as f32;
                Image::from_dynamic_image(&DynamicImage::ImageRgb8(pixels)).add_to_layer(
                    current.clone(),
                    ImageTransform {
                        translate_x: Some(mm(image.x0)),
                        translate_y: Some(mm(height - image.top - image.size)),
                        rotate: None,
                        scale_x: Some(scale),
                        scale_y: Some(scale),
                        dpi: Some(72.0),
                    },
                );
            }
        }

        let mut buffer = Vec::new();
        {
            let mut writer = std::io::BufWriter::new(&mut buffer);
            doc.save(&mut writer).expect("save sample pdf");
        }
        buffer
    }

    /// One letter page that draws `text` only through a form XObject.
    /// The page shifts the form right by `shift_x`; the form's own matrix
    /// moves its content down by `drop`.
    pub(crate) fn form_xobject_pdf(text: &str, baseline: f32, shift_x: f32, drop: f32) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let form_content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![10.into(), baseline.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 0.into(), (-drop).into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            },
            form_content.encode().expect("form content"),
        ));

        let page_content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), shift_x.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Fm0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            page_content.encode().expect("page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Fm0" => form_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save form pdf");
        buffer
    }
}

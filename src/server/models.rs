use serde::Serialize;

use crate::pipeline::TranslationReport;

#[derive(Debug, Serialize)]
pub(crate) struct TranslateResponse {
    pub(crate) original_text: String,
    pub(crate) translated_text: String,
    pub(crate) filename: String,
    pub(crate) audio_filename: Option<String>,
}

impl From<TranslationReport> for TranslateResponse {
    fn from(report: TranslationReport) -> Self {
        Self {
            original_text: report.original_text,
            translated_text: report.translated_text,
            filename: report.filename,
            audio_filename: report.audio_filename,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LanguageOption {
    pub(crate) code: String,
    pub(crate) label: String,
}

use anyhow::Context;
use axum::Json;
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::io::Write;

use crate::pipeline::Pipeline;
use crate::providers::{SpeechProvider, TranslationProvider};

use super::models::{ErrorResponse, TranslateResponse};

pub(crate) const MISSING_FIELDS: &str = "File and language are required";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub(crate) fn into_parts(self) -> (StatusCode, Json<ErrorResponse>) {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

/// Form fields of a `/translate` request.
#[derive(Debug, Default)]
pub(crate) struct Upload {
    pub(crate) file: Option<Vec<u8>>,
    pub(crate) language: Option<String>,
}

pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Upload, ServerError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(|err| {
                    ServerError::bad_request(format!("failed to read upload: {}", err))
                })?;
                upload.file = Some(bytes.to_vec());
            }
            "language" => {
                let value = field.text().await.map_err(|err| {
                    ServerError::bad_request(format!("failed to read language: {}", err))
                })?;
                upload.language = Some(value);
            }
            _ => {}
        }
    }
    Ok(upload)
}

/// Runs one upload through the pipeline. The upload lives in a temp file
/// that is removed when this returns, whatever the outcome.
pub(crate) async fn translate_upload<T, S>(
    pipeline: &Pipeline<T, S>,
    upload: Upload,
) -> Result<TranslateResponse, ServerError>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    let (file, language) = match (upload.file, upload.language) {
        (Some(file), Some(language)) if !language.trim().is_empty() => (file, language),
        _ => return Err(ServerError::bad_request(MISSING_FIELDS)),
    };

    let mut input = tempfile::Builder::new()
        .prefix("pdf-speech-translator-")
        .suffix(".pdf")
        .tempfile()
        .with_context(|| "failed to create upload temp file")?;
    input
        .write_all(&file)
        .with_context(|| "failed to write upload temp file")?;
    input
        .flush()
        .with_context(|| "failed to flush upload temp file")?;

    let report = pipeline.run_file(input.path(), language.trim()).await?;
    Ok(report.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::fonts::FontRegistry;
    use crate::pdf::RenderOptions;
    use crate::speech::Synthesizer;
    use crate::test_util::{FakeSpeech, FakeTranslate, SamplePage, sample_pdf};
    use crate::translator::Translator;
    use std::sync::Arc;

    fn pipeline(dir: &std::path::Path) -> Pipeline<FakeTranslate, FakeSpeech> {
        Pipeline::new(
            Translator::new(FakeTranslate::prefixing("T:")),
            Synthesizer::new(FakeSpeech::new(), vec!["hi".to_string()], "en"),
            Arc::new(FontRegistry::default()),
            ArtifactStore::open(dir).unwrap(),
            RenderOptions::default(),
        )
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path());
        let uploads = [
            Upload::default(),
            Upload {
                file: Some(b"%PDF".to_vec()),
                language: None,
            },
            Upload {
                file: None,
                language: Some("hi".to_string()),
            },
            Upload {
                file: Some(b"%PDF".to_vec()),
                language: Some("  ".to_string()),
            },
        ];
        for upload in uploads {
            let err = translate_upload(&pipeline, upload).await.unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, MISSING_FIELDS);
        }
    }

    #[tokio::test]
    async fn corrupt_uploads_are_internal_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path());
        let upload = Upload {
            file: Some(b"not a pdf at all".to_vec()),
            language: Some("hi".to_string()),
        };
        let err = translate_upload(&pipeline, upload).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn valid_uploads_produce_a_response() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path());
        let upload = Upload {
            file: Some(sample_pdf(&[SamplePage::letter().line("Hello world", 10.0, 20.0)])),
            language: Some("hi".to_string()),
        };
        let response = translate_upload(&pipeline, upload).await.expect("response");
        assert_eq!(response.translated_text, "T:Hello world");
        assert!(response.filename.ends_with(".pdf"));
        assert!(response.audio_filename.is_some());
    }
}

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tera::{Context as TeraContext, Tera};
use tracing::info;

use crate::artifacts::ArtifactKind;
use crate::fonts::FontRegistry;
use crate::pipeline::{Pipeline, PipelineStage, log_stage};
use crate::providers::{GoogleSpeech, GoogleTranslate, SpeechProvider, TranslationProvider};
use crate::settings::Settings;

use super::models::{ErrorResponse, LanguageOption, TranslateResponse};
use super::state::ServerState;
use super::translate::{ServerError, read_upload, translate_upload};

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let fonts = Arc::new(FontRegistry::load(&settings.fonts));
    let translation = GoogleTranslate::new(settings.translation_endpoint.clone())
        .with_source_lang(settings.translation_source_lang.clone());
    let speech =
        GoogleSpeech::new(settings.speech_endpoint.clone()).with_chunk_chars(settings.speech_chunk_chars);
    let pipeline = Pipeline::from_settings(&settings, translation, speech, fonts)?;
    info!("artifacts stored in {}", pipeline.store().dir().display());

    let app = router(pipeline)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router<T, S>(pipeline: Pipeline<T, S>) -> Result<Router>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    let landing_page = render_index(&pipeline.languages())?;
    let state = Arc::new(ServerState {
        pipeline,
        landing_page,
    });
    Ok(Router::new()
        .route("/", get(index::<T, S>))
        .route("/health", get(health))
        .route("/translate", post(translate::<T, S>))
        .route("/download/:filename", get(download::<T, S>))
        .route("/audio/:filename", get(audio::<T, S>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn(cors_middleware)))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn index<T, S>(State(state): State<Arc<ServerState<T, S>>>) -> Html<String>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    Html(state.landing_page.clone())
}

async fn translate<T, S>(
    State(state): State<Arc<ServerState<T, S>>>,
    multipart: Multipart,
) -> Result<Json<TranslateResponse>, (StatusCode, Json<ErrorResponse>)>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    let upload = read_upload(multipart).await.map_err(ServerError::into_parts)?;
    let state = state.clone();
    let handle = tokio::runtime::Handle::current();
    let result = tokio::task::spawn_blocking(move || {
        handle.block_on(translate_upload(&state.pipeline, upload))
    })
    .await
    .map_err(|err| ServerError::internal(format!("server task failed: {}", err)).into_parts())?;

    match result {
        Ok(response) => {
            log_stage(PipelineStage::Responded);
            Ok(Json(response))
        }
        Err(err) => Err(err.into_parts()),
    }
}

async fn download<T, S>(
    State(state): State<Arc<ServerState<T, S>>>,
    Path(filename): Path<String>,
) -> Result<Response<Body>, (StatusCode, Json<ErrorResponse>)>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    serve_artifact(&state, &filename, ArtifactKind::Document)
        .await
        .map_err(ServerError::into_parts)
}

async fn audio<T, S>(
    State(state): State<Arc<ServerState<T, S>>>,
    Path(filename): Path<String>,
) -> Result<Response<Body>, (StatusCode, Json<ErrorResponse>)>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    serve_artifact(&state, &filename, ArtifactKind::Audio)
        .await
        .map_err(ServerError::into_parts)
}

async fn serve_artifact<T, S>(
    state: &ServerState<T, S>,
    filename: &str,
    kind: ArtifactKind,
) -> Result<Response<Body>, ServerError>
where
    T: TranslationProvider,
    S: SpeechProvider,
{
    let path = state
        .pipeline
        .store()
        .resolve(filename)
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::not_found(format!("file not found: {}", filename)));
        }
        Err(err) => {
            return Err(ServerError::internal(format!(
                "failed to read {}: {}",
                filename, err
            )));
        }
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename.trim()))
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(kind.mime()));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

fn render_index(languages: &[String]) -> Result<String> {
    let options = languages
        .iter()
        .map(|code| LanguageOption {
            code: code.clone(),
            label: language_label(code),
        })
        .collect::<Vec<_>>();
    let mut context = TeraContext::new();
    context.insert("languages", &options);
    Tera::one_off(INDEX_TEMPLATE, &context, true).with_context(|| "failed to render index template")
}

fn language_label(code: &str) -> String {
    let label = match code {
        "hi" => "Hindi",
        "ta" => "Tamil",
        "ml" => "Malayalam",
        "kn" => "Kannada",
        "gu" => "Gujarati",
        "pa" => "Punjabi",
        "or" => "Odia",
        "bn" => "Bengali",
        "te" => "Telugu",
        "en" => "English",
        other => return other.to_string(),
    };
    label.to_string()
}

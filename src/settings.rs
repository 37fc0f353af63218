use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

/// Size of every output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSizeMode {
    /// Mirror the MediaBox of the source page.
    Source,
    /// Always US Letter (612x792pt).
    Letter,
}

impl PageSizeMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "source" => Some(PageSizeMode::Source),
            "letter" => Some(PageSizeMode::Letter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub downloads_dir: String,
    pub translation_endpoint: String,
    pub translation_source_lang: String,
    pub speech_endpoint: String,
    pub speech_languages: Vec<String>,
    pub speech_fallback_lang: String,
    pub speech_chunk_chars: usize,
    pub font_size: f32,
    pub page_size: PageSizeMode,
    pub fonts: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:5000".to_string(),
            downloads_dir: "static/downloads".to_string(),
            translation_endpoint: "https://translate.googleapis.com/translate_a/single"
                .to_string(),
            translation_source_lang: "auto".to_string(),
            speech_endpoint: "https://translate.google.com/translate_tts".to_string(),
            speech_languages: Vec::new(),
            speech_fallback_lang: "en".to_string(),
            speech_chunk_chars: 100,
            font_size: 10.0,
            page_size: PageSizeMode::Source,
            fonts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    translation: Option<TranslationSettings>,
    speech: Option<SpeechSettings>,
    document: Option<DocumentSettings>,
    fonts: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    downloads_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    endpoint: Option<String>,
    source_lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechSettings {
    endpoint: Option<String>,
    languages: Option<Vec<String>>,
    fallback_lang: Option<String>,
    chunk_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentSettings {
    font_size: Option<f32>,
    page_size: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            merge_string(&mut self.server_addr, server.addr);
            merge_string(&mut self.downloads_dir, server.downloads_dir);
        }
        if let Some(translation) = incoming.translation {
            merge_string(&mut self.translation_endpoint, translation.endpoint);
            merge_string(&mut self.translation_source_lang, translation.source_lang);
        }
        if let Some(speech) = incoming.speech {
            merge_string(&mut self.speech_endpoint, speech.endpoint);
            merge_string(&mut self.speech_fallback_lang, speech.fallback_lang);
            if let Some(languages) = speech.languages {
                self.speech_languages = languages
                    .into_iter()
                    .map(|code| code.trim().to_lowercase())
                    .filter(|code| !code.is_empty())
                    .collect();
            }
            if let Some(chars) = speech.chunk_chars {
                if chars > 0 {
                    self.speech_chunk_chars = chars;
                }
            }
        }
        if let Some(document) = incoming.document {
            if let Some(size) = document.font_size {
                if size > 0.0 {
                    self.font_size = size;
                }
            }
            if let Some(value) = document.page_size {
                match PageSizeMode::parse(&value) {
                    Some(mode) => self.page_size = mode,
                    None => warn!("ignoring unknown page_size '{}'", value),
                }
            }
        }
        if let Some(fonts) = incoming.fonts {
            for (lang, path) in fonts {
                let lang = lang.trim().to_lowercase();
                if lang.is_empty() || path.trim().is_empty() {
                    continue;
                }
                self.fonts.insert(lang, path);
            }
        }
    }
}

fn merge_string(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *target = value.trim().to_string();
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".pdf-speech-translator"))
        }
    })
}

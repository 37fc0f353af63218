use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ttf_parser::{Face, name_id};

pub const DEFAULT_FONT_KEY: &str = "default";

#[derive(Debug, Clone)]
pub struct LoadedFont {
    data: Arc<Vec<u8>>,
    family: Option<String>,
}

impl LoadedFont {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

#[cfg(test)]
impl LoadedFont {
    /// Wraps bytes without parsing them.
    pub(crate) fn unchecked(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            family: None,
        }
    }
}

/// Language code to font mapping, built once at startup and read-only after.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: BTreeMap<String, LoadedFont>,
}

impl FontRegistry {
    /// Loads every font in `table`. Missing or unparsable files are logged
    /// and left out; the registry is usable even when empty.
    pub fn load(table: &BTreeMap<String, String>) -> Self {
        let mut registry = Self::default();
        for (lang, path) in table {
            let path = Path::new(path);
            if !path.exists() {
                debug!("font for '{}' not found at {}", lang, path.display());
                continue;
            }
            match load_font(path) {
                Ok(font) => {
                    info!(
                        "registered font '{}' for '{}'",
                        font.family().unwrap_or("unknown"),
                        lang
                    );
                    registry.insert(lang, font);
                }
                Err(err) => warn!("error registering font {}: {:#}", lang, err),
            }
        }
        if registry.is_empty() {
            warn!("no fonts registered; only Latin text can be drawn");
        }
        registry
    }

    pub fn insert(&mut self, lang: &str, font: LoadedFont) {
        self.fonts.insert(lang.trim().to_lowercase(), font);
    }

    /// Font for `lang`, else the `default` entry.
    pub fn font_for(&self, lang: &str) -> Option<&LoadedFont> {
        let lang = lang.trim().to_lowercase();
        self.fonts
            .get(&lang)
            .or_else(|| self.fonts.get(DEFAULT_FONT_KEY))
    }

    /// Language codes with a dedicated font, in code order.
    pub fn languages(&self) -> Vec<String> {
        self.fonts
            .keys()
            .filter(|key| key.as_str() != DEFAULT_FONT_KEY)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

pub fn load_font(path: &Path) -> Result<LoadedFont> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

pub fn load_font_from_data(data: Vec<u8>) -> Result<LoadedFont> {
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    let mut family = None;
    let mut parsed = false;
    for index in 0..count {
        if let Ok(face) = Face::parse(&data, index) {
            parsed = true;
            family = extract_family_name(&face);
            break;
        }
    }
    if !parsed {
        return Err(anyhow!("failed to parse font data"));
    }
    Ok(LoadedFont {
        data: Arc::new(data),
        family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_font(family: &str) -> LoadedFont {
        LoadedFont {
            data: Arc::new(Vec::new()),
            family: Some(family.to_string()),
        }
    }

    #[test]
    fn lookup_prefers_language_then_default() {
        let mut registry = FontRegistry::default();
        assert!(registry.font_for("hi").is_none());

        registry.insert("default", fake_font("Noto Sans"));
        registry.insert("HI", fake_font("Noto Sans Devanagari"));

        assert_eq!(registry.font_for("hi").and_then(LoadedFont::family), Some("Noto Sans Devanagari"));
        assert_eq!(registry.font_for("ta").and_then(LoadedFont::family), Some("Noto Sans"));
        assert_eq!(registry.languages(), vec!["hi".to_string()]);
    }

    #[test]
    fn missing_and_corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let corrupt = dir.path().join("broken.ttf");
        std::fs::write(&corrupt, b"not a font").unwrap();

        let mut table = BTreeMap::new();
        table.insert("hi".to_string(), corrupt.display().to_string());
        table.insert(
            "ta".to_string(),
            dir.path().join("missing.ttf").display().to_string(),
        );
        let registry = FontRegistry::load(&table);
        assert!(registry.is_empty());
    }

    #[test]
    fn loads_real_fonts_under_lowercased_codes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roboto.ttf");
        std::fs::write(&path, crate::test_util::ROBOTO).unwrap();

        let mut table = BTreeMap::new();
        table.insert(" RU ".to_string(), path.display().to_string());
        let registry = FontRegistry::load(&table);
        assert!(!registry.is_empty());
        assert_eq!(registry.languages(), vec!["ru".to_string()]);
        assert_eq!(registry.font_for("ru").and_then(LoadedFont::family), Some("Roboto"));
    }

    #[test]
    fn rejects_non_font_data() {
        assert!(load_font_from_data(b"garbage".to_vec()).is_err());
    }
}

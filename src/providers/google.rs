use anyhow::{Context, anyhow};
use serde_json::Value;

use super::{ProviderFuture, SpeechProvider, TranslationProvider};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client for the public Google Translate `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    endpoint: String,
    source_lang: String,
}

impl GoogleTranslate {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            source_lang: "auto".to_string(),
        }
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        let source_lang = source_lang.into();
        if !source_lang.trim().is_empty() {
            self.source_lang = source_lang;
        }
        self
    }
}

impl TranslationProvider for GoogleTranslate {
    fn translate(&self, text: String, target_lang: String) -> ProviderFuture<String> {
        let this = self.clone();
        Box::pin(async move {
            let response = this
                .client
                .get(&this.endpoint)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .query(&[
                    ("client", "gtx"),
                    ("sl", this.source_lang.as_str()),
                    ("tl", target_lang.as_str()),
                    ("dt", "t"),
                    ("q", text.as_str()),
                ])
                .send()
                .await
                .with_context(|| "failed to reach Google Translate")?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!("Google Translate error ({}): {}", status, body.trim()));
            }
            extract_translation(&body)
        })
    }
}

fn extract_translation(body: &str) -> anyhow::Result<String> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|err| anyhow!("failed to parse Google Translate response JSON: {}", err))?;
    let sentences = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("unexpected Google Translate response shape"))?;

    let mut translated = String::new();
    for sentence in sentences {
        if let Some(text) = sentence.get(0).and_then(Value::as_str) {
            translated.push_str(text);
        }
    }
    if translated.trim().is_empty() {
        return Err(anyhow!("Google Translate returned no text"));
    }
    Ok(translated)
}

/// Client for the Google Translate TTS endpoint, which returns MP3 audio.
#[derive(Debug, Clone)]
pub struct GoogleSpeech {
    client: reqwest::Client,
    endpoint: String,
    chunk_chars: usize,
}

impl GoogleSpeech {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            chunk_chars: 100,
        }
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        if chunk_chars > 0 {
            self.chunk_chars = chunk_chars;
        }
        self
    }
}

impl SpeechProvider for GoogleSpeech {
    fn synthesize(&self, text: String, lang: String) -> ProviderFuture<Vec<u8>> {
        let this = self.clone();
        Box::pin(async move {
            let chunks = split_speech_chunks(&text, this.chunk_chars);
            if chunks.is_empty() {
                return Err(anyhow!("no text to speak"));
            }
            let total = chunks.len().to_string();
            let mut audio = Vec::new();
            for (idx, chunk) in chunks.iter().enumerate() {
                let index = idx.to_string();
                let textlen = chunk.chars().count().to_string();
                let response = this
                    .client
                    .get(&this.endpoint)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .query(&[
                        ("ie", "UTF-8"),
                        ("client", "tw-ob"),
                        ("tl", lang.as_str()),
                        ("q", chunk.as_str()),
                        ("total", total.as_str()),
                        ("idx", index.as_str()),
                        ("textlen", textlen.as_str()),
                    ])
                    .send()
                    .await
                    .with_context(|| "failed to reach Google TTS")?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(anyhow!("Google TTS error ({}): {}", status, body.trim()));
                }
                let bytes = response
                    .bytes()
                    .await
                    .with_context(|| "failed to read Google TTS audio")?;
                audio.extend_from_slice(&bytes);
            }
            Ok(audio)
        })
    }
}

/// Splits `text` on whitespace into pieces of at most `max_chars` characters.
/// Words longer than the limit are cut at character boundaries.
pub(crate) fn split_speech_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars = word.chars().collect::<Vec<_>>();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_sentence_segments() {
        let body = r#"[[["नमस्ते ","Hello ",null,null,10],["दुनिया","world",null,null,10]],null,"en"]"#;
        assert_eq!(extract_translation(body).unwrap(), "नमस्ते दुनिया");
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert!(extract_translation(r#"{"error":"nope"}"#).is_err());
        assert!(extract_translation(r#"[[],null,"en"]"#).is_err());
        assert!(extract_translation("<html>").is_err());
    }

    #[test]
    fn speech_chunks_respect_the_limit() {
        let chunks = split_speech_chunks("one two three four", 9);
        assert_eq!(chunks, vec!["one two", "three", "four"]);
    }

    #[test]
    fn speech_chunks_split_long_words_and_skip_blank_text() {
        assert_eq!(split_speech_chunks("abcdefg hi", 3), vec!["abc", "def", "g", "hi"]);
        assert!(split_speech_chunks(" \n\t ", 100).is_empty());
    }

    #[test]
    fn speech_chunks_count_characters_not_bytes() {
        let text = "नमस्ते दुनिया";
        let chunks = split_speech_chunks(text, 100);
        assert_eq!(chunks, vec![text.to_string()]);
    }
}

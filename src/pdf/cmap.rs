use anyhow::{Context, Result};
use lopdf::Object;
use lopdf::content::Content;
use std::collections::BTreeMap;

/// Ranges wider than this are treated as corrupt and skipped.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// Character code to Unicode lookup parsed from a font's `/ToUnicode` CMap.
#[derive(Debug, Clone, Default)]
pub(crate) struct ToUnicodeMap {
    entries: BTreeMap<u32, String>,
}

impl ToUnicodeMap {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        let content =
            Content::decode(&strip_comments(data)).with_context(|| "failed to decode cmap")?;

        let mut entries = BTreeMap::new();
        for operation in &content.operations {
            match operation.operator.as_str() {
                "endbfchar" => {
                    for pair in operation.operands.chunks_exact(2) {
                        if let (Some(code), Some(text)) = (code_of(&pair[0]), text_of(&pair[1])) {
                            entries.insert(code, text);
                        }
                    }
                }
                "endbfrange" => {
                    for range in operation.operands.chunks_exact(3) {
                        let (Some(low), Some(high)) = (code_of(&range[0]), code_of(&range[1]))
                        else {
                            continue;
                        };
                        if high < low || high - low > MAX_RANGE_SPAN {
                            continue;
                        }
                        insert_range(&mut entries, low, high, &range[2]);
                    }
                }
                _ => {}
            }
        }
        Ok(Self { entries })
    }

    pub(crate) fn get(&self, code: u32) -> Option<&str> {
        self.entries.get(&code).map(String::as_str)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn insert_range(entries: &mut BTreeMap<u32, String>, low: u32, high: u32, target: &Object) {
    match target {
        Object::String(bytes, _) => {
            let mut units = utf16_units(bytes);
            let Some(last) = units.pop() else {
                return;
            };
            for (offset, code) in (low..=high).enumerate() {
                let mut current = units.clone();
                current.push(last.wrapping_add(offset as u16));
                entries.insert(code, String::from_utf16_lossy(&current));
            }
        }
        Object::Array(targets) => {
            for (code, target) in (low..=high).zip(targets) {
                if let Some(text) = text_of(target) {
                    entries.insert(code, text);
                }
            }
        }
        _ => {}
    }
}

/// The content parser has no notion of `%` comments, and PostScript
/// resource headers carry several of them.
fn strip_comments(data: &[u8]) -> Vec<u8> {
    let mut stripped = Vec::with_capacity(data.len());
    for line in data.split(|byte| *byte == b'\n' || *byte == b'\r') {
        if let Some(start) = line.iter().position(|byte| !byte.is_ascii_whitespace()) {
            if line[start] == b'%' {
                continue;
            }
        }
        stripped.extend_from_slice(line);
        stripped.push(b'\n');
    }
    stripped
}

fn code_of(object: &Object) -> Option<u32> {
    match object {
        Object::String(bytes, _) if !bytes.is_empty() && bytes.len() <= 4 => {
            Some(bytes.iter().fold(0u32, |code, byte| (code << 8) | *byte as u32))
        }
        _ => None,
    }
}

fn text_of(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) if !bytes.is_empty() => {
            Some(String::from_utf16_lossy(&utf16_units(bytes)))
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).to_string()),
        _ => None,
    }
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [high, low] => u16::from_be_bytes([*high, *low]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

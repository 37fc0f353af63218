use anyhow::{Context, Result, anyhow};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PDF_MIME: &str = "application/pdf";
pub const MP3_MIME: &str = "audio/mpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Document,
    Audio,
}

impl ArtifactKind {
    fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Document => "translated_",
            ArtifactKind::Audio => "translated_audio_",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Document => "pdf",
            ArtifactKind::Audio => "mp3",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ArtifactKind::Document => PDF_MIME,
            ArtifactKind::Audio => MP3_MIME,
        }
    }
}

/// Flat directory of generated documents and audio files.
///
/// Every artifact gets a fresh random name and is written through a temp
/// file that is linked into place without replacing an existing file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create downloads dir: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn persist(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.dir)
            .with_context(|| "failed to create artifact temp file")?;
        file.write_all(bytes)
            .with_context(|| "failed to write artifact")?;
        file.flush().with_context(|| "failed to flush artifact")?;

        let mut pending = file;
        loop {
            let name = artifact_name(kind);
            match pending.persist_noclobber(self.dir.join(&name)) {
                Ok(_) => return Ok(name),
                Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    pending = err.file;
                }
                Err(err) => {
                    return Err(anyhow!("failed to persist artifact {}: {}", name, err.error));
                }
            }
        }
    }

    /// Resolves a client-supplied artifact name to a path inside the store.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(anyhow!("invalid artifact name: {}", name));
        }
        Ok(self.dir.join(name))
    }
}

pub(crate) fn artifact_name(kind: ArtifactKind) -> String {
    let token: [u8; 8] = rand::random();
    let hex = token
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>();
    format!("{}{}.{}", kind.prefix(), hex, kind.extension())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

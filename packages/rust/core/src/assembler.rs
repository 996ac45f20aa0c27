//! Corpus output writer.
//!
//! Persists one JSON file per article, the validation report, and the run
//! manifest. Every file is written atomically (temp file, then rename) and
//! described by a [`FileEntry`] carrying its SHA-256 and size.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use papercorpus_shared::{
    Article, ChunkerConfig, CorpusError, Result, SectionFilterConfig, ValidationConfig,
};

/// File name of the run manifest, written next to the report.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Extension of persisted article records.
pub const ARTICLE_EXTENSION: &str = "json";

/// Checksum entry for one written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name relative to its directory.
    pub path: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Parameters a run was executed with.
#[derive(Debug, Clone, Serialize)]
pub struct RunParams {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub report_path: PathBuf,
    pub extension: String,
    pub concurrency: usize,
    pub filter: SectionFilterConfig,
    pub chunking: ChunkerConfig,
    pub validation: ValidationConfig,
}

/// `manifest.json`: what a run produced and with which parameters.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: String,
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub params: RunParams,
    pub articles: Vec<FileEntry>,
    pub report: FileEntry,
}

/// Path of the persisted record for `article_id`.
pub fn article_path(output_dir: &Path, article_id: &str) -> PathBuf {
    output_dir.join(format!("{article_id}.{ARTICLE_EXTENSION}"))
}

/// Path of the run manifest: beside the report, or in `.` for a bare file name.
pub fn manifest_path(report_path: &Path) -> PathBuf {
    report_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join(MANIFEST_FILE)
}

/// Write one article record.
#[instrument(skip_all, fields(article_id = %article.article_id))]
pub fn persist_article(output_dir: &Path, article: &Article) -> Result<FileEntry> {
    write_json_atomic(&article_path(output_dir, &article.article_id), article)
}

/// Serialize `data` as 4-space indented JSON and write it atomically.
///
/// Missing parent directories are created.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<FileEntry> {
    let mut bytes = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut serializer)?;
    bytes.push(b'\n');

    write_atomic(path, &bytes)
}

/// Write `bytes` to a hidden temp file beside `path`, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<FileEntry> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CorpusError::config(format!("invalid output path {}", path.display())))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| CorpusError::io(dir, e))?;

    let temp = dir.join(format!(".{file_name}.tmp"));
    std::fs::write(&temp, bytes).map_err(|e| CorpusError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| CorpusError::io(path, e))?;

    debug!(path = %path.display(), size = bytes.len(), "wrote file");

    Ok(FileEntry {
        path: file_name.to_string(),
        sha256: sha256_hex(bytes),
        size_bytes: bytes.len(),
    })
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use papercorpus_shared::{Chunk, ChunkId};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pc-assembler-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn article() -> Article {
        Article {
            article_id: "satiety".into(),
            title: vec!["Satiety".into()],
            doi: vec!["10.1000/sat".into()],
            authors: vec![],
            chunks: vec![Chunk {
                chunk_id: ChunkId::FIRST,
                section_title: "Introduction".into(),
                text: "Über-satiety is discussed.".into(),
                source_doi: Some("10.1000/sat".into()),
            }],
        }
    }

    #[test]
    fn persist_article_writes_record() {
        let tmp = temp_dir();
        let entry = persist_article(&tmp, &article()).unwrap();

        assert_eq!(entry.path, "satiety.json");
        let content = std::fs::read_to_string(tmp.join("satiety.json")).unwrap();
        assert_eq!(entry.size_bytes, content.len());
        assert!(content.contains("\n    \"article_id\": \"satiety\""));
        assert!(content.contains("Über-satiety"));

        let parsed: Article = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, article());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let tmp = temp_dir();
        write_atomic(&tmp.join("a.json"), b"{}").unwrap();
        write_atomic(&tmp.join("a.json"), b"[]").unwrap();

        let names: Vec<String> = std::fs::read_dir(&tmp)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json"]);
        assert_eq!(std::fs::read(tmp.join("a.json")).unwrap(), b"[]");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let tmp = temp_dir();
        let nested = tmp.join("data").join("validation_report.json");
        write_json_atomic(&nested, &serde_json::json!({"total_articles": 0})).unwrap();
        assert!(nested.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn checksum_matches_content() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let tmp = temp_dir();
        let entry = write_atomic(&tmp.join("abc.txt"), b"abc").unwrap();
        assert_eq!(entry.sha256, sha256_hex(b"abc"));
        assert_eq!(entry.size_bytes, 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manifest_sits_next_to_report() {
        assert_eq!(
            manifest_path(Path::new("data/validation_report.json")),
            PathBuf::from("data/manifest.json")
        );
        assert_eq!(
            manifest_path(Path::new("report.json")),
            PathBuf::from("./manifest.json")
        );
    }
}

//! JSONL records: one JSON record per line.
//!
//! Blank lines and `#` comments are skipped. NUL bytes and invalid UTF-8
//! mark the file as corrupt.

use assay_kernel::source::{DataSource, RecordStream, SourceContext};
use assay_kernel::{Record, SourceError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader as AsyncBufReader, Lines};
use tracing::debug;

fn parse_line(line_no: usize, line: &str) -> Result<Option<Record>, JsonlError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| JsonlError::Parse(line_no, e.to_string()))
}

/// A JSONL file opened lazily once per scoring run.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for JsonlSource {
    async fn open(&self) -> Result<Box<dyn SourceContext>, SourceError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| SourceError::Io(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "jsonl source opened");
        Ok(Box::new(JsonlContext {
            path: self.path.clone(),
            lines: Some(AsyncBufReader::new(file).lines()),
        }))
    }
}

struct JsonlContext {
    path: PathBuf,
    lines: Option<Lines<AsyncBufReader<tokio::fs::File>>>,
}

impl SourceContext for JsonlContext {
    fn stream(&mut self, features: Vec<String>) -> RecordStream<'_> {
        let Some(lines) = self.lines.take() else {
            let err = SourceError::Io(format!(
                "{}: stream already consumed for this run",
                self.path.display()
            ));
            return stream::once(async move { Err(err) }).boxed();
        };
        let cursor = Cursor {
            lines,
            line_no: 0,
            path: self.path.clone(),
            features,
        };
        // A failed line ends the stream.
        stream::unfold(Some(cursor), |cursor| async move {
            let mut cursor = cursor?;
            match cursor.next_record().await? {
                Ok(record) => Some((Ok(record), Some(cursor))),
                Err(err) => Some((Err(SourceError::from(err)), None)),
            }
        })
        .boxed()
    }
}

struct Cursor {
    lines: Lines<AsyncBufReader<tokio::fs::File>>,
    line_no: usize,
    path: PathBuf,
    features: Vec<String>,
}

impl Cursor {
    async fn next_record(&mut self) -> Option<Result<Record, JsonlError>> {
        loop {
            self.line_no += 1;
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Some(Err(JsonlError::Corrupt(format!(
                        "{}: line {}: contains non-UTF-8 byte sequence(s)",
                        self.path.display(),
                        self.line_no
                    ))));
                }
                Err(e) => {
                    return Some(Err(JsonlError::Io(
                        self.line_no,
                        format!("{}: {e}", self.path.display()),
                    )));
                }
            };
            if line.contains('\0') {
                return Some(Err(JsonlError::Corrupt(format!(
                    "{}: line {}: contains NUL byte(s)",
                    self.path.display(),
                    self.line_no
                ))));
            }
            match parse_line(self.line_no, &line) {
                Ok(Some(record)) => return Some(Ok(record.project(&self.features))),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("corrupted source: {0}")]
    Corrupt(String),
}

impl From<JsonlError> for SourceError {
    fn from(err: JsonlError) -> Self {
        match err {
            JsonlError::Io(line, message) => SourceError::Io(format!("line {line}: {message}")),
            JsonlError::Parse(line, message) => SourceError::Parse { line, message },
            JsonlError::Corrupt(message) => SourceError::Corrupt(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "assay-jsonl-{prefix}-{}-{unique}.jsonl",
            std::process::id()
        ))
    }

    fn write_fixture(path: &Path, records: &[Record]) {
        let body: String = records
            .iter()
            .map(|record| serde_json::to_string(record).expect("record should serialize") + "\n")
            .collect();
        fs::write(path, body).expect("fixture should write");
    }

    async fn collect(path: &Path, features: Vec<String>) -> Vec<Result<Record, SourceError>> {
        let source = JsonlSource::new(path);
        let mut context = source.open().await.expect("open");
        context.stream(features).collect().await
    }

    #[tokio::test]
    async fn source_skips_blank_and_comment_lines() {
        let path = temp_path("comments");
        fs::write(
            &path,
            "# header\n\n{\"key\":\"a\",\"features\":{\"x\":1.5}}\n   \n{\"key\":\"b\"}\n",
        )
        .expect("fixture should write");

        let records: Vec<Record> = collect(&path, vec!["x".to_string()])
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("records should parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].feature("x").and_then(|v| v.as_f64()), Some(1.5));
        assert!(records[1].features.is_empty());

        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn parse_error_reports_line_and_ends_stream() {
        let path = temp_path("parse");
        fs::write(&path, "{\"key\":\"a\"}\nnot json\n{\"key\":\"c\"}\n")
            .expect("fixture should write");

        let results = collect(&path, Vec::new()).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(SourceError::Parse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn source_rejects_nul_line() {
        let path = temp_path("nul");
        fs::write(&path, b"{\"key\":\"a\"}\n\0garbage\n").expect("fixture should write");

        let results = collect(&path, Vec::new()).await;
        assert_eq!(results.len(), 2);
        match &results[1] {
            Err(SourceError::Corrupt(message)) => assert!(message.contains("contains NUL")),
            other => panic!("expected corrupt source error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn source_streams_projected_records() {
        let path = temp_path("stream");
        write_fixture(
            &path,
            &[
                Record::new("a").with_feature("x", 1.0).with_feature("y", 2.0),
                Record::new("b").with_feature("x", 3.0).with_feature("y", 4.0),
            ],
        );

        let source = JsonlSource::new(&path);
        let mut context = source.open().await.expect("open");
        let streamed: Vec<Record> = context
            .stream(vec!["y".to_string()])
            .try_collect()
            .await
            .expect("stream");
        assert_eq!(streamed.len(), 2);
        assert_eq!(streamed[1].key, "b");
        assert!(streamed.iter().all(|r| r.feature("x").is_none()));

        let again: Result<Vec<Record>, SourceError> =
            context.stream(vec!["y".to_string()]).try_collect().await;
        assert!(matches!(again, Err(SourceError::Io(_))));

        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn source_rejects_non_utf8_line() {
        let path = temp_path("non-utf8");
        fs::write(&path, b"{\"key\":\"a\"}\n\xff\xfe\xfd\n").expect("fixture should write");

        let results = collect(&path, Vec::new()).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(SourceError::Corrupt(message)) => assert!(message.contains("non-UTF-8")),
            other => panic!("expected corrupt source error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn open_missing_file_is_io_error() {
        let source = JsonlSource::new(temp_path("missing"));
        assert!(matches!(source.open().await, Err(SourceError::Io(_))));
    }
}

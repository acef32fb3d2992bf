// src/storage/csv.rs

//! CSV output: one row per detail page.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::ExtractionResult;
use crate::storage::{ResultSink, WriteMetadata};

/// Column order of the output file.
pub const HEADER: [&str; 4] = ["municipality", "mayor_name", "emails", "source_url"];

const SEP: char = ',';

/// Writes results to a CSV file, replacing it atomically.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Serialize rows, header first.
pub fn render(results: &[ExtractionResult]) -> String {
    let mut out = String::new();
    write_row(&mut out, HEADER.iter().copied());
    for result in results {
        let emails = result.joined_emails();
        write_row(
            &mut out,
            [
                result.municipality_name.as_str(),
                result.mayor_name.as_str(),
                emails.as_str(),
                result.source_url.as_str(),
            ],
        );
    }
    out
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<'a>(out: &mut String, row: impl IntoIterator<Item = &'a str>) {
    for (idx, cell) in row.into_iter().enumerate() {
        if idx > 0 {
            out.push(SEP);
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn write_results(&self, results: &[ExtractionResult]) -> Result<WriteMetadata> {
        let body = render(results);
        self.write_bytes(body.as_bytes()).await?;
        log::info!("Wrote {} rows to {}", results.len(), self.path.display());

        Ok(WriteMetadata {
            rows: results.len(),
            location: self.path.display().to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Strategy;

    fn row(name: &str, mayor: &str, emails: &[&str], url: &str) -> ExtractionResult {
        ExtractionResult::new(
            name,
            mayor,
            emails.iter().map(|e| e.to_string()),
            url,
            Some(Strategy::PageMailto),
        )
    }

    #[test]
    fn test_render_quotes_and_joins() {
        let results = vec![
            row("Община Банско", "Иван Иванов", &["z@x.bg", "a@x.bg"], "https://x.bg/1"),
            row("Община \"Белово\", област Пазарджик", "", &[], "https://x.bg/2"),
        ];

        let text = render(&results);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "municipality,mayor_name,emails,source_url");
        assert_eq!(lines[1], "Община Банско,Иван Иванов,a@x.bg; z@x.bg,https://x.bg/1");
        assert_eq!(
            lines[2],
            "\"Община \"\"Белово\"\", област Пазарджик\",,,https://x.bg/2"
        );
    }

    #[test]
    fn test_render_empty_has_header_only() {
        assert_eq!(render(&[]), "municipality,mayor_name,emails,source_url\n");
    }

    #[tokio::test]
    async fn test_write_results_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("mayors.csv");
        let sink = CsvSink::new(&path);

        sink.write_results(&[row("A", "", &["a@x.bg"], "u1")]).await.unwrap();
        let meta = sink
            .write_results(&[row("B", "", &[], "u2"), row("C", "", &[], "u3")])
            .await
            .unwrap();

        assert_eq!(meta.rows, 2);
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("B,,,u2"));
        assert!(!text.contains("a@x.bg"));
        assert!(!path.with_extension("tmp").exists());
    }
}

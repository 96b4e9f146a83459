//! File-backed operations journal.
//!
//! A journal is a directory of markdown documents plus a `notes/`
//! subdirectory of timestamped notes. Registering a scraper appends to
//! the source log and drops a note, and the stats/report operations
//! read those files back. Everything is plain files so the journal can
//! be read and edited without the service.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// Document the source log lives in.
pub const SOURCES_DOC: &str = "sources.md";
/// Subdirectory holding timestamped notes.
pub const NOTES_DIR: &str = "notes";
/// Where [`Journal::status_report`] persists its output.
pub const REPORT_DOC: &str = "status_report.json";

/// One source parsed back out of the source log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    pub date_added: String,
}

/// Summary of every source the journal has seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperStats {
    pub total_scrapers: usize,
    pub scrapers: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalStatus {
    pub total_documents: usize,
    pub total_notes: usize,
}

/// Point-in-time health snapshot, also written to [`REPORT_DOC`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub journal_status: JournalStatus,
    pub scraper_stats: ScraperStats,
}

/// Handle on a journal directory. Cheap to clone; all state is on disk.
#[derive(Debug, Clone)]
pub struct Journal {
    root: PathBuf,
}

impl Journal {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Markdown documents at the journal root, sorted by name. A journal
    /// directory that does not exist yet is an empty journal.
    pub fn list_documents(&self) -> Result<Vec<String>, ScrapeError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ScrapeError::JournalError(format!(
                    "cannot list {}: {e}",
                    self.root.display()
                )));
            }
        };
        let mut documents = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ScrapeError::JournalError(format!("cannot list {}: {e}", self.root.display()))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".md") && entry.path().is_file() {
                documents.push(name);
            }
        }
        documents.sort_unstable();
        Ok(documents)
    }

    pub fn document_exists(&self, name: &str) -> bool {
        self.checked_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    pub fn read_document(&self, name: &str) -> Result<String, ScrapeError> {
        let path = self.checked_path(name)?;
        std::fs::read_to_string(&path).map_err(|e| {
            ScrapeError::JournalError(format!("cannot read document `{name}`: {e}"))
        })
    }

    /// Create or overwrite a document.
    pub fn write_document(&self, name: &str, content: &str) -> Result<(), ScrapeError> {
        let path = self.checked_path(name)?;
        self.ensure_dir(&self.root)?;
        std::fs::write(&path, content).map_err(|e| {
            ScrapeError::JournalError(format!("cannot write document `{name}`: {e}"))
        })
    }

    /// Append to a document, creating it if needed.
    pub fn append_document(&self, name: &str, content: &str) -> Result<(), ScrapeError> {
        let path = self.checked_path(name)?;
        self.ensure_dir(&self.root)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ScrapeError::JournalError(format!("cannot open document `{name}`: {e}"))
            })?;
        file.write_all(content.as_bytes()).map_err(|e| {
            ScrapeError::JournalError(format!("cannot append to document `{name}`: {e}"))
        })
    }

    /// Log a source into [`SOURCES_DOC`] as a dated `##` block. The
    /// block format is what [`scraper_stats`](Self::scraper_stats)
    /// parses back.
    pub fn record_source(
        &self,
        name: &str,
        url: &str,
        description: &str,
    ) -> Result<(), ScrapeError> {
        let date = Utc::now().format("%Y-%m-%d");
        let block = format!(
            "\n## {name}\n- URL: {url}\n- Description: {description}\n- Added: {date}\n"
        );
        self.append_document(SOURCES_DOC, &block)
    }

    /// Drop a timestamped note under [`NOTES_DIR`] and return its file
    /// name. The file stem is the lowercased title with whitespace
    /// collapsed to underscores.
    pub fn create_note(&self, title: &str, content: &str) -> Result<String, ScrapeError> {
        let stem: String = title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .filter(|c| *c != '/' && *c != '\\' && *c != '.')
            .collect();
        if stem.is_empty() {
            return Err(ScrapeError::JournalError(format!(
                "note title `{title}` has no usable characters"
            )));
        }
        let notes_dir = self.root.join(NOTES_DIR);
        self.ensure_dir(&notes_dir)?;
        let file_name = format!("{stem}_{}.md", Utc::now().timestamp_millis());
        let created = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = format!("# {title}\n\nCreated: {created}\n\n{content}");
        std::fs::write(notes_dir.join(&file_name), body).map_err(|e| {
            ScrapeError::JournalError(format!("cannot write note `{file_name}`: {e}"))
        })?;
        Ok(file_name)
    }

    /// Parse the source log back into a summary. A journal without a
    /// source log has zero scrapers.
    pub fn scraper_stats(&self) -> Result<ScraperStats, ScrapeError> {
        if !self.document_exists(SOURCES_DOC) {
            return Ok(ScraperStats {
                total_scrapers: 0,
                scrapers: Vec::new(),
            });
        }
        let content = self.read_document(SOURCES_DOC)?;
        let mut scrapers: Vec<SourceEntry> = Vec::new();
        for line in content.lines() {
            if let Some(heading) = line.strip_prefix("## ") {
                scrapers.push(SourceEntry {
                    name: heading.trim().to_string(),
                    url: "N/A".to_string(),
                    date_added: "N/A".to_string(),
                });
            } else if let Some(entry) = scrapers.last_mut() {
                if let Some(url) = line.strip_prefix("- URL:") {
                    entry.url = url.trim().to_string();
                } else if let Some(date) = line.strip_prefix("- Added:") {
                    entry.date_added = date.trim().to_string();
                }
            }
        }
        Ok(ScraperStats {
            total_scrapers: scrapers.len(),
            scrapers,
        })
    }

    /// Build the status snapshot, persist it to [`REPORT_DOC`], and
    /// return it.
    pub fn status_report(&self) -> Result<StatusReport, ScrapeError> {
        let documents = self.list_documents()?;
        let report = StatusReport {
            generated_at: Utc::now(),
            journal_status: JournalStatus {
                total_documents: documents.len(),
                total_notes: self.count_notes()?,
            },
            scraper_stats: self.scraper_stats()?,
        };
        let json = serde_json::to_string_pretty(&report)?;
        self.write_document(REPORT_DOC, &json)?;
        Ok(report)
    }

    fn count_notes(&self) -> Result<usize, ScrapeError> {
        let notes_dir = self.root.join(NOTES_DIR);
        let entries = match std::fs::read_dir(&notes_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(ScrapeError::JournalError(format!(
                    "cannot list {}: {e}",
                    notes_dir.display()
                )));
            }
        };
        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| {
                ScrapeError::JournalError(format!("cannot list {}: {e}", notes_dir.display()))
            })?;
            if entry.file_name().to_string_lossy().ends_with(".md") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Document names stay inside the journal root: no separators, no
    /// traversal components.
    fn checked_path(&self, name: &str) -> Result<PathBuf, ScrapeError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ScrapeError::JournalError(format!(
                "invalid document name `{name}`"
            )));
        }
        Ok(self.root.join(name))
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), ScrapeError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            ScrapeError::JournalError(format!("cannot create {}: {e}", dir.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_journal() -> (tempfile::TempDir, Journal) {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path());
        (dir, journal)
    }

    #[test]
    fn test_write_read_append_round_trip() {
        let (_dir, journal) = temp_journal();

        journal.write_document("context.md", "# Context\n").unwrap();
        journal.append_document("context.md", "More.\n").unwrap();

        assert_eq!(journal.read_document("context.md").unwrap(), "# Context\nMore.\n");
    }

    #[test]
    fn test_list_documents_sorted_markdown_only() {
        let (dir, journal) = temp_journal();
        journal.write_document("zebra.md", "z").unwrap();
        journal.write_document("alpha.md", "a").unwrap();
        std::fs::write(dir.path().join("data.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join(NOTES_DIR)).unwrap();

        assert_eq!(journal.list_documents().unwrap(), ["alpha.md", "zebra.md"]);
    }

    #[test]
    fn test_fresh_journal_is_empty_not_an_error() {
        let journal = Journal::new("/tmp/argus-journal-test-does-not-exist");
        assert!(journal.list_documents().unwrap().is_empty());
        assert_eq!(journal.scraper_stats().unwrap().total_scrapers, 0);
    }

    #[test]
    fn test_record_source_round_trips_through_stats() {
        let (_dir, journal) = temp_journal();
        journal
            .record_source("Bounos", "https://bounos.example.com/props", "Rental listings")
            .unwrap();
        journal
            .record_source("Mallemacci", "https://mallemaci.example.com/listing", "Rentals")
            .unwrap();

        let stats = journal.scraper_stats().unwrap();

        assert_eq!(stats.total_scrapers, 2);
        assert_eq!(stats.scrapers[0].name, "Bounos");
        assert_eq!(stats.scrapers[0].url, "https://bounos.example.com/props");
        assert_ne!(stats.scrapers[0].date_added, "N/A");
    }

    #[test]
    fn test_create_note_names_and_formats_the_file() {
        let (dir, journal) = temp_journal();

        let file_name = journal
            .create_note("New Scraper: Bounos", "Registered today.")
            .unwrap();

        assert!(file_name.starts_with("new_scraper:_bounos_"));
        assert!(file_name.ends_with(".md"));
        let body = std::fs::read_to_string(dir.path().join(NOTES_DIR).join(&file_name)).unwrap();
        assert!(body.starts_with("# New Scraper: Bounos\n\nCreated: "));
        assert!(body.ends_with("Registered today."));
    }

    #[test]
    fn test_status_report_counts_and_persists() {
        let (dir, journal) = temp_journal();
        journal.write_document("context.md", "ctx").unwrap();
        journal
            .record_source("Solo", "https://solo.example.com/l", "One source")
            .unwrap();
        journal.create_note("first", "note body").unwrap();

        let report = journal.status_report().unwrap();

        // context.md + sources.md
        assert_eq!(report.journal_status.total_documents, 2);
        assert_eq!(report.journal_status.total_notes, 1);
        assert_eq!(report.scraper_stats.total_scrapers, 1);
        let persisted = std::fs::read_to_string(dir.path().join(REPORT_DOC)).unwrap();
        assert!(persisted.contains("\"journalStatus\""));
        assert!(persisted.contains("\"totalScrapers\": 1"));
        // the report itself is not a markdown document
        assert_eq!(journal.list_documents().unwrap().len(), 2);
    }

    #[test]
    fn test_traversal_names_are_rejected() {
        let (_dir, journal) = temp_journal();
        for name in ["../escape.md", "a/b.md", "a\\b.md", "..", ""] {
            assert!(
                journal.read_document(name).is_err(),
                "`{name}` must be rejected"
            );
            assert!(journal.write_document(name, "x").is_err());
            assert!(!journal.document_exists(name));
        }
    }

    #[test]
    fn test_read_missing_document_is_a_journal_error() {
        let (_dir, journal) = temp_journal();
        let error = journal.read_document("absent.md").unwrap_err();
        assert!(matches!(error, ScrapeError::JournalError(_)));
    }
}

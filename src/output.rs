use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use biblatex::Bibliography;
use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::record::PaperRecord;

/// `notes_{label}_{YYYY-MM-DD_HH-MM-SS}.json`, e.g. `notes_ACL2024_long_2025-01-31_09-05-00.json`.
pub fn default_file_name(label: &str, now: DateTime<Local>) -> String {
    format!("notes_{label}_{}.json", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write the records as one pretty-printed JSON array.
///
/// The file is written next to its destination first and renamed into place, so an
/// interrupted write never leaves a truncated array behind.
pub fn write_records(path: &Path, records: &[PaperRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records).context("serialising records")?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json + "\n").with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("moving output to {}", path.display()))?;
    debug!(path = %path.display(), records = records.len(), "wrote output");
    Ok(())
}

pub fn read_records(path: &Path) -> anyhow::Result<Vec<PaperRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BibExport {
    /// Entries joined by blank lines, newline terminated.
    pub text: String,
    pub entries: usize,
    pub duplicates: usize,
    pub invalid: usize,
    /// Records without any citation text.
    pub missing: usize,
}

/// Collect the citation text of every record that parses as BibTeX, dropping entries
/// whose key was already exported. The text of kept entries is copied unchanged.
pub fn export_bibtex(records: &[PaperRecord]) -> BibExport {
    let mut out = BibExport::default();
    let mut seen = HashSet::new();
    let mut blocks = Vec::new();

    for rec in records {
        let Some(text) = rec.citation_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            out.missing += 1;
            continue;
        };
        let bib = match Bibliography::parse(text) {
            Ok(bib) => bib,
            Err(e) => {
                warn!(link = %rec.link, error = %e, "dropping unparseable citation");
                out.invalid += 1;
                continue;
            }
        };
        let keys: Vec<String> = bib.iter().map(|e| e.key.clone()).collect();
        if keys.is_empty() {
            warn!(link = %rec.link, "citation holds no BibTeX entry");
            out.invalid += 1;
            continue;
        }
        if keys.iter().any(|k| seen.contains(k)) {
            debug!(link = %rec.link, keys = ?keys, "duplicate citation key");
            out.duplicates += 1;
            continue;
        }
        seen.extend(keys.iter().cloned());
        out.entries += keys.len();
        blocks.push(text.to_string());
    }

    if !blocks.is_empty() {
        out.text = blocks.join("\n\n") + "\n";
    }
    out
}

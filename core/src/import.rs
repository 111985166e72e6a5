//! Bulk loading of tab-delimited posting records into a [`SledStore`].
//!
//! Each line holds `word, url, max tf, euclidean tf, word count, link count, meta tag count,
//! header count`. Malformed lines are logged and skipped; they never abort an import.

use crate::posting::Posting;
use crate::store::SledStore;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Non-blank lines read.
    pub lines: u64,
    pub imported: u64,
    pub skipped: u64,
    /// Distinct urls seen by this import.
    pub documents: u64,
}

struct Importer<'a> {
    store: &'a SledStore,
    batch_size: usize,
    batch: Vec<Posting>,
    seen_urls: HashSet<String>,
    stats: ImportStats,
}

impl<'a> Importer<'a> {
    fn new(store: &'a SledStore, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self { store, batch_size, batch: Vec::with_capacity(batch_size), seen_urls: HashSet::new(), stats: ImportStats::default() }
    }

    fn read<R: BufRead>(&mut self, reader: R, source: &str) -> Result<()> {
        for (idx, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading {source}"))?;
            if line.trim().is_empty() {
                continue;
            }
            self.stats.lines += 1;
            match Posting::from_tsv_line(&line) {
                Ok(posting) => {
                    self.seen_urls.insert(posting.url.clone());
                    self.batch.push(posting);
                    if self.batch.len() >= self.batch_size {
                        self.flush_batch()?;
                    }
                }
                Err(e) => {
                    self.stats.skipped += 1;
                    tracing::warn!(source, line = idx + 1, error = %e, "skipping malformed posting record");
                }
            }
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.store.insert_batch(&self.batch)?;
        self.stats.imported += self.batch.len() as u64;
        self.batch.clear();
        tracing::info!(imported = self.stats.imported, lines = self.stats.lines, "imported posting batch");
        Ok(())
    }

    fn finish(mut self) -> Result<ImportStats> {
        self.flush_batch()?;
        self.stats.documents = self.seen_urls.len() as u64;
        Ok(self.stats)
    }
}

/// Import every record of `reader` in batches of `batch_size`.
pub fn import_postings<R: BufRead>(reader: R, store: &SledStore, batch_size: usize) -> Result<ImportStats> {
    let mut importer = Importer::new(store, batch_size);
    importer.read(reader, "<reader>")?;
    importer.finish()
}

/// Import a single file, or every `.tsv`/`.txt` file below a directory.
pub fn import_path<P: AsRef<Path>>(path: P, store: &SledStore, batch_size: usize) -> Result<ImportStats> {
    let files = collect_sources(path.as_ref())?;
    let mut importer = Importer::new(store, batch_size);
    for file in files {
        let source = file.display().to_string();
        let f = File::open(&file).with_context(|| format!("opening {source}"))?;
        tracing::info!(%source, "importing postings");
        importer.read(BufReader::new(f), &source)?;
    }
    importer.finish()
}

fn collect_sources(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("import source {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("tsv" | "txt")))
        .collect();
    files.sort();
    Ok(files)
}

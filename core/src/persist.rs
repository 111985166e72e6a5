use crate::store::SledStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub corpus_size: u32,
    pub num_postings: u64,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn now(corpus_size: u32, num_postings: u64) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { corpus_size, num_postings, created_at, version: META_VERSION }
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn postings_db(&self) -> PathBuf { self.root.join("postings.sled") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Open (or create) the posting database of an index directory.
pub fn open_store(paths: &IndexPaths) -> Result<SledStore> {
    create_dir_all(&paths.root)?;
    let db = paths.postings_db();
    SledStore::open(&db).with_context(|| format!("opening posting store at {}", db.display()))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Meta file if the index has one. A missing file is not an error.
pub fn try_load_meta(paths: &IndexPaths) -> Result<Option<MetaFile>> {
    if !paths.meta().exists() {
        return Ok(None);
    }
    load_meta(paths).map(Some)
}

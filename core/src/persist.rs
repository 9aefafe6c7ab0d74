use crate::index::InvertedIndex;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write the index and its meta file. The index file is written to a temporary
/// name first and renamed, so a reader never sees a truncated index.bin.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let tmp = paths.root.join("index.bin.tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut w, index)?;
        w.flush()?;
    }
    std::fs::rename(&tmp, paths.index())?;

    let meta = MetaFile {
        num_docs: index.num_docs(),
        num_terms: index.num_terms(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        bail!("index at {} has format version {}, expected {}", paths.root.display(), meta.version, FORMAT_VERSION);
    }
    let f = File::open(paths.index()).with_context(|| format!("opening {}", paths.index().display()))?;
    let index: InvertedIndex = bincode::deserialize_from(BufReader::new(f))?;
    tracing::info!(root = %paths.root.display(), num_docs = index.num_docs(), "index loaded");
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Document;

    #[test]
    fn saved_index_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let doc = Document {
            id: "p1".into(),
            title: "Canvas Tote Bag".into(),
            description: "roomy".into(),
            brand: "Acme".into(),
            category: "Bags".into(),
            sub_category: String::new(),
            price: Some(15.0),
            rating: None,
            url: None,
        };
        save_index(&paths, &InvertedIndex::build(vec![doc.clone()])).unwrap();

        let loaded = load_index(&paths).unwrap();
        assert_eq!(loaded.num_docs(), 1);
        assert_eq!(**loaded.document("p1").unwrap(), doc);
        assert!(loaded.postings("tote").is_some());
        assert_eq!(load_meta(&paths).unwrap().version, FORMAT_VERSION);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &InvertedIndex::default()).unwrap();
        save_meta(&paths, &MetaFile { num_docs: 0, num_terms: 0, created_at: String::new(), version: 1 }).unwrap();
        assert!(load_index(&paths).is_err());
    }
}

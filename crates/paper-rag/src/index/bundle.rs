//! On-disk index bundle
//!
//! A bundle is a directory holding four co-located artifacts:
//!
//! - `vectors.npy`: `count × dim` f32 matrix, row `i` belongs to `ids[i]`
//! - `ids.json`: chunk ids in row order
//! - `docstore.jsonl`: one [`PassageMeta`] per line
//! - `stats.json`: [`IndexStats`]
//!
//! Bundles are staged in a sibling temporary directory and swapped into
//! place, so a reader sees either the previous bundle or the new one.

use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::flat::{FlatIpIndex, VectorIndex};
use crate::error::{Error, Result};
use crate::ingestion::{parent_dir, JsonlReader};
use crate::types::PassageMeta;

pub const VECTORS_FILE: &str = "vectors.npy";
pub const IDS_FILE: &str = "ids.json";
pub const DOCSTORE_FILE: &str = "docstore.jsonl";
pub const STATS_FILE: &str = "stats.json";

/// Summary stored alongside the vectors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of vectors
    pub count: usize,
    /// Vector dimension
    pub dim: usize,
    /// Whether vectors were L2-normalized; queries must match
    pub normalize: bool,
    /// Embedding model identity, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Vectors, ids and per-passage metadata, positionally aligned
#[derive(Debug, Clone)]
pub struct IndexBundle {
    index: FlatIpIndex,
    ids: Vec<String>,
    metas: Vec<PassageMeta>,
    stats: IndexStats,
}

impl IndexBundle {
    /// Assemble a bundle, checking that all parts line up
    pub fn new(index: FlatIpIndex, metas: Vec<PassageMeta>, normalize: bool, model: Option<String>) -> Result<Self> {
        if index.len() != metas.len() {
            return Err(Error::vector_index(format!(
                "{} vectors for {} passages",
                index.len(),
                metas.len()
            )));
        }
        let ids: Vec<String> = metas.iter().map(|m| m.chunk_id.clone()).collect();
        if let Some(dup) = first_duplicate(ids.iter().map(String::as_str)) {
            return Err(Error::vector_index(format!("duplicate chunk id '{}'", dup)));
        }
        let stats = IndexStats {
            count: index.len(),
            dim: index.dim(),
            normalize,
            model,
        };
        Ok(Self { index, ids, metas, stats })
    }

    pub fn index(&self) -> &FlatIpIndex {
        &self.index
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Metadata for the vector at `position`
    pub fn meta(&self, position: usize) -> Option<&PassageMeta> {
        self.metas.get(position)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Write the bundle to `dir`, replacing whatever was there
    pub fn save(&self, dir: &Path) -> Result<()> {
        let parent = parent_dir(dir);
        fs::create_dir_all(&parent)?;

        let staging = tempfile::Builder::new()
            .prefix(".bundle-staging-")
            .tempdir_in(&parent)?;
        self.write_artifacts(staging.path())?;
        let staged = staging.keep();

        if let Err(e) = swap_into_place(&staged, dir) {
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }
        tracing::info!(
            "Index bundle saved: {} vectors, dim={}, dir={}",
            self.stats.count,
            self.stats.dim,
            dir.display()
        );
        Ok(())
    }

    fn write_artifacts(&self, dir: &Path) -> Result<()> {
        write_npy(dir.join(VECTORS_FILE), self.index.vectors())
            .map_err(|e| Error::vector_index(format!("failed to write {}: {}", VECTORS_FILE, e)))?;

        write_json(&dir.join(IDS_FILE), &self.ids)?;

        let mut docstore = BufWriter::new(File::create(dir.join(DOCSTORE_FILE))?);
        for meta in &self.metas {
            serde_json::to_writer(&mut docstore, meta)?;
            docstore.write_all(b"\n")?;
        }
        docstore.flush()?;

        write_json(&dir.join(STATS_FILE), &self.stats)
    }

    /// Load and validate a bundle. Any missing, unreadable or inconsistent
    /// artifact is reported as [`Error::IndexLoad`].
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::index_load(dir, "index directory not found"));
        }
        for name in [VECTORS_FILE, IDS_FILE, DOCSTORE_FILE, STATS_FILE] {
            if !dir.join(name).is_file() {
                return Err(Error::index_load(dir, format!("missing {}", name)));
            }
        }

        let stats: IndexStats = read_json(dir, STATS_FILE)?;
        let ids: Vec<String> = read_json(dir, IDS_FILE)?;
        let vectors: Array2<f32> = read_npy(dir.join(VECTORS_FILE))
            .map_err(|e| Error::index_load(dir, format!("unreadable {}: {}", VECTORS_FILE, e)))?;

        let mut by_id: HashMap<String, PassageMeta> = HashMap::with_capacity(ids.len());
        let docstore = JsonlReader::<PassageMeta>::open(dir.join(DOCSTORE_FILE))
            .map_err(|e| Error::index_load(dir, format!("unreadable {}: {}", DOCSTORE_FILE, e)))?;
        for record in docstore {
            let meta = record.map_err(|e| Error::index_load(dir, format!("bad {}: {}", DOCSTORE_FILE, e)))?;
            by_id.insert(meta.chunk_id.clone(), meta);
        }

        if stats.count != ids.len() || stats.count != vectors.nrows() {
            return Err(Error::index_load(
                dir,
                format!(
                    "count mismatch: stats={}, ids={}, vectors={}",
                    stats.count,
                    ids.len(),
                    vectors.nrows()
                ),
            ));
        }
        if stats.dim != vectors.ncols() {
            return Err(Error::index_load(
                dir,
                format!("dim mismatch: stats={}, vectors={}", stats.dim, vectors.ncols()),
            ));
        }
        if let Some(dup) = first_duplicate(ids.iter().map(String::as_str)) {
            return Err(Error::index_load(dir, format!("duplicate chunk id '{}'", dup)));
        }

        let mut metas = Vec::with_capacity(ids.len());
        for id in &ids {
            let meta = by_id
                .remove(id)
                .ok_or_else(|| Error::index_load(dir, format!("chunk id '{}' missing from docstore", id)))?;
            metas.push(meta);
        }

        Ok(Self {
            index: FlatIpIndex::from_matrix(vectors),
            ids,
            metas,
            stats,
        })
    }
}

/// First id that repeats an earlier one
pub(super) fn first_duplicate<'a, I>(ids: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, value)?;
    out.flush()?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let file = File::open(dir.join(name))
        .map_err(|e| Error::index_load(dir, format!("unreadable {}: {}", name, e)))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::index_load(dir, format!("bad {}: {}", name, e)))
}

/// Replace `target` with `staged`, keeping the old directory until the new
/// one is in place
fn swap_into_place(staged: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        fs::rename(staged, target)?;
        return Ok(());
    }

    let backup = backup_path(target);
    fs::rename(target, &backup)?;
    if let Err(e) = fs::rename(staged, target) {
        let _ = fs::rename(&backup, target);
        return Err(e.into());
    }
    if let Err(e) = fs::remove_dir_all(&backup) {
        tracing::warn!("Failed to remove old bundle {}: {}", backup.display(), e);
    }
    Ok(())
}

fn backup_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    parent_dir(target).join(format!(".{}.old-{}", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaperMeta;
    use ndarray::array;

    fn meta(id: &str, title: &str) -> PassageMeta {
        PassageMeta {
            chunk_id: id.to_string(),
            doc_id: "d".to_string(),
            paper: PaperMeta {
                title: title.to_string(),
                ..Default::default()
            },
        }
    }

    fn bundle() -> IndexBundle {
        let index = FlatIpIndex::from_matrix(array![[1.0, 0.0], [0.0, 1.0]]);
        IndexBundle::new(index, vec![meta("d_0", "A"), meta("d_1000", "B")], true, Some("hashing:2".into()))
            .unwrap()
    }

    #[test]
    fn test_save_load_preserves_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("flat");
        bundle().save(&target).unwrap();

        let loaded = IndexBundle::load(&target).unwrap();
        assert_eq!(loaded.stats(), bundle().stats());
        assert_eq!(loaded.ids(), &["d_0".to_string(), "d_1000".to_string()]);
        assert_eq!(loaded.meta(1).unwrap().title(), "B");
        assert_eq!(loaded.index().vectors(), bundle().index().vectors());

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(target.join(STATS_FILE)).unwrap()).unwrap();
        assert_eq!(stats["count"], 2);
        assert_eq!(stats["normalize"], true);
    }

    #[test]
    fn test_save_replaces_previous_bundle_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("flat");
        bundle().save(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        let index = FlatIpIndex::from_matrix(array![[0.5, 0.5]]);
        IndexBundle::new(index, vec![meta("e_0", "C")], false, None)
            .unwrap()
            .save(&target)
            .unwrap();

        assert!(!target.join("stale.txt").exists());
        let loaded = IndexBundle::load(&target).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.stats().model, None);

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_new_rejects_duplicates_and_misalignment() {
        let index = FlatIpIndex::from_matrix(array![[1.0], [2.0]]);
        assert!(IndexBundle::new(index.clone(), vec![meta("x", ""), meta("x", "")], true, None).is_err());
        assert!(IndexBundle::new(index, vec![meta("x", "")], true, None).is_err());
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexBundle::load(&dir.path().join("absent")).unwrap_err();
        assert!(err.is_index_load());
    }

    #[test]
    fn test_load_detects_inconsistency() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("flat");

        bundle().save(&target).unwrap();
        fs::write(target.join(IDS_FILE), r#"["d_0"]"#).unwrap();
        assert!(IndexBundle::load(&target).unwrap_err().is_index_load());

        bundle().save(&target).unwrap();
        fs::write(target.join(IDS_FILE), r#"["d_0", "nope"]"#).unwrap();
        assert!(IndexBundle::load(&target).unwrap_err().is_index_load());

        bundle().save(&target).unwrap();
        fs::write(target.join(STATS_FILE), r#"{"count": 2, "dim": 3, "normalize": true}"#).unwrap();
        assert!(IndexBundle::load(&target).unwrap_err().is_index_load());

        bundle().save(&target).unwrap();
        fs::remove_file(target.join(DOCSTORE_FILE)).unwrap();
        assert!(IndexBundle::load(&target).unwrap_err().is_index_load());
    }
}

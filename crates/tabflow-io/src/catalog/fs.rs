//! Filesystem catalog.
//!
//! Layout under the root directory:
//!
//! ```text
//! datasets/<name>.{csv,jsonl,json}
//! views/<name>.{csv,jsonl,json}
//! pricelists/<name>/v<N>.{csv,jsonl,json}   versioned
//! pricelists/<name>.{csv,jsonl,json}        unversioned, read as version 1
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tabflow_core::dag::EntityType;
use tabflow_core::fetch::{FetchError, FetchRequest, TableFetcher};
use tabflow_core::table::Table;

use super::{not_found, resolve_version};
use crate::readers::{read_path, EXTENSIONS};

#[derive(Debug, Clone)]
pub struct FsCatalog {
    root: PathBuf,
}

impl FsCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<dir>/<stem>.<ext>` for the first supported extension that exists.
    fn find_file(dir: &Path, stem: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|p| p.is_file())
    }

    /// Every stored version of a price list.
    fn versions(&self, name: &str) -> BTreeMap<u32, PathBuf> {
        let base = self.root.join(EntityType::Pricelists.as_str());
        let mut out: BTreeMap<u32, (usize, PathBuf)> = BTreeMap::new();
        if let Ok(entries) = fs::read_dir(base.join(name)) {
            for entry in entries.flatten() {
                let path = entry.path();
                let version = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.strip_prefix('v'))
                    .and_then(|s| s.parse::<u32>().ok());
                let rank = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(|e| EXTENSIONS.iter().position(|x| *x == e));
                if let (Some(v), Some(rank)) = (version, rank) {
                    // csv beats jsonl beats json when one version has several files
                    let keep = match out.get(&v) {
                        Some((existing, _)) => rank < *existing,
                        None => true,
                    };
                    if keep {
                        out.insert(v, (rank, path));
                    }
                }
            }
        }
        let mut out: BTreeMap<u32, PathBuf> = out.into_iter().map(|(v, (_, p))| (v, p)).collect();
        if out.is_empty() {
            if let Some(flat) = Self::find_file(&base, name) {
                out.insert(1, flat);
            }
        }
        out
    }

    fn locate(&self, req: &FetchRequest) -> Result<PathBuf, FetchError> {
        let name = req.entity_name.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(not_found(req));
        }
        match req.entity_type {
            EntityType::Pricelists => {
                let versions = self.versions(name);
                resolve_version(req, &versions).cloned()
            }
            other => {
                Self::find_file(&self.root.join(other.as_str()), name).ok_or_else(|| not_found(req))
            }
        }
    }
}

impl TableFetcher for FsCatalog {
    fn fetch(&self, req: &FetchRequest) -> Result<Table, FetchError> {
        let path = self.locate(req)?;
        let table = read_path(&path).map_err(|e| FetchError::Read {
            entity_type: req.entity_type,
            name: req.entity_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(req.apply_selection(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabflow_core::types::Scalar;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    #[test]
    fn reads_datasets_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "datasets/orders.csv", "id,amount\n1,10\n2,20\n");
        write(dir.path(), "views/big.jsonl", "{\"id\": 2}\n");
        let cat = FsCatalog::new(dir.path());

        let orders = cat.fetch(&FetchRequest::latest(EntityType::Datasets, "orders")).unwrap();
        assert_eq!(orders.num_rows(), 2);
        let big = cat.fetch(&FetchRequest::latest(EntityType::Views, "big")).unwrap();
        assert_eq!(big.rows()[0].value("id"), &Scalar::Number(2.0));
    }

    #[test]
    fn price_list_versions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pricelists/EU/v1.csv", "sku,price\nA,10\n");
        write(dir.path(), "pricelists/EU/v10.csv", "sku,price\nA,14\n");
        write(dir.path(), "pricelists/EU/notes.txt", "ignored");
        let cat = FsCatalog::new(dir.path());

        let mut req = FetchRequest::latest(EntityType::Pricelists, "EU");
        assert_eq!(cat.fetch(&req).unwrap().rows()[0].value("price"), &Scalar::Number(14.0));
        req.version = Some(1);
        assert_eq!(cat.fetch(&req).unwrap().rows()[0].value("price"), &Scalar::Number(10.0));
        req.version = Some(2);
        assert!(matches!(cat.fetch(&req), Err(FetchError::VersionUnavailable { .. })));
    }

    #[test]
    fn missing_and_unsafe_names_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cat = FsCatalog::new(dir.path());
        for name in ["nope", "../etc", ""] {
            let req = FetchRequest::latest(EntityType::Datasets, name);
            assert!(matches!(cat.fetch(&req), Err(FetchError::NotFound { .. })));
        }
    }

    #[test]
    fn malformed_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "datasets/bad.json", "{\"not\": \"an array\"}");
        let cat = FsCatalog::new(dir.path());
        let req = FetchRequest::latest(EntityType::Datasets, "bad");
        assert!(matches!(cat.fetch(&req), Err(FetchError::Read { .. })));
    }
}

//! Stable hashing helpers for pipeline definitions, manifests, and tables.

use blake3::Hasher;
use serde::Serialize;

use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// Content digest of a table: column order plus every cell in row order.
///
/// Uses the canonical key encoding, so `-0.0` and `0.0` hash the same.
pub fn hash_table(table: &Table) -> Hash256 {
    let mut h = Hasher::new();
    let mut buf = Vec::new();
    for c in table.columns() {
        h.update(&(c.len() as u64).to_le_bytes());
        h.update(c.as_bytes());
    }
    for row in table.rows() {
        h.update(b"\x1e");
        for c in table.columns() {
            buf.clear();
            row.value(c).write_key(&mut buf);
            h.update(&buf);
        }
    }
    Hash256(h.finalize().into())
}

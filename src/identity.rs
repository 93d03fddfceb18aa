use md5::{Digest, Md5};
use serde_json::Value;

use crate::blob::canonical_json;
use crate::error::PackError;

const SEPARATOR: &str = "|";

fn md5_hex(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            hasher.update(SEPARATOR.as_bytes());
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Row id used when an upsert carries no explicit id: `md5(dataset_id | canonical input)`.
pub fn derive_row_id(dataset_id: &str, canonical_input: &Value) -> Result<String, PackError> {
    let canonical = canonical_json(canonical_input)?;
    Ok(md5_hex(&[dataset_id, canonical.as_str()]))
}

/// Stable id for a synthetic project-score row: `md5(project_name | score_name)`.
pub fn derive_project_score_id(project_name: &str, score_name: &str) -> String {
    md5_hex(&[project_name, score_name])
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PackError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = PackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(PackError::InvalidInput {
                field: "datasetId".to_string(),
                message: "dataset id must not be empty".to_string(),
            });
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

/// Dataset as the upstream API returns it, without the owning project's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

/// Row of the Datasets table. Only built once the project name is resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub name: String,
    pub description: Option<String>,
    pub created: Option<String>,
}

impl DatasetRecord {
    pub fn new(dataset: Dataset, project_name: String) -> Self {
        Self {
            id: dataset.id,
            project_id: dataset.project_id,
            project_name,
            name: dataset.name,
            description: dataset.description,
            created: dataset.created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub repo_info: Option<Value>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub base_exp_id: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub dataset_version: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub diff: Option<f64>,
    #[serde(default)]
    pub improvements: Option<u64>,
    #[serde(default)]
    pub regressions: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metric: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub diff: Option<f64>,
    #[serde(default)]
    pub improvements: Option<u64>,
    #[serde(default)]
    pub regressions: Option<u64>,
}

/// Summary with the upstream `scores` / `metrics` maps flattened, in the order received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub project_name: Option<String>,
    pub experiment_name: Option<String>,
    pub comparison_experiment_name: Option<String>,
    pub scores: Vec<Score>,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectScore {
    pub project_score_id: String,
    pub project_name: String,
    pub experiment_name: String,
    pub created: Option<String>,
    pub score_name: String,
    pub score_value: Option<f64>,
}

/// Log event with its dynamic payload fields carried as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentLogEntry {
    pub id: Option<String>,
    pub created: Option<String>,
    pub span_id: Option<String>,
    pub root_span_id: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub expected: Option<String>,
    pub scores: Option<String>,
    pub metadata: Option<String>,
    /// Every other event field (`experiment_id`, `span_parents`, `tags`, `metrics`, ...) as received.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One write event for the dataset insert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRowEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "_object_delete", skip_serializing_if = "Option::is_none")]
    pub object_delete: Option<bool>,
    #[serde(rename = "_is_merge", skip_serializing_if = "Option::is_none")]
    pub is_merge: Option<bool>,
}

impl DatasetRowEvent {
    pub fn upsert(
        id: String,
        input: Value,
        expected: Value,
        metadata: Value,
        tags: Option<Vec<String>>,
    ) -> Self {
        Self {
            id,
            input: Some(input),
            expected: Some(expected),
            metadata: Some(metadata),
            tags,
            object_delete: None,
            is_merge: None,
        }
    }

    pub fn delete(id: String) -> Self {
        Self {
            id,
            input: None,
            expected: None,
            metadata: None,
            tags: None,
            object_delete: Some(true),
            is_merge: Some(true),
        }
    }
}

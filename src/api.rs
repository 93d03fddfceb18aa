use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::{
    Dataset, DatasetId, DatasetRowEvent, Experiment, ExperimentSummary, Metric, Project, Score,
};
use crate::error::PackError;
use crate::fetcher::{FetchRequest, FetchResponse, Fetcher};

pub const DEFAULT_LOG_LIMIT: usize = 10_000;

/// Accessors over the Braintrust REST API. Each call issues exactly one request,
/// except [`BraintrustApi::fetch_experiment_logs`] which resolves the experiment first.
#[derive(Clone)]
pub struct BraintrustApi<F: Fetcher> {
    fetcher: F,
    base_url: Url,
}

impl<F: Fetcher> BraintrustApi<F> {
    pub fn new(fetcher: F, config: &ResolvedConfig) -> Self {
        Self {
            fetcher,
            base_url: config.api_url.clone(),
        }
    }

    pub fn with_base_url(fetcher: F, base_url: Url) -> Self {
        Self { fetcher, base_url }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn endpoint(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<String, PackError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PackError::InvalidConfig(format!("api_url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url.into())
    }

    fn send(&self, request: FetchRequest) -> Result<FetchResponse, PackError> {
        debug!(method = %request.method, url = %request.url, "braintrust request");
        let response = self.fetcher.fetch(request)?;
        handle_status(response)
    }

    fn get(&self, url: String) -> Result<Value, PackError> {
        Ok(self.send(FetchRequest::get(url))?.body)
    }

    pub fn fetch_project(&self, id: &str) -> Result<Project, PackError> {
        let url = self.endpoint(&["project", id], &[])?;
        decode(self.get(url)?, "project")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, PackError> {
        let url = self.endpoint(&["project"], &[])?;
        decode_envelope(self.get(url)?, "objects")
    }

    pub fn list_datasets(&self) -> Result<Vec<Dataset>, PackError> {
        let url = self.endpoint(&["dataset"], &[])?;
        decode_envelope(self.get(url)?, "objects")
    }

    pub fn list_experiments(
        &self,
        project_name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Experiment>, PackError> {
        let mut query = Vec::new();
        if let Some(project_name) = project_name {
            query.push(("project_name", project_name.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let url = self.endpoint(&["experiment"], &query)?;
        decode_envelope(self.get(url)?, "objects")
    }

    pub fn list_experiments_named(
        &self,
        project_name: &str,
        experiment_name: &str,
    ) -> Result<Vec<Experiment>, PackError> {
        let query = [
            ("project_name", project_name.to_string()),
            ("experiment_name", experiment_name.to_string()),
        ];
        let url = self.endpoint(&["experiment"], &query)?;
        decode_envelope(self.get(url)?, "objects")
    }

    pub fn resolve_experiment_id(
        &self,
        project_name: &str,
        experiment_name: &str,
    ) -> Result<String, PackError> {
        let mut matches = self.list_experiments_named(project_name, experiment_name)?;
        match matches.len() {
            0 => Err(PackError::NotFound(format!(
                "experiment `{experiment_name}` not found in project `{project_name}`"
            ))),
            1 => Ok(matches.remove(0).id),
            count => Err(PackError::AmbiguousMatch(format!(
                "{count} experiments named `{experiment_name}` in project `{project_name}`"
            ))),
        }
    }

    pub fn fetch_experiment_summary(
        &self,
        experiment_id: &str,
    ) -> Result<ExperimentSummary, PackError> {
        let url = self.endpoint(
            &["experiment", experiment_id, "summarize"],
            &[("summarize_scores", "true".to_string())],
        )?;
        flatten_summary(self.get(url)?)
    }

    pub fn fetch_experiment_logs(
        &self,
        project_name: &str,
        experiment_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, PackError> {
        let experiment_id = self.resolve_experiment_id(project_name, experiment_name)?;
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);
        let url = self.endpoint(
            &["experiment", experiment_id.as_str(), "fetch"],
            &[("limit", limit.to_string())],
        )?;
        decode_envelope(self.get(url)?, "events")
    }

    /// Posts write events and returns the acknowledged row ids.
    pub fn insert_dataset_events(
        &self,
        dataset_id: &DatasetId,
        events: &[DatasetRowEvent],
    ) -> Result<Vec<String>, PackError> {
        let body = self.submit_dataset_events(dataset_id, events)?;
        decode_envelope(body, "row_ids")
    }

    /// Posts write events, only checking that the server accepted them.
    pub fn submit_dataset_events(
        &self,
        dataset_id: &DatasetId,
        events: &[DatasetRowEvent],
    ) -> Result<Value, PackError> {
        let url = self.endpoint(&["dataset", dataset_id.as_str(), "insert"], &[])?;
        let body = json!({ "events": events });
        Ok(self.send(FetchRequest::post(url, body))?.body)
    }
}

fn handle_status(response: FetchResponse) -> Result<FetchResponse, PackError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = match response.body {
        Value::Null => "Braintrust request failed".to_string(),
        Value::String(text) => text,
        other => other.to_string(),
    };
    Err(PackError::RemoteRequestFailed {
        status: response.status,
        message,
    })
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, PackError> {
    serde_json::from_value(value)
        .map_err(|err| PackError::InvalidResponse(format!("{what}: {err}")))
}

fn decode_envelope<T: DeserializeOwned>(
    mut body: Value,
    field: &str,
) -> Result<Vec<T>, PackError> {
    let items = body
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| PackError::InvalidResponse(format!("missing `{field}` in response")))?;
    decode(items, field)
}

fn flatten_summary(mut body: Value) -> Result<ExperimentSummary, PackError> {
    let text = |body: &Value, key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let project_name = text(&body, "project_name");
    let experiment_name = text(&body, "experiment_name");
    let comparison_experiment_name = text(&body, "comparison_experiment_name");

    let scores = flatten_named(
        body.get_mut("scores").map(Value::take),
        "scores",
        |name, mut score: Score| {
            score.name = name;
            score
        },
    )?;
    let metrics = flatten_named(
        body.get_mut("metrics").map(Value::take),
        "metrics",
        |name, mut metric: Metric| {
            metric.name = name;
            metric
        },
    )?;

    Ok(ExperimentSummary {
        project_name,
        experiment_name,
        comparison_experiment_name,
        scores,
        metrics,
    })
}

/// Turns a `{name: {...}}` map into a sequence in received order, keyed by the map key.
fn flatten_named<T, N>(value: Option<Value>, what: &str, name: N) -> Result<Vec<T>, PackError>
where
    T: DeserializeOwned,
    N: Fn(String, T) -> T,
{
    let map: Map<String, Value> = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(PackError::InvalidResponse(format!(
                "{what}: expected an object, got {other}"
            )));
        }
    };
    map.into_iter()
        .map(|(key, entry)| decode::<T>(entry, what).map(|item| name(key, item)))
        .collect()
}

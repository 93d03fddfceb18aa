use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::info;

use crate::api::BraintrustApi;
use crate::domain::{
    DatasetRecord, Experiment, ExperimentLogEntry, Metric, Project, ProjectScore, Score,
};
use crate::error::PackError;
use crate::fetcher::Fetcher;
use crate::identity::derive_project_score_id;

/// How many recent experiments are scanned when picking the latest one.
pub const LATEST_EXPERIMENT_WINDOW: usize = 50;

pub fn sync_projects<F: Fetcher>(api: &BraintrustApi<F>) -> Result<Vec<Project>, PackError> {
    let projects = api.list_projects()?;
    info!(count = projects.len(), "synced projects");
    Ok(projects)
}

pub fn sync_experiments<F: Fetcher>(
    api: &BraintrustApi<F>,
) -> Result<Vec<Experiment>, PackError> {
    let experiments = api.list_experiments(None, None)?;
    info!(count = experiments.len(), "synced experiments");
    Ok(experiments)
}

/// Lists datasets with the owning project's name attached to each row.
///
/// Project lookups run one at a time and are memoized for the duration of the call.
/// Any failed lookup fails the whole listing.
pub fn sync_datasets<F: Fetcher>(
    api: &BraintrustApi<F>,
) -> Result<Vec<DatasetRecord>, PackError> {
    let datasets = api.list_datasets()?;
    let mut project_names: HashMap<String, String> = HashMap::new();
    let mut records = Vec::with_capacity(datasets.len());

    for dataset in datasets {
        let project_name = match project_names.get(&dataset.project_id) {
            Some(name) => name.clone(),
            None => {
                let project = api.fetch_project(&dataset.project_id)?;
                let name = project.name.ok_or_else(|| {
                    PackError::InvalidResponse(format!(
                        "project {} has no name",
                        dataset.project_id
                    ))
                })?;
                project_names.insert(dataset.project_id.clone(), name.clone());
                name
            }
        };
        records.push(DatasetRecord::new(dataset, project_name));
    }

    info!(
        count = records.len(),
        projects = project_names.len(),
        "synced datasets"
    );
    Ok(records)
}

/// Picks the first experiment whose name starts with `prefix`, or the first one overall.
/// Relies on the upstream list order being most-recent-first.
pub fn select_latest<'a>(
    experiments: &'a [Experiment],
    prefix: Option<&str>,
) -> Option<&'a Experiment> {
    match prefix.filter(|prefix| !prefix.is_empty()) {
        Some(prefix) => experiments
            .iter()
            .find(|experiment| experiment.name.starts_with(prefix)),
        None => experiments.first(),
    }
}

pub fn sync_project_scores<F: Fetcher>(
    api: &BraintrustApi<F>,
    project_name: &str,
    prefix: Option<&str>,
) -> Result<Vec<ProjectScore>, PackError> {
    let experiments = api.list_experiments(Some(project_name), Some(LATEST_EXPERIMENT_WINDOW))?;
    if experiments.is_empty() {
        return Err(PackError::NotFound(format!(
            "no experiments found in project `{project_name}`"
        )));
    }
    let experiment = select_latest(&experiments, prefix).ok_or_else(|| {
        PackError::NotFound(format!(
            "no experiment in project `{project_name}` starts with `{}`",
            prefix.unwrap_or_default()
        ))
    })?;

    let summary = api.fetch_experiment_summary(&experiment.id)?;
    let rows = summary
        .scores
        .into_iter()
        .map(|score| ProjectScore {
            project_score_id: derive_project_score_id(project_name, &score.name),
            project_name: project_name.to_string(),
            experiment_name: experiment.name.clone(),
            created: experiment.created.clone(),
            score_name: score.name,
            score_value: score.score,
        })
        .collect::<Vec<_>>();

    info!(
        experiment = %experiment.name,
        count = rows.len(),
        "synced project scores"
    );
    Ok(rows)
}

pub fn sync_experiment_scores<F: Fetcher>(
    api: &BraintrustApi<F>,
    experiment_id: &str,
) -> Result<Vec<Score>, PackError> {
    Ok(api.fetch_experiment_summary(experiment_id)?.scores)
}

pub fn sync_experiment_metrics<F: Fetcher>(
    api: &BraintrustApi<F>,
    experiment_id: &str,
) -> Result<Vec<Metric>, PackError> {
    Ok(api.fetch_experiment_summary(experiment_id)?.metrics)
}

pub fn sync_experiment_logs<F: Fetcher>(
    api: &BraintrustApi<F>,
    project_name: &str,
    experiment_name: &str,
    limit: Option<usize>,
) -> Result<Vec<ExperimentLogEntry>, PackError> {
    let events = api.fetch_experiment_logs(project_name, experiment_name, limit)?;
    let entries = events.iter().map(log_entry).collect::<Vec<_>>();
    info!(count = entries.len(), "synced experiment logs");
    Ok(entries)
}

const LOG_FIELDS: [&str; 9] = [
    "id",
    "created",
    "span_id",
    "root_span_id",
    "input",
    "output",
    "expected",
    "scores",
    "metadata",
];

fn log_entry(event: &Value) -> ExperimentLogEntry {
    let text = |key: &str| {
        event
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let encoded = |key: &str| {
        event
            .get(key)
            .filter(|value| !value.is_null())
            .map(Value::to_string)
    };
    ExperimentLogEntry {
        id: text("id"),
        created: text("created"),
        span_id: text("span_id"),
        root_span_id: text("root_span_id"),
        input: encoded("input"),
        output: encoded("output"),
        expected: encoded("expected"),
        scores: encoded("scores"),
        metadata: encoded("metadata"),
        rest: event
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(key, _)| !LOG_FIELDS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<Map<String, Value>>()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn experiment(name: &str) -> Experiment {
        Experiment {
            id: format!("id-{name}"),
            project_id: "p1".to_string(),
            name: name.to_string(),
            description: None,
            created: None,
            repo_info: None,
            commit: None,
            base_exp_id: None,
            deleted_at: None,
            dataset_id: None,
            dataset_version: None,
            public: None,
            user_id: None,
        }
    }

    #[test]
    fn latest_is_first_without_prefix() {
        let experiments = vec![experiment("exp-b"), experiment("exp-a")];
        assert_eq!(select_latest(&experiments, None).unwrap().name, "exp-b");
        assert_eq!(select_latest(&experiments, Some("")).unwrap().name, "exp-b");
    }

    #[test]
    fn prefix_selects_regardless_of_position() {
        let experiments = vec![experiment("exp-b"), experiment("exp-a")];
        assert_eq!(
            select_latest(&experiments, Some("exp-a")).unwrap().name,
            "exp-a"
        );
        assert!(select_latest(&experiments, Some("nightly")).is_none());
        assert!(select_latest(&[], None).is_none());
    }

    #[test]
    fn log_payloads_become_text() {
        let entry = log_entry(&json!({
            "id": "evt1",
            "created": "2024-01-01T00:00:00Z",
            "input": {"question": "2+2"},
            "output": "4",
            "expected": null,
            "scores": {"exact": 1},
        }));
        assert_eq!(entry.id.as_deref(), Some("evt1"));
        assert_eq!(entry.input.as_deref(), Some("{\"question\":\"2+2\"}"));
        assert_eq!(entry.output.as_deref(), Some("\"4\""));
        assert_eq!(entry.expected, None);
        assert_eq!(entry.scores.as_deref(), Some("{\"exact\":1}"));
        assert_eq!(entry.metadata, None);
        assert!(entry.rest.is_empty());
    }

    #[test]
    fn other_event_fields_are_kept() {
        let entry = log_entry(&json!({
            "id": "evt1",
            "experiment_id": "e1",
            "span_parents": ["root"],
            "tags": ["smoke"],
            "metrics": {"tokens": 12},
            "output": 4,
        }));
        assert_eq!(entry.output.as_deref(), Some("4"));
        assert_eq!(entry.rest.get("experiment_id"), Some(&json!("e1")));
        assert_eq!(entry.rest.get("span_parents"), Some(&json!(["root"])));
        assert_eq!(entry.rest.get("tags"), Some(&json!(["smoke"])));
        assert_eq!(entry.rest.get("metrics"), Some(&json!({"tokens": 12})));
        assert!(!entry.rest.contains_key("id"));

        let row = serde_json::to_value(&entry).unwrap();
        assert_eq!(row["experiment_id"], json!("e1"));
        assert_eq!(row["output"], json!("4"));
    }
}

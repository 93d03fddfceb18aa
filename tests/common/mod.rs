#![allow(dead_code)]

use std::sync::Mutex;

use braintrust_pack::api::BraintrustApi;
use braintrust_pack::error::PackError;
use braintrust_pack::fetcher::{FetchRequest, FetchResponse, Fetcher};
use reqwest::Url;
use serde_json::{Value, json};

pub const BASE: &str = "https://api.braintrustdata.com/v1";

/// Answers requests from canned responses keyed by full URL and records every request.
#[derive(Default)]
pub struct MockFetcher {
    routes: Vec<(String, FetchResponse)>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, status: u16, body: Value) -> Self {
        self.routes
            .push((format!("{BASE}{path}"), FetchResponse { status, body }));
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        let url = format!("{BASE}{path}");
        self.requests()
            .iter()
            .filter(|request| request.url == url)
            .count()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PackError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self
            .routes
            .iter()
            .find(|(url, _)| *url == request.url)
            .map(|(_, response)| response.clone())
            .unwrap_or(FetchResponse {
                status: 404,
                body: json!({"error": format!("no route for {}", request.url)}),
            });
        Ok(response)
    }
}

pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse, PackError> {
        Err(PackError::RemoteTransport("connection reset".to_string()))
    }
}

pub fn api<F: Fetcher>(fetcher: F) -> BraintrustApi<F> {
    BraintrustApi::with_base_url(fetcher, Url::parse(BASE).unwrap())
}

pub fn experiment(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "project_id": "p1",
        "name": name,
        "description": null,
        "created": "2024-05-01T10:00:00.000Z",
        "repo_info": {"commit": "abc123", "branch": "main"},
        "commit": "abc123",
        "base_exp_id": null,
        "deleted_at": null,
        "dataset_id": null,
        "dataset_version": null,
        "public": false,
        "user_id": "u1"
    })
}

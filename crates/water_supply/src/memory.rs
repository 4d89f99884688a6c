use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{backend::Backend, envelope, RequestError, RequestResult};

/// How the in-memory backend shapes its answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Lists as bare arrays, writes echo the full record.
    #[default]
    Bare,
    /// Everything wrapped in `{"status": "success", "data": ...}`.
    Envelope,
    /// Lists as bare arrays, writes only echo `{"id": ...}`.
    IdOnly,
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Value>>,
    failures: HashMap<String, RequestError>,
    latency: HashMap<String, Duration>,
    requests: Vec<(Method, String)>,
}

/// A backend holding its collections in memory. Ids of created records are
/// uuid v4 strings.
#[derive(Default)]
pub struct MemoryBackend {
    mode: ResponseMode,
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            state: Mutex::default(),
        }
    }

    /// Registers a collection under its endpoint, e.g. `/bowsers`.
    pub fn with_collection(mut self, endpoint: &str, records: Value) -> Self {
        let records = match records {
            Value::Array(records) => records,
            _ => Vec::new(),
        };
        self.state
            .get_mut()
            .collections
            .insert(normalize(endpoint), records);
        self
    }

    pub async fn set_collection(&self, endpoint: &str, records: Vec<Value>) {
        self.state
            .lock()
            .await
            .collections
            .insert(normalize(endpoint), records);
    }

    pub async fn collection(&self, endpoint: &str) -> Vec<Value> {
        self.state
            .lock()
            .await
            .collections
            .get(&normalize(endpoint))
            .cloned()
            .unwrap_or_default()
    }

    /// Every request below `endpoint` fails with `error` until cleared.
    pub async fn fail(&self, endpoint: &str, error: RequestError) {
        self.state
            .lock()
            .await
            .failures
            .insert(normalize(endpoint), error);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Delays every answer below `endpoint`.
    pub async fn delay(&self, endpoint: &str, latency: Duration) {
        self.state
            .lock()
            .await
            .latency
            .insert(normalize(endpoint), latency);
    }

    /// Requests served so far, oldest first.
    pub async fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().await.requests.clone()
    }

    fn wrap(&self, value: Value) -> Value {
        match self.mode {
            ResponseMode::Envelope => json!({"status": "success", "data": value}),
            _ => value,
        }
    }

    fn echo(&self, record: &Value) -> Value {
        match self.mode {
            ResponseMode::IdOnly => json!({"id": record.get("id").cloned()}),
            _ => self.wrap(record.clone()),
        }
    }
}

fn normalize(endpoint: &str) -> String {
    format!("/{}", endpoint.trim_matches('/'))
}

fn not_found(endpoint: &str) -> RequestError {
    RequestError::Http {
        status: StatusCode::NOT_FOUND,
        url: endpoint.to_owned(),
        message: Some("not found".to_owned()),
    }
}

fn id_of(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Splits `/mutual-aid/transactions/42` into the longest registered
/// collection and the trailing id.
fn route<'a>(
    collections: &HashMap<String, Vec<Value>>,
    endpoint: &'a str,
) -> Option<(String, Option<&'a str>)> {
    collections
        .keys()
        .filter_map(|collection| {
            if endpoint == collection {
                Some((collection.clone(), None))
            } else {
                endpoint
                    .strip_prefix(collection.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .filter(|id| !id.is_empty() && !id.contains('/'))
                    .map(|id| (collection.clone(), Some(id)))
            }
        })
        .max_by_key(|(collection, _)| collection.len())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> RequestResult<Value> {
        let endpoint = normalize(endpoint);

        let latency = {
            let mut state = self.state.lock().await;
            state.requests.push((method.clone(), endpoint.clone()));
            let failure = state
                .failures
                .iter()
                .find(|(prefix, _)| endpoint.starts_with(prefix.as_str()))
                .map(|(_, error)| error.clone());
            if let Some(error) = failure {
                return Err(error);
            }
            state
                .latency
                .iter()
                .find(|(prefix, _)| endpoint.starts_with(prefix.as_str()))
                .map(|(_, latency)| *latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        let (collection, id) =
            route(&state.collections, &endpoint).ok_or_else(|| not_found(&endpoint))?;
        let records = state
            .collections
            .get_mut(&collection)
            .ok_or_else(|| not_found(&endpoint))?;
        let position = id.and_then(|id| {
            records
                .iter()
                .position(|record| id_of(record).as_deref() == Some(id))
        });

        match (method, id) {
            (Method::GET, None) => Ok(self.wrap(Value::Array(records.clone()))),
            (Method::GET, Some(_)) => {
                let index = position.ok_or_else(|| not_found(&endpoint))?;
                Ok(self.wrap(records[index].clone()))
            }
            (Method::POST, None) => {
                let mut record = body.unwrap_or_else(|| json!({}));
                if !record.is_object() {
                    return Err(RequestError::Http {
                        status: StatusCode::BAD_REQUEST,
                        url: endpoint.clone(),
                        message: Some("expected a JSON object".to_owned()),
                    });
                }
                if id_of(&record).filter(|id| !id.trim().is_empty()).is_none() {
                    envelope::merge(&mut record, &json!({"id": Uuid::new_v4().to_string()}));
                }
                let echo = self.echo(&record);
                records.push(record);
                Ok(echo)
            }
            (Method::PUT | Method::PATCH, Some(_)) => {
                let index = position.ok_or_else(|| not_found(&endpoint))?;
                let record = &mut records[index];
                if let Some(patch) = &body {
                    let id = record.get("id").cloned();
                    envelope::merge(record, patch);
                    if let Some(id) = id {
                        envelope::merge(record, &json!({"id": id}));
                    }
                }
                Ok(self.echo(record))
            }
            (Method::DELETE, Some(_)) => {
                let index = position.ok_or_else(|| not_found(&endpoint))?;
                records.remove(index);
                Ok(json!({"status": "success"}))
            }
            _ => Err(RequestError::Http {
                status: StatusCode::METHOD_NOT_ALLOWED,
                url: endpoint.clone(),
                message: None,
            }),
        }
    }
}

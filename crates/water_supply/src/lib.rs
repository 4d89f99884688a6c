use std::{error, fmt, sync::Arc};

use reqwest::StatusCode;

pub mod backend;
pub mod collections;
pub mod config;
pub mod csrf;
pub mod demo;
pub mod envelope;
pub mod export;
pub mod finance;
pub mod joins;
pub mod memory;
pub mod poller;
pub mod priority;
pub mod reports;
pub mod store;

#[derive(Debug, Clone)]
pub enum RequestError {
    /// The request never produced a response.
    Network(Arc<reqwest::Error>),
    Http {
        status: StatusCode,
        url: String,
        message: Option<String>,
    },
    Json(Arc<serde_json::Error>),
    /// The backend answered `{"status": "error"}`.
    Api { message: String },
    /// A list was expected but the payload was neither an array nor a
    /// `{data: [...]}` envelope.
    Shape(String),
    InvalidUrl(String),
    NotFound { collection: &'static str, id: String },
    NotLoaded,
    Conflict(String),
}

impl error::Error for RequestError {}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestError::Network(e) => write!(f, "network error: {}", e),
            RequestError::Http {
                status,
                url,
                message,
            } => match message {
                Some(text) => write!(f, "HTTP {} from {}: {}", status, url, text),
                None => write!(f, "HTTP {} from {}", status, url),
            },
            RequestError::Json(e) => write!(f, "JSON parse error: {}", e),
            RequestError::Api { message } => write!(f, "api error: {}", message),
            RequestError::Shape(what) => write!(f, "unexpected response shape: {}", what),
            RequestError::InvalidUrl(url) => write!(f, "invalid url: {}", url),
            RequestError::NotFound { collection, id } => {
                write!(f, "no record '{}' in {}", id, collection)
            }
            RequestError::NotLoaded => write!(f, "collections have not been loaded yet"),
            RequestError::Conflict(why) => write!(f, "conflict: {}", why),
        }
    }
}

impl RequestError {
    /// The HTTP status to report this error with, for errors that have one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            RequestError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            RequestError::Conflict(_) => Some(StatusCode::CONFLICT),
            _ => None,
        }
    }

    pub fn not_found<T: model::Resource>(id: &utility::id::Id<T>) -> Self {
        RequestError::NotFound {
            collection: T::NAME,
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        RequestError::Network(Arc::new(e))
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(e: serde_json::Error) -> Self {
        RequestError::Json(Arc::new(e))
    }
}

pub type RequestResult<T> = Result<T, RequestError>;

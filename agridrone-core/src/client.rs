//! Thin async wrapper over `reqwest` shared by the backend API and the geocoder.
//!
//! Every call is a single attempt: no retries, no caching. Failures are
//! classified into [`RequestError`] and logged before being handed back.

use reqwest::{
    Client, Method, StatusCode,
    multipart::{Form, Part},
};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::RequestError;

/// A binary file sent as one multipart form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(FilePart),
}

/// Description of one outbound call, relative to the client's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, RequestError> {
        let value = serde_json::to_value(body)
            .map_err(|e| RequestError::InvalidRequest(format!("unserializable body: {e}")))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    pub fn multipart(mut self, part: FilePart) -> Self {
        self.body = Some(RequestBody::Multipart(part));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, RequestError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| RequestError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: normalize_base(base_url)?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` below the base URL, keeping any path prefix the base carries.
    pub fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RequestError::InvalidRequest(format!("bad path '{path}': {e}")))
    }

    /// Perform the call and decode a JSON body into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, RequestError> {
        let label = format!("{} {}", request.method, request.path);
        let body = self.execute(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            warn!(request = %label, error = %e, "response body did not match expected shape");
            RequestError::Decode(e.to_string())
        })
    }

    /// Perform the call, caring only about success or failure.
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), RequestError> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: ApiRequest) -> Result<String, RequestError> {
        let url = self.endpoint(&request.path)?;
        let method = request.method.clone();
        let path = request.path.clone();

        debug!(%method, %url, "dispatching request");

        let mut builder = self.http.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Multipart(file)) => {
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.mime)
                    .map_err(|e| RequestError::InvalidRequest(format!("bad mime type: {e}")))?;
                builder.multipart(Form::new().part(file.field, part))
            }
        };

        let res = builder.send().await.map_err(|e| {
            let err = RequestError::from(e);
            warn!(%method, %path, error = %err, "request failed before a response arrived");
            err
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            let err = RequestError::from(e);
            warn!(%method, %path, %status, error = %err, "failed to read response body");
            err
        })?;

        classify(status, body).inspect_err(|err| {
            warn!(%method, %path, %status, error = %err, "server reported an error");
        })
    }
}

fn classify(status: StatusCode, body: String) -> Result<String, RequestError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(RequestError::server(status, &body))
    }
}

fn normalize_base(base_url: &str) -> Result<Url, RequestError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| RequestError::InvalidRequest(format!("bad base URL '{base_url}': {e}")))?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

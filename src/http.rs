use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use tracing::debug;

use crate::admin::AdminCommand;
use crate::client::{DataApi, Outcome};
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::request::{DeleteRequest, FindRequest, InsertRequest, UpdateRequest, check_name};

pub const DEFAULT_API_URL: &str = "https://api.mlab.com/api/1";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV_VAR: &str = "MLAB_API_URL";

/// Client for the mLab Data API. The key travels as the `apiKey` query parameter.
#[derive(Debug, Clone)]
pub struct MlabClient {
    http: reqwest::Client,
    base: Url,
    key: Credential,
}

impl MlabClient {
    pub fn new(credential: &Credential, base_url: &str) -> Result<Self> {
        if credential.as_str().trim().is_empty() {
            return Err(Error::Auth("empty API key".into()));
        }
        let base = Url::parse(base_url)
            .map_err(|e| Error::Auth(format!("invalid API URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Auth(format!("invalid API URL {base_url}")));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("mlab-shell/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Auth(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base,
            key: credential.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        for segment in segments {
            check_name(segment)?;
        }
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        params: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(segments)?;
        debug!(%method, path = url.path(), params = params.len(), "data api request");

        let mut req = self
            .http
            .request(method, url)
            .query(params)
            .query(&[("apiKey", self.key.as_str())]);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let parsed: Option<Value> = if text.trim().is_empty() {
            Some(Value::Null)
        } else {
            serde_json::from_str(&text).ok()
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let msg = parsed
                .as_ref()
                .and_then(message_of)
                .unwrap_or_else(|| status.to_string());
            return Err(Error::Auth(msg));
        }
        if !status.is_success() {
            let msg = parsed
                .as_ref()
                .and_then(message_of)
                .unwrap_or_else(|| status.to_string());
            return Err(Error::Remote(msg));
        }
        parsed.ok_or_else(|| Error::Remote(format!("invalid response JSON ({status})")))
    }
}

/// `{"message": "..."}` and nothing else.
fn message_of(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get("message").and_then(|m| m.as_str()).map(String::from)
}

fn outcome(body: Value) -> Outcome<Value> {
    match message_of(&body) {
        Some(m) => Outcome::Message(m),
        None => Outcome::Done(body),
    }
}

fn names(body: Value) -> Result<Vec<String>> {
    serde_json::from_value(body)
        .map_err(|e| Error::Remote(format!("expected a list of names: {e}")))
}

fn count_field(body: &Value, field: &str) -> Result<u64> {
    body.get(field)
        .and_then(|n| n.as_u64())
        .ok_or_else(|| match message_of(body) {
            Some(m) => Error::Remote(m),
            None => Error::Remote(format!("response has no '{field}' count")),
        })
}

impl DataApi for MlabClient {
    async fn list_databases(&self) -> Result<Vec<String>> {
        names(self.send(Method::GET, &["databases"], &[], None).await?)
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        let body = self
            .send(Method::GET, &["databases", database, "collections"], &[], None)
            .await?;
        names(body)
    }

    async fn list_documents(&self, request: &FindRequest) -> Result<Outcome<Value>> {
        let body = self
            .send(
                Method::GET,
                &["databases", request.database.as_str(), "collections", request.collection.as_str()],
                &request.query_params(),
                None,
            )
            .await?;
        Ok(outcome(body))
    }

    async fn insert_documents(&self, request: &InsertRequest) -> Result<u64> {
        let docs = Value::Array(request.documents.clone());
        let body = self
            .send(
                Method::POST,
                &["databases", request.database.as_str(), "collections", request.collection.as_str()],
                &[],
                Some(&docs),
            )
            .await?;
        count_field(&body, "n")
    }

    async fn update_documents(&self, request: &UpdateRequest) -> Result<u64> {
        let body = self
            .send(
                Method::PUT,
                &["databases", request.database.as_str(), "collections", request.collection.as_str()],
                &request.query_params(),
                Some(&request.data),
            )
            .await?;
        count_field(&body, "n")
    }

    async fn delete_documents(&self, request: &DeleteRequest) -> Result<Outcome<u64>> {
        // Replacing the matched set with an empty array removes it.
        let body = self
            .send(
                Method::PUT,
                &["databases", request.database.as_str(), "collections", request.collection.as_str()],
                &request.query_params(),
                Some(&json!([])),
            )
            .await?;
        match outcome(body) {
            Outcome::Done(b) => Ok(Outcome::Done(count_field(&b, "removed")?)),
            Outcome::Message(m) => Ok(Outcome::Message(m)),
        }
    }

    async fn run_command(&self, database: &str, command: &AdminCommand) -> Result<Outcome<Value>> {
        let payload = command.to_value();
        let body = self
            .send(
                Method::POST,
                &["databases", database, "runCommand"],
                &[],
                Some(&payload),
            )
            .await?;
        Ok(outcome(body))
    }
}

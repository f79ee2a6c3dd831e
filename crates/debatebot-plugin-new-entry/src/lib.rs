//! Plugin logging chat messages into the debate through a webhook.

use async_trait::async_trait;
use debatebot_core::{
    ensure_function, Arguments, ExecutionResult, FunctionSpec, Helper, Plugin, PluginError,
};
use debatebot_schema::ObjectSchema;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

pub const SOURCE_NAME: &str = "newEntry";
pub const FUNCTION_NAME: &str = "newEntry";
pub const DEFAULT_ENDPOINT: &str = "https://p3mxly.buildship.run/debateStatus";

/// Webhook response body, decoded when the server declared JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Decoded(Value),
    Raw(String),
}

impl ResponseBody {
    pub fn from_response(content_type: Option<&str>, text: String) -> Self {
        if !content_type.is_some_and(is_json_content_type) {
            return Self::Raw(text);
        }
        if text.trim().is_empty() {
            return Self::Decoded(Value::Null);
        }
        match serde_json::from_str(&text) {
            Ok(value) => Self::Decoded(value),
            Err(err) => {
                warn!(%err, "response declared json but did not parse");
                Self::Raw(text)
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Decoded(value) => value,
            Self::Raw(text) => json!({ "response": text }),
        }
    }
}

/// `application/json` and the `application/*+json` family.
fn is_json_content_type(raw: &str) -> bool {
    let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.strip_prefix("application/") {
        Some(subtype) => subtype == "json" || subtype.ends_with("+json"),
        None => false,
    }
}

#[derive(Clone, Debug)]
pub struct NewEntryPlugin {
    endpoint: Url,
    client: HttpClient,
}

impl NewEntryPlugin {
    pub fn new() -> Result<Self, PluginError> {
        let endpoint = Url::parse(DEFAULT_ENDPOINT)
            .map_err(|e| PluginError::Configuration(format!("invalid webhook url: {e}")))?;
        Self::with_endpoint(endpoint)
    }

    pub fn with_endpoint(endpoint: Url) -> Result<Self, PluginError> {
        let client = HttpClient::builder()
            .build()
            .map_err(|e| PluginError::Configuration(format!("failed to build http client: {e}")))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Plugin for NewEntryPlugin {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn spec(&self) -> Vec<FunctionSpec> {
        vec![FunctionSpec::new(
            FUNCTION_NAME,
            "Log a Telegram bot message to the debate.",
            ObjectSchema::new()
                .string("entry", "The text of the debate entry.", true)
                .build(),
        )]
    }

    async fn execute(
        &self,
        function_name: &str,
        _helper: &dyn Helper,
        arguments: Arguments,
    ) -> Result<ExecutionResult, PluginError> {
        info!(function = function_name, ?arguments, "executing function");
        if let Err(err) = ensure_function(FUNCTION_NAME, function_name) {
            error!(%err, "rejecting call");
            return Err(err);
        }

        let entry = arguments
            .get("entry")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PluginError::InvalidArguments("`entry` must be a string".to_string())
            })?;
        let body = json!({ "message": entry });
        debug!(%body, url = %self.endpoint, "sending debate entry");

        let response = match self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Ok(transport_failure(err)),
        };

        let status = response.status().as_u16();
        let content_type = content_type(response.headers());
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => return Ok(transport_failure(err)),
        };
        debug!(status, %text, "received response");

        let body = ResponseBody::from_response(content_type.as_deref(), text);
        match &body {
            ResponseBody::Decoded(value) => info!(%value, "received json response"),
            ResponseBody::Raw(text) => warn!(%text, "response is not json"),
        }
        let payload = body.into_value();

        if (200..300).contains(&status) {
            Ok(ExecutionResult::success(status, payload))
        } else {
            error!(status, %payload, "request failed");
            Ok(ExecutionResult::failure(status, payload))
        }
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn transport_failure(err: reqwest::Error) -> ExecutionResult {
    let message = format!("Request failed: {err}");
    error!("{message}");
    ExecutionResult::failure(500, message)
}

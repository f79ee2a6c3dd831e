use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::StoreConfig;
use debatebot_core::PluginError;

pub const TABLE: &str = "state_of_debate";
pub const COLUMNS: &str = "state_of_debate,debate_question";

/// One row of the debate table. Columns are nullable but must be selected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DebateStatusRecord {
    #[serde(deserialize_with = "Option::deserialize")]
    pub state_of_debate: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub debate_question: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("store responded with {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Read access to the debate state table.
#[async_trait]
pub trait DebateStore: Send + Sync {
    /// Most recent row by descending id, if the table has any.
    async fn latest_status(&self) -> Result<Option<DebateStatusRecord>, StoreError>;
}

/// [`DebateStore`] speaking to a Supabase project through its PostgREST API.
#[derive(Clone, Debug)]
pub struct PostgrestStore {
    table_url: Url,
    api_key: String,
    client: HttpClient,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, PluginError> {
        let table_url = config.url.join(&format!("rest/v1/{TABLE}")).map_err(|e| {
            PluginError::Configuration(format!("failed to construct table url: {e}"))
        })?;
        let client = HttpClient::builder()
            .build()
            .map_err(|e| PluginError::Configuration(format!("failed to build http client: {e}")))?;
        Ok(Self {
            table_url,
            api_key: config.key.clone(),
            client,
        })
    }

}

#[async_trait]
impl DebateStore for PostgrestStore {
    async fn latest_status(&self) -> Result<Option<DebateStatusRecord>, StoreError> {
        let response = self
            .client
            .get(self.table_url.clone())
            .query(&[("select", COLUMNS), ("order", "id.desc"), ("limit", "1")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(parse_http_error(status, text));
        }

        let rows = response
            .json::<Vec<DebateStatusRecord>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}

fn parse_http_error(status: StatusCode, body: String) -> StoreError {
    StoreError::Upstream {
        status: status.as_u16(),
        message: extract_postgrest_message(body),
    }
}

// PostgREST reports failures as {"message", "code", "details", "hint"}.
fn extract_postgrest_message(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or(body)
}

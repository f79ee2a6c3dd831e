//! Plugin reporting the current state and question of the debate.

use async_trait::async_trait;
use debatebot_core::{
    ensure_function, Arguments, ExecutionResult, FunctionSpec, Helper, Plugin, PluginError,
};
use debatebot_schema::ObjectSchema;
use serde_json::json;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

mod store;

pub use store::{DebateStatusRecord, DebateStore, PostgrestStore, StoreError};

pub const SOURCE_NAME: &str = "debateStatus";
pub const FUNCTION_NAME: &str = "getDebateStatus";
pub const NOT_FOUND_MESSAGE: &str = "No debate status or question found";

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_KEY";

/// Connection settings for the Supabase project holding the debate table.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub url: Url,
    pub key: String,
}

impl StoreConfig {
    pub fn new(url: &str, key: impl Into<String>) -> Result<Self, PluginError> {
        let mut url = Url::parse(url)
            .map_err(|e| PluginError::Configuration(format!("invalid {URL_VAR}: {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            url,
            key: key.into(),
        })
    }

    pub fn from_env() -> Result<Self, PluginError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values
    /// count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PluginError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR).filter(|v| !v.is_empty());
        let key = lookup(KEY_VAR).filter(|v| !v.is_empty());
        match (url, key) {
            (Some(url), Some(key)) => Self::new(&url, key),
            _ => Err(PluginError::Configuration(format!(
                "{URL_VAR} and {KEY_VAR} must be set in environment variables"
            ))),
        }
    }
}

pub struct DebateStatusPlugin {
    store: Arc<dyn DebateStore>,
}

impl DebateStatusPlugin {
    pub fn new(config: &StoreConfig) -> Result<Self, PluginError> {
        let store = PostgrestStore::new(config)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    pub fn from_env() -> Result<Self, PluginError> {
        Self::new(&StoreConfig::from_env()?)
    }

    pub fn with_store(store: Arc<dyn DebateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Plugin for DebateStatusPlugin {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn spec(&self) -> Vec<FunctionSpec> {
        vec![FunctionSpec::new(
            FUNCTION_NAME,
            "Retrieve the current status and question of the debate from the Supabase database.",
            ObjectSchema::new().build(),
        )]
    }

    async fn execute(
        &self,
        function_name: &str,
        _helper: &dyn Helper,
        _arguments: Arguments,
    ) -> Result<ExecutionResult, PluginError> {
        info!(function = function_name, "executing function");
        if let Err(err) = ensure_function(FUNCTION_NAME, function_name) {
            error!(%err, "rejecting call");
            return Err(err);
        }

        let result = match self.store.latest_status().await {
            Ok(Some(record)) => {
                info!(
                    state_of_debate = ?record.state_of_debate,
                    debate_question = ?record.debate_question,
                    "retrieved debate status"
                );
                ExecutionResult::success(
                    200,
                    json!({
                        "state_of_debate": record.state_of_debate,
                        "debate_question": record.debate_question,
                    }),
                )
            }
            Ok(None) => {
                warn!("no debate status or question found in the database");
                ExecutionResult::failure(404, NOT_FOUND_MESSAGE)
            }
            Err(err) => {
                let message = format!("Failed to retrieve debate status and question: {err}");
                error!("{message}");
                ExecutionResult::failure(500, message)
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debatebot_core::NoopHelper;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    enum Canned {
        Row(&'static str, &'static str),
        Empty,
        Fail(&'static str),
    }

    struct CannedStore(Canned);

    #[async_trait]
    impl DebateStore for CannedStore {
        async fn latest_status(&self) -> Result<Option<DebateStatusRecord>, StoreError> {
            match self.0 {
                Canned::Row(state, question) => Ok(Some(DebateStatusRecord {
                    state_of_debate: Some(state.to_string()),
                    debate_question: Some(question.to_string()),
                })),
                Canned::Empty => Ok(None),
                Canned::Fail(message) => Err(StoreError::Transport(message.to_string())),
            }
        }
    }

    fn plugin(canned: Canned) -> DebateStatusPlugin {
        DebateStatusPlugin::with_store(Arc::new(CannedStore(canned)))
    }

    async fn run(plugin: &DebateStatusPlugin) -> ExecutionResult {
        plugin
            .execute(FUNCTION_NAME, &NoopHelper, Arguments::new())
            .await
            .unwrap()
    }

    #[test]
    fn spec_declares_parameterless_function() {
        let specs = plugin(Canned::Empty).spec();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "getDebateStatus");
        assert_eq!(
            specs[0].parameters,
            json!({"type": "object", "properties": {}, "required": []})
        );
        assert_eq!(plugin(Canned::Empty).source_name(), "debateStatus");
    }

    #[tokio::test]
    async fn returns_latest_record() {
        let result = run(&plugin(Canned::Row("active", "Q?"))).await;
        assert_eq!(
            result,
            ExecutionResult::success(
                200,
                json!({"state_of_debate": "active", "debate_question": "Q?"})
            )
        );
    }

    #[tokio::test]
    async fn empty_table_is_not_found() {
        let result = run(&plugin(Canned::Empty)).await;
        assert_eq!(
            result,
            ExecutionResult::failure(404, "No debate status or question found")
        );
    }

    #[tokio::test]
    async fn store_failure_becomes_500() {
        let result = run(&plugin(Canned::Fail("connection reset"))).await;
        assert_eq!(result.status, 500);
        assert!(result.data.is_none());
        let message = result.error.unwrap();
        let message = message.as_str().unwrap();
        assert!(message.starts_with("Failed to retrieve debate status and question"));
        assert!(message.contains("connection reset"));
    }

    #[tokio::test]
    async fn unknown_function_is_rejected() {
        let err = plugin(Canned::Row("active", "Q?"))
            .execute("newEntry", &NoopHelper, Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::UnknownFunction(name) if name == "newEntry"));
    }

    #[tokio::test]
    async fn null_question_is_returned_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/state_of_debate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"state_of_debate": "opening", "debate_question": null}
            ])))
            .mount(&server)
            .await;

        let config = StoreConfig::new(&server.uri(), "test-key").unwrap();
        let result = run(&DebateStatusPlugin::new(&config).unwrap()).await;
        assert_eq!(
            result,
            ExecutionResult::success(
                200,
                json!({"state_of_debate": "opening", "debate_question": null})
            )
        );
    }

    #[tokio::test]
    async fn rejected_credentials_become_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/state_of_debate"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})),
            )
            .mount(&server)
            .await;

        let config = StoreConfig::new(&server.uri(), "wrong-key").unwrap();
        let result = run(&DebateStatusPlugin::new(&config).unwrap()).await;
        assert_eq!(result.status, 500);
        assert!(result
            .error
            .unwrap()
            .as_str()
            .unwrap()
            .contains("Invalid API key"));
    }

    #[test]
    fn config_requires_both_variables() {
        let vars: HashMap<&str, &str> = [(URL_VAR, "https://example.supabase.co")].into();
        let err = StoreConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, PluginError::Configuration(_)));

        let vars: HashMap<&str, &str> =
            [(URL_VAR, "https://example.supabase.co"), (KEY_VAR, "")].into();
        assert!(StoreConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).is_err());
    }

    #[test]
    fn config_rejects_malformed_url() {
        let err = StoreConfig::new("not a url", "key").unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn config_reads_both_variables() {
        let vars: HashMap<&str, &str> =
            [(URL_VAR, "https://example.supabase.co"), (KEY_VAR, "secret")].into();
        let config =
            StoreConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.url.as_str(), "https://example.supabase.co/");
        assert_eq!(config.key, "secret");
    }
}

//! Client configuration.
//!
//! A [`ForumConfig`] is owned by every [`Session`](crate::Session). Values come
//! from [`Default`], an optional JSON file and a few environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Index page of the forum; every action goes through it.
pub const DEFAULT_FORUM_URL: &str = "https://tbgforums.com/forums/index.php";
/// AJAX chat endpoint.
pub const DEFAULT_CHAT_URL: &str = "https://tbgforums.com/forums/chat/";
/// Messages per topic page. Set by forum admins, not negotiable by clients.
pub const DEFAULT_TOPIC_PER_PAGE: u32 = 25;
/// Results per search page.
pub const DEFAULT_SEARCH_PER_PAGE: u32 = 30;

const ENV_FORUM_URL: &str = "TBG_FORUM_URL";
const ENV_CHAT_URL: &str = "TBG_CHAT_URL";
const ENV_TIMEOUT_SECS: &str = "TBG_TIMEOUT_SECS";

/// Settings shared by every request a session makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForumConfig {
    /// URL of the forum's `index.php`.
    pub forum_url: String,
    /// URL of the chat endpoint.
    pub chat_url: String,
    /// Messages per topic page, used to turn page numbers into offsets.
    pub topic_per_page: u32,
    /// Results per search page.
    pub search_per_page: u32,
    /// Per-request timeout. `None` waits forever.
    #[serde(with = "timeout_secs")]
    pub timeout: Option<Duration>,
    /// User agent sent with each request.
    pub user_agent: String,
    /// Turn responses with a status of 400 or above into request errors.
    pub raise_on_error_status: bool,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            forum_url: DEFAULT_FORUM_URL.to_string(),
            chat_url: DEFAULT_CHAT_URL.to_string(),
            topic_per_page: DEFAULT_TOPIC_PER_PAGE,
            search_per_page: DEFAULT_SEARCH_PER_PAGE,
            timeout: Some(Duration::from_secs(30)),
            user_agent: concat!("tbgclient/", env!("CARGO_PKG_VERSION")).to_string(),
            raise_on_error_status: true,
        }
    }
}

impl ForumConfig {
    /// Loads a configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|err| crate::Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `TBG_FORUM_URL`, `TBG_CHAT_URL` and `TBG_TIMEOUT_SECS` when set.
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(url) = std::env::var(ENV_FORUM_URL) {
            self.forum_url = url;
        }
        if let Ok(url) = std::env::var(ENV_CHAT_URL) {
            self.chat_url = url;
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| crate::Error::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}")))?;
            self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        self.validate()?;
        Ok(self)
    }

    /// Points the client at another installation, e.g. a local test server.
    pub fn with_forum_url(mut self, url: impl Into<String>) -> Self {
        self.forum_url = url.into();
        self
    }

    /// Sets the chat endpoint.
    pub fn with_chat_url(mut self, url: impl Into<String>) -> Self {
        self.chat_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> crate::Result<()> {
        for (name, value) in [("forumUrl", &self.forum_url), ("chatUrl", &self.chat_url)] {
            url::Url::parse(value).map_err(|err| crate::Error::Config(format!("{name} {value:?} is not a valid URL: {err}")))?;
        }
        if self.topic_per_page == 0 || self.search_per_page == 0 {
            return Err(crate::Error::Config("page sizes must be positive".to_string()));
        }
        Ok(())
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(timeout) => serializer.serialize_some(&timeout.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let Some(secs) = Option::<f64>::deserialize(deserializer)?.filter(|secs| *secs > 0.0) else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|err| D::Error::custom(format!("timeout of {secs} seconds: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tbg.json");
        std::fs::write(&path, r#"{"forumUrl": "http://127.0.0.1:8080/index.php", "timeout": 2.5}"#).unwrap();

        let config = ForumConfig::from_file(&path).unwrap();
        assert_eq!(config.forum_url, "http://127.0.0.1:8080/index.php");
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.topic_per_page, DEFAULT_TOPIC_PER_PAGE);
        assert!(config.raise_on_error_status);
    }

    #[test]
    fn null_timeout_disables_it() {
        let config: ForumConfig = serde_json::from_str(r#"{"timeout": null}"#).unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn oversized_timeout_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tbg.json");
        std::fs::write(&path, r#"{"timeout": 1e300}"#).unwrap();

        let err = ForumConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Config(ref message) if message.contains("timeout")), "{err:?}");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tbg.json");
        std::fs::write(&path, r#"{"forumUrl": "not a url"}"#).unwrap();

        let err = ForumConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}

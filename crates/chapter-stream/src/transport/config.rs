use std::time::Duration;

use crate::config::{env_value, parse_env};
use crate::errors::{GenerationError, TransportError};

/// Configuration for the HTTP generation transport.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Base URL of the novel backend.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Connect timeout. The stream itself has no read deadline; use
    /// `ControllerOptions::stall_timeout` to bound silent streams.
    pub connect_timeout: Duration,
}

impl HttpTransportConfig {
    /// Creates a config with default timeouts and no credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Builds a config from `CHAPTER_STREAM_BASE_URL`,
    /// `CHAPTER_STREAM_API_KEY` and `CHAPTER_STREAM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, GenerationError> {
        let base_url = env_value("CHAPTER_STREAM_BASE_URL").ok_or_else(|| {
            GenerationError::config("missing CHAPTER_STREAM_BASE_URL for HTTP transport")
        })?;
        let mut config = Self::new(base_url);
        config.api_key = env_value("CHAPTER_STREAM_API_KEY");
        if let Some(secs) = parse_env::<u64>("CHAPTER_STREAM_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Sets the bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Streaming endpoint for `project_id`.
    ///
    /// The id is appended as a single escaped path segment, so `/`, `?`
    /// and `#` inside it cannot change which endpoint is called.
    pub(crate) fn stream_url(&self, project_id: &str) -> Result<reqwest::Url, TransportError> {
        if matches!(project_id, "" | "." | "..") {
            return Err(TransportError::protocol(format!(
                "project id {project_id:?} is not a usable path segment"
            )));
        }
        let mut url = reqwest::Url::parse(self.base_url.trim()).map_err(|e| {
            TransportError::protocol(format!("invalid base_url {:?}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::protocol(format!("base_url {:?} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "novel", "projects", project_id, "chapters", "stream"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_trims_trailing_slash() {
        let config = HttpTransportConfig::new("http://localhost:8000/");
        assert_eq!(
            config.stream_url("p1").expect("url").as_str(),
            "http://localhost:8000/api/v1/novel/projects/p1/chapters/stream"
        );
    }

    #[test]
    fn stream_url_keeps_base_path_prefix() {
        let config = HttpTransportConfig::new("https://novels.example/backend");
        assert_eq!(
            config.stream_url("p1").expect("url").as_str(),
            "https://novels.example/backend/api/v1/novel/projects/p1/chapters/stream"
        );
    }

    #[test]
    fn project_id_is_escaped_as_one_segment() {
        let config = HttpTransportConfig::new("http://h");
        let url = config.stream_url("a/../b?x=1#f").expect("url");
        assert_eq!(
            url.as_str(),
            "http://h/api/v1/novel/projects/a%2F..%2Fb%3Fx=1%23f/chapters/stream"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn dot_segments_and_bad_base_are_rejected() {
        let config = HttpTransportConfig::new("http://h");
        assert!(matches!(config.stream_url(".."), Err(TransportError::Protocol(_))));
        assert!(matches!(
            HttpTransportConfig::new("not a url").stream_url("p1"),
            Err(TransportError::Protocol(_))
        ));
    }
}

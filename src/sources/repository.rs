//! Repository handles and credential resolution.
//!
//! A Repository is the product of registering a `[[tool.poetry.source]]`
//! entry: a validated name and URL, plus HTTP basic credentials when the
//! effective configuration stores some. Resolution is a pure lookup, no
//! network I/O; anonymous access is a normal outcome, not an error.

use std::fmt;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::util::config::Config;

/// Error while registering a package source.
///
/// Fatal for that source only; unrelated registrations are unaffected.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("unsupported source specified")]
    #[diagnostic(
        code(stanza::source::unsupported),
        help("a source entry needs at least a url")
    )]
    UnsupportedSource,

    #[error("missing [name] in [[tool.poetry.source]]")]
    #[diagnostic(code(stanza::source::missing_name))]
    MissingSourceName,

    #[error("invalid url `{url}` for source `{name}`")]
    #[diagnostic(code(stanza::source::invalid_url))]
    InvalidUrl {
        name: String,
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A `[[tool.poetry.source]]` entry as written in the manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Source name, used for credential lookup
    #[serde(default)]
    pub name: Option<String>,

    /// Index URL
    #[serde(default)]
    pub url: Option<String>,

    /// Whether this source replaces the default index
    #[serde(default)]
    pub default: bool,

    /// Whether this source is only searched after the default index
    #[serde(default)]
    pub secondary: bool,
}

/// HTTP basic credentials for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBasicAuth {
    /// Account name
    pub username: String,

    /// Password; None when it lives in an external keyring
    pub password: Option<String>,
}

/// A registered package repository.
#[derive(Debug, Clone)]
pub struct Repository {
    /// Source name
    name: String,

    /// Index URL
    url: Url,

    /// Credentials, when the configuration stores some
    auth: Option<HttpBasicAuth>,
}

impl Repository {
    /// Create an unauthenticated repository.
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Repository {
            name: name.into(),
            url,
            auth: None,
        }
    }

    /// Attach credentials.
    pub fn with_auth(mut self, auth: HttpBasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Register a source entry, resolving credentials from the
    /// effective configuration.
    ///
    /// A source without a url is unsupported; one with a url but no name
    /// cannot be credential-resolved and is rejected too.
    pub fn from_source(source: &SourceConfig, config: &Config) -> Result<Self, SourceError> {
        let url = source.url.as_deref().ok_or(SourceError::UnsupportedSource)?;
        let name = source.name.as_deref().ok_or(SourceError::MissingSourceName)?;

        let url = Url::parse(url).map_err(|parse_err| SourceError::InvalidUrl {
            name: name.to_string(),
            url: url.to_string(),
            source: parse_err,
        })?;

        let mut repository = Repository::new(name, url);
        if let Some(auth) = resolve_credentials(config, name) {
            tracing::debug!("resolved http-basic credentials for repository `{}`", name);
            repository = repository.with_auth(auth);
        }

        Ok(repository)
    }

    /// Get the source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the index URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the credentials, if any.
    pub fn auth(&self) -> Option<&HttpBasicAuth> {
        self.auth.as_ref()
    }

    /// Check whether this repository carries credentials.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

fn resolve_credentials(config: &Config, name: &str) -> Option<HttpBasicAuth> {
    let entry = config.get(&format!("http-basic.{}", name))?.as_table()?;
    let username = entry.get("username")?.as_str()?.to_string();
    let password = entry
        .get("password")
        .and_then(|value| value.as_str())
        .map(str::to_string);

    Some(HttpBasicAuth { username, password })
}

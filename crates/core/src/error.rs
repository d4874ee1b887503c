//! Error types for soltap
//!
//! Two families live here. [`TapError`] covers the runner itself (config,
//! IO, build aborts). [`Failure`] is what test handlers return: it carries a
//! message, optional assertion metadata and the call sites it passed through.

use std::fmt;

use thiserror::Error;

use crate::locator::CallSite;

/// Result type alias for runner operations
pub type TapResult<T> = std::result::Result<T, TapError>;

/// Runner error types
#[derive(Error, Debug)]
pub enum TapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("A locator is already active in this process")]
    LocatorBusy,

    #[error("Build failed at {}: {failure}", .path.join(" / "))]
    Build { path: Vec<String>, failure: Failure },

    #[error("Unknown suite: {0}")]
    UnknownSuite(String),
}

/// Structured metadata of a failed assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub operator: String,
    pub actual: String,
    pub expected: String,
}

/// Error raised by a hook or case handler.
///
/// Any `std::error::Error` converts into a `Failure` through `?`, recording
/// the site of the `?` as the first call site. The blanket conversion requires
/// that `Failure` itself does not implement `std::error::Error`.
#[derive(Debug, Clone)]
pub struct Failure {
    message: String,
    assertion: Option<Assertion>,
    sites: Vec<CallSite>,
    location: Vec<String>,
}

impl Failure {
    /// Create a generic failure at the caller's location
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            assertion: None,
            sites: vec![CallSite::caller()],
            location: Vec::new(),
        }
    }

    /// Create a failure carrying assertion metadata
    #[track_caller]
    pub fn assertion_failed(message: impl Into<String>, assertion: Assertion) -> Self {
        Self {
            assertion: Some(assertion),
            ..Self::new(message)
        }
    }

    /// Failure built from a caught panic. The site is whatever the panic hook
    /// saw, if a locator was active.
    pub(crate) fn from_panic(message: String, site: Option<CallSite>) -> Self {
        Self {
            message,
            assertion: None,
            sites: site.into_iter().collect(),
            location: Vec::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn assertion(&self) -> Option<&Assertion> {
        self.assertion.as_ref()
    }

    /// Raw call sites, innermost first
    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    /// Rendered `file:line:column` entries. Empty until a locator annotates
    /// the failure.
    pub fn location(&self) -> &[String] {
        &self.location
    }

    /// Append an outer call site
    pub fn push_site(&mut self, site: CallSite) {
        self.sites.push(site);
    }

    pub(crate) fn set_location(&mut self, location: Vec<String>) {
        self.location = location;
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl<E> From<E> for Failure
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[track_caller]
    fn from(error: E) -> Self {
        Failure::new(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_number(input: &str) -> Result<u32, Failure> {
        let value: u32 = input.parse()?;
        Ok(value)
    }

    #[test]
    fn test_question_mark_records_site() {
        let failure = parse_number("nope").unwrap_err();
        assert_eq!(failure.message(), "invalid digit found in string");
        assert_eq!(failure.sites().len(), 1);
        assert!(failure.sites()[0].file.ends_with("error.rs"));
        assert!(failure.assertion().is_none());
    }

    #[test]
    fn test_assertion_failed_keeps_metadata() {
        let failure = Failure::assertion_failed(
            "expected 1 to equal 2",
            Assertion {
                operator: "equal".into(),
                actual: "1".into(),
                expected: "2".into(),
            },
        );
        let assertion = failure.assertion().unwrap();
        assert_eq!(assertion.operator, "equal");
        assert_eq!(failure.to_string(), "expected 1 to equal 2");
    }

    #[test]
    fn test_build_error_display_joins_path() {
        let error = TapError::Build {
            path: vec!["Token".into(), "#mint()".into()],
            failure: Failure::new("fixture missing"),
        };
        assert_eq!(error.to_string(), "Build failed at Token / #mint(): fixture missing");
    }
}

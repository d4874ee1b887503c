//! Assertions for case handlers
//!
//! Each assertion returns a [`CaseResult`] so handlers can chain them with
//! `?`. Failures carry `operator`, `actual` and `expected` (rendered with
//! `Debug`) and the caller's location.

use std::fmt::{self, Debug};
use std::future::Future;

use regex::Regex;

use crate::action::CaseResult;
use crate::error::{Assertion, Failure};

/// Fail unless `actual == expected`
#[track_caller]
pub fn equal<A, E>(actual: A, expected: E) -> CaseResult
where
    A: PartialEq<E> + Debug,
    E: Debug,
{
    if actual == expected {
        return Ok(());
    }
    Err(failed(
        format!("expected {:?} to equal {:?}", actual, expected),
        "equal",
        format!("{:?}", actual),
        format!("{:?}", expected),
    ))
}

/// Fail when `actual == expected`
#[track_caller]
pub fn not_equal<A, E>(actual: A, expected: E) -> CaseResult
where
    A: PartialEq<E> + Debug,
    E: Debug,
{
    if actual != expected {
        return Ok(());
    }
    Err(failed(
        format!("expected {:?} to not equal {:?}", actual, expected),
        "notEqual",
        format!("{:?}", actual),
        format!("{:?}", expected),
    ))
}

/// Fail unless `value` is true
#[track_caller]
pub fn ok(value: bool) -> CaseResult {
    if value {
        return Ok(());
    }
    Err(failed(
        "expected value to be truthy".to_string(),
        "ok",
        "false".to_string(),
        "true".to_string(),
    ))
}

#[track_caller]
fn failed(message: String, operator: &str, actual: String, expected: String) -> Failure {
    Failure::assertion_failed(
        message,
        Assertion {
            operator: operator.to_string(),
            actual,
            expected,
        },
    )
}

/// How [`throws`] recognizes the expected failure
pub enum Check {
    /// Message equals the string
    Message(String),
    /// Message matches the pattern
    Pattern(Regex),
    Predicate(Box<dyn Fn(&Failure) -> bool + Send + Sync>),
}

impl Check {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Failure) -> bool + Send + Sync + 'static,
    {
        Check::Predicate(Box::new(predicate))
    }

    pub fn matches(&self, failure: &Failure) -> bool {
        match self {
            Check::Message(message) => failure.message() == message,
            Check::Pattern(pattern) => pattern.is_match(failure.message()),
            Check::Predicate(predicate) => predicate(failure),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Check::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Check::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for Check {
    fn from(message: &str) -> Self {
        Check::Message(message.to_string())
    }
}

impl From<String> for Check {
    fn from(message: String) -> Self {
        Check::Message(message)
    }
}

impl From<Regex> for Check {
    fn from(pattern: Regex) -> Self {
        Check::Pattern(pattern)
    }
}

/// Await `future` expecting it to fail.
///
/// Returns `Ok(true)` when it failed in a way `check` accepts, `Ok(false)`
/// when it succeeded, and passes any other failure through unchanged.
pub async fn throws<T, Fut>(check: impl Into<Check>, future: Fut) -> Result<bool, Failure>
where
    Fut: Future<Output = Result<T, Failure>>,
{
    let check = check.into();
    match future.await {
        Ok(_) => Ok(false),
        Err(failure) if check.matches(&failure) => Ok(true),
        Err(failure) => Err(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_passes_and_fails_with_metadata() {
        assert!(equal(2 + 2, 4).is_ok());

        let failure = equal("10", "20").unwrap_err();
        let assertion = failure.assertion().unwrap();
        assert_eq!(failure.message(), "expected \"10\" to equal \"20\"");
        assert_eq!(assertion.operator, "equal");
        assert_eq!(assertion.actual, "\"10\"");
        assert_eq!(assertion.expected, "\"20\"");
        assert!(failure.sites()[0].file.ends_with("assert.rs"));
    }

    #[test]
    fn test_equal_across_types() {
        let owned = String::from("main");
        assert!(equal(owned, "main").is_ok());
    }

    #[test]
    fn test_not_equal_and_ok() {
        assert!(not_equal(1, 2).is_ok());
        assert_eq!(not_equal(1, 1).unwrap_err().assertion().unwrap().operator, "notEqual");
        assert!(ok(true).is_ok());
        assert_eq!(ok(false).unwrap_err().assertion().unwrap().actual, "false");
    }

    #[tokio::test]
    async fn test_throws_matches_pattern() {
        let pattern = Regex::new("not_released_only").unwrap();
        let caught = throws(pattern, async {
            Err::<(), _>(Failure::new("VM Exception: revert not_released_only"))
        })
        .await
        .unwrap();
        assert!(caught);
    }

    #[tokio::test]
    async fn test_throws_reports_success_as_false() {
        let caught = throws("anything", async { Ok::<_, Failure>(1) }).await.unwrap();
        assert!(!caught);
    }

    #[tokio::test]
    async fn test_throws_passes_through_other_failures() {
        let failure = throws("expected", async { Err::<(), _>(Failure::new("different")) })
            .await
            .unwrap_err();
        assert_eq!(failure.message(), "different");

        let caught = throws(
            Check::predicate(|f| f.message().starts_with("diff")),
            async { Err::<(), _>(Failure::new("different")) },
        )
        .await
        .unwrap();
        assert!(caught);
    }
}

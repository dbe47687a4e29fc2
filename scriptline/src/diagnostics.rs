//! Diagnostics and the two-variant result every stage returns.
//!
//! A [`ScriptResult`] is either a success (with an optional value) or a
//! failure; both carry the ordered list of [`Diagnostic`]s emitted so far.
//! Stages never stop at the first report: warnings ride along with
//! successes, and a failure keeps everything accumulated upstream.

use std::fmt;
use std::sync::Arc;

use crate::{error::ScriptError, span::Location};

/// How serious a [`Diagnostic`] is. Only `Error` fails a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// The error a diagnostic wraps, shared so diagnostics stay cloneable.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A single reported message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub location: Option<Location>,
    pub cause: Option<Cause>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            location: None,
            cause: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(Severity::Debug, message)
    }

    /// An ERROR diagnostic wrapping `err`. The message is `custom` when
    /// given, otherwise the error's own text.
    pub fn from_error<E>(
        err: E,
        custom: Option<&str>,
        location: Option<Location>,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_cause(Arc::new(err), custom, location)
    }

    pub fn from_cause(
        cause: Cause,
        custom: Option<&str>,
        location: Option<Location>,
    ) -> Self {
        let message = match custom {
            Some(message) => message.to_string(),
            None => cause.to_string(),
        };
        Self {
            message,
            severity: Severity::Error,
            location,
            cause: Some(cause),
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<ScriptError> for Diagnostic {
    fn from(err: ScriptError) -> Self {
        Diagnostic::from_error(err, None, None)
    }
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.severity == other.severity
            && self.location == other.location
            && self.cause.is_some() == other.cause.is_some()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(location) = self.location {
            write!(f, " ({location})")?;
        }
        Ok(())
    }
}

/// Outcome of a pipeline stage.
#[derive(Debug, Clone)]
pub enum ScriptResult<T> {
    /// The stage completed. `value` may be absent for stages that declare
    /// no output.
    Success {
        value: Option<T>,
        reports: Vec<Diagnostic>,
    },
    /// The stage failed; `reports` holds at least one ERROR.
    Failure { reports: Vec<Diagnostic> },
}

impl<T> ScriptResult<T> {
    pub fn success(value: T) -> Self {
        Self::Success {
            value: Some(value),
            reports: Vec::new(),
        }
    }

    pub fn success_with(value: T, reports: Vec<Diagnostic>) -> Self {
        Self::Success {
            value: Some(value),
            reports,
        }
    }

    /// A success that carries no value.
    pub fn empty(reports: Vec<Diagnostic>) -> Self {
        Self::Success {
            value: None,
            reports,
        }
    }

    pub fn failure(reports: Vec<Diagnostic>) -> Self {
        debug_assert!(
            reports.iter().any(Diagnostic::is_error),
            "failure without an ERROR diagnostic"
        );
        Self::Failure { reports }
    }

    /// Shorthand for a failure with a single diagnostic built from `err`.
    pub fn from_error(err: ScriptError) -> Self {
        Self::Failure {
            reports: vec![err.into()],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn reports(&self) -> &[Diagnostic] {
        match self {
            Self::Success { reports, .. } | Self::Failure { reports } => {
                reports
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.reports().iter().any(Diagnostic::is_error)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => value.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value, .. } => value,
            Self::Failure { .. } => None,
        }
    }

    /// Put `earlier` ahead of this result's own reports, keeping the tag
    /// and the value.
    pub fn prepend(self, mut earlier: Vec<Diagnostic>) -> Self {
        match self {
            Self::Success { value, reports } => {
                earlier.extend(reports);
                Self::Success {
                    value,
                    reports: earlier,
                }
            }
            Self::Failure { reports } => {
                earlier.extend(reports);
                Self::Failure { reports: earlier }
            }
        }
    }

    /// Re-tag a failure for a caller with a different success type.
    ///
    /// # Panics
    /// Panics when called on a success; the value would be lost.
    pub fn convert<U>(self) -> ScriptResult<U> {
        match self {
            Self::Failure { reports } => ScriptResult::Failure { reports },
            Self::Success { .. } => {
                panic!("convert() called on a successful result")
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ScriptResult<U> {
        match self {
            Self::Success { value, reports } => ScriptResult::Success {
                value: value.map(f),
                reports,
            },
            Self::Failure { reports } => ScriptResult::Failure { reports },
        }
    }

    /// Run the next stage on the value, concatenating reports.
    ///
    /// A success without a value short-circuits into an empty success.
    pub fn and_then<U>(
        self,
        f: impl FnOnce(T) -> ScriptResult<U>,
    ) -> ScriptResult<U> {
        match self {
            Self::Success {
                value: Some(value),
                reports,
            } => f(value).prepend(reports),
            Self::Success {
                value: None,
                reports,
            } => ScriptResult::Success {
                value: None,
                reports,
            },
            Self::Failure { reports } => ScriptResult::Failure { reports },
        }
    }
}

/// Combine results: all reports in order, success only if all succeeded.
pub fn combine<T>(
    results: impl IntoIterator<Item = ScriptResult<T>>,
) -> ScriptResult<Vec<T>> {
    let mut values = Vec::new();
    let mut reports = Vec::new();
    let mut failed = false;
    for result in results {
        match result {
            ScriptResult::Success { value, reports: r } => {
                values.extend(value);
                reports.extend(r);
            }
            ScriptResult::Failure { reports: r } => {
                failed = true;
                reports.extend(r);
            }
        }
    }
    if failed {
        ScriptResult::Failure { reports }
    } else {
        ScriptResult::success_with(values, reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    fn messages<T>(result: &ScriptResult<T>) -> Vec<&str> {
        result.reports().iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn prepend_keeps_success_and_value() {
        let result = ScriptResult::success_with(7, vec![Diagnostic::info("b")])
            .prepend(vec![Diagnostic::warning("a")]);
        assert!(result.is_success());
        assert_eq!(result.value(), Some(&7));
        assert_eq!(messages(&result), ["a", "b"]);
    }

    #[test]
    fn prepend_keeps_failure() {
        let result: ScriptResult<i32> =
            ScriptResult::failure(vec![Diagnostic::error("boom")])
                .prepend(vec![Diagnostic::warning("first")]);
        assert!(result.is_failure());
        assert_eq!(messages(&result), ["first", "boom"]);
    }

    #[test]
    fn convert_copies_reports() {
        let failure: ScriptResult<String> =
            ScriptResult::failure(vec![Diagnostic::error("nope")]);
        let converted: ScriptResult<u8> = failure.convert();
        assert!(converted.is_failure());
        assert_eq!(messages(&converted), ["nope"]);
    }

    #[test]
    #[should_panic(expected = "convert() called on a successful result")]
    fn convert_rejects_success() {
        let _: ScriptResult<u8> = ScriptResult::success(1).convert();
    }

    #[test]
    fn and_then_accumulates_left_to_right() {
        let result = ScriptResult::success_with(1, vec![Diagnostic::info("one")])
            .and_then(|v| {
                ScriptResult::success_with(v + 1, vec![Diagnostic::info("two")])
            });
        assert_eq!(result.value(), Some(&2));
        assert_eq!(messages(&result), ["one", "two"]);
    }

    #[test]
    fn and_then_skips_after_failure() {
        let mut called = false;
        let result: ScriptResult<i32> =
            ScriptResult::<i32>::failure(vec![Diagnostic::error("stop")])
                .and_then(|v| {
                    called = true;
                    ScriptResult::success(v)
                });
        assert!(!called);
        assert!(result.is_failure());
    }

    #[test]
    fn empty_success_has_no_value() {
        let result: ScriptResult<i32> = ScriptResult::empty(Vec::new());
        assert!(result.is_success());
        assert!(result.value().is_none());
        assert!(!result.has_errors());
    }

    #[test]
    fn combine_all_or_nothing() {
        let ok = combine(vec![
            ScriptResult::success_with(1, vec![Diagnostic::warning("w")]),
            ScriptResult::success(2),
        ]);
        assert_eq!(ok.value(), Some(&vec![1, 2]));

        let bad = combine(vec![
            ScriptResult::success_with(1, vec![Diagnostic::warning("w")]),
            ScriptResult::failure(vec![Diagnostic::error("e")]),
        ]);
        assert!(bad.is_failure());
        assert_eq!(messages(&bad), ["w", "e"]);
    }

    #[test]
    fn from_error_uses_error_text_unless_overridden() {
        let err = std::io::Error::other("disk on fire");
        let diagnostic = Diagnostic::from_error(err, None, None);
        assert_eq!(diagnostic.message, "disk on fire");
        assert!(diagnostic.is_error());
        assert!(diagnostic.cause.is_some());

        let err = std::io::Error::other("disk on fire");
        let location = Location::at(Position::new(2, 3));
        let diagnostic =
            Diagnostic::from_error(err, Some("read failed"), Some(location));
        assert_eq!(diagnostic.message, "read failed");
        assert_eq!(diagnostic.location, Some(location));
    }

    #[test]
    fn display_includes_severity_and_location() {
        let diagnostic = Diagnostic::warning("unused")
            .with_location(Location::at(Position::new(1, 4)));
        assert_eq!(diagnostic.to_string(), "warning: unused (1:4)");
    }
}

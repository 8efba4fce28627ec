use serde::{Deserialize, Serialize};

/// Category of a failed command or query.
///
/// Every crate-level error maps onto exactly one kind, which is what callers
/// (e.g. the HTTP layer) branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request is invalid for the current state (e.g. unknown basket line).
    ValidationFailure,
    /// The stream changed between load and append.
    ConcurrencyConflict,
    /// The basket or its projection does not exist.
    NotFound,
    /// A store or external API was unreachable or returned an error.
    DependencyFailure,
    /// Anything uncategorized.
    UnexpectedFailure,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::ValidationFailure => "validation_failure",
            FailureKind::ConcurrencyConflict => "concurrency_conflict",
            FailureKind::NotFound => "not_found",
            FailureKind::DependencyFailure => "dependency_failure",
            FailureKind::UnexpectedFailure => "unexpected_failure",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serialized_form() {
        let kind = FailureKind::ConcurrencyConflict;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, format!("\"{kind}\""));
    }
}

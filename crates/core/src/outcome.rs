//! Tagged result for operations that always produce a value for display
//! but need to record whether that value is real or substituted.

use serde::Serialize;

/// Why a fallback value was substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The request never produced an HTTP response.
    Transport(String),
    /// The endpoint answered with a non-success status.
    Status(u16),
    /// The response envelope could not be decoded.
    MalformedResponse(String),
    /// The envelope decoded but carried no candidate text.
    EmptyResponse,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Transport(msg) => write!(f, "transport error: {}", msg),
            FallbackReason::Status(code) => write!(f, "endpoint returned status {}", code),
            FallbackReason::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            FallbackReason::EmptyResponse => write!(f, "response contained no candidates"),
        }
    }
}

/// Result of an operation that may substitute a default instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The value came from the real source.
    Ok(T),
    /// The source failed; `value` is the canned default.
    Fallback { value: T, reason: FallbackReason },
    /// No value could be produced at all.
    Failed(FallbackReason),
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok(v) | Outcome::Fallback { value: v, .. } => Some(v),
            Outcome::Failed(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Fallback { reason, .. } | Outcome::Failed(reason) => Some(reason),
        }
    }

    /// Collapse to the bare value, using `default` when nothing was produced.
    pub fn into_value_or(self, default: T) -> T {
        match self {
            Outcome::Ok(v) | Outcome::Fallback { value: v, .. } => v,
            Outcome::Failed(_) => default,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Fallback { value, reason } => Outcome::Fallback {
                value: f(value),
                reason,
            },
            Outcome::Failed(reason) => Outcome::Failed(reason),
        }
    }

    /// Short label used in logs and API responses.
    pub fn origin(&self) -> &'static str {
        match self {
            Outcome::Ok(_) => "model",
            Outcome::Fallback { .. } => "fallback",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_still_exposes_value() {
        let o = Outcome::Fallback {
            value: 3,
            reason: FallbackReason::Status(503),
        };
        assert_eq!(o.value(), Some(&3));
        assert!(o.is_fallback());
        assert_eq!(o.origin(), "fallback");
        assert_eq!(o.reason(), Some(&FallbackReason::Status(503)));
    }

    #[test]
    fn failed_uses_default() {
        let o: Outcome<i32> = Outcome::Failed(FallbackReason::EmptyResponse);
        assert_eq!(o.value(), None);
        assert_eq!(o.into_value_or(7), 7);
    }

    #[test]
    fn map_preserves_tag() {
        let o = Outcome::Fallback {
            value: 2,
            reason: FallbackReason::Transport("refused".into()),
        };
        let mapped = o.map(|v| v * 10);
        assert_eq!(mapped.value(), Some(&20));
        assert!(mapped.is_fallback());
    }

    #[test]
    fn reason_serializes_tagged() {
        let json = serde_json::to_value(FallbackReason::Status(500)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "status", "detail": 500}));
    }
}

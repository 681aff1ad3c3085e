//! Pure classification of raw log entries into runner intents.
//!
//! [`interpret`] is deterministic, performs no I/O and never blocks, so the
//! full producer-facing contract is unit-testable without a running broker.
use serde::{Deserialize, Serialize};

use crate::{FIELD_ACTION, FIELD_PARAMETERS, JobParams, Message, PARAM_CHANNEL};

/// What the runner should do with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    /// Spawn a worker process for the given channel.
    Launch {
        /// Routing key extracted from the parameter mapping.
        channel: String,
        /// Full parameter mapping, passed to the worker verbatim
        /// (still includes the channel entry).
        params: JobParams,
    },
    /// Stop accepting new work and drain.
    Shutdown,
    /// Message is not actionable; retire it and move on.
    Ignore {
        /// Why the message was ignored.
        reason: IgnoreReason,
    },
}

impl Intent {
    /// Returns the intent as a static string for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Launch { .. } => "launch",
            Intent::Shutdown => "shutdown",
            Intent::Ignore { .. } => "ignore",
        }
    }
}

/// Why a message yielded [`Intent::Ignore`].
///
/// Only [`IgnoreReason::Malformed`] indicates a producer contract
/// violation worth counting as a fault; the other variants are benign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    /// No `action` field present.
    MissingAction,
    /// Unrecognized `action` value.
    UnknownAction(String),
    /// A `launch` message that fails parameter validation.
    Malformed(String),
}

impl IgnoreReason {
    /// Whether this reason represents a malformed `launch` message.
    pub fn is_malformed(&self) -> bool {
        matches!(self, IgnoreReason::Malformed(_))
    }

    /// Returns a short stable label for logs and fault signatures.
    pub fn as_label(&self) -> &'static str {
        match self {
            IgnoreReason::MissingAction => "missing_action",
            IgnoreReason::UnknownAction(_) => "unknown_action",
            IgnoreReason::Malformed(_) => "malformed_message",
        }
    }
}

/// Classify a message into an [`Intent`].
///
/// Rules:
/// - `action == "launch"`: the [`FIELD_PARAMETERS`] field must hold a JSON
///   object of strings carrying a non-empty [`PARAM_CHANNEL`]; violations
///   yield [`IgnoreReason::Malformed`].
/// - `action` in `close` / `terminate` / `stop`: [`Intent::Shutdown`].
/// - anything else, or a missing `action`: benign [`Intent::Ignore`].
pub fn interpret(message: &Message) -> Intent {
    let Some(action) = message.fields().get(FIELD_ACTION) else {
        return Intent::Ignore {
            reason: IgnoreReason::MissingAction,
        };
    };

    match action {
        "launch" => interpret_launch(message),
        "close" | "terminate" | "stop" => Intent::Shutdown,
        other => Intent::Ignore {
            reason: IgnoreReason::UnknownAction(other.to_string()),
        },
    }
}

fn interpret_launch(message: &Message) -> Intent {
    let Some(raw) = message.fields().get(FIELD_PARAMETERS) else {
        return malformed(format!("missing '{FIELD_PARAMETERS}' field"));
    };

    let params = match JobParams::from_json(raw) {
        Ok(params) => params,
        Err(e) => return malformed(e.to_string()),
    };

    let channel = match params.channel() {
        Some(c) if !c.trim().is_empty() => c.to_string(),
        Some(_) => return malformed(format!("'{PARAM_CHANNEL}' parameter is empty")),
        None => return malformed(format!("missing '{PARAM_CHANNEL}' parameter")),
    };
    Intent::Launch { channel, params }
}

fn malformed(detail: String) -> Intent {
    Intent::Ignore {
        reason: IgnoreReason::Malformed(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::{IgnoreReason, Intent, interpret};
    use crate::{Fields, Message, MessageId};

    fn mk_message(fields: &[(&str, &str)]) -> Message {
        let fields: Fields = fields.iter().copied().collect();
        Message::new(MessageId::from("1-0"), fields)
    }

    #[test]
    fn launch_with_channel_yields_launch() {
        let msg = mk_message(&[
            ("action", "launch"),
            ("parameters", r#"{"channel":"eval-1","config":"ref"}"#),
        ]);

        match interpret(&msg) {
            Intent::Launch { channel, params } => {
                assert_eq!(channel, "eval-1");
                assert_eq!(params.get("config"), Some("ref"));
                assert_eq!(params.channel(), Some("eval-1"));
            }
            other => panic!("expected Launch, got {other:?}"),
        }
    }

    #[test]
    fn launch_without_parameters_is_malformed() {
        let msg = mk_message(&[("action", "launch")]);

        match interpret(&msg) {
            Intent::Ignore { reason } => {
                assert!(reason.is_malformed());
                assert_eq!(reason.as_label(), "malformed_message");
            }
            other => panic!("expected Ignore, got {other:?}"),
        }
    }

    #[test]
    fn launch_with_invalid_json_is_malformed() {
        for raw in [r#"not-json"#, r#"["a"]"#, r#"{"channel":7}"#] {
            let msg = mk_message(&[("action", "launch"), ("parameters", raw)]);
            match interpret(&msg) {
                Intent::Ignore { reason } => assert!(reason.is_malformed(), "raw={raw}"),
                other => panic!("expected Ignore for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn launch_without_channel_is_malformed() {
        for raw in [r#"{}"#, r#"{"config":"ref"}"#, r#"{"channel":"  "}"#] {
            let msg = mk_message(&[("action", "launch"), ("parameters", raw)]);
            match interpret(&msg) {
                Intent::Ignore { reason } => assert!(reason.is_malformed(), "raw={raw}"),
                other => panic!("expected Ignore for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn close_synonyms_yield_shutdown() {
        for action in ["close", "terminate", "stop"] {
            let msg = mk_message(&[("action", action)]);
            assert_eq!(interpret(&msg), Intent::Shutdown, "action={action}");
        }
    }

    #[test]
    fn unknown_action_is_benign_ignore() {
        let msg = mk_message(&[("action", "reboot")]);

        match interpret(&msg) {
            Intent::Ignore { reason } => {
                assert!(!reason.is_malformed());
                assert_eq!(reason, IgnoreReason::UnknownAction("reboot".to_string()));
            }
            other => panic!("expected Ignore, got {other:?}"),
        }
    }

    #[test]
    fn missing_action_is_benign_ignore() {
        let msg = mk_message(&[("channel", "eval-1")]);

        match interpret(&msg) {
            Intent::Ignore { reason } => {
                assert_eq!(reason, IgnoreReason::MissingAction);
                assert_eq!(reason.as_label(), "missing_action");
            }
            other => panic!("expected Ignore, got {other:?}"),
        }
    }

    #[test]
    fn interpretation_is_deterministic() {
        let msg = mk_message(&[
            ("action", "launch"),
            ("parameters", r#"{"channel":"eval-1"}"#),
        ]);

        assert_eq!(interpret(&msg), interpret(&msg));
    }
}

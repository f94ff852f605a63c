//! Line-oriented command protocol for driving the limiters.
//!
//! Each input line is `<policy> <command> <identifier>`, where command is one
//! of `check`, `record`, `status` or `reset`. Each reply is one JSON object.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::trace;

use crate::error::{FloodgateError, Result};
use crate::ratelimit::{blocked_message, format_block_time, Limiters, Outcome, Policy, RateLimitStatus};

/// What to do with an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Check,
    Record,
    Status,
    Reset,
}

impl CommandKind {
    /// The command name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Check => "check",
            CommandKind::Record => "record",
            CommandKind::Status => "status",
            CommandKind::Reset => "reset",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = FloodgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "check" => Ok(CommandKind::Check),
            "record" => Ok(CommandKind::Record),
            "status" => Ok(CommandKind::Status),
            "reset" => Ok(CommandKind::Reset),
            other => Err(FloodgateError::Command(format!("unknown command '{}'", other))),
        }
    }
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub policy: Policy,
    pub kind: CommandKind,
    pub identifier: String,
}

impl Command {
    /// Parse a command line. Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();

        let Some(policy) = parts.next() else {
            return Ok(None);
        };
        let (Some(kind), Some(identifier), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(FloodgateError::Command(
                "expected '<policy> <command> <identifier>'".to_string(),
            ));
        };

        Ok(Some(Self {
            policy: policy.parse()?,
            kind: kind.parse()?,
            identifier: identifier.to_string(),
        }))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.policy, self.kind, self.identifier)
    }
}

/// The reply to a single command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub policy: Policy,
    pub command: CommandKind,
    pub identifier: String,
    #[serde(flatten)]
    pub body: ReplyBody,
}

/// Command-specific reply fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    Check {
        allowed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        block_expiry: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_in: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Status(RateLimitStatus),
    Done { ok: bool },
}

/// An error reply for a line that could not be handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReply {
    pub error: String,
}

/// Apply `command` to the matching limiter.
pub fn execute(limiters: &Limiters, command: &Command) -> Reply {
    let limiter = limiters.get(command.policy);
    let identifier = command.identifier.as_str();

    trace!(command = %command, "Executing command");

    let body = match command.kind {
        CommandKind::Check => match limiter.check(identifier) {
            Outcome::Admitted => ReplyBody::Check {
                allowed: true,
                block_expiry: None,
                retry_in: None,
                message: None,
            },
            Outcome::Blocked { expiry } => {
                let now = limiter.clock().now_millis();
                ReplyBody::Check {
                    allowed: false,
                    block_expiry: Some(expiry),
                    retry_in: Some(format_block_time(expiry, now)),
                    message: Some(blocked_message(expiry, now)),
                }
            }
        },
        CommandKind::Record => {
            limiter.record_attempt(identifier);
            ReplyBody::Done { ok: true }
        }
        CommandKind::Status => ReplyBody::Status(limiter.status(identifier)),
        CommandKind::Reset => {
            limiter.reset(identifier);
            ReplyBody::Done { ok: true }
        }
    };

    Reply {
        policy: command.policy,
        command: command.kind,
        identifier: command.identifier.clone(),
        body,
    }
}

/// Handle one input line, producing the JSON reply or `None` for blank lines.
pub fn handle_line(limiters: &Limiters, line: &str) -> Result<Option<String>> {
    let json = match Command::parse(line) {
        Ok(Some(command)) => serde_json::to_string(&execute(limiters, &command))?,
        Ok(None) => return Ok(None),
        Err(e) => serde_json::to_string(&ErrorReply {
            error: e.to_string(),
        })?,
    };
    Ok(Some(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn create_test_limiters() -> Limiters {
        Limiters::new(Arc::new(ManualClock::new(1_700_000_000_000)))
    }

    fn reply(limiters: &Limiters, line: &str) -> Value {
        let out = handle_line(limiters, line).unwrap().unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn test_parse_command() {
        let command = Command::parse("login check fp_x").unwrap().unwrap();
        assert_eq!(command.policy, Policy::Login);
        assert_eq!(command.kind, CommandKind::Check);
        assert_eq!(command.identifier, "fp_x");

        assert_eq!(Command::parse("   ").unwrap(), None);
        assert!(Command::parse("login check").is_err());
        assert!(Command::parse("login check fp_x extra").is_err());
        assert!(Command::parse("login frobnicate fp_x").is_err());
        assert!(matches!(
            Command::parse("signup check fp_x"),
            Err(FloodgateError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_command_display_uses_wire_names() {
        let command = Command::parse("contact_form record fp_x").unwrap().unwrap();
        assert_eq!(command.to_string(), "contact_form record fp_x");

        for line in ["login check a", "api status b", "registration reset c"] {
            assert_eq!(Command::parse(line).unwrap().unwrap().to_string(), line);
        }
    }

    #[test]
    fn test_check_then_block() {
        let limiters = create_test_limiters();

        for _ in 0..3 {
            let value = reply(&limiters, "registration check fp_x");
            assert_eq!(value["allowed"], json!(true));
            assert!(value.get("retry_in").is_none());
        }

        let value = reply(&limiters, "registration check fp_x");
        assert_eq!(value["policy"], json!("registration"));
        assert_eq!(value["command"], json!("check"));
        assert_eq!(value["allowed"], json!(false));
        assert_eq!(value["block_expiry"], json!(1_700_000_000_000i64 + 3_600_000));
        assert_eq!(value["retry_in"], json!("1 hora"));
        assert_eq!(
            value["message"],
            json!("Muitas tentativas. Tente novamente em 1 hora.")
        );
    }

    #[test]
    fn test_status_record_reset() {
        let limiters = create_test_limiters();

        let value = reply(&limiters, "contact_form status fp_x");
        assert_eq!(value["attempts_remaining"], json!(5));
        assert_eq!(value["is_blocked"], json!(false));

        assert_eq!(reply(&limiters, "contact_form record fp_x")["ok"], json!(true));
        assert_eq!(reply(&limiters, "contact_form status fp_x")["attempts_remaining"], json!(4));

        assert_eq!(reply(&limiters, "contact_form reset fp_x")["ok"], json!(true));
        assert_eq!(reply(&limiters, "contact_form status fp_x")["attempts_remaining"], json!(5));
    }

    #[test]
    fn test_malformed_line_yields_error_reply() {
        let limiters = create_test_limiters();

        let value = reply(&limiters, "login check");
        assert!(value["error"].as_str().unwrap().starts_with("Invalid command"));
        assert_eq!(handle_line(&limiters, "").unwrap(), None);
    }
}

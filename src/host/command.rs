//! Command Protocol
//!
//! Line-oriented scripting surface over a [`SessionRegistry`]. Values are
//! JSON; each is stored in the session cache as a `serde_json::Value`.
//!
//! ```text
//! open <session>
//! close <session>
//! put <session> <key> <json> [ttl=<secs>] [pin|unpin]
//! get <session> <key>
//! del <session> <key>
//! has <session> <key>
//! clear <session>
//! size <session>
//! stats <session>
//! sweep
//! sessions
//! ```

use std::str::FromStr;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cache::{Clock, Expiry, PutOptions};
use crate::error::{CacheError, Result};
use crate::host::responses::{GetResponse, Reply, SizeResponse, StatsResponse};
use crate::host::SessionRegistry;

/// A parsed protocol command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { session: String },
    Close { session: String },
    Put {
        session: String,
        key: String,
        value: Value,
        opts: PutOptions,
    },
    Get { session: String, key: String },
    Del { session: String, key: String },
    Has { session: String, key: String },
    Clear { session: String },
    Size { session: String },
    Stats { session: String },
    Sweep,
    Sessions,
}

// == Parsing ==
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn take(&mut self, what: &str) -> Result<&'a str> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return Err(CacheError::InvalidCommand(format!("missing {}", what)));
        }
        let (token, tail) = match rest.find(char::is_whitespace) {
            Some(at) => rest.split_at(at),
            None => (rest, ""),
        };
        self.rest = tail;
        Ok(token)
    }

    fn remainder(&self) -> &'a str {
        self.rest.trim()
    }

    fn finish(&self) -> Result<()> {
        match self.remainder() {
            "" => Ok(()),
            extra => Err(CacheError::InvalidCommand(format!(
                "unexpected argument '{}'",
                extra
            ))),
        }
    }
}

/// Returns the seconds of a `ttl=<digits>` token, None for any other token.
fn ttl_flag(token: &str) -> Option<&str> {
    token
        .strip_prefix("ttl=")
        .filter(|secs| !secs.is_empty() && secs.bytes().all(|b| b.is_ascii_digit()))
}

/// Splits trailing `ttl=<secs>`, `pin` and `unpin` flags off a put payload.
///
/// Only whole tokens count as flags; anything else ends the flag list and
/// stays part of the JSON value.
fn split_put_flags(payload: &str) -> Result<(&str, PutOptions)> {
    let mut rest = payload.trim_end();
    let mut opts = PutOptions::new();
    let mut ttl_seen = false;

    while let Some((head, last)) = rest.rsplit_once(char::is_whitespace) {
        match (last, ttl_flag(last)) {
            ("pin" | "unpin", _) => {
                if opts.pin.is_some() {
                    return Err(CacheError::InvalidCommand(
                        "pin flag given twice".to_string(),
                    ));
                }
                opts = opts.pinned(last == "pin");
            }
            (_, Some(secs)) => {
                if ttl_seen {
                    return Err(CacheError::InvalidCommand(
                        "ttl flag given twice".to_string(),
                    ));
                }
                let secs = secs.parse::<u64>().map_err(|_| {
                    CacheError::InvalidCommand(format!("invalid ttl '{}'", last))
                })?;
                opts = opts.expiry(Expiry::from_secs(secs));
                ttl_seen = true;
            }
            _ => break,
        }
        rest = head.trim_end();
    }

    Ok((rest, opts))
}

impl FromStr for Command {
    type Err = CacheError;

    fn from_str(line: &str) -> Result<Self> {
        let mut tokens = Tokens::new(line);
        let verb = tokens.take("command")?.to_ascii_lowercase();

        let command = match verb.as_str() {
            "open" | "close" | "clear" | "size" | "stats" => {
                let session = tokens.take("session")?.to_string();
                match verb.as_str() {
                    "open" => Command::Open { session },
                    "close" => Command::Close { session },
                    "clear" => Command::Clear { session },
                    "size" => Command::Size { session },
                    _ => Command::Stats { session },
                }
            }
            "get" | "del" | "has" => {
                let session = tokens.take("session")?.to_string();
                let key = tokens.take("key")?.to_string();
                match verb.as_str() {
                    "get" => Command::Get { session, key },
                    "del" => Command::Del { session, key },
                    _ => Command::Has { session, key },
                }
            }
            "put" => {
                let session = tokens.take("session")?.to_string();
                let key = tokens.take("key")?.to_string();
                let (payload, opts) = split_put_flags(tokens.remainder())?;
                if payload.is_empty() {
                    return Err(CacheError::InvalidCommand("missing value".to_string()));
                }
                let value = serde_json::from_str(payload).map_err(|err| {
                    CacheError::InvalidCommand(format!("invalid JSON value: {}", err))
                })?;
                return Ok(Command::Put {
                    session,
                    key,
                    value,
                    opts,
                });
            }
            "sweep" => Command::Sweep,
            "sessions" => Command::Sessions,
            other => {
                return Err(CacheError::InvalidCommand(format!(
                    "unknown command '{}'",
                    other
                )))
            }
        };

        tokens.finish()?;
        Ok(command)
    }
}

// == Execution ==
/// Runs one command against the registry, returning the `ok` payload.
pub fn execute(registry: &SessionRegistry, command: Command) -> Result<Value> {
    match command {
        Command::Open { session } => {
            registry.open(&session)?;
            Ok(json!({ "session": session }))
        }
        Command::Close { session } => Ok(json!({ "closed": registry.close(&session) })),
        Command::Put {
            session,
            key,
            value,
            opts,
        } => {
            registry.get(&session)?.put_with(&key, value, opts)?;
            Ok(Value::Bool(true))
        }
        Command::Get { session, key } => {
            let engine = registry.get(&session)?;
            match engine.get_as_with_ttl::<Value>(&key)? {
                Some((value, ttl)) => {
                    let ttl_ms =
                        ttl.map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
                    Ok(json!(GetResponse::new(key, value, ttl_ms)))
                }
                None => Ok(Value::Null),
            }
        }
        Command::Del { session, key } => Ok(Value::Bool(registry.get(&session)?.remove(&key))),
        Command::Has { session, key } => {
            Ok(Value::Bool(registry.get(&session)?.contains(&key)))
        }
        Command::Clear { session } => {
            let removed = registry.get(&session)?.clear();
            Ok(json!({ "removed": removed }))
        }
        Command::Size { session } => {
            let engine = registry.get(&session)?;
            Ok(json!(SizeResponse {
                size: engine.size(),
                capacity: engine.capacity(),
            }))
        }
        Command::Stats { session } => {
            let engine = registry.get(&session)?;
            let strategy = engine.config().strategy;
            Ok(json!(StatsResponse::new(
                session,
                engine.stats(),
                engine.capacity(),
                strategy
            )))
        }
        Command::Sweep => {
            let removed = registry.sweep_all(registry.clock().now());
            Ok(json!({ "removed": removed }))
        }
        Command::Sessions => Ok(json!(registry.names())),
    }
}

/// Parses and runs one protocol line.
///
/// Blank lines and lines starting with `#` yield no reply.
pub fn handle_line(registry: &SessionRegistry, line: &str) -> Option<Reply> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let result = line
        .parse::<Command>()
        .and_then(|command| {
            debug!(?command, "Executing command");
            execute(registry, command)
        });

    Some(match result {
        Ok(value) => Reply::Ok(value),
        Err(err) => {
            warn!(error = %err, line, "Command failed");
            Reply::from(err)
        }
    })
}

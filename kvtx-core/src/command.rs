//! Canonical command frame types.

use kvtx_common::error::KvError;

/// Command line representation used between the connection layer and the transaction engine.
///
/// Token 0 of the wire command becomes `name`; the remaining tokens are kept as raw bytes.
/// Frames are immutable once queued in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Command name as received. Lookups are case-insensitive.
    pub name: String,
    /// Raw byte arguments preserving wire-level payload.
    pub args: Vec<Vec<u8>>,
}

impl CommandFrame {
    /// Creates a command frame from a command name and argument list.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Returns the canonical uppercase command name used for table lookups.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }
}

/// Error category for generic command failures.
pub const ERR_CATEGORY: &str = "ERR";

/// Error category for operations against a key holding the wrong kind of value.
pub const WRONGTYPE_CATEGORY: &str = "WRONGTYPE";

/// Canonical command reply representation.
///
/// The reply enum is kept protocol-neutral. `to_resp_bytes` exists for callers that speak RESP,
/// but the transaction engine itself only inspects `is_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// `+OK` style replies.
    SimpleString(String),
    /// `+QUEUED` acknowledgement returned while staging inside `MULTI`.
    Queued,
    /// `$<len> ...` style binary-safe payload.
    BulkString(Vec<u8>),
    /// RESP null bulk string (`$-1`).
    Null,
    /// RESP integer reply (`:<n>`).
    Integer(i64),
    /// RESP array reply (`*<n> ...`), also used for the aggregate `EXEC` result.
    Array(Vec<CommandReply>),
    /// `-<CATEGORY> <message>` style error.
    Error {
        /// Machine-readable category token such as `ERR` or `WRONGTYPE`.
        category: &'static str,
        /// Human-readable message.
        message: String,
    },
}

impl CommandReply {
    /// Returns the `+OK` status reply.
    #[must_use]
    pub fn ok() -> Self {
        Self::SimpleString("OK".to_owned())
    }

    /// Builds a generic `ERR` reply.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            category: ERR_CATEGORY,
            message: message.into(),
        }
    }

    /// Builds the reply for an operation against a key holding the wrong kind of value.
    #[must_use]
    pub fn wrong_type() -> Self {
        Self::Error {
            category: WRONGTYPE_CATEGORY,
            message: "Operation against a key holding the wrong kind of value".to_owned(),
        }
    }

    /// Returns whether this reply is an error-kind result.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Encodes the reply as RESP2, the wire format `EXEC` results travel in.
    #[must_use]
    pub fn to_resp_bytes(&self) -> Vec<u8> {
        let mut output = Vec::new();
        self.write_resp(&mut output);
        output
    }

    fn write_resp(&self, output: &mut Vec<u8>) {
        match self {
            Self::SimpleString(status) => write_line(output, b'+', status.as_bytes()),
            Self::Queued => write_line(output, b'+', b"QUEUED"),
            Self::BulkString(payload) => {
                write_line(output, b'$', payload.len().to_string().as_bytes());
                output.extend_from_slice(payload);
                output.extend_from_slice(CRLF);
            }
            Self::Null => write_line(output, b'$', b"-1"),
            Self::Integer(number) => write_line(output, b':', number.to_string().as_bytes()),
            Self::Array(items) => {
                write_line(output, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.write_resp(output);
                }
            }
            Self::Error { category, message } => {
                write_line(output, b'-', format!("{category} {message}").as_bytes());
            }
        }
    }
}

const CRLF: &[u8] = b"\r\n";

fn write_line(output: &mut Vec<u8>, marker: u8, body: &[u8]) {
    output.push(marker);
    output.extend_from_slice(body);
    output.extend_from_slice(CRLF);
}

impl From<KvError> for CommandReply {
    fn from(error: KvError) -> Self {
        Self::Error {
            category: error.category(),
            message: error.to_string(),
        }
    }
}

//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GridError, Result};
use crate::grid::command::GridCommand;
use crate::grid::state::GridState;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request the current grid (public).
    GetState,

    /// Log in as admin.
    Login(LoginRequest),

    /// Attach a previously issued token to this connection.
    Authenticate {
        /// Token from an earlier `login_result`.
        token: String,
    },

    /// Forget this connection's token.
    Logout,

    /// Replace the grid (admin).
    Generate(GenerateRequest),

    /// Clear hidden cells and labels (admin).
    Reset,

    /// Hide a slot or change its label (admin).
    Update(UpdateRequest),

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Admin identity.
    #[serde(alias = "user")]
    pub identity: String,
    /// Admin secret.
    #[serde(alias = "pass")]
    pub secret: String,
}

/// Generate request. Values are validated into a [`GridCommand`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Row count (integer or decimal string).
    #[serde(default)]
    pub rows: Option<Value>,
    /// Column count (integer or decimal string).
    #[serde(default)]
    pub cols: Option<Value>,
}

/// Update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Target slot number.
    #[serde(default, alias = "boxNum")]
    pub box_num: Option<Value>,
    /// New label; blank removes it.
    #[serde(default)]
    pub subtitle: Option<Value>,
    /// `"hide"` hides the slot, anything else updates the label.
    #[serde(default)]
    pub visibility: Option<String>,
}

/// An admin mutation as received, before validation.
#[derive(Debug, Clone)]
pub enum MutationRequest {
    /// See [`ClientMessage::Generate`].
    Generate(GenerateRequest),
    /// See [`ClientMessage::Reset`].
    Reset,
    /// See [`ClientMessage::Update`].
    Update(UpdateRequest),
}

impl MutationRequest {
    /// Operation name.
    pub fn operation(&self) -> &'static str {
        match self {
            MutationRequest::Generate(_) => "generate",
            MutationRequest::Reset => "reset",
            MutationRequest::Update(_) => "update",
        }
    }

    /// Validate into a command.
    pub fn into_command(self) -> Result<GridCommand> {
        match self {
            MutationRequest::Generate(req) => GridCommand::generate(req.rows.as_ref(), req.cols.as_ref()),
            MutationRequest::Reset => Ok(GridCommand::Reset),
            MutationRequest::Update(req) => GridCommand::update(
                req.box_num.as_ref(),
                subtitle_text(req.subtitle)?,
                req.visibility.as_deref(),
            ),
        }
    }
}

/// Labels may arrive as strings or bare numbers.
fn subtitle_text(value: Option<Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(GridError::invalid("subtitle must be text")),
    }
}

impl ClientMessage {
    /// The mutation this message asks for, if any.
    pub fn into_mutation(self) -> std::result::Result<MutationRequest, ClientMessage> {
        match self {
            ClientMessage::Generate(req) => Ok(MutationRequest::Generate(req)),
            ClientMessage::Reset => Ok(MutationRequest::Reset),
            ClientMessage::Update(req) => Ok(MutationRequest::Update(req)),
            other => Err(other),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
///
/// Adjacently tagged (`{"type": ..., "data": ...}`): snapshot `names` has
/// integer keys, which internally tagged enums cannot deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Current grid, sent on connect and on request.
    State(GridState),

    /// Grid after a committed mutation, sent to every connection.
    StateUpdated(GridState),

    /// Successful login.
    LoginResult(LoginResult),

    /// Connection token attached.
    Authenticated {
        /// Identity the token belongs to.
        identity: String,
        /// Expiry (Unix seconds).
        expires_at: u64,
    },

    /// Connection token dropped; the client should discard it.
    LoggedOut,

    /// Mutation committed (sent to the requester).
    MutationApplied {
        /// `generate`, `reset` or `update`.
        operation: String,
        /// State after the mutation.
        state: GridState,
    },

    /// Pong response.
    Pong {
        /// Timestamp from the ping.
        timestamp: u64,
        /// Server wall clock (Unix milliseconds).
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Why the server is going away.
        reason: String,
    },
}

/// Login result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    /// Logged in identity.
    pub identity: String,
    /// Token to present on reconnect.
    pub token: String,
    /// Expiry (Unix seconds).
    pub expires_at: u64,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or malformed mutation input.
    InvalidArgument,
    /// Hide target is not a visible slot.
    NotFound,
    /// Missing, invalid or expired credential.
    Unauthorized,
    /// Persistence failed; nothing changed.
    StorageFailure,
    /// Frame was not a valid message.
    InvalidMessage,
}

impl From<&GridError> for ServerError {
    fn from(err: &GridError) -> Self {
        let code = match err {
            GridError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            GridError::NotFound(_) => ErrorCode::NotFound,
            GridError::Unauthorized(_) => ErrorCode::Unauthorized,
            GridError::StorageFailure(_) => ErrorCode::StorageFailure,
        };
        // Storage and auth details stay in the server log
        let message = match err {
            GridError::Unauthorized(_) => "unauthorized".to_string(),
            GridError::StorageFailure(_) => "storage failure".to_string(),
            other => other.to_string(),
        };
        Self { code, message }
    }
}

impl ServerMessage {
    /// Error reply for a failed request.
    pub fn error(err: &GridError) -> Self {
        ServerMessage::Error(err.into())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

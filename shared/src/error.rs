use thiserror::Error;

/// Failures decoding a wire frame (binary game-state broadcasts, the binary
/// movement-intent frame, or a malformed JSON lobby/game message). Kept
/// separate from the server's `ServerError` so the codec has no dependency
/// on the server crate's transport concerns.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid team code {0}")]
    InvalidTeamCode(u8),

    #[error("invalid role code {0}")]
    InvalidRoleCode(u8),

    #[error("invalid ball type code {0}")]
    InvalidBallTypeCode(u8),

    #[error("frame declares {wire} entries but the known order has {known}")]
    OrderMismatch { wire: usize, known: usize },

    #[error("malformed JSON message: {0}")]
    Malformed(#[from] serde_json::Error),
}

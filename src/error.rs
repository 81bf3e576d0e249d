use thiserror::Error;

/// Every way a chain-sync session or a normalization call can fail.
///
/// None of these are retried internally. A session that returns one of the
/// fatal variants has already stopped dispatching callbacks and released its
/// socket; reconnecting with a fresh starting point is up to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// The socket never opened, or closed while the session still needed it.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound frame was not valid JSON, or not a JSON-WSP envelope.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The peer could not find any of the points offered in FindIntersect.
    #[error("intersection not found")]
    IntersectionNotFound,

    /// The peer answered with something the session did not ask for.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("malformed protocol parameters: {0}")]
    MalformedParameters(String),

    /// A `jsonwsp/fault` envelope sent by the peer.
    #[error("peer fault ({code}): {message}")]
    Fault { code: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn transport(error: impl ToString) -> Error {
        Error::Transport(error.to_string())
    }

    pub fn malformed_message(error: impl ToString) -> Error {
        Error::MalformedMessage(error.to_string())
    }

    pub fn protocol_violation(error: impl ToString) -> Error {
        Error::ProtocolViolation(error.to_string())
    }

    pub fn malformed_block(error: impl ToString) -> Error {
        Error::MalformedBlock(error.to_string())
    }

    pub fn config(error: impl ToString) -> Error {
        Error::Config(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::transport(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::malformed_message(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::config(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::config(format!("invalid url: {}", err))
    }
}

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Stable numeric error codes.
///
/// The 2500 block is specific to the X client, the 2000 block is shared
/// with the classic client library. Server-side codes arrive verbatim in
/// `Mysqlx.Error` messages; the two the client reacts to are listed at the
/// end.
pub mod code {
    pub const UNKNOWN_ERROR: i32 = 2000;
    pub const CONNECTION_ERROR: i32 = 2002;
    pub const UNKNOWN_HOST: i32 = 2005;
    pub const SERVER_GONE: i32 = 2006;
    pub const SSL_CONNECTION_ERROR: i32 = 2026;
    pub const MALFORMED_PACKET: i32 = 2027;
    pub const ALREADY_CONNECTED: i32 = 2058;
    pub const AUTH_PLUGIN_ERROR: i32 = 2061;

    pub const READ_TIMEOUT: i32 = 2500;
    pub const WRITE_TIMEOUT: i32 = 2501;
    pub const INTERNAL_ABORTED: i32 = 2502;
    pub const TLS_WRONG_CONFIGURATION: i32 = 2503;
    pub const INVALID_AUTH_METHOD: i32 = 2504;
    pub const UNSUPPORTED_OPTION_VALUE: i32 = 2505;
    pub const UNSUPPORTED_CAPABILITY_VALUE: i32 = 2506;
    pub const UNSUPPORTED_OPTION: i32 = 2507;
    pub const LAST_COMMAND_UNFINISHED: i32 = 2508;
    pub const RECEIVE_BUFFER_TOO_SMALL: i32 = 2509;
    pub const SESSION_CONNECT_TIMEOUT: i32 = 2510;
    pub const COMPRESSION_NOT_CONFIGURED: i32 = 2511;
    pub const REQUIRED_COMPRESSION_NOT_SUPPORTED: i32 = 2512;

    pub const ER_ACCESS_DENIED: i32 = 1045;
    pub const ER_X_CAPABILITIES_PREPARE_FAILED: i32 = 5001;
}

/// Client and server failures share one shape: a stable numeric code, a
/// message, a fatality flag, and the SQL state reported by the server
/// (empty for client-side errors).
///
/// A fatal error leaves the session unusable; a non-fatal one (a rejected
/// statement, an optional-capability refusal, a timeout) does not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct Error {
    pub code: i32,
    pub message: String,
    pub fatal: bool,
    pub sql_state: String,
}

impl Error {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fatal: false,
            sql_state: String::new(),
        }
    }

    pub fn fatal(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fatal: true,
            sql_state: String::new(),
        }
    }

    /// An error reported by the server in a `Mysqlx.Error` message.
    pub fn server(
        code: i32,
        message: impl Into<String>,
        fatal: bool,
        sql_state: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            fatal,
            sql_state: sql_state.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn is_read_timeout(&self) -> bool {
        self.code == code::READ_TIMEOUT
    }

    /// True for errors raised locally rather than relayed from the server.
    pub fn is_client_error(&self) -> bool {
        (2000..=2099).contains(&self.code) || (2500..=2599).contains(&self.code)
    }

    /// Errors after which the connection is not worth retrying on:
    /// the peer is gone or an I/O deadline expired mid-conversation.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            code::SERVER_GONE | code::READ_TIMEOUT | code::WRITE_TIMEOUT | code::UNKNOWN_ERROR
        )
    }
}

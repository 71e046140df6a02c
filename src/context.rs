//! Per-session configuration shared between the session facade, the
//! protocol engine and outstanding query results.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use smart_default::SmartDefault;

use crate::constant::CLIENT_ID_NOT_VALID;
use crate::error::Error;
use crate::protocol::compression::CompressionAlgorithm;
use crate::protocol::negotiator::CompressionNegotiator;

/// TLS requirement level, from "never" to "verify the peer identity".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disabled,
    #[default]
    Preferred,
    Required,
    VerifyCa,
    VerifyIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslFipsMode {
    #[default]
    Off,
    On,
    Strict,
}

/// Address families allowed during hostname resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpMode {
    #[default]
    Any,
    V4,
    V6,
}

/// Authentication methods, including the auto-expanding pseudo methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthMethod {
    Auto,
    AutoFallback,
    AutoFromCapabilities,
    Mysql41,
    Plain,
    Sha256Memory,
}

impl AuthMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::AutoFallback => "FALLBACK",
            Self::AutoFromCapabilities => "FROM_CAPABILITIES",
            Self::Mysql41 => "MYSQL41",
            Self::Plain => "PLAIN",
            Self::Sha256Memory => "SHA256_MEMORY",
        }
    }

    /// Pseudo methods that expand to a sequence instead of naming a
    /// mechanism.
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto | Self::AutoFallback | Self::AutoFromCapabilities)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "AUTO" => Self::Auto,
            "FALLBACK" => Self::AutoFallback,
            "FROM_CAPABILITIES" => Self::AutoFromCapabilities,
            "MYSQL41" => Self::Mysql41,
            "PLAIN" => Self::Plain,
            "SHA256_MEMORY" => Self::Sha256Memory,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, SmartDefault)]
pub struct SslConfig {
    pub key: String,
    pub ca: String,
    pub ca_path: String,
    pub cert: String,
    pub cipher: String,
    pub crl: String,
    pub crl_path: String,
    /// Comma-separated accepted TLS versions, e.g. `"TLSv1.2,TLSv1.3"`.
    pub tls_version: String,
    pub mode: SslMode,
    pub fips_mode: SslFipsMode,
}

impl SslConfig {
    pub fn is_configured(&self) -> bool {
        self.mode != SslMode::Disabled
    }

    pub fn does_mode_require_ca(&self) -> bool {
        matches!(self.mode, SslMode::VerifyCa | SslMode::VerifyIdentity)
    }

    pub fn is_ca_configured(&self) -> bool {
        !self.ca.is_empty() || !self.ca_path.is_empty()
    }
}

/// Timeouts are milliseconds; a negative value means "no deadline".
#[derive(Debug, Clone, SmartDefault)]
pub struct ConnectionConfig {
    #[default(-1)]
    pub timeout_connect: i64,
    #[default(-1)]
    pub timeout_session_connect: i64,
    #[default(-1)]
    pub timeout_read: i64,
    #[default(-1)]
    pub timeout_write: i64,
    #[default(crate::constant::DEFAULT_RECEIVE_BUFFER_SIZE)]
    pub buffer_receive_size: usize,
    pub network_namespace: String,
}

/// Convert a millisecond timeout knob into a socket deadline.
pub fn timeout_duration(millis: i64) -> Option<Duration> {
    if millis < 0 {
        None
    } else {
        Some(Duration::from_millis(millis as u64))
    }
}

#[derive(Debug, Default)]
pub struct CompressionConfig {
    pub negotiator: CompressionNegotiator,
    pub use_algorithm: CompressionAlgorithm,
    pub use_server_combine_mixed_messages: bool,
    pub use_server_max_combine_messages: i64,
    pub use_level_client: Option<i64>,
    pub use_level_server: Option<i64>,
}

/// Shared, session-wide state.
///
/// Mutated only before connect, except for the client id (set by the
/// built-in notice handler) and the sticky global error.
#[derive(Debug, SmartDefault)]
pub struct Context {
    pub ssl_config: SslConfig,
    pub connection_config: ConnectionConfig,
    pub compression_config: CompressionConfig,
    pub use_auth_methods: Vec<AuthMethod>,
    pub internet_protocol: IpMode,
    #[default(true)]
    pub consume_all_notices: bool,
    /// Length of a DATETIME column holding only the date part.
    #[default(10)]
    pub datetime_length_discriminator: u32,
    #[default(CLIENT_ID_NOT_VALID)]
    pub client_id: u64,
    /// Once set, every subsequent protocol operation short-circuits with
    /// this error until the session is dropped.
    pub global_error: Option<Error>,
}

pub type SharedContext = Rc<RefCell<Context>>;

pub fn new_shared_context() -> SharedContext {
    Rc::new(RefCell::new(Context::default()))
}

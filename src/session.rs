//! The session facade: options, capability advertisement, TLS and
//! compression negotiation, the authentication sequence, and query
//! execution.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::argument::{ArgumentArray, ArgumentObject, ArgumentUObject, ArgumentValue};
use crate::connection::ConnectionType;
use crate::constant::{DEFAULT_TCP_PORT, DEFAULT_UNIX_SOCKET, notice_type};
use crate::context::{AuthMethod, SharedContext, SslMode, new_shared_context, timeout_duration};
use crate::error::{Error, Result, code};
use crate::opts::{ConnectParams, SessionCapability, SessionOption, apply_option,
    validate_capability};
use crate::proto;
use crate::proto::notice::session_state_changed::Parameter;
use crate::protocol::capability::CapabilitiesBuilder;
use crate::protocol::engine::Protocol;
use crate::protocol::handler::{
    HandlerPosition, HandlerResult, PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_MEDIUM,
};
use crate::protocol::negotiator::CompressionMode;
use crate::protocol::result::QueryResult;

use prost::Message as _;

const ER_TEXT_ALREADY_CONNECTED: &str = "Already connected";
const ER_TEXT_NOT_CONNECTED: &str = "Not connected";
const ER_TEXT_OPTION_NOT_SUPPORTED_AFTER_CONNECTING: &str =
    "Operation not supported after connecting";
const ER_TEXT_CA_IS_REQUIRED: &str =
    "TLS was marked that requires \"CA\", but it was not configured";
const ER_TEXT_AMBIGUOUS_AUTH_METHODS: &str = "Ambiguous authentication methods given";

fn not_connected() -> Error {
    Error::new(code::CONNECTION_ERROR, ER_TEXT_NOT_CONNECTED)
}

/// A single client session over one connection.
///
/// Typical use: set options, optionally set capabilities, connect,
/// execute statements, close. After `close` only the static connect
/// attributes remain available.
pub struct Session {
    context: SharedContext,
    protocol: Option<Protocol>,
    required_capabilities: ArgumentObject,
    optional_capabilities: ArgumentObject,
    /// What the server accepts for authentication; replaced by the
    /// advertised list when capabilities are fetched.
    server_auth_methods: BTreeSet<AuthMethod>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let context = new_shared_context();
        let mut session = Self {
            context: Rc::clone(&context),
            protocol: Some(Protocol::new(context)),
            required_capabilities: ArgumentObject::new(),
            optional_capabilities: ArgumentObject::new(),
            server_auth_methods: BTreeSet::from([
                AuthMethod::Mysql41,
                AuthMethod::Plain,
                AuthMethod::Sha256Memory,
            ]),
        };
        session.setup_notice_handlers();
        session
    }

    /// The protocol engine, for callers that need the lower layers.
    pub fn protocol(&mut self) -> Option<&mut Protocol> {
        self.protocol.as_mut()
    }

    pub fn is_connected(&self) -> bool {
        self.protocol
            .as_ref()
            .is_some_and(|p| p.connection().is_connected())
    }

    /// Client id assigned by the server, or
    /// [`CLIENT_ID_NOT_VALID`](crate::constant::CLIENT_ID_NOT_VALID).
    pub fn client_id(&self) -> u64 {
        self.context.borrow().client_id
    }

    // ------------------------------------------------------------------
    // Options and capabilities
    // ------------------------------------------------------------------

    pub fn set_mysql_option(
        &mut self,
        option: SessionOption,
        value: impl Into<ArgumentValue>,
    ) -> Result<()> {
        if self.is_connected() {
            return Err(Error::new(
                code::ALREADY_CONNECTED,
                ER_TEXT_OPTION_NOT_SUPPORTED_AFTER_CONNECTING,
            ));
        }
        apply_option(&mut self.context.borrow_mut(), option, &value.into())
    }

    /// Queue a capability for the connect-time `CapabilitiesSet`.
    /// Required capabilities abort the connect on failure, optional ones
    /// are tolerated.
    pub fn set_capability(
        &mut self,
        capability: SessionCapability,
        value: impl Into<ArgumentValue>,
        required: bool,
    ) -> Result<()> {
        let value = value.into();
        let name = validate_capability(capability, &value)?;
        let bucket = if required {
            &mut self.required_capabilities
        } else {
            &mut self.optional_capabilities
        };
        bucket.insert(name.to_string(), value);
        Ok(())
    }

    /// Attributes reported in `session_connect_attrs`.
    pub fn get_connect_attrs(&self) -> ArgumentUObject {
        vec![
            (
                "_client_name".to_string(),
                ArgumentValue::from(env!("CARGO_PKG_NAME")),
            ),
            (
                "_client_version".to_string(),
                ArgumentValue::from(env!("CARGO_PKG_VERSION")),
            ),
            ("_os".to_string(), ArgumentValue::from(std::env::consts::OS)),
            (
                "_platform".to_string(),
                ArgumentValue::from(std::env::consts::ARCH),
            ),
            ("_client_license".to_string(), ArgumentValue::from("MIT")),
            (
                "_pid".to_string(),
                ArgumentValue::from(std::process::id().to_string()),
            ),
        ]
    }

    // ------------------------------------------------------------------
    // Connect
    // ------------------------------------------------------------------

    pub fn connect(
        &mut self,
        host: &str,
        port: u16,
        user: &str,
        pass: &str,
        schema: &str,
    ) -> Result<()> {
        if self.is_connected() {
            return Err(Error::new(code::ALREADY_CONNECTED, ER_TEXT_ALREADY_CONNECTED));
        }

        let port = if port == 0 { DEFAULT_TCP_PORT } else { port };
        let ip_mode = self.context.borrow().internet_protocol;

        self.with_connect_timeout_guard(|session| {
            let protocol = session.protocol.as_mut().ok_or_else(not_connected)?;
            protocol.connection_mut().connect_tcp(host, port, ip_mode)?;
            protocol.reset_buffering();
            session.authenticate(user, pass, schema, ConnectionType::Tcp)
        })
    }

    pub fn connect_unix(&mut self, socket_path: &str, user: &str, pass: &str, schema: &str) -> Result<()> {
        if self.is_connected() {
            return Err(Error::new(code::ALREADY_CONNECTED, ER_TEXT_ALREADY_CONNECTED));
        }

        let path = if socket_path.is_empty() {
            DEFAULT_UNIX_SOCKET
        } else {
            socket_path
        };

        self.with_connect_timeout_guard(|session| {
            let protocol = session.protocol.as_mut().ok_or_else(not_connected)?;
            protocol.connection_mut().connect_unix(path)?;
            protocol.reset_buffering();
            session.authenticate(user, pass, schema, ConnectionType::UnixSocket)
        })
    }

    /// Apply the options of a `mysqlx://` URL and connect with its
    /// endpoint and credentials.
    pub fn connect_url(&mut self, url: &str) -> Result<()> {
        let params = ConnectParams::try_from(url)?;
        for (option, value) in &params.options {
            self.set_mysql_option(*option, value.clone())?;
        }
        self.connect(
            &params.host,
            params.port,
            &params.user,
            &params.password,
            &params.schema,
        )
    }

    /// Reset the server-side session state and run the authentication
    /// sequence again on the live connection.
    pub fn reauthenticate(&mut self, user: &str, pass: &str, schema: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(not_connected());
        }

        let protocol = self.protocol.as_mut().ok_or_else(not_connected)?;
        protocol.send(&proto::session::Reset { keep_open: None })?;
        let connection_type = protocol
            .connection()
            .state()
            .connection_type
            .unwrap_or(ConnectionType::Tcp);

        self.with_connect_timeout_guard(|session| {
            let protocol = session.protocol.as_mut().ok_or_else(not_connected)?;
            protocol.recv_ok()?;
            session.authenticate(user, pass, schema, connection_type)
        })
    }

    /// Close the session cleanly; the protocol object is dropped.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut protocol) = self.protocol.take() {
            if protocol.connection().is_connected() {
                let result = protocol
                    .send(&proto::session::Close {})
                    .and_then(|()| protocol.recv_ok());
                protocol.connection_mut().close();
                return result;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryResult<'_>> {
        if !self.is_connected() {
            return Err(not_connected());
        }
        let stmt = proto::sql::StmtExecute::new(sql);
        self.protocol
            .as_mut()
            .ok_or_else(not_connected)?
            .execute_stmt(&stmt)
    }

    /// Execute a statement in an admin namespace (e.g. `mysqlx`) with
    /// arguments.
    pub fn execute_stmt(
        &mut self,
        namespace: &str,
        stmt: &str,
        args: &ArgumentArray,
    ) -> Result<QueryResult<'_>> {
        if !self.is_connected() {
            return Err(not_connected());
        }

        let mut msg = proto::sql::StmtExecute::new(stmt);
        msg.namespace = Some(namespace.to_string());
        msg.args = args
            .iter()
            .map(crate::protocol::capability::any_from_argument)
            .collect();

        self.protocol
            .as_mut()
            .ok_or_else(not_connected)?
            .execute_stmt(&msg)
    }

    // ------------------------------------------------------------------
    // Built-in notice handlers
    // ------------------------------------------------------------------

    fn setup_notice_handlers(&mut self) {
        let Some(protocol) = self.protocol.as_mut() else {
            return;
        };

        // Client-id assignment; consumes only that one notice kind.
        let context = Rc::clone(&self.context);
        protocol.add_notice_handler(
            Box::new(move |_is_global, notice, payload| {
                if notice != notice_type::SESSION_STATE_CHANGED {
                    return HandlerResult::Continue;
                }
                let Ok(change) = proto::notice::SessionStateChanged::decode(payload) else {
                    return HandlerResult::Continue;
                };
                if change.param != Parameter::ClientIdAssigned as i32 || change.value.len() != 1 {
                    return HandlerResult::Continue;
                }
                match change.value[0].as_unsigned_int() {
                    Some(client_id) => {
                        context.borrow_mut().client_id = client_id;
                        HandlerResult::Consumed
                    }
                    None => HandlerResult::Error,
                }
            }),
            HandlerPosition::End,
            PRIORITY_HIGH,
        );

        // Swallow everything else when the session is configured to.
        let context = Rc::clone(&self.context);
        protocol.add_notice_handler(
            Box::new(move |_is_global, _notice, _payload| {
                if context.borrow().consume_all_notices {
                    HandlerResult::Consumed
                } else {
                    HandlerResult::Continue
                }
            }),
            HandlerPosition::End,
            PRIORITY_LOW,
        );
    }

    /// Clamp per-send socket deadlines so the whole connect sequence
    /// stays within `session_connect_timeout`, then restore the
    /// configured timeouts.
    fn with_connect_timeout_guard<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let context = Rc::clone(&self.context);
        let start = Instant::now();

        let guard_id = self.protocol.as_mut().map(|protocol| {
            protocol.add_send_message_handler(
                Box::new(move |connection, _mid, _msg| {
                    let timeout = context.borrow().connection_config.timeout_session_connect;
                    if timeout < 0 {
                        return HandlerResult::Continue;
                    }
                    let elapsed = start.elapsed().as_millis().min(i64::MAX as u128) as i64;
                    let left = (timeout - elapsed).max(0) as u64;
                    let deadline = Some(Duration::from_millis(left.max(1)));
                    let _ = connection.set_write_timeout(deadline);
                    let _ = connection.set_read_timeout(deadline);
                    HandlerResult::Continue
                }),
                HandlerPosition::Begin,
                PRIORITY_MEDIUM,
            )
        });

        let result = f(self);

        if let (Some(protocol), Some(guard_id)) = (self.protocol.as_mut(), guard_id) {
            protocol.remove_send_message_handler(guard_id);
            let (read_timeout, write_timeout) = {
                let context = self.context.borrow();
                (
                    timeout_duration(context.connection_config.timeout_read),
                    timeout_duration(context.connection_config.timeout_write),
                )
            };
            let _ = protocol.connection_mut().set_read_timeout(read_timeout);
            let _ = protocol.connection_mut().set_write_timeout(write_timeout);
        }

        result
    }

    // ------------------------------------------------------------------
    // The connect sequence
    // ------------------------------------------------------------------

    fn authenticate(
        &mut self,
        user: &str,
        pass: &str,
        schema: &str,
        connection_type: ConnectionType,
    ) -> Result<()> {
        // A single ServerHello is expected right after connecting; a
        // second one is a protocol violation.
        let hello_seen = Cell::new(false);
        let hello_filter_id = self.protocol.as_mut().map(|protocol| {
            protocol.add_notice_handler(
                Box::new(move |is_global, notice, _payload| {
                    if !is_global || notice != notice_type::SERVER_HELLO {
                        return HandlerResult::Continue;
                    }
                    if hello_seen.replace(true) {
                        return HandlerResult::Error;
                    }
                    HandlerResult::Consumed
                }),
                HandlerPosition::Begin,
                PRIORITY_LOW,
            )
        });

        let result = self.authenticate_inner(user, pass, schema, connection_type);

        if let (Some(protocol), Some(id)) = (self.protocol.as_mut(), hello_filter_id) {
            protocol.remove_notice_handler(id);
        }

        result
    }

    fn authenticate_inner(
        &mut self,
        user: &str,
        pass: &str,
        schema: &str,
        connection_type: ConnectionType,
    ) -> Result<()> {
        self.advertise_capabilities()?;
        self.setup_tls()?;
        self.negotiate_server_features()?;

        // Arm the compression transport with whatever was negotiated.
        {
            let (algorithm, level) = {
                let context = self.context.borrow();
                (
                    context.compression_config.use_algorithm,
                    context.compression_config.use_level_client,
                )
            };
            let protocol = self.protocol.as_mut().ok_or_else(not_connected)?;
            if algorithm != crate::protocol::compression::CompressionAlgorithm::None {
                protocol.use_compression(algorithm, level);
            }
        }

        self.run_auth_sequence(user, pass, schema, connection_type)
    }

    /// Send required capabilities as one set (failure is fatal), then
    /// each optional capability on its own (failures tolerated unless
    /// fatal or client-local).
    fn advertise_capabilities(&mut self) -> Result<()> {
        let required = if self.required_capabilities.is_empty() {
            None
        } else {
            let mut builder = CapabilitiesBuilder::default();
            builder.add_capabilities_from_object(&self.required_capabilities);
            Some(builder.build())
        };
        let optional: Vec<_> = self
            .optional_capabilities
            .iter()
            .map(|(name, value)| {
                let mut builder = CapabilitiesBuilder::default();
                builder.add_capability(name, value);
                builder.build()
            })
            .collect();

        let protocol = self.protocol.as_mut().ok_or_else(not_connected)?;

        if let Some(required) = required {
            protocol.execute_set_capability(&required)?;
        }

        for capability_set in &optional {
            if let Err(e) = protocol.execute_set_capability(capability_set) {
                if e.is_fatal() || e.is_client_error() {
                    return Err(e);
                }
                debug!(error = %e, "optional capability rejected");
            }
        }

        Ok(())
    }

    /// Ask for TLS and upgrade the connection. A server refusal is only
    /// tolerated with ssl-mode Preferred.
    fn setup_tls(&mut self) -> Result<()> {
        let (require_ca_missing, ssl_mode) = {
            let context = self.context.borrow();
            let ssl = &context.ssl_config;
            (
                ssl.does_mode_require_ca() && !ssl.is_ca_configured(),
                ssl.mode,
            )
        };

        let protocol = self.protocol.as_mut().ok_or_else(not_connected)?;
        let state = protocol.connection().state();
        if state.ssl_activated {
            return Ok(());
        }

        if require_ca_missing {
            return Err(Error::new(
                code::TLS_WRONG_CONFIGURATION,
                ER_TEXT_CA_IS_REQUIRED,
            ));
        }

        if !state.ssl_configured {
            return Ok(());
        }

        let mut builder = CapabilitiesBuilder::default();
        builder.add_capability("tls", &ArgumentValue::Bool(true));
        let tls_set = builder.build();

        let result = protocol
            .execute_set_capability(&tls_set)
            .and_then(|()| protocol.connection_mut().activate_tls());

        match result {
            Ok(()) => Ok(()),
            Err(e)
                if e.code == code::ER_X_CAPABILITIES_PREPARE_FAILED
                    && ssl_mode == SslMode::Preferred =>
            {
                debug!("server refused TLS, continuing unencrypted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn needs_server_capabilities(&self) -> bool {
        let context = self.context.borrow();
        if context.use_auth_methods.len() == 1
            && context.use_auth_methods[0] == AuthMethod::AutoFromCapabilities
        {
            return true;
        }
        context.compression_config.negotiator.is_negotiation_needed()
    }

    /// Fetch server capabilities when needed and negotiate compression.
    fn negotiate_server_features(&mut self) -> Result<()> {
        if !self.needs_server_capabilities() {
            return Ok(());
        }

        let capabilities = self
            .protocol
            .as_mut()
            .ok_or_else(not_connected)?
            .execute_fetch_capabilities()?;
        self.setup_server_supported_features(&capabilities);

        let resolution = self
            .context
            .borrow_mut()
            .compression_config
            .negotiator
            .update_compression_options()?;

        let Some((algorithm, payload)) = resolution else {
            return Ok(());
        };
        self.context.borrow_mut().compression_config.use_algorithm = algorithm;

        let with_level = self.compression_capability(&payload, true);
        let without_level = self.compression_capability(&payload, false);
        let mode = self.context.borrow().compression_config.negotiator.mode;
        let protocol = self.protocol.as_mut().ok_or_else(not_connected)?;

        let mut builder = CapabilitiesBuilder::default();
        builder.add_capability("compression", &with_level);
        match protocol.execute_set_capability(&builder.build()) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!(error = %e, "compression capability rejected, retrying without level"),
        }

        // The server supports the algorithm but possibly not the level
        // field; retry without it.
        let mut builder = CapabilitiesBuilder::default();
        builder.add_capability("compression", &without_level);
        match protocol.execute_set_capability(&builder.build()) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() || mode == CompressionMode::Required => Err(e),
            Err(e) => {
                debug!(error = %e, "compression capability rejected, proceeding uncompressed");
                self.context.borrow_mut().compression_config.use_algorithm =
                    crate::protocol::compression::CompressionAlgorithm::None;
                Ok(())
            }
        }
    }

    /// The full `compression` capability payload: the negotiated fields
    /// plus the server-side grouping knobs and the optional level.
    fn compression_capability(
        &self,
        negotiated: &ArgumentValue,
        include_level: bool,
    ) -> ArgumentValue {
        let context = self.context.borrow();
        let config = &context.compression_config;

        let mut object = match negotiated {
            ArgumentValue::Object(object) => object.clone(),
            _ => ArgumentObject::new(),
        };
        object.insert(
            "server_combine_mixed_messages".to_string(),
            ArgumentValue::Bool(config.use_server_combine_mixed_messages),
        );
        object.insert(
            "server_max_combine_messages".to_string(),
            ArgumentValue::SignedInt(config.use_server_max_combine_messages),
        );
        if include_level {
            if let Some(level) = config.use_level_server {
                object.insert("level".to_string(), ArgumentValue::SignedInt(level));
            }
        }
        ArgumentValue::Object(object)
    }

    fn setup_server_supported_features(
        &mut self,
        capabilities: &proto::connection::Capabilities,
    ) {
        if let Some(mechanisms) = capabilities
            .get("authentication.mechanisms")
            .and_then(proto::datatypes::Any::as_string_array)
        {
            self.server_auth_methods = mechanisms
                .iter()
                .filter_map(|name| AuthMethod::from_name(name))
                .collect();
        }

        if let Some(compression) = capabilities.get("compression") {
            if let Some(object) = compression.obj.as_ref() {
                let mut context = self.context.borrow_mut();
                let negotiator = &mut context.compression_config.negotiator;
                for field in &object.fld {
                    let Some(values) = field
                        .value
                        .as_ref()
                        .and_then(proto::datatypes::Any::as_string_array)
                    else {
                        continue;
                    };
                    if field.key == "algorithm" {
                        negotiator.server_supports_algorithms(values);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Authentication sequence
    // ------------------------------------------------------------------

    /// Expand auto modes, check ambiguity, and intersect with what the
    /// server accepts, preserving client order.
    fn validate_and_adjust_auth_methods(&self, can_use_plain: bool) -> Result<Vec<AuthMethod>> {
        let configured = self.context.borrow().use_auth_methods.clone();

        let has_auto = configured.iter().copied().any(AuthMethod::is_auto);
        if has_auto && configured.len() > 1 {
            return Err(Error::new(
                code::INVALID_AUTH_METHOD,
                ER_TEXT_AMBIGUOUS_AUTH_METHODS,
            ));
        }

        let first = configured.first().copied().unwrap_or(AuthMethod::Auto);
        let plain_or_mysql41 = if can_use_plain {
            AuthMethod::Plain
        } else {
            AuthMethod::Mysql41
        };

        let candidates = match first {
            AuthMethod::AutoFallback => vec![plain_or_mysql41, AuthMethod::Sha256Memory],
            AuthMethod::Auto | AuthMethod::AutoFromCapabilities => {
                if can_use_plain {
                    vec![
                        AuthMethod::Sha256Memory,
                        AuthMethod::Plain,
                        AuthMethod::Mysql41,
                    ]
                } else {
                    vec![AuthMethod::Sha256Memory, AuthMethod::Mysql41]
                }
            }
            _ => configured,
        };

        let methods: Vec<AuthMethod> = candidates
            .into_iter()
            .filter(|method| self.server_auth_methods.contains(method))
            .collect();

        if methods.is_empty() {
            return Err(Error::new(
                code::INVALID_AUTH_METHOD,
                "Server doesn't support clients authentication methods",
            ));
        }

        Ok(methods)
    }

    fn run_auth_sequence(
        &mut self,
        user: &str,
        pass: &str,
        schema: &str,
        connection_type: ConnectionType,
    ) -> Result<()> {
        let is_secure = {
            let protocol = self.protocol.as_ref().ok_or_else(not_connected)?;
            protocol.connection().state().ssl_activated
                || connection_type == ConnectionType::UnixSocket
        };

        let methods = self.validate_and_adjust_auth_methods(is_secure)?;
        let protocol = self.protocol.as_mut().ok_or_else(not_connected)?;

        let mut reported_error: Option<Error> = None;
        let mut fatal_error_received = false;
        let mut tried_sha256_memory = false;

        for (index, method) in methods.iter().enumerate() {
            let is_last = index + 1 == methods.len();

            if *method == AuthMethod::Plain && !is_secure {
                // Try the remaining methods first; report the error only
                // when PLAIN was the last candidate left.
                if is_last {
                    return Err(Error::new(
                        code::INVALID_AUTH_METHOD,
                        "Invalid authentication method: PLAIN over unsecure channel",
                    ));
                }
                continue;
            }

            let current_error =
                match protocol.execute_authenticate(user, pass, schema, method.name()) {
                    Ok(()) => return Ok(()),
                    Err(e) => e,
                };

            // Connection-level failures end the sequence; after a noted
            // fatal error they are the expected aftermath and the noted
            // error wins.
            if current_error.is_connection_error() {
                if fatal_error_received {
                    if let Some(reported) = reported_error.take() {
                        return Err(reported);
                    }
                }
                return Err(current_error);
            }

            // Most-important-error tie-break: no error yet, then any
            // non-access-denied error, then the last access-denied.
            let replace = match &reported_error {
                None => true,
                Some(previous) => {
                    current_error.code != code::ER_ACCESS_DENIED
                        || previous.code == code::ER_ACCESS_DENIED
                }
            };
            if replace {
                reported_error = Some(current_error.clone());
            }

            // Keep iterating even after a fatal-flagged error; some
            // servers wrongly mark recoverable errors as fatal.
            if current_error.is_fatal() {
                fatal_error_received = true;
            }
            if *method == AuthMethod::Sha256Memory {
                tried_sha256_memory = true;
            }
        }

        let mut reported = reported_error.unwrap_or_else(|| {
            Error::new(
                code::INVALID_AUTH_METHOD,
                "Server doesn't support clients authentication methods",
            )
        });

        // All candidates failed with access-denied and the cache-based
        // method never had a chance to be seeded over this insecure
        // channel; point the user at a secure connection.
        if tried_sha256_memory && !is_secure && reported.code == code::ER_ACCESS_DENIED {
            reported = Error::new(
                code::AUTH_PLUGIN_ERROR,
                "Authentication failed, check username and password or try a secure connection",
            );
        }

        Err(reported)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_connected() {
            let _ = self.close();
        }
    }
}

//! The message-oriented protocol engine: framing, interceptor chains,
//! capability get/set, authentication and the execute entry points.

use tracing::{debug, trace};
use zerocopy::{FromBytes, IntoBytes};

use crate::connection::Connection;
use crate::constant::{ClientMessageId, ServerMessageId};
use crate::context::SharedContext;
use crate::error::{Error, Result, code};
use crate::proto;
use crate::protocol::auth;
use crate::protocol::compression::{
    Compression, CompressionAlgorithm, InnerMessageStream, write_inner_frame,
};
use crate::protocol::frame::{
    ClientMessage, FRAME_HEADER_SIZE, FrameHeader, ServerMessage, WireMessage,
    error_from_message,
};
use crate::protocol::handler::{
    HANDLER_ID_NOT_VALID, HandlerId, HandlerPosition, HandlerPriority, HandlerResult,
    PriorityChain,
};
use crate::protocol::result::{Column, QueryResult, QuerySequencer};
use crate::protocol::stream::{InputStream, OutputStream};

const ER_TEXT_RECEIVE_HANDLER_FAILED: &str =
    "Aborted by internal callback at received message processing";
const ER_TEXT_NOTICE_HANDLER_FAILED: &str =
    "Aborted by internal callback at notice processing";
const ER_TEXT_DATA_TOO_LARGE: &str =
    "Messages payload size exceeded the value that message header can hold";

/// Logging-only interceptor for outgoing messages; the result is ignored.
/// Receives the connection so guards can adjust socket deadlines.
pub type SendMessageHandler =
    Box<dyn FnMut(&mut Connection, ClientMessageId, &dyn WireMessage) -> HandlerResult>;

/// Interceptor for every received message; `Consumed` drops the message.
pub type ReceivedMessageHandler = Box<dyn FnMut(ServerMessageId, &ServerMessage) -> HandlerResult>;

/// Interceptor for notice frames: `(is_global, notice_type, payload)`.
pub type NoticeHandler = Box<dyn FnMut(bool, u32, &[u8]) -> HandlerResult>;

/// The protocol engine over one byte connection.
///
/// Handlers registered here may call back into the engine only when they
/// are not executing inside `recv_single_message`; re-entering the
/// receive loop from a handler leaves its state undefined.
pub struct Protocol {
    context: SharedContext,
    connection: Connection,
    input: InputStream,
    output: OutputStream,
    header_buf: [u8; FRAME_HEADER_SIZE],
    header_filled: usize,
    send_handlers: PriorityChain<SendMessageHandler>,
    received_handlers: PriorityChain<ReceivedMessageHandler>,
    notice_handlers: PriorityChain<NoticeHandler>,
    next_handler_id: HandlerId,
    compression: Compression,
    inner_stream: Option<InnerMessageStream>,
    pub(crate) sequencer: QuerySequencer,
}

impl Protocol {
    pub fn new(context: SharedContext) -> Self {
        let capacity = context.borrow().connection_config.buffer_receive_size;
        let connection = Connection::new(std::rc::Rc::clone(&context));
        Self {
            context,
            connection,
            input: InputStream::new(capacity),
            output: OutputStream::default(),
            header_buf: [0; FRAME_HEADER_SIZE],
            header_filled: 0,
            send_handlers: PriorityChain::default(),
            received_handlers: PriorityChain::default(),
            notice_handlers: PriorityChain::default(),
            next_handler_id: 0,
            compression: Compression::default(),
            inner_stream: None,
            sequencer: QuerySequencer::default(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub(crate) fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Drop any buffered input; used right after (re)connecting.
    pub fn reset_buffering(&mut self) {
        let capacity = self.context.borrow().connection_config.buffer_receive_size;
        self.input = InputStream::new(capacity);
        self.inner_stream = None;
        self.header_filled = 0;
    }

    /// Arm the compression transport with the negotiated algorithm.
    pub fn use_compression(&mut self, algorithm: CompressionAlgorithm, level: Option<i64>) {
        self.compression.reinitialize(algorithm, level);
    }

    // ------------------------------------------------------------------
    // Handler chains
    // ------------------------------------------------------------------

    pub fn add_send_message_handler(
        &mut self,
        handler: SendMessageHandler,
        position: HandlerPosition,
        priority: HandlerPriority,
    ) -> HandlerId {
        let id = self.take_handler_id();
        self.send_handlers.insert(id, priority, position, handler);
        id
    }

    pub fn add_received_message_handler(
        &mut self,
        handler: ReceivedMessageHandler,
        position: HandlerPosition,
        priority: HandlerPriority,
    ) -> HandlerId {
        let id = self.take_handler_id();
        self.received_handlers.insert(id, priority, position, handler);
        id
    }

    pub fn add_notice_handler(
        &mut self,
        handler: NoticeHandler,
        position: HandlerPosition,
        priority: HandlerPriority,
    ) -> HandlerId {
        let id = self.take_handler_id();
        self.notice_handlers.insert(id, priority, position, handler);
        id
    }

    pub fn remove_send_message_handler(&mut self, id: HandlerId) {
        self.send_handlers.remove(id);
    }

    pub fn remove_received_message_handler(&mut self, id: HandlerId) {
        self.received_handlers.remove(id);
    }

    pub fn remove_notice_handler(&mut self, id: HandlerId) {
        self.notice_handlers.remove(id);
    }

    fn take_handler_id(&mut self) -> HandlerId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        debug_assert_ne!(id, HANDLER_ID_NOT_VALID);
        id
    }

    fn dispatch_send(&mut self, mid: ClientMessageId, msg: &dyn WireMessage) {
        let Self {
            send_handlers,
            connection,
            ..
        } = self;
        for entry in send_handlers.iter_mut() {
            let _ = (entry.handler)(connection, mid, msg);
        }
    }

    /// Run the received chain and, for notices, the notice chain.
    /// `Ok(true)` means the message was consumed and must be skipped.
    fn dispatch_received(&mut self, msg: &ServerMessage) -> Result<bool> {
        let Self {
            received_handlers,
            notice_handlers,
            ..
        } = self;

        let id = msg.id();
        let mut verdict = HandlerResult::Continue;
        for entry in received_handlers.iter_mut() {
            verdict = (entry.handler)(id, msg);
            if verdict != HandlerResult::Continue {
                break;
            }
        }
        match verdict {
            HandlerResult::Consumed => return Ok(true),
            HandlerResult::Error => {
                return Err(Error::new(
                    code::INTERNAL_ABORTED,
                    ER_TEXT_RECEIVE_HANDLER_FAILED,
                ));
            }
            HandlerResult::Continue => {}
        }

        if let ServerMessage::Notice(frame) = msg {
            let is_global = frame.is_global();
            let payload = frame.payload_bytes();
            let mut verdict = HandlerResult::Continue;
            for entry in notice_handlers.iter_mut() {
                verdict = (entry.handler)(is_global, frame.r#type, payload);
                if verdict != HandlerResult::Continue {
                    break;
                }
            }
            match verdict {
                HandlerResult::Consumed => return Ok(true),
                HandlerResult::Error => {
                    return Err(Error::new(
                        code::INTERNAL_ABORTED,
                        ER_TEXT_NOTICE_HANDLER_FAILED,
                    ));
                }
                HandlerResult::Continue => {}
            }
        }

        Ok(false)
    }

    // ------------------------------------------------------------------
    // Framing
    // ------------------------------------------------------------------

    fn global_error(&self) -> Option<Error> {
        self.context.borrow().global_error.clone()
    }

    /// Frame and send one message, running the sent-message chain. Once
    /// the compression transport is armed, messages travel inside
    /// `COMPRESSION` envelopes.
    pub fn send<M: ClientMessage>(&mut self, msg: &M) -> Result<()> {
        if self.compression.is_enabled() && M::ID != ClientMessageId::Compression {
            return self.send_compressed_frame(msg);
        }
        self.send_with_id(M::ID, msg)
    }

    pub fn send_with_id(&mut self, mid: ClientMessageId, msg: &dyn WireMessage) -> Result<()> {
        if let Some(error) = self.global_error() {
            return Err(error);
        }

        let payload_len = msg.encoded_len();
        if payload_len as u64 + 1 > u64::from(u32::MAX) {
            return Err(Error::new(code::MALFORMED_PACKET, ER_TEXT_DATA_TOO_LARGE));
        }

        trace!(mid = mid as u8, len = payload_len, "send message");
        self.dispatch_send(mid, msg);

        let header = FrameHeader::encode(payload_len, mid as u8);
        let mut payload = Vec::with_capacity(payload_len);
        msg.encode_raw_to(&mut payload);

        let Self {
            output, connection, ..
        } = self;
        output.write(connection, header.as_bytes())?;
        output.write(connection, &payload)?;
        output.flush(connection)
    }

    /// Send a pre-serialized frame; bypasses the sent-message chain.
    pub fn send_raw(&mut self, mid: u8, payload: &[u8]) -> Result<()> {
        if let Some(error) = self.global_error() {
            return Err(error);
        }
        if payload.len() as u64 + 1 > u64::from(u32::MAX) {
            return Err(Error::new(code::MALFORMED_PACKET, ER_TEXT_DATA_TOO_LARGE));
        }
        let header = FrameHeader::encode(payload.len(), mid);
        let Self {
            output, connection, ..
        } = self;
        output.write(connection, header.as_bytes())?;
        output.write(connection, payload)?;
        output.flush(connection)
    }

    /// Read one frame header. A timeout here is retryable: the latched
    /// I/O error is cleared and partial header bytes are kept for the
    /// next attempt.
    fn recv_header(&mut self) -> Result<FrameHeader> {
        let Self {
            input,
            connection,
            header_buf,
            header_filled,
            ..
        } = self;

        input.allowed_read(FRAME_HEADER_SIZE - *header_filled);
        while *header_filled < FRAME_HEADER_SIZE {
            match input.next(connection) {
                Ok(Some(chunk)) => {
                    let take = chunk.len().min(FRAME_HEADER_SIZE - *header_filled);
                    let excess = chunk.len() - take;
                    header_buf[*header_filled..*header_filled + take]
                        .copy_from_slice(&chunk[..take]);
                    if excess > 0 {
                        input.back_up(excess);
                    }
                    *header_filled += take;
                }
                Ok(None) => {
                    return Err(Error::new(
                        code::MALFORMED_PACKET,
                        "Unexpected end of message",
                    ));
                }
                Err(e) => {
                    if input.last_io_error().is_some_and(Error::is_read_timeout) {
                        input.clear_io_error();
                    }
                    return Err(e);
                }
            }
        }
        *header_filled = 0;

        FrameHeader::read_from_bytes(&header_buf[..])
            .map_err(|_| Error::new(code::MALFORMED_PACKET, "Invalid frame header"))
    }

    fn read_payload(&mut self, length: usize) -> Result<Vec<u8>> {
        let Self {
            input, connection, ..
        } = self;
        input.allowed_read(length);
        let mut payload = vec![0; length];
        input.read_exact(connection, &mut payload)?;
        Ok(payload)
    }

    /// Receive one raw frame as `(type, payload)`.
    pub fn recv_raw(&mut self) -> Result<(u8, Vec<u8>)> {
        let header = self.recv_header()?;
        let payload = self.read_payload(header.payload_length())?;
        Ok((header.msg_type, payload))
    }

    /// Receive one raw frame into a caller-owned buffer.
    pub fn recv_raw_into(&mut self, buffer: &mut [u8]) -> Result<(u8, usize)> {
        let header = self.recv_header()?;
        let length = header.payload_length();
        if length > buffer.len() {
            return Err(Error::fatal(
                code::RECEIVE_BUFFER_TOO_SMALL,
                "Receive buffer too small",
            ));
        }
        let Self {
            input, connection, ..
        } = self;
        input.allowed_read(length);
        input.read_exact(connection, &mut buffer[..length])?;
        Ok((header.msg_type, length))
    }

    /// Decode a standalone frame payload by its type tag.
    pub fn deserialize_received_message(&self, mid: u8, payload: &[u8]) -> Result<ServerMessage> {
        ServerMessage::decode(mid, payload)
    }

    /// Read messages until one survives the interceptor chains.
    ///
    /// Compressed envelopes are demultiplexed transparently: inner frames
    /// are decoded and dispatched exactly like ordinary messages.
    pub fn recv_single_message(&mut self) -> Result<ServerMessage> {
        if let Some(error) = self.global_error() {
            return Err(error);
        }

        loop {
            let Some(msg) = self.recv_message_with_header()? else {
                // A compressed envelope was consumed whole; read on.
                continue;
            };

            if self.dispatch_received(&msg)? {
                continue;
            }

            return Ok(msg);
        }
    }

    fn recv_message_with_header(&mut self) -> Result<Option<ServerMessage>> {
        // Drain an installed inner stream before touching outer frames.
        if self.inner_stream.is_some() {
            return self.read_compressed().map(Some);
        }

        let header = self.recv_header()?;
        let payload_length = header.payload_length();
        trace!(
            mid = header.msg_type,
            len = payload_length,
            "recv message"
        );

        if header.msg_type != ServerMessageId::Compression as u8 {
            let payload = self.read_payload(payload_length)?;
            return ServerMessage::decode(header.msg_type, &payload).map(Some);
        }

        let payload = self.read_payload(payload_length)?;
        let envelope =
            match ServerMessage::decode(ServerMessageId::Compression as u8, &payload)? {
                ServerMessage::Compression(envelope) => envelope,
                _ => {
                    return Err(Error::new(
                        code::MALFORMED_PACKET,
                        "Invalid compression envelope",
                    ));
                }
            };

        if self.dispatch_received(&ServerMessage::Compression(envelope.clone()))? {
            return Ok(None);
        }

        let decompressed = self
            .compression
            .downlink(&envelope.payload, envelope.uncompressed_size)?;
        let inner = InnerMessageStream::new(decompressed);
        if !inner.has_data() {
            return Ok(None);
        }
        self.inner_stream = Some(inner);
        self.read_compressed().map(Some)
    }

    fn read_compressed(&mut self) -> Result<ServerMessage> {
        let Some(inner) = self.inner_stream.as_mut() else {
            return Err(Error::new(
                code::COMPRESSION_NOT_CONFIGURED,
                "Compression is disabled or required compression style was not selected",
            ));
        };

        let result = inner
            .next_frame()
            .and_then(|(mid, payload)| ServerMessage::decode(mid, payload));

        let drained = !self.inner_stream.as_ref().is_some_and(InnerMessageStream::has_data);
        if drained || result.is_err() {
            self.inner_stream = None;
        }

        result
    }

    /// Receive one message and require its type: an `ERROR` frame maps to
    /// the carried server error, any other unexpected type is an
    /// out-of-sync condition.
    pub fn recv_id(&mut self, expected: ServerMessageId) -> Result<ServerMessage> {
        let msg = self.recv_single_message()?;

        if let ServerMessage::Error(error) = &msg {
            return Err(error_from_message(error));
        }

        if msg.id() != expected {
            return Err(Error::new(
                code::MALFORMED_PACKET,
                format!("Unknown message received from server {}", msg.id() as u8),
            ));
        }

        Ok(msg)
    }

    pub fn recv_ok(&mut self) -> Result<()> {
        self.recv_id(ServerMessageId::Ok).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Compressed send
    // ------------------------------------------------------------------

    pub fn send_compressed_frame<M: ClientMessage>(&mut self, msg: &M) -> Result<()> {
        self.send_compressed_multiple_frames(&[(M::ID, msg)])
    }

    /// Pack several messages as inner frames of one `COMPRESSION`
    /// envelope.
    pub fn send_compressed_multiple_frames(
        &mut self,
        messages: &[(ClientMessageId, &dyn WireMessage)],
    ) -> Result<()> {
        if !self.compression.is_enabled() {
            return Err(Error::new(
                code::COMPRESSION_NOT_CONFIGURED,
                "Compression is disabled or required compression style was not selected",
            ));
        }

        let mut inner = Vec::new();
        for (mid, msg) in messages {
            self.dispatch_send(*mid, *msg);
            write_inner_frame(&mut inner, *mid, *msg)?;
        }

        let uncompressed_size = inner.len() as u64;
        let compressed = self.compression.uplink(&inner)?;
        debug!(
            uncompressed = uncompressed_size,
            compressed = compressed.len(),
            "send compressed envelope"
        );

        let envelope = proto::connection::Compression {
            uncompressed_size: Some(uncompressed_size),
            server_messages: None,
            client_messages: None,
            payload: compressed,
        };
        self.send_with_id(ClientMessageId::Compression, &envelope)
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    pub fn execute_fetch_capabilities(&mut self) -> Result<proto::connection::Capabilities> {
        self.send(&proto::connection::CapabilitiesGet {})?;
        match self.recv_id(ServerMessageId::ConnCapabilities)? {
            ServerMessage::Capabilities(capabilities) => Ok(capabilities),
            _ => Err(Error::new(
                code::MALFORMED_PACKET,
                "Unknown message received from server",
            )),
        }
    }

    pub fn execute_set_capability(
        &mut self,
        capabilities_set: &proto::connection::CapabilitiesSet,
    ) -> Result<()> {
        self.send(capabilities_set)?;
        self.recv_ok()
    }

    pub fn execute_close(&mut self) -> Result<()> {
        self.send(&proto::connection::Close {})?;
        self.recv_ok()
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Run one authentication round with the named mechanism.
    pub fn execute_authenticate(
        &mut self,
        user: &str,
        pass: &str,
        schema: &str,
        method: &str,
    ) -> Result<()> {
        debug!(method, user, "authenticate");
        match method {
            "PLAIN" => self.authenticate_plain(user, pass, schema),
            "MYSQL41" => self.authenticate_challenge_response(
                "MYSQL41",
                user,
                pass,
                schema,
                |pass, nonce| {
                    if pass.is_empty() {
                        String::new()
                    } else {
                        auth::mysql41_scramble(pass, nonce)
                    }
                },
            ),
            "SHA256_MEMORY" => self.authenticate_challenge_response(
                "SHA256_MEMORY",
                user,
                pass,
                schema,
                auth::sha256_memory_scramble,
            ),
            other => Err(Error::new(
                code::INVALID_AUTH_METHOD,
                format!("Invalid authentication method {other}"),
            )),
        }
    }

    fn authenticate_plain(&mut self, user: &str, pass: &str, schema: &str) -> Result<()> {
        self.send(&proto::session::AuthenticateStart {
            mech_name: "PLAIN".to_string(),
            auth_data: Some(auth::continue_payload(schema, user, pass)),
            initial_response: None,
        })?;
        self.recv_id(ServerMessageId::SessAuthenticateOk).map(|_| ())
    }

    /// The generic two-round sequence: start with the mechanism name,
    /// answer the nonce with the mechanism-specific continue payload,
    /// expect `AuthenticateOk`.
    fn authenticate_challenge_response(
        &mut self,
        mechanism: &str,
        user: &str,
        pass: &str,
        schema: &str,
        scramble: impl FnOnce(&str, &[u8]) -> String,
    ) -> Result<()> {
        self.send(&proto::session::AuthenticateStart {
            mech_name: mechanism.to_string(),
            auth_data: None,
            initial_response: None,
        })?;

        let nonce = match self.recv_id(ServerMessageId::SessAuthenticateContinue)? {
            ServerMessage::AuthenticateContinue(cont) => cont.auth_data,
            _ => {
                return Err(Error::new(
                    code::MALFORMED_PACKET,
                    "Unknown message received from server",
                ));
            }
        };

        let response = scramble(pass, &nonce);
        self.send(&proto::session::AuthenticateContinue {
            auth_data: auth::continue_payload(schema, user, &response),
        })?;

        self.recv_id(ServerMessageId::SessAuthenticateOk).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Execute with resultset
    // ------------------------------------------------------------------

    fn execute<M: ClientMessage>(&mut self, msg: &M) -> Result<QueryResult<'_>> {
        self.send(msg)?;
        self.recv_resultset()
    }

    pub fn execute_stmt(&mut self, msg: &proto::sql::StmtExecute) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    pub fn execute_find(&mut self, msg: &proto::crud::Find) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    pub fn execute_insert(&mut self, msg: &proto::crud::Insert) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    pub fn execute_update(&mut self, msg: &proto::crud::Update) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    pub fn execute_delete(&mut self, msg: &proto::crud::Delete) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    pub fn execute_prep_stmt(&mut self, msg: &proto::prepare::Execute) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    pub fn execute_cursor_open(&mut self, msg: &proto::cursor::Open) -> Result<QueryResult<'_>> {
        self.execute(msg)
    }

    /// Fetch from an open cursor. Servers do not re-emit metadata on
    /// fetch; the caller passes the columns obtained from the
    /// `Cursor.Open` result.
    pub fn execute_cursor_fetch(
        &mut self,
        msg: &proto::cursor::Fetch,
        metadata: Vec<Column>,
    ) -> Result<QueryResult<'_>> {
        self.send(msg)?;
        if let Some(error) = self.global_error() {
            return Err(error);
        }
        let mut result = QueryResult::new(self);
        result.set_metadata(metadata);
        Ok(result)
    }

    fn recv_resultset(&mut self) -> Result<QueryResult<'_>> {
        if let Some(error) = self.global_error() {
            return Err(error);
        }
        let mut result = QueryResult::new(self);
        result.get_metadata()?;
        Ok(result)
    }
}

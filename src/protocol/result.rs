//! Streaming query results: metadata, rows, terminal markers, and the
//! session-state side channel carried by notices.

use std::cell::RefCell;
use std::rc::Rc;

use prost::Message as _;
use tracing::trace;

use crate::constant::{ColumnFlags, ServerMessageId, notice_type};
use crate::error::{Error, Result, code};
use crate::proto;
use crate::proto::notice::session_state_changed::Parameter;
use crate::protocol::engine::Protocol;
use crate::protocol::frame::{ServerMessage, error_from_message};
use crate::protocol::handler::{HandlerId, HandlerPosition, HandlerResult, PRIORITY_MEDIUM};

const ERR_LAST_COMMAND_UNFINISHED: &str =
    "Fetching wrong result set, there is previous command pending.";

/// Enforces "one active reader at a time" with two monotonic counters.
#[derive(Debug, Default)]
pub struct QuerySequencer {
    current_instance: u64,
    last_instance: u64,
}

impl QuerySequencer {
    /// Allocate the instance id for a new result.
    pub fn fetch_begin(&mut self) -> u64 {
        let id = self.last_instance;
        self.last_instance += 1;
        id
    }

    /// Advance past the instance whose fetch completed.
    pub fn fetch_end(&mut self) {
        self.current_instance += 1;
    }

    pub fn is_active(&self, instance_id: u64) -> bool {
        instance_id == self.current_instance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Sint,
    Uint,
    Double,
    Float,
    Bytes,
    Time,
    Datetime,
    Set,
    Enum,
    Bit,
    Decimal,
}

/// Decoded column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub column_type: ColumnType,
    pub name: String,
    pub original_name: String,
    pub table: String,
    pub original_table: String,
    pub schema: String,
    pub catalog: String,
    pub collation: u64,
    pub fractional_digits: u32,
    pub length: u32,
    pub flags: ColumnFlags,
    pub content_type: Option<u32>,
}

fn utf8_or_lossy(bytes: Option<&Vec<u8>>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

pub(crate) fn unwrap_column_metadata(
    column: &proto::resultset::ColumnMetaData,
) -> Result<Column> {
    use proto::resultset::column_meta_data::FieldType;

    let column_type = match FieldType::try_from(column.r#type) {
        Ok(FieldType::Sint) => ColumnType::Sint,
        Ok(FieldType::Uint) => ColumnType::Uint,
        Ok(FieldType::Double) => ColumnType::Double,
        Ok(FieldType::Float) => ColumnType::Float,
        Ok(FieldType::Bytes) => ColumnType::Bytes,
        Ok(FieldType::Time) => ColumnType::Time,
        Ok(FieldType::Datetime) => ColumnType::Datetime,
        Ok(FieldType::Set) => ColumnType::Set,
        Ok(FieldType::Enum) => ColumnType::Enum,
        Ok(FieldType::Bit) => ColumnType::Bit,
        Ok(FieldType::Decimal) => ColumnType::Decimal,
        Err(_) => {
            return Err(Error::new(
                code::MALFORMED_PACKET,
                format!("Unknown column type: {}", column.r#type),
            ));
        }
    };

    Ok(Column {
        column_type,
        name: utf8_or_lossy(column.name.as_ref()),
        original_name: utf8_or_lossy(column.original_name.as_ref()),
        table: utf8_or_lossy(column.table.as_ref()),
        original_table: utf8_or_lossy(column.original_table.as_ref()),
        schema: utf8_or_lossy(column.schema.as_ref()),
        catalog: utf8_or_lossy(column.catalog.as_ref()),
        collation: column.collation.unwrap_or(0),
        fractional_digits: column.fractional_digits.unwrap_or(0),
        length: column.length.unwrap_or(0),
        flags: ColumnFlags::from_bits_truncate(column.flags.unwrap_or(0)),
        content_type: column.content_type,
    })
}

/// Per-statement side-channel data accumulated from notices; shared with
/// the handler registered on the engine.
#[derive(Debug, Default)]
struct NoticeState {
    last_insert_id: Option<u64>,
    affected_rows: Option<u64>,
    produced_message: Option<String>,
    generated_document_ids: Vec<String>,
    warnings: Vec<proto::notice::Warning>,
}

fn handle_notice(state: &RefCell<NoticeState>, notice: u32, payload: &[u8]) -> HandlerResult {
    match notice {
        notice_type::WARNING => {
            let Ok(warning) = proto::notice::Warning::decode(payload) else {
                return HandlerResult::Error;
            };
            state.borrow_mut().warnings.push(warning);
            HandlerResult::Consumed
        }

        notice_type::SESSION_STATE_CHANGED => {
            let Ok(change) = proto::notice::SessionStateChanged::decode(payload) else {
                return HandlerResult::Error;
            };

            let mut state = state.borrow_mut();
            match Parameter::try_from(change.param) {
                Ok(Parameter::GeneratedInsertId) => {
                    let [value] = change.value.as_slice() else {
                        return HandlerResult::Error;
                    };
                    match value.as_unsigned_int() {
                        Some(id) => state.last_insert_id = Some(id),
                        None => return HandlerResult::Error,
                    }
                }
                Ok(Parameter::RowsAffected) => {
                    let [value] = change.value.as_slice() else {
                        return HandlerResult::Error;
                    };
                    match value.as_unsigned_int() {
                        Some(rows) => state.affected_rows = Some(rows),
                        None => return HandlerResult::Error,
                    }
                }
                Ok(Parameter::ProducedMessage) => {
                    let [value] = change.value.as_slice() else {
                        return HandlerResult::Error;
                    };
                    match value.as_string() {
                        Some(message) => {
                            state.produced_message =
                                Some(String::from_utf8_lossy(message).into_owned());
                        }
                        None => return HandlerResult::Error,
                    }
                }
                Ok(Parameter::GeneratedDocumentIds) => {
                    state.generated_document_ids.clear();
                    for value in &change.value {
                        match value.as_octets() {
                            Some(id) => state
                                .generated_document_ids
                                .push(String::from_utf8_lossy(id).into_owned()),
                            None => return HandlerResult::Error,
                        }
                    }
                }
                _ => return HandlerResult::Continue,
            }
            HandlerResult::Consumed
        }

        _ => HandlerResult::Continue,
    }
}

const RESULT_BOUNDARIES: &[ServerMessageId] = &[
    ServerMessageId::SqlStmtExecuteOk,
    ServerMessageId::ResultsetRow,
    ServerMessageId::ResultsetFetchDone,
    ServerMessageId::ResultsetFetchDoneMoreResultsets,
    ServerMessageId::ResultsetFetchDoneMoreOutParams,
    ServerMessageId::ResultsetFetchSuspended,
];

const RESULT_TERMINALS: &[ServerMessageId] = &[
    ServerMessageId::ResultsetFetchDone,
    ServerMessageId::ResultsetFetchDoneMoreResultsets,
    ServerMessageId::ResultsetFetchDoneMoreOutParams,
    ServerMessageId::ResultsetFetchSuspended,
];

/// One or more streamed resultsets.
///
/// The result mutably borrows the engine, so the compiler already keeps a
/// second reader out; the sequencer still guards the observable contract
/// and poisons the session when violated. Dropping a partially consumed
/// result drains the stream through `STMT_EXECUTE_OK` so the next command
/// starts aligned.
pub struct QueryResult<'a> {
    protocol: &'a mut Protocol,
    state: Rc<RefCell<NoticeState>>,
    notice_handler_id: Option<HandlerId>,
    instance_id: u64,
    error: Option<Error>,
    metadata: Vec<Column>,
    cached: Option<ServerMessage>,
    cached_id: Option<ServerMessageId>,
    read_metadata_pending: bool,
    received_fetch_done: bool,
    is_out_param_resultset: bool,
}

impl<'a> QueryResult<'a> {
    pub(crate) fn new(protocol: &'a mut Protocol) -> Self {
        let state: Rc<RefCell<NoticeState>> = Rc::default();
        let instance_id = protocol.sequencer.fetch_begin();

        let handler_state = Rc::clone(&state);
        let notice_handler_id = protocol.add_notice_handler(
            Box::new(move |is_global, notice, payload| {
                if is_global {
                    return HandlerResult::Continue;
                }
                handle_notice(&handler_state, notice, payload)
            }),
            HandlerPosition::Begin,
            PRIORITY_MEDIUM,
        );

        Self {
            protocol,
            state,
            notice_handler_id: Some(notice_handler_id),
            instance_id,
            error: None,
            metadata: Vec::new(),
            cached: None,
            cached_id: None,
            read_metadata_pending: true,
            received_fetch_done: false,
            is_out_param_resultset: false,
        }
    }

    // --------------------------------------------------------------
    // Side-channel accessors
    // --------------------------------------------------------------

    pub fn try_get_last_insert_id(&self) -> Option<u64> {
        self.state.borrow().last_insert_id
    }

    pub fn try_get_affected_rows(&self) -> Option<u64> {
        self.state.borrow().affected_rows
    }

    pub fn try_get_info_message(&self) -> Option<String> {
        self.state.borrow().produced_message.clone()
    }

    pub fn try_get_generated_document_ids(&self) -> Option<Vec<String>> {
        let ids = &self.state.borrow().generated_document_ids;
        if ids.is_empty() {
            None
        } else {
            Some(ids.clone())
        }
    }

    pub fn get_warnings(&self) -> Vec<proto::notice::Warning> {
        self.state.borrow().warnings.clone()
    }

    pub fn is_out_parameter_resultset(&self) -> bool {
        self.is_out_param_resultset
    }

    // --------------------------------------------------------------
    // Streaming
    // --------------------------------------------------------------

    fn had_fetch_not_ended(&self) -> bool {
        self.error.is_none() && !self.received_fetch_done
    }

    /// Read column metadata if pending; returns the columns of the
    /// current resultset.
    pub fn get_metadata(&mut self) -> Result<&[Column]> {
        if self.had_fetch_not_ended() {
            self.verify_current_instance()?;
            self.read_if_needed_metadata()?;
            self.check_if_fetch_done();
        } else if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(&self.metadata)
    }

    /// Install metadata obtained elsewhere (cursor fetches do not re-emit
    /// it on the wire).
    pub fn set_metadata(&mut self, metadata: Vec<Column>) {
        self.metadata = metadata;
        self.read_metadata_pending = false;
    }

    pub fn metadata(&self) -> &[Column] {
        &self.metadata
    }

    pub fn has_resultset(&mut self) -> Result<bool> {
        Ok(!self.get_metadata()?.is_empty())
    }

    /// The next row, or `None` once a terminal message was seen.
    pub fn get_next_row(&mut self) -> Result<Option<proto::resultset::Row>> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.received_fetch_done {
            return Ok(None);
        }

        self.verify_current_instance()?;
        self.read_if_needed_metadata()?;
        let row = self.read_row()?;
        self.check_if_stmt_ok()?;
        Ok(row)
    }

    /// Move to the next resultset. Valid only after the current stream
    /// ended with a more-resultsets or more-out-params marker.
    pub fn next_resultset(&mut self) -> Result<bool> {
        self.metadata.clear();

        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.received_fetch_done {
            return Ok(false);
        }

        self.verify_current_instance()?;
        if self.check_if_fetch_done() {
            return Ok(false);
        }

        let at_boundary = self.cached_id.is_some_and(|id| RESULT_TERMINALS.contains(&id));
        if !at_boundary {
            self.drain_to_boundary()?;
        }

        // Accept another series of column metadata.
        self.read_metadata_pending = true;

        if self.cached_id == Some(ServerMessageId::ResultsetFetchDoneMoreOutParams) {
            self.is_out_param_resultset = true;
        }

        match self.cached_id {
            // The marker is consumed; the next metadata block follows.
            Some(ServerMessageId::ResultsetFetchDoneMoreResultsets)
            | Some(ServerMessageId::ResultsetFetchDoneMoreOutParams) => {
                self.cached = None;
                self.cached_id = None;
            }
            // Keep the id so check_if_stmt_ok sees the terminal kind.
            Some(ServerMessageId::ResultsetFetchDone)
            | Some(ServerMessageId::ResultsetFetchSuspended) => {
                self.cached = None;
            }
            _ => {}
        }

        self.check_if_stmt_ok()?;
        Ok(self.had_fetch_not_ended())
    }

    // --------------------------------------------------------------
    // Internals
    // --------------------------------------------------------------

    fn record(&mut self, error: Error) -> Error {
        if self.error.is_none() {
            self.error = Some(error.clone());
            if !self.received_fetch_done {
                self.protocol.sequencer.fetch_end();
                self.remove_notice_handler();
            }
        }
        error
    }

    fn remove_notice_handler(&mut self) {
        if let Some(id) = self.notice_handler_id.take() {
            self.protocol.remove_notice_handler(id);
        }
    }

    fn verify_current_instance(&mut self) -> Result<()> {
        if self.protocol.sequencer.is_active(self.instance_id) {
            return Ok(());
        }
        let error = Error::new(code::LAST_COMMAND_UNFINISHED, ERR_LAST_COMMAND_UNFINISHED);
        self.protocol.context().borrow_mut().global_error = Some(error.clone());
        self.error = Some(error.clone());
        Err(error)
    }

    /// Read until one of `expected` arrives and cache it. `ColumnMetaData`
    /// frames are collected or skipped depending on `collect_metadata`;
    /// unconsumed notices and, while draining, rows are tolerated.
    fn read_until_expected(
        &mut self,
        expected: &[ServerMessageId],
        collect_metadata: bool,
        allow_rows: bool,
    ) -> Result<()> {
        loop {
            let msg = match self.protocol.recv_single_message() {
                Ok(msg) => msg,
                Err(e) => return Err(self.record(e)),
            };
            let id = msg.id();
            trace!(id = id as u8, "resultset message");

            if expected.contains(&id) {
                self.cached_id = Some(id);
                self.cached = Some(msg);
                return Ok(());
            }

            match msg {
                ServerMessage::ColumnMetaData(meta) => {
                    if collect_metadata {
                        match unwrap_column_metadata(&meta) {
                            Ok(column) => self.metadata.push(column),
                            Err(e) => return Err(self.record(e)),
                        }
                    }
                }
                ServerMessage::Row(_) if allow_rows => {}
                // A notice nobody consumed; not part of the row stream.
                ServerMessage::Notice(_) => {}
                ServerMessage::Error(error) => {
                    return Err(self.record(error_from_message(&error)));
                }
                other => {
                    let error = Error::new(
                        code::MALFORMED_PACKET,
                        format!(
                            "Unknown message received from server {}",
                            other.id() as u8
                        ),
                    );
                    return Err(self.record(error));
                }
            }
        }
    }

    fn read_if_needed_metadata(&mut self) -> Result<()> {
        if self.error.is_none() && self.read_metadata_pending {
            self.read_metadata_pending = false;
            self.read_until_expected(RESULT_BOUNDARIES, true, false)?;
        }
        Ok(())
    }

    fn read_row(&mut self) -> Result<Option<proto::resultset::Row>> {
        if self.cached.is_none() && self.cached_id.is_none() {
            self.read_until_expected(RESULT_BOUNDARIES, false, false)?;
        }

        match self.cached.take() {
            Some(ServerMessage::Row(row)) => {
                self.cached_id = None;
                // Stay one message ahead so terminals are seen eagerly.
                self.read_until_expected(RESULT_BOUNDARIES, false, false)?;
                Ok(Some(row))
            }
            other => {
                self.cached = other;
                Ok(None)
            }
        }
    }

    fn drain_to_boundary(&mut self) -> Result<()> {
        self.read_until_expected(
            &[
                ServerMessageId::SqlStmtExecuteOk,
                ServerMessageId::ResultsetFetchDone,
                ServerMessageId::ResultsetFetchDoneMoreResultsets,
                ServerMessageId::ResultsetFetchDoneMoreOutParams,
                ServerMessageId::ResultsetFetchSuspended,
            ],
            false,
            true,
        )
    }

    /// After `FETCH_DONE` or `FETCH_SUSPENDED`, pull the closing
    /// `STMT_EXECUTE_OK` (a suspended fetch is not followed by one in
    /// this round; the cursor delivers it later).
    fn check_if_stmt_ok(&mut self) -> Result<()> {
        if self.error.is_none()
            && self.cached_id == Some(ServerMessageId::ResultsetFetchDone)
        {
            self.cached = None;
            self.cached_id = None;
            self.read_until_expected(&[ServerMessageId::SqlStmtExecuteOk], false, false)?;
        }
        if self.error.is_none()
            && self.cached_id == Some(ServerMessageId::ResultsetFetchSuspended)
        {
            self.cached = None;
            self.cached_id = None;
            self.received_fetch_done = true;
            self.protocol.sequencer.fetch_end();
            self.remove_notice_handler();
            return Ok(());
        }

        self.check_if_fetch_done();
        Ok(())
    }

    fn check_if_fetch_done(&mut self) -> bool {
        if self.error.is_none()
            && !self.received_fetch_done
            && self.cached_id == Some(ServerMessageId::SqlStmtExecuteOk)
        {
            self.protocol.sequencer.fetch_end();
            self.remove_notice_handler();
            self.received_fetch_done = true;
        }
        self.received_fetch_done
    }
}

impl Drop for QueryResult<'_> {
    fn drop(&mut self) {
        while self.had_fetch_not_ended() {
            if self.next_resultset().is_err() {
                break;
            }
        }
        self.remove_notice_handler();
    }
}

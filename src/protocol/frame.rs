//! Frame header layout and the typed view over decoded server messages.

use prost::Message as _;
use zerocopy::byteorder::little_endian::U32 as U32LE;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::{ClientMessageId, ServerMessageId};
use crate::error::{Error, Result, code};
use crate::proto;

/// X Protocol frame header (zero-copy)
///
/// Layout on the wire:
/// - length: 4 bytes (little-endian, includes the type byte)
/// - type: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct FrameHeader {
    pub length: U32LE,
    pub msg_type: u8,
}

pub const FRAME_HEADER_SIZE: usize = 5;

impl FrameHeader {
    pub fn encode(payload_length: usize, msg_type: u8) -> Self {
        Self {
            length: U32LE::new(payload_length as u32 + 1),
            msg_type,
        }
    }

    /// Payload bytes following the header (the type byte is excluded).
    pub fn payload_length(&self) -> usize {
        (self.length.get() as usize).saturating_sub(1)
    }
}

/// Object-safe view of an encodable message, usable behind `dyn` in
/// handler callbacks and mixed-message envelopes.
pub trait WireMessage: std::fmt::Debug {
    fn encoded_len(&self) -> usize;
    fn encode_raw_to(&self, out: &mut Vec<u8>);
}

impl<M: prost::Message> WireMessage for M {
    fn encoded_len(&self) -> usize {
        prost::Message::encoded_len(self)
    }

    fn encode_raw_to(&self, out: &mut Vec<u8>) {
        self.encode_raw(out);
    }
}

/// A client message paired with its frame type tag.
///
/// The trait is what lets `Protocol::send` pick the right tag for every
/// message class at compile time.
pub trait ClientMessage: prost::Message {
    const ID: ClientMessageId;
}

macro_rules! client_message {
    ($($msg:ty => $id:ident,)*) => {
        $(impl ClientMessage for $msg {
            const ID: ClientMessageId = ClientMessageId::$id;
        })*
    };
}

client_message! {
    proto::connection::CapabilitiesGet => CapabilitiesGet,
    proto::connection::CapabilitiesSet => CapabilitiesSet,
    proto::connection::Close => ConClose,
    proto::session::AuthenticateStart => SessAuthenticateStart,
    proto::session::AuthenticateContinue => SessAuthenticateContinue,
    proto::session::Reset => SessReset,
    proto::session::Close => SessClose,
    proto::sql::StmtExecute => SqlStmtExecute,
    proto::crud::Find => CrudFind,
    proto::crud::Insert => CrudInsert,
    proto::crud::Update => CrudUpdate,
    proto::crud::Delete => CrudDelete,
    proto::crud::CreateView => CrudCreateView,
    proto::crud::ModifyView => CrudModifyView,
    proto::crud::DropView => CrudDropView,
    proto::expect::Open => ExpectOpen,
    proto::expect::Close => ExpectClose,
    proto::prepare::Prepare => PreparePrepare,
    proto::prepare::Execute => PrepareExecute,
    proto::prepare::Deallocate => PrepareDeallocate,
    proto::cursor::Open => CursorOpen,
    proto::cursor::Close => CursorClose,
    proto::cursor::Fetch => CursorFetch,
}

/// A decoded server message. The Rust stand-in for allocate-by-tag plus
/// downcasts: match instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ok(proto::Ok),
    Error(proto::Error),
    Capabilities(proto::connection::Capabilities),
    AuthenticateContinue(proto::session::AuthenticateContinue),
    AuthenticateOk(proto::session::AuthenticateOk),
    Notice(proto::notice::Frame),
    ColumnMetaData(proto::resultset::ColumnMetaData),
    Row(proto::resultset::Row),
    FetchDone(proto::resultset::FetchDone),
    FetchSuspended(proto::resultset::FetchSuspended),
    FetchDoneMoreResultsets(proto::resultset::FetchDoneMoreResultsets),
    StmtExecuteOk(proto::sql::StmtExecuteOk),
    FetchDoneMoreOutParams(proto::resultset::FetchDoneMoreOutParams),
    Compression(proto::connection::Compression),
}

impl ServerMessage {
    pub fn id(&self) -> ServerMessageId {
        match self {
            Self::Ok(_) => ServerMessageId::Ok,
            Self::Error(_) => ServerMessageId::Error,
            Self::Capabilities(_) => ServerMessageId::ConnCapabilities,
            Self::AuthenticateContinue(_) => ServerMessageId::SessAuthenticateContinue,
            Self::AuthenticateOk(_) => ServerMessageId::SessAuthenticateOk,
            Self::Notice(_) => ServerMessageId::Notice,
            Self::ColumnMetaData(_) => ServerMessageId::ResultsetColumnMetaData,
            Self::Row(_) => ServerMessageId::ResultsetRow,
            Self::FetchDone(_) => ServerMessageId::ResultsetFetchDone,
            Self::FetchSuspended(_) => ServerMessageId::ResultsetFetchSuspended,
            Self::FetchDoneMoreResultsets(_) => ServerMessageId::ResultsetFetchDoneMoreResultsets,
            Self::StmtExecuteOk(_) => ServerMessageId::SqlStmtExecuteOk,
            Self::FetchDoneMoreOutParams(_) => ServerMessageId::ResultsetFetchDoneMoreOutParams,
            Self::Compression(_) => ServerMessageId::Compression,
        }
    }

    /// Decode a frame payload according to its type tag.
    pub fn decode(mid: u8, payload: &[u8]) -> Result<Self> {
        let Some(id) = ServerMessageId::from_u8(mid) else {
            return Err(Error::new(
                code::MALFORMED_PACKET,
                format!("Unexpected response received from server, msg-id: {mid}"),
            ));
        };

        fn parse<M: prost::Message + Default>(name: &str, payload: &[u8]) -> Result<M> {
            M::decode(payload).map_err(|e| {
                Error::new(
                    code::MALFORMED_PACKET,
                    format!("Message is not properly initialized: Name:{name}, {e}"),
                )
            })
        }

        Ok(match id {
            ServerMessageId::Ok => Self::Ok(parse("Mysqlx.Ok", payload)?),
            ServerMessageId::Error => Self::Error(parse("Mysqlx.Error", payload)?),
            ServerMessageId::ConnCapabilities => {
                Self::Capabilities(parse("Mysqlx.Connection.Capabilities", payload)?)
            }
            ServerMessageId::SessAuthenticateContinue => Self::AuthenticateContinue(parse(
                "Mysqlx.Session.AuthenticateContinue",
                payload,
            )?),
            ServerMessageId::SessAuthenticateOk => {
                Self::AuthenticateOk(parse("Mysqlx.Session.AuthenticateOk", payload)?)
            }
            ServerMessageId::Notice => Self::Notice(parse("Mysqlx.Notice.Frame", payload)?),
            ServerMessageId::ResultsetColumnMetaData => {
                Self::ColumnMetaData(parse("Mysqlx.Resultset.ColumnMetaData", payload)?)
            }
            ServerMessageId::ResultsetRow => Self::Row(parse("Mysqlx.Resultset.Row", payload)?),
            ServerMessageId::ResultsetFetchDone => {
                Self::FetchDone(parse("Mysqlx.Resultset.FetchDone", payload)?)
            }
            ServerMessageId::ResultsetFetchSuspended => {
                Self::FetchSuspended(parse("Mysqlx.Resultset.FetchSuspended", payload)?)
            }
            ServerMessageId::ResultsetFetchDoneMoreResultsets => Self::FetchDoneMoreResultsets(
                parse("Mysqlx.Resultset.FetchDoneMoreResultsets", payload)?,
            ),
            ServerMessageId::SqlStmtExecuteOk => {
                Self::StmtExecuteOk(parse("Mysqlx.Sql.StmtExecuteOk", payload)?)
            }
            ServerMessageId::ResultsetFetchDoneMoreOutParams => Self::FetchDoneMoreOutParams(
                parse("Mysqlx.Resultset.FetchDoneMoreOutParams", payload)?,
            ),
            ServerMessageId::Compression => {
                Self::Compression(parse("Mysqlx.Connection.Compression", payload)?)
            }
        })
    }
}

/// Translate a received `Mysqlx.Error` into the error value type.
pub fn error_from_message(error: &proto::Error) -> Error {
    Error::server(
        error.code as i32,
        error.msg.clone(),
        error.is_fatal(),
        error.sql_state.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_length_includes_type_byte() {
        let header = FrameHeader::encode(7, ServerMessageId::Ok as u8);
        assert_eq!(header.length.get(), 8);
        assert_eq!(header.payload_length(), 7);

        let bytes = header.as_bytes();
        assert_eq!(bytes, [8, 0, 0, 0, 0]);
    }

    #[test]
    fn header_parses_from_wire_bytes() {
        let bytes = [3_u8, 0, 0, 0, 11];
        let header = FrameHeader::read_from_bytes(&bytes).unwrap();
        assert_eq!(header.payload_length(), 2);
        assert_eq!(header.msg_type, ServerMessageId::Notice as u8);
    }

    #[test]
    fn decode_round_trips_an_error_message() {
        let msg = proto::Error {
            severity: Some(proto::error::Severity::Fatal as i32),
            code: 1045,
            sql_state: "28000".to_string(),
            msg: "denied".to_string(),
        };
        let payload = msg.encode_to_vec();

        let decoded = ServerMessage::decode(ServerMessageId::Error as u8, &payload).unwrap();
        let ServerMessage::Error(decoded) = decoded else {
            panic!("wrong variant");
        };
        assert_eq!(decoded, msg);

        let error = error_from_message(&decoded);
        assert_eq!(error.code, 1045);
        assert!(error.is_fatal());
        assert_eq!(error.sql_state, "28000");
    }

    #[test]
    fn unknown_message_id_is_malformed() {
        let err = ServerMessage::decode(200, &[]).unwrap_err();
        assert_eq!(err.code, code::MALFORMED_PACKET);
    }

    #[test]
    fn corrupt_payload_is_malformed() {
        // 0xFF is not a valid field tag.
        let err = ServerMessage::decode(ServerMessageId::Error as u8, &[0xFF]).unwrap_err();
        assert_eq!(err.code, code::MALFORMED_PACKET);
    }
}

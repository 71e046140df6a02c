//! Wire-level constants of the X Protocol: message type tags, notice
//! types, and connection defaults.

/// Default X Plugin TCP port.
pub const DEFAULT_TCP_PORT: u16 = 33060;

/// Default X Plugin Unix socket path.
pub const DEFAULT_UNIX_SOCKET: &str = "/tmp/mysqlx.sock";

/// Default size of the connection receive buffer.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 64 * 1024;

/// Client id value meaning "no id assigned yet".
pub const CLIENT_ID_NOT_VALID: u64 = 0;

/// Tag byte of every message the client may send (`Mysqlx.ClientMessages`).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessageId {
    CapabilitiesGet = 1,
    CapabilitiesSet = 2,
    ConClose = 3,
    SessAuthenticateStart = 4,
    SessAuthenticateContinue = 5,
    SessReset = 6,
    SessClose = 7,
    SqlStmtExecute = 12,
    CrudFind = 17,
    CrudInsert = 18,
    CrudUpdate = 19,
    CrudDelete = 20,
    ExpectOpen = 24,
    ExpectClose = 25,
    CrudCreateView = 30,
    CrudModifyView = 31,
    CrudDropView = 32,
    PreparePrepare = 40,
    PrepareExecute = 41,
    PrepareDeallocate = 42,
    CursorOpen = 43,
    CursorClose = 44,
    CursorFetch = 45,
    Compression = 46,
}

/// Tag byte of every message the server may send (`Mysqlx.ServerMessages`).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessageId {
    Ok = 0,
    Error = 1,
    ConnCapabilities = 2,
    SessAuthenticateContinue = 3,
    SessAuthenticateOk = 4,
    Notice = 11,
    ResultsetColumnMetaData = 12,
    ResultsetRow = 13,
    ResultsetFetchDone = 14,
    ResultsetFetchSuspended = 15,
    ResultsetFetchDoneMoreResultsets = 16,
    SqlStmtExecuteOk = 17,
    ResultsetFetchDoneMoreOutParams = 18,
    Compression = 19,
}

impl ServerMessageId {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Ok,
            1 => Self::Error,
            2 => Self::ConnCapabilities,
            3 => Self::SessAuthenticateContinue,
            4 => Self::SessAuthenticateOk,
            11 => Self::Notice,
            12 => Self::ResultsetColumnMetaData,
            13 => Self::ResultsetRow,
            14 => Self::ResultsetFetchDone,
            15 => Self::ResultsetFetchSuspended,
            16 => Self::ResultsetFetchDoneMoreResultsets,
            17 => Self::SqlStmtExecuteOk,
            18 => Self::ResultsetFetchDoneMoreOutParams,
            19 => Self::Compression,
            _ => return None,
        })
    }
}

/// `Mysqlx.Notice.Frame.type` values.
pub mod notice_type {
    pub const WARNING: u32 = 1;
    pub const SESSION_VARIABLE_CHANGED: u32 = 2;
    pub const SESSION_STATE_CHANGED: u32 = 3;
    pub const GROUP_REPLICATION_STATE_CHANGED: u32 = 4;
    pub const SERVER_HELLO: u32 = 5;
}

bitflags::bitflags! {
    /// Flags carried in `Mysqlx.Resultset.ColumnMetaData.flags`.
    ///
    /// The low bit is reused per column type; the named constant here is
    /// the unsigned/zerofill meaning it has for numeric columns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u32 {
        /// UINT zerofill / DOUBLE, FLOAT, DECIMAL unsigned / BYTES rightpad
        const TYPE_SPECIFIC = 0x0001;
        const NOT_NULL = 0x0010;
        const PRIMARY_KEY = 0x0020;
        const UNIQUE_KEY = 0x0040;
        const MULTIPLE_KEY = 0x0080;
        const AUTO_INCREMENT = 0x0100;
    }
}

//! A scripted X Protocol server for integration tests: accepts one
//! connection on a loopback listener and plays a fixed exchange.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::thread::JoinHandle;

use prost::Message;

use zero_mysqlx::proto;

// Client frame type tags.
pub const C_CAPABILITIES_GET: u8 = 1;
pub const C_CAPABILITIES_SET: u8 = 2;
pub const C_CON_CLOSE: u8 = 3;
pub const C_AUTH_START: u8 = 4;
pub const C_AUTH_CONTINUE: u8 = 5;
pub const C_SESS_CLOSE: u8 = 7;
pub const C_STMT_EXECUTE: u8 = 12;
pub const C_COMPRESSION: u8 = 46;

// Server frame type tags.
pub const S_OK: u8 = 0;
pub const S_ERROR: u8 = 1;
pub const S_CAPABILITIES: u8 = 2;
pub const S_AUTH_CONTINUE: u8 = 3;
pub const S_AUTH_OK: u8 = 4;
pub const S_NOTICE: u8 = 11;
pub const S_COLUMN_META_DATA: u8 = 12;
pub const S_ROW: u8 = 13;
pub const S_FETCH_DONE: u8 = 14;
pub const S_FETCH_DONE_MORE_RESULTSETS: u8 = 16;
pub const S_STMT_EXECUTE_OK: u8 = 17;

pub struct MockServer {
    port: u16,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind a TCP listener and play `script` on the first connection.
    pub fn start<F>(script: F) -> Self
    where
        F: FnOnce(&mut ServerConn<TcpStream>) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("local addr").port();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut conn = ServerConn::new(stream);
            script(&mut conn);
        });
        Self { port, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn join(self) {
        self.handle.join().expect("mock server panicked");
    }
}

pub struct UnixMockServer {
    path: PathBuf,
    handle: JoinHandle<()>,
}

impl UnixMockServer {
    pub fn start<F>(name: &str, script: F) -> Self
    where
        F: FnOnce(&mut ServerConn<UnixStream>) + Send + 'static,
    {
        let path = std::env::temp_dir().join(format!(
            "zero-mysqlx-{}-{}.sock",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).expect("bind unix mock server");
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut conn = ServerConn::new(stream);
            script(&mut conn);
        });
        Self { path, handle }
    }

    pub fn path(&self) -> &str {
        self.path.to_str().expect("utf-8 socket path")
    }

    pub fn join(self) {
        self.handle.join().expect("mock server panicked");
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Server side of one scripted connection.
pub struct ServerConn<S> {
    stream: S,
    inflate: Option<flate2::Decompress>,
}

impl<S: Read + Write> ServerConn<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            inflate: None,
        }
    }

    /// Client frames after this point arrive as DEFLATE_STREAM
    /// compression envelopes.
    pub fn expect_deflate_from_now_on(&mut self) {
        self.inflate = Some(flate2::Decompress::new(true));
    }

    /// Read one raw frame `(type, payload)`.
    pub fn read_frame(&mut self) -> (u8, Vec<u8>) {
        let mut header = [0_u8; 5];
        self.stream.read_exact(&mut header).expect("frame header");
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let mut payload = vec![0; length - 1];
        self.stream.read_exact(&mut payload).expect("frame payload");
        (header[4], payload)
    }

    /// Read one client message, transparently unwrapping a compression
    /// envelope holding a single inner frame.
    pub fn read_client_message(&mut self) -> (u8, Vec<u8>) {
        let (mid, payload) = self.read_frame();
        if mid != C_COMPRESSION {
            return (mid, payload);
        }

        let envelope =
            proto::connection::Compression::decode(&payload[..]).expect("compression envelope");
        let inflate = self
            .inflate
            .as_mut()
            .expect("unexpected compression envelope");

        let mut inner = Vec::with_capacity(envelope.uncompressed_size.unwrap_or(256) as usize);
        let mut input = &envelope.payload[..];
        loop {
            let before = inflate.total_in();
            inflate
                .decompress_vec(input, &mut inner, flate2::FlushDecompress::Sync)
                .expect("inflate");
            let consumed = (inflate.total_in() - before) as usize;
            input = &input[consumed..];
            if input.is_empty() && inner.len() < inner.capacity() {
                break;
            }
            inner.reserve(256);
        }

        let length = u32::from_le_bytes([inner[0], inner[1], inner[2], inner[3]]) as usize;
        assert_eq!(inner.len(), 4 + length, "one inner frame per envelope");
        (inner[4], inner[5..].to_vec())
    }

    /// Read a client message and assert its frame type.
    pub fn expect(&mut self, mid: u8) -> Vec<u8> {
        let (got, payload) = self.read_client_message();
        assert_eq!(got, mid, "unexpected client message");
        payload
    }

    pub fn write_frame(&mut self, mid: u8, payload: &[u8]) {
        let mut frame = Vec::with_capacity(payload.len() + 5);
        frame.extend_from_slice(&(payload.len() as u32 + 1).to_le_bytes());
        frame.push(mid);
        frame.extend_from_slice(payload);
        self.stream.write_all(&frame).expect("write frame");
        self.stream.flush().expect("flush");
    }

    pub fn write_msg(&mut self, mid: u8, msg: &impl Message) {
        self.write_frame(mid, &msg.encode_to_vec());
    }

    pub fn write_ok(&mut self) {
        self.write_msg(S_OK, &proto::Ok { msg: None });
    }

    pub fn write_error(&mut self, code: u32, msg: &str, fatal: bool) {
        self.write_msg(
            S_ERROR,
            &proto::Error {
                severity: Some(if fatal {
                    proto::error::Severity::Fatal as i32
                } else {
                    proto::error::Severity::Error as i32
                }),
                code,
                sql_state: "HY000".to_string(),
                msg: msg.to_string(),
            },
        );
    }

    pub fn write_notice(&mut self, notice_type: u32, global: bool, payload: Vec<u8>) {
        self.write_msg(
            S_NOTICE,
            &proto::notice::Frame {
                r#type: notice_type,
                scope: Some(if global {
                    proto::notice::frame::Scope::Global as i32
                } else {
                    proto::notice::frame::Scope::Local as i32
                }),
                payload: Some(payload),
            },
        );
    }

    pub fn write_session_state_notice(
        &mut self,
        param: proto::notice::session_state_changed::Parameter,
        value: proto::datatypes::Scalar,
        global: bool,
    ) {
        let change = proto::notice::SessionStateChanged {
            param: param as i32,
            value: vec![value],
        };
        self.write_notice(3, global, change.encode_to_vec());
    }

    pub fn write_warning_notice(&mut self, code: u32, msg: &str) {
        let warning = proto::notice::Warning {
            level: Some(proto::notice::warning::Level::Warning as i32),
            code,
            msg: msg.to_string(),
        };
        self.write_notice(1, false, warning.encode_to_vec());
    }

    /// Serve one authentication round, accepting any mechanism.
    pub fn serve_auth_ok(&mut self) {
        let payload = self.expect(C_AUTH_START);
        let start = proto::session::AuthenticateStart::decode(&payload[..]).expect("auth start");
        if start.mech_name != "PLAIN" {
            self.write_msg(
                S_AUTH_CONTINUE,
                &proto::session::AuthenticateContinue {
                    auth_data: b"01234567890123456789".to_vec(),
                },
            );
            self.expect(C_AUTH_CONTINUE);
        }
        self.write_msg(S_AUTH_OK, &proto::session::AuthenticateOk { auth_data: None });
    }

    /// Write one column of metadata with the given name and type.
    pub fn write_column(&mut self, name: &str, field_type: i32) {
        let column = proto::resultset::ColumnMetaData {
            r#type: field_type,
            name: Some(name.as_bytes().to_vec()),
            original_name: None,
            table: None,
            original_table: None,
            schema: None,
            catalog: None,
            collation: None,
            fractional_digits: None,
            length: Some(20),
            flags: None,
            content_type: None,
        };
        self.write_msg(S_COLUMN_META_DATA, &column);
    }

    pub fn write_row(&mut self, cells: &[&[u8]]) {
        let row = proto::resultset::Row {
            field: cells.iter().map(|c| c.to_vec()).collect(),
        };
        self.write_msg(S_ROW, &row);
    }
}

pub fn uint_scalar(value: u64) -> proto::datatypes::Scalar {
    proto::datatypes::Scalar {
        r#type: proto::datatypes::scalar::Type::VUint as i32,
        v_signed_int: None,
        v_unsigned_int: Some(value),
        v_octets: None,
        v_double: None,
        v_float: None,
        v_bool: None,
        v_string: None,
    }
}

pub fn string_array_any(values: &[&str]) -> proto::datatypes::Any {
    let elements = values
        .iter()
        .map(|v| {
            proto::datatypes::Any::from_scalar(proto::datatypes::Scalar {
                r#type: proto::datatypes::scalar::Type::VString as i32,
                v_signed_int: None,
                v_unsigned_int: None,
                v_octets: None,
                v_double: None,
                v_float: None,
                v_bool: None,
                v_string: Some(proto::datatypes::scalar::String {
                    value: v.as_bytes().to_vec(),
                    collation: None,
                }),
            })
        })
        .collect();
    proto::datatypes::Any::from_array(proto::datatypes::Array { value: elements })
}

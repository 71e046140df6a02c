//! The byte-oriented connection: blocking TCP/Unix sockets with read and
//! write deadlines, TLS upgrade, and a buffered read layer.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use native_tls::{Certificate, Identity, Protocol as TlsVersion, TlsConnector, TlsStream};
use tracing::debug;

use crate::context::{IpMode, SharedContext, SslFipsMode, SslMode, timeout_duration};
use crate::error::{Error, Result, code};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    UnixSocket,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownType {
    Send,
    Recv,
    Both,
}

/// Immutable snapshot of the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub ssl_configured: bool,
    pub ssl_activated: bool,
    pub connected: bool,
    pub connection_type: Option<ConnectionType>,
}

enum Stream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Unix(UnixStream),
}

impl Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Tcp(s) => s.read(buf),
            Self::Tls(s) => s.read(buf),
            Self::Unix(s) => s.read(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Tcp(s) => s.write_all(buf),
            Self::Tls(s) => s.write_all(buf),
            Self::Unix(s) => s.write_all(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Tcp(s) => s.flush(),
            Self::Tls(s) => s.flush(),
            Self::Unix(s) => s.flush(),
        }
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            Self::Tcp(s) => s.set_read_timeout(timeout),
            Self::Tls(s) => s.get_ref().set_read_timeout(timeout),
            Self::Unix(s) => s.set_read_timeout(timeout),
        }
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            Self::Tcp(s) => s.set_write_timeout(timeout),
            Self::Tls(s) => s.get_ref().set_write_timeout(timeout),
            Self::Unix(s) => s.set_write_timeout(timeout),
        }
    }

    fn shutdown(&self, how: Shutdown) -> std::io::Result<()> {
        match self {
            Self::Tcp(s) => s.shutdown(how),
            Self::Tls(s) => s.get_ref().shutdown(how),
            Self::Unix(s) => s.shutdown(how),
        }
    }
}

/// Byte connection with a fixed-capacity back-buffer in front of the
/// socket. Reads are served from the buffer first; `has_data` reports
/// buffered bytes that a poll on the raw socket would not see.
pub struct Connection {
    context: SharedContext,
    stream: Option<Stream>,
    hostname: String,
    connection_type: Option<ConnectionType>,
    ssl_activated: bool,
    back_buffer: Vec<u8>,
    buf_start: usize,
    buf_end: usize,
}

impl Connection {
    pub fn new(context: SharedContext) -> Self {
        let capacity = context.borrow().connection_config.buffer_receive_size;
        Self {
            context,
            stream: None,
            hostname: String::new(),
            connection_type: None,
            ssl_activated: false,
            back_buffer: vec![0; capacity.max(1)],
            buf_start: 0,
            buf_end: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState {
            ssl_configured: self.context.borrow().ssl_config.is_configured(),
            ssl_activated: self.ssl_activated,
            connected: self.stream.is_some(),
            connection_type: self.connection_type,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Bytes already pulled off the socket but not yet consumed.
    pub fn has_data(&self) -> bool {
        self.buf_end > self.buf_start
    }

    pub fn connect_tcp(&mut self, host: &str, port: u16, ip_mode: IpMode) -> Result<()> {
        self.connection_type = Some(ConnectionType::Tcp);
        self.hostname = host.to_string();

        let (resolve_timeout, connect_timeout, namespace) = {
            let context = self.context.borrow();
            (
                timeout_duration(context.connection_config.timeout_session_connect),
                timeout_duration(context.connection_config.timeout_connect),
                context.connection_config.network_namespace.clone(),
            )
        };

        if !namespace.is_empty() {
            return Err(Error::fatal(
                code::CONNECTION_ERROR,
                "Network namespace not supported by the platform",
            ));
        }

        let addresses = resolve_host(host, port, ip_mode, resolve_timeout)?;

        let mut last_error: Option<std::io::Error> = None;
        let mut stream = None;
        for address in addresses {
            let connected = match connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&address, timeout),
                None => TcpStream::connect(address),
            };
            match connected {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let Some(stream) = stream else {
            let cause = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no address resolved".to_string());
            return Err(Error::fatal(
                code::CONNECTION_ERROR,
                format!("{cause}, while connecting to {host}:{port}"),
            ));
        };

        stream
            .set_nodelay(true)
            .map_err(|e| Error::fatal(code::CONNECTION_ERROR, e.to_string()))?;
        self.install_stream(Stream::Tcp(stream))
    }

    pub fn connect_unix(&mut self, path: &str) -> Result<()> {
        self.connection_type = Some(ConnectionType::UnixSocket);
        self.hostname = "localhost".to_string();

        if path.is_empty() {
            return Err(Error::fatal(
                code::UNKNOWN_HOST,
                "UNIX Socket file was not specified",
            ));
        }

        let stream = UnixStream::connect(path).map_err(|e| {
            Error::fatal(
                code::CONNECTION_ERROR,
                format!("{e}, while connecting to {path}"),
            )
        })?;
        self.install_stream(Stream::Unix(stream))
    }

    fn install_stream(&mut self, stream: Stream) -> Result<()> {
        let (read_timeout, write_timeout, capacity) = {
            let context = self.context.borrow();
            (
                timeout_duration(context.connection_config.timeout_read),
                timeout_duration(context.connection_config.timeout_write),
                context.connection_config.buffer_receive_size,
            )
        };
        stream
            .set_read_timeout(read_timeout)
            .and_then(|()| stream.set_write_timeout(write_timeout))
            .map_err(|e| Error::fatal(code::CONNECTION_ERROR, e.to_string()))?;

        self.back_buffer = vec![0; capacity.max(1)];
        self.buf_start = 0;
        self.buf_end = 0;
        self.stream = Some(stream);
        self.ssl_activated = false;
        debug!(host = %self.hostname, "connected");
        Ok(())
    }

    /// Read some bytes, serving the back-buffer first.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        if self.has_data() {
            let n = out.len().min(self.buf_end - self.buf_start);
            out[..n].copy_from_slice(&self.back_buffer[self.buf_start..self.buf_start + n]);
            self.buf_start += n;
            return Ok(n);
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::fatal(code::SERVER_GONE, "MySQL server has gone away"));
        };

        // Large reads bypass the back-buffer, small ones refill it.
        if out.len() >= self.back_buffer.len() {
            match stream.read(out) {
                Ok(0) => Err(self.on_gone()),
                Ok(n) => Ok(n),
                Err(e) => Err(self.map_read_error(e)),
            }
        } else {
            let n = match stream.read(&mut self.back_buffer) {
                Ok(0) => return Err(self.on_gone()),
                Ok(n) => n,
                Err(e) => return Err(self.map_read_error(e)),
            };
            self.buf_start = 0;
            self.buf_end = n;
            let served = out.len().min(n);
            out[..served].copy_from_slice(&self.back_buffer[..served]);
            self.buf_start = served;
            Ok(served)
        }
    }

    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            filled += self.read(&mut out[filled..])?;
        }
        Ok(())
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::fatal(code::SERVER_GONE, "MySQL server has gone away"));
        };
        match stream.write_all(bytes).and_then(|()| stream.flush()) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.map_write_error(e)),
        }
    }

    fn on_gone(&mut self) -> Error {
        self.close();
        Error::fatal(code::SERVER_GONE, "MySQL server has gone away")
    }

    fn map_read_error(&mut self, e: std::io::Error) -> Error {
        match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                Error::new(code::READ_TIMEOUT, "Read timeout")
            }
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                self.on_gone()
            }
            _ => {
                self.close();
                Error::fatal(code::UNKNOWN_ERROR, e.to_string())
            }
        }
    }

    fn map_write_error(&mut self, e: std::io::Error) -> Error {
        match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                Error::new(code::WRITE_TIMEOUT, "Write timeout")
            }
            std::io::ErrorKind::BrokenPipe => {
                self.close();
                Error::new(code::SERVER_GONE, "MySQL server has gone away")
            }
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                self.on_gone()
            }
            _ => {
                self.close();
                Error::fatal(code::UNKNOWN_ERROR, e.to_string())
            }
        }
    }

    /// Upgrade the TCP stream to TLS.
    ///
    /// Legal only when connected, not yet TLS-active, and TLS is
    /// configured; every failure is a fatal `SSL_CONNECTION_ERROR`.
    pub fn activate_tls(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::fatal(code::SERVER_GONE, "MySQL server has gone away"));
        }
        if self.ssl_activated {
            return Err(Error::fatal(
                code::SSL_CONNECTION_ERROR,
                "TLS layer already activated",
            ));
        }

        let connector = {
            let context = self.context.borrow();
            let ssl = &context.ssl_config;
            if !ssl.is_configured() {
                return Err(Error::fatal(
                    code::SSL_CONNECTION_ERROR,
                    "TLS layer is not configured",
                ));
            }
            build_tls_connector(ssl)?
        };

        let tcp = match self.stream.take() {
            Some(Stream::Tcp(tcp)) => tcp,
            other => {
                self.stream = other;
                return Err(Error::fatal(
                    code::SSL_CONNECTION_ERROR,
                    "TLS is only supported on TCP connections",
                ));
            }
        };

        match connector.connect(&self.hostname, tcp) {
            Ok(tls) => {
                self.stream = Some(Stream::Tls(Box::new(tls)));
                self.ssl_activated = true;
                debug!(host = %self.hostname, "TLS activated");
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))
            }
        }
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        if let Some(stream) = self.stream.as_ref() {
            stream
                .set_read_timeout(timeout)
                .map_err(|e| Error::new(code::CONNECTION_ERROR, e.to_string()))?;
        }
        Ok(())
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        if let Some(stream) = self.stream.as_ref() {
            stream
                .set_write_timeout(timeout)
                .map_err(|e| Error::new(code::CONNECTION_ERROR, e.to_string()))?;
        }
        Ok(())
    }

    pub fn shutdown(&mut self, kind: ShutdownType) -> Result<()> {
        if let Some(stream) = self.stream.as_ref() {
            let how = match kind {
                ShutdownType::Send => Shutdown::Write,
                ShutdownType::Recv => Shutdown::Read,
                ShutdownType::Both => Shutdown::Both,
            };
            stream
                .shutdown(how)
                .map_err(|e| Error::new(code::CONNECTION_ERROR, e.to_string()))?;
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.stream = None;
        self.ssl_activated = false;
        self.buf_start = 0;
        self.buf_end = 0;
    }
}

/// Resolve `host:port` on a helper thread so the lookup is bounded by the
/// session-connect timeout.
fn resolve_host(
    host: &str,
    port: u16,
    ip_mode: IpMode,
    timeout: Option<Duration>,
) -> Result<Vec<SocketAddr>> {
    let (tx, rx) = mpsc::channel();
    let target = (host.to_string(), port);
    thread::spawn(move || {
        let resolved: std::io::Result<Vec<SocketAddr>> =
            target.to_socket_addrs().map(|addrs| addrs.collect());
        // The receiver may have timed out and gone away.
        let _ = tx.send(resolved);
    });

    let resolved = match timeout {
        Some(timeout) => rx.recv_timeout(timeout).map_err(|_| {
            Error::fatal(
                code::SESSION_CONNECT_TIMEOUT,
                "Session_connect_timeout limit exceeded",
            )
        })?,
        None => rx.recv().map_err(|_| {
            Error::fatal(code::UNKNOWN_HOST, format!("No such host is known '{host}'"))
        })?,
    };

    let addresses: Vec<SocketAddr> = resolved
        .map_err(|_| Error::fatal(code::UNKNOWN_HOST, format!("No such host is known '{host}'")))?
        .into_iter()
        .filter(|addr| match ip_mode {
            IpMode::Any => true,
            IpMode::V4 => addr.is_ipv4(),
            IpMode::V6 => addr.is_ipv6(),
        })
        .collect();

    if addresses.is_empty() {
        return Err(Error::fatal(
            code::UNKNOWN_HOST,
            format!("No such host is known '{host}'"),
        ));
    }

    Ok(addresses)
}

fn parse_tls_version(name: &str) -> Option<TlsVersion> {
    match name.trim() {
        "TLSv1" => Some(TlsVersion::Tlsv10),
        "TLSv1.1" => Some(TlsVersion::Tlsv11),
        "TLSv1.2" => Some(TlsVersion::Tlsv12),
        // The backend caps its version enum at 1.2; requesting 1.3 keeps
        // the floor at 1.2 and lets the handshake negotiate upward.
        "TLSv1.3" => Some(TlsVersion::Tlsv12),
        _ => None,
    }
}

fn build_tls_connector(ssl: &crate::context::SslConfig) -> Result<TlsConnector> {
    if ssl.fips_mode != SslFipsMode::Off {
        return Err(Error::fatal(
            code::SSL_CONNECTION_ERROR,
            "FIPS mode is not supported by the TLS backend",
        ));
    }
    if !ssl.cipher.is_empty() || !ssl.crl.is_empty() || !ssl.crl_path.is_empty() {
        return Err(Error::fatal(
            code::SSL_CONNECTION_ERROR,
            "Cipher and CRL restrictions are not supported by the TLS backend",
        ));
    }

    let mut builder = TlsConnector::builder();

    if !ssl.tls_version.is_empty() {
        let mut versions = Vec::new();
        for name in ssl.tls_version.split(',') {
            match parse_tls_version(name) {
                Some(version) => versions.push(version),
                None => {
                    return Err(Error::fatal(
                        code::SSL_CONNECTION_ERROR,
                        format!("Unknown TLS version '{}'", name.trim()),
                    ));
                }
            }
        }
        fn rank(version: TlsVersion) -> u8 {
            match version {
                TlsVersion::Sslv3 => 0,
                TlsVersion::Tlsv10 => 1,
                TlsVersion::Tlsv11 => 2,
                TlsVersion::Tlsv12 => 3,
                _ => 4,
            }
        }
        let min = versions.iter().copied().min_by_key(|v| rank(*v));
        let max = versions.iter().copied().max_by_key(|v| rank(*v));
        builder.min_protocol_version(min);
        builder.max_protocol_version(max);
    }

    if !ssl.ca.is_empty() {
        let pem = std::fs::read(&ssl.ca)
            .map_err(|e| Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|e| Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))?;
        builder.add_root_certificate(certificate);
        builder.disable_built_in_roots(true);
    }

    if !ssl.key.is_empty() && !ssl.cert.is_empty() {
        let cert = std::fs::read(&ssl.cert)
            .map_err(|e| Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))?;
        let key = std::fs::read(&ssl.key)
            .map_err(|e| Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))?;
        let identity = Identity::from_pkcs8(&cert, &key)
            .map_err(|e| Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))?;
        builder.identity(identity);
    }

    match ssl.mode {
        SslMode::Disabled => {
            return Err(Error::fatal(
                code::SSL_CONNECTION_ERROR,
                "TLS layer is not configured",
            ));
        }
        SslMode::Preferred | SslMode::Required => {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyCa => {
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyIdentity => {}
    }

    builder
        .build()
        .map_err(|e| Error::fatal(code::SSL_CONNECTION_ERROR, e.to_string()))
}

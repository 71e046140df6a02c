//! A MySQL X Protocol client: length-prefixed Protobuf framing over a
//! blocking byte connection, a message-oriented protocol engine with
//! interceptor chains, and a session facade handling capability
//! negotiation, TLS, compression and authentication.

pub mod argument;
pub mod connection;
pub mod constant;
pub mod context;
pub mod error;
pub mod opts;
pub mod proto;
pub mod protocol;
pub mod row;
pub mod session;

pub use argument::ArgumentValue;
pub use error::{Error, Result};
pub use opts::{ConnectParams, SessionCapability, SessionOption};
pub use session::Session;

pub mod auth;
pub mod capability;
pub mod compression;
pub mod engine;
pub mod frame;
pub mod handler;
pub mod negotiator;
pub mod result;
mod stream;

pub use engine::Protocol;
pub use frame::{ClientMessage, FrameHeader, ServerMessage};
pub use handler::{HandlerId, HandlerPosition, HandlerResult};
pub use result::{Column, ColumnType, QueryResult};

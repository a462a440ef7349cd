//! Network front end: the listener, the accept loop and per-connection
//! handling.

pub mod core;
pub mod handlers;

pub use self::core::GameServer;

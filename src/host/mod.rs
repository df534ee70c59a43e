//! Reference Host
//!
//! A small embedding of the cache engine: named sessions that each own a
//! cache, a tokio timer that sweeps them, and a line protocol to drive them.

pub mod command;
pub mod registry;
pub mod responses;
pub mod ticker;

pub use command::{execute, handle_line, Command};
pub use registry::SessionRegistry;
pub use responses::Reply;
pub use ticker::spawn_sweep_task;

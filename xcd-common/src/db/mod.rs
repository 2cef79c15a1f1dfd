//! Database schema bootstrap and roster queries

pub mod init;
pub mod rosters;

pub use init::*;
pub use rosters::*;

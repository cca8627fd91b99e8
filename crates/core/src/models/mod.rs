//! Data models for Gestor

mod access_log;
mod identity;
mod page;
mod profile;
mod role;
mod session;

pub use access_log::*;
pub use identity::*;
pub use page::*;
pub use profile::*;
pub use role::*;
pub use session::*;

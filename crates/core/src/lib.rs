//! Gestor Core Library
//!
//! Models, role permissions, form validation, the user provisioning flow and
//! the storage backend for the Gestor admin dashboard.

pub mod clock;
pub mod error;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod provisioning;
pub mod storage;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use models::*;
pub use permissions::*;
pub use provisioning::{ProvisionError, ProvisionStep, ProvisionedUser, Provisioner};
pub use storage::{AuthProvider, Backend, DataStore, Database, SqliteBackend};
pub use validation::{FieldErrors, NewUserForm};

//! Admin user list

use gestor_core::{AuthUser, DashboardAction, Result};

use super::{authorize, Route};
use crate::state::{AppState, SessionContext};

pub struct UserList {
    viewer: AuthUser,
}

impl UserList {
    /// Fails with `PermissionDenied` for non-admins
    pub async fn open(state: &AppState, ctx: &SessionContext) -> Result<Self> {
        let (viewer, _) = authorize(state, ctx, DashboardAction::ListUsers).await?;
        Ok(Self { viewer })
    }

    pub fn viewer(&self) -> &AuthUser {
        &self.viewer
    }

    pub fn new_user(&self) -> Route {
        Route::NewUser
    }
}

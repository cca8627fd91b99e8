//! View models
//!
//! Presentation state for each screen. They read through the backend traits
//! and never talk to the store directly.

mod dashboard;
mod header;
mod new_user;
mod users;

pub use dashboard::{Dashboard, QuickLink};
pub use header::{format_login_time, Header, HeaderView};
pub use new_user::NewUserPage;
pub use users::UserList;

use gestor_core::{
    AuthUser, DashboardAction, DataStore, Error, PermissionMatrix, Result, Role, DASHBOARD_ROUTE,
    NEW_USER_ROUTE, USERS_ROUTE,
};

use crate::state::{AppState, SessionContext};

/// Navigation targets a view model can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Users,
    NewUser,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => DASHBOARD_ROUTE,
            Route::Users => USERS_ROUTE,
            Route::NewUser => NEW_USER_ROUTE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// Transient notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

/// Signed-in user and role, if the role may perform `action`
async fn authorize(
    state: &AppState,
    ctx: &SessionContext,
    action: DashboardAction,
) -> Result<(AuthUser, Role)> {
    let user = ctx
        .user()
        .ok_or_else(|| Error::Authentication("not signed in".to_string()))?;
    let role = state
        .backend
        .fetch_latest_role(user.id)
        .await?
        .unwrap_or_default();

    if !PermissionMatrix::can_perform(role, action) {
        return Err(Error::PermissionDenied(format!("{action:?} requires a higher role")));
    }
    Ok((user, role))
}

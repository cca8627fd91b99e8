//! Permission system for dashboard operations

use crate::models::Role;

/// Route every signed-in user lands on
pub const DASHBOARD_ROUTE: &str = "/dashboard";
/// The user's own profile
pub const PROFILE_ROUTE: &str = "/profile";
/// Admin user listing
pub const USERS_ROUTE: &str = "/admin/users";
/// Admin provisioning form
pub const NEW_USER_ROUTE: &str = "/admin/users/new";

/// Actions that can be performed in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    // Self service
    ViewDashboard,
    ViewOwnProfile,

    // Administration
    ViewAdminPanel,
    ListUsers,
    ProvisionUsers,
}

/// Permission matrix for role tiers
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: Role, action: DashboardAction) -> bool {
        match action {
            DashboardAction::ViewDashboard => true,
            DashboardAction::ViewOwnProfile => true,

            // Administration - Admin only
            DashboardAction::ViewAdminPanel => role == Role::Admin,
            DashboardAction::ListUsers => role == Role::Admin,
            DashboardAction::ProvisionUsers => role == Role::Admin,
        }
    }

    /// Check if a role can hand out `target` to a new user
    pub fn can_grant_role(actor_role: Role, target: Role) -> bool {
        // Admin is never granted through provisioning
        if !target.is_grantable() {
            return false;
        }

        Self::can_perform(actor_role, DashboardAction::ProvisionUsers)
    }
}

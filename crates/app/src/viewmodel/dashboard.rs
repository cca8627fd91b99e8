//! Dashboard landing page

use std::sync::Arc;

use gestor_core::{
    DashboardAction, DataStore, Page, PermissionMatrix, Role, RoleBadge, DASHBOARD_ROUTE,
    PROFILE_ROUTE, USERS_ROUTE,
};
use tracing::warn;

use super::header::Header;
use crate::access_logger::{AccessLogger, PageVisit};
use crate::state::{AppState, SessionContext};

/// Shortcut shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickLink {
    pub label: String,
    pub route: String,
}

pub struct Dashboard {
    header: Header,
    visit: Option<PageVisit>,
    role: Option<Role>,
    granted_pages: Vec<Page>,
}

impl Dashboard {
    pub async fn mount(state: &AppState, ctx: &Arc<SessionContext>) -> Self {
        let Some(user) = ctx.user() else {
            return Self {
                header: Header::mount(state, ctx).await,
                visit: None,
                role: None,
                granted_pages: Vec::new(),
            };
        };

        let logger = AccessLogger::new(state.backend.clone(), state.clock.clone());
        let visit = logger.enter(user.id, DASHBOARD_ROUTE).await;

        let (role, granted_pages, header) = tokio::join!(
            state.backend.fetch_latest_role(user.id),
            state.backend.list_granted_pages(user.id),
            Header::mount(state, ctx),
        );

        let role = role.unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "Failed to load role");
            None
        });
        let granted_pages = granted_pages.unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "Failed to load granted pages");
            Vec::new()
        });

        Self {
            header,
            visit: Some(visit),
            role,
            granted_pages,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn role_badge(&self) -> Option<RoleBadge> {
        self.role.map(|role| role.badge())
    }

    /// Admin quick-access entry
    pub fn shows_admin_panel(&self) -> bool {
        self.role
            .is_some_and(|role| PermissionMatrix::can_perform(role, DashboardAction::ViewAdminPanel))
    }

    pub fn quick_links(&self) -> Vec<QuickLink> {
        let Some(role) = self.role else {
            return Vec::new();
        };

        let mut links = Vec::new();
        if PermissionMatrix::can_perform(role, DashboardAction::ViewOwnProfile) {
            links.push(QuickLink {
                label: "Meu Perfil".to_string(),
                route: PROFILE_ROUTE.to_string(),
            });
        }
        if self.shows_admin_panel() {
            links.push(QuickLink {
                label: "Painel Administrativo".to_string(),
                route: USERS_ROUTE.to_string(),
            });
        }
        links.extend(self.granted_pages.iter().map(|page| QuickLink {
            label: page.name.clone(),
            route: page.route.clone(),
        }));
        links
    }

    /// Close the visit, then stop the header countdown
    pub async fn unmount(self) {
        if let Some(visit) = self.visit {
            visit.leave().await;
        }
        self.header.unmount().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, ADMIN_EMAIL, ANALYST_EMAIL};
    use chrono::Duration;
    use gestor_core::testing::Call;
    use gestor_core::{BadgeVariant, PageSelection};

    #[tokio::test(start_paused = true)]
    async fn test_admin_dashboard() {
        let fx = fixture(Duration::hours(1)).await;
        fx.sign_in(ADMIN_EMAIL).await;

        let dashboard = Dashboard::mount(&fx.state, &fx.ctx).await;
        assert_eq!(dashboard.role(), Some(Role::Admin));
        let badge = dashboard.role_badge().unwrap();
        assert_eq!(badge.label, "Administrador");
        assert_eq!(badge.variant, BadgeVariant::Destructive);
        assert!(dashboard.shows_admin_panel());
        let routes: Vec<_> = dashboard.quick_links().into_iter().map(|l| l.route).collect();
        assert_eq!(routes, vec!["/profile", "/admin/users"]);

        assert_eq!(fx.recording.calls()[0], Call::InsertAccessLog);
        dashboard.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyst_sees_granted_pages_only() {
        let fx = fixture(Duration::hours(1)).await;
        let grants: PageSelection = fx.pages.iter().take(1).map(|p| p.id).collect();
        fx.recording
            .insert_page_permissions(&grants.permissions_for(fx.analyst_id))
            .await
            .unwrap();
        fx.sign_in(ANALYST_EMAIL).await;

        let dashboard = Dashboard::mount(&fx.state, &fx.ctx).await;
        assert_eq!(dashboard.role(), Some(Role::AnalystI));
        assert_eq!(dashboard.role_badge().unwrap().label, "Analista I");
        assert!(!dashboard.shows_admin_panel());
        assert_eq!(
            dashboard.quick_links(),
            vec![
                QuickLink {
                    label: "Meu Perfil".to_string(),
                    route: "/profile".to_string(),
                },
                QuickLink {
                    label: "Relatórios".to_string(),
                    route: "/reports".to_string(),
                },
            ]
        );
        dashboard.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_closes_visit() {
        let fx = fixture(Duration::hours(1)).await;
        fx.sign_in(ANALYST_EMAIL).await;

        let dashboard = Dashboard::mount(&fx.state, &fx.ctx).await;
        fx.clock.advance(Duration::seconds(42));
        dashboard.unmount().await;

        let calls = fx.recording.calls();
        assert_eq!(calls.first(), Some(&Call::InsertAccessLog));
        assert_eq!(calls.last(), Some(&Call::CloseAccessLog));
        let open = fx
            .recording
            .inner()
            .with_db(|db| db.access_logs().count_open(fx.analyst_id))
            .unwrap();
        assert_eq!(open, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_failure_does_not_block_mount() {
        let fx = fixture(Duration::hours(1)).await;
        fx.recording.fail_on(Call::InsertAccessLog);
        fx.recording.fail_on(Call::CloseAccessLog);
        fx.sign_in(ANALYST_EMAIL).await;

        let dashboard = Dashboard::mount(&fx.state, &fx.ctx).await;
        assert!(dashboard.header().view().is_some());
        dashboard.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_out_dashboard_is_empty() {
        let fx = fixture(Duration::hours(1)).await;
        let dashboard = Dashboard::mount(&fx.state, &fx.ctx).await;

        assert!(dashboard.role().is_none());
        assert!(dashboard.quick_links().is_empty());
        assert!(fx.recording.calls().is_empty());
        dashboard.unmount().await;
    }
}

//! Gestor - session-aware admin dashboard
//!
//! Headless runner: opens the store, signs in with the credentials from the
//! environment, mounts the dashboard and keeps the session countdown going
//! until the session expires or the process is interrupted.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gestor_app::viewmodel::{Dashboard, NewUserPage, UserList};
use gestor_app::{AppConfig, AppState, SessionContext};

const EMAIL_ENV: &str = "GESTOR_EMAIL";
const PASSWORD_ENV: &str = "GESTOR_PASSWORD";

fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Starting Gestor");

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    let app_state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(run(app_state));
    tracing::info!("Gestor stopped");
}

async fn run(state: AppState) {
    let (Ok(email), Ok(password)) = (std::env::var(EMAIL_ENV), std::env::var(PASSWORD_ENV)) else {
        tracing::info!("Set {} and {} to sign in", EMAIL_ENV, PASSWORD_ENV);
        return;
    };

    let ctx = SessionContext::new(state.backend.clone());
    if let Err(e) = ctx.sign_in(&email, &password).await {
        tracing::error!("Sign-in failed: {}", e);
        return;
    }

    let dashboard = Dashboard::mount(&state, &ctx).await;
    report(&state, &ctx, &dashboard).await;

    let mut signed_in = ctx.subscribe();
    let mut countdown = dashboard.header().countdown();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            _ = signed_in.wait_for(|signed_in| !*signed_in) => {
                tracing::info!("Session ended");
                break;
            }
            Some(remaining) = next_countdown(&mut countdown) => {
                tracing::info!(%remaining, "Session time left");
            }
        }
    }

    dashboard.unmount().await;
    if let Err(e) = ctx.sign_out().await {
        tracing::warn!("Sign-out failed: {}", e);
    }
}

/// Log what the dashboard and admin pages would show
async fn report(state: &AppState, ctx: &Arc<SessionContext>, dashboard: &Dashboard) {
    if let Some(view) = dashboard.header().view() {
        tracing::info!(
            name = %view.full_name,
            email = %view.email,
            initials = %view.initials,
            login_time = view.login_time.as_deref().unwrap_or("-"),
            "Signed in"
        );
    }
    if let Some(badge) = dashboard.role_badge() {
        tracing::info!(role = badge.label, variant = ?badge.variant, "Access level");
    }
    for link in dashboard.quick_links() {
        tracing::info!(label = %link.label, route = %link.route, "Quick link");
    }

    if dashboard.shows_admin_panel() {
        match UserList::open(state, ctx).await {
            Ok(list) => {
                let page = NewUserPage::open(state, ctx).await;
                match page {
                    Ok(page) => tracing::info!(
                        route = list.new_user().path(),
                        pages = page.pages().len(),
                        roles = ?page.role_options(),
                        "User provisioning available"
                    ),
                    Err(e) => tracing::warn!("Provisioning form unavailable: {}", e),
                }
            }
            Err(e) => tracing::warn!("User list unavailable: {}", e),
        }
    }
}

async fn next_countdown(countdown: &mut Option<watch::Receiver<String>>) -> Option<String> {
    match countdown {
        Some(rx) => {
            rx.changed().await.ok()?;
            let value = rx.borrow_and_update().clone();
            Some(value)
        }
        None => std::future::pending().await,
    }
}

//! Admin form for provisioning a user

use std::sync::Arc;

use gestor_core::{
    Backend, DashboardAction, DataStore, FieldErrors, NewUserForm, Page, PermissionMatrix,
    ProvisionError, Provisioner, Result, Role,
};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use super::{authorize, Route, Toast};
use crate::state::{AppState, SessionContext};

pub struct NewUserPage {
    backend: Arc<dyn Backend>,
    actor_role: Role,
    pub form: NewUserForm,
    pages: Vec<Page>,
    errors: FieldErrors,
    toasts: Vec<Toast>,
    loading: watch::Sender<bool>,
}

/// Clears the loading flag when the submit ends or is dropped
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> LoadingGuard<'a> {
    fn start(loading: &'a watch::Sender<bool>) -> Self {
        loading.send_replace(true);
        Self(loading)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl NewUserPage {
    /// Check access and load the page catalogue
    pub async fn open(state: &AppState, ctx: &SessionContext) -> Result<Self> {
        let (_, actor_role) = authorize(state, ctx, DashboardAction::ProvisionUsers).await?;

        let mut page = Self {
            backend: state.backend.clone(),
            actor_role,
            form: NewUserForm::default(),
            pages: Vec::new(),
            errors: FieldErrors::default(),
            toasts: Vec::new(),
            loading: watch::Sender::new(false),
        };

        match state.backend.list_pages().await {
            Ok(pages) => page.pages = pages,
            Err(e) => {
                warn!(error = %e, "Failed to load pages");
                page.toasts
                    .push(Toast::error("Erro ao carregar páginas", e.to_string()));
            }
        }
        Ok(page)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Tiers the signed-in admin may hand out
    pub fn role_options(&self) -> Vec<Role> {
        Role::grantable()
            .iter()
            .copied()
            .filter(|role| PermissionMatrix::can_grant_role(self.actor_role, *role))
            .collect()
    }

    pub fn is_selected(&self, page_id: Uuid) -> bool {
        self.form.page_permissions.contains(page_id)
    }

    /// Checkbox change for one page
    pub fn toggle_page(&mut self, page_id: Uuid, checked: bool) {
        self.form.page_permissions.set(page_id, checked);
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Follows the submit button state while a submit is in flight
    pub fn loading_state(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    /// Validate and provision; `Some(route)` when the user was created
    pub async fn submit(&mut self) -> Option<Route> {
        if self.is_loading() {
            return None;
        }
        let loading = LoadingGuard::start(&self.loading);
        self.errors = FieldErrors::default();

        let result = Provisioner::new(self.backend.as_ref())
            .provision(&self.form)
            .await;
        drop(loading);

        match result {
            Ok(created) => {
                info!(user_id = %created.user_id, "New user form submitted");
                self.toasts.push(Toast::success(
                    "Usuário criado com sucesso",
                    format!("{} foi cadastrado.", created.full_name),
                ));
                Some(Route::Users)
            }
            Err(ProvisionError::Invalid(errors)) => {
                self.errors = errors;
                None
            }
            Err(ProvisionError::DuplicateEmail(_)) => {
                self.toasts.push(Toast::error(
                    "E-mail já cadastrado",
                    "Este e-mail já está em uso.",
                ));
                None
            }
            Err(ProvisionError::StepFailed { source, .. }) => {
                self.toasts
                    .push(Toast::error("Erro ao criar usuário", source.to_string()));
                None
            }
        }
    }

    pub fn cancel(&self) -> Route {
        Route::Users
    }
}

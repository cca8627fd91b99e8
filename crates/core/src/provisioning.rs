//! User provisioning
//!
//! Creating a user is four backend calls in a fixed order: e-mail check,
//! identity creation, role assignment, page grants. The calls are not
//! transactional. A failure stops the sequence and completed steps stay
//! in place; [`ProvisionError::StepFailed`] lists them so a partial user
//! can be found and cleaned up by hand.

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::models::NewIdentity;
use crate::storage::{AuthProvider, Backend, DataStore};
use crate::validation::{FieldErrors, NewUserForm};

/// Steps of a provisioning run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CheckEmail,
    CreateIdentity,
    AssignRole,
    GrantPages,
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProvisionStep::CheckEmail => "e-mail check",
            ProvisionStep::CreateIdentity => "identity creation",
            ProvisionStep::AssignRole => "role assignment",
            ProvisionStep::GrantPages => "page grants",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("invalid form: {0}")]
    Invalid(FieldErrors),

    #[error("e-mail already registered: {0}")]
    DuplicateEmail(String),

    #[error("{step} failed: {source}")]
    StepFailed {
        step: ProvisionStep,
        /// Steps that had already succeeded and were not undone
        completed: Vec<ProvisionStep>,
        source: Error,
    },
}

impl ProvisionError {
    /// True when some writes landed before the failure
    pub fn is_partial(&self) -> bool {
        match self {
            ProvisionError::StepFailed { completed, .. } => completed
                .iter()
                .any(|step| *step != ProvisionStep::CheckEmail),
            _ => false,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedUser {
    pub user_id: Uuid,
    pub full_name: String,
    pub granted_pages: usize,
}

pub struct Provisioner<'a> {
    backend: &'a dyn Backend,
}

impl<'a> Provisioner<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Validate the form, then run every step in order
    #[instrument(skip(self, form), fields(email = %form.email, role = %form.role))]
    pub async fn provision(&self, form: &NewUserForm) -> Result<ProvisionedUser, ProvisionError> {
        form.check().map_err(ProvisionError::Invalid)?;

        let mut completed = Vec::with_capacity(4);
        let fail = |step: ProvisionStep, completed: &Vec<ProvisionStep>, source: Error| {
            if completed.iter().any(|s| *s != ProvisionStep::CheckEmail) {
                warn!(%step, ?completed, error = %source, "Provisioning stopped, earlier writes kept");
            } else {
                warn!(%step, error = %source, "Provisioning failed");
            }
            ProvisionError::StepFailed {
                step,
                completed: completed.clone(),
                source,
            }
        };

        match self.backend.find_profile_by_email(&form.email).await {
            Ok(Some(_)) => return Err(ProvisionError::DuplicateEmail(form.email.clone())),
            Ok(None) => completed.push(ProvisionStep::CheckEmail),
            Err(e) => return Err(fail(ProvisionStep::CheckEmail, &completed, e)),
        }

        let identity = NewIdentity {
            email: form.email.clone(),
            password: form.password.clone(),
            display_name: form.full_name(),
        };
        let user_id = match self.backend.create_identity(&identity).await {
            Ok(id) => id,
            Err(Error::DuplicateEmail(email)) => return Err(ProvisionError::DuplicateEmail(email)),
            Err(e) => return Err(fail(ProvisionStep::CreateIdentity, &completed, e)),
        };
        completed.push(ProvisionStep::CreateIdentity);

        if let Err(e) = self.backend.update_role(user_id, form.role).await {
            return Err(fail(ProvisionStep::AssignRole, &completed, e));
        }
        completed.push(ProvisionStep::AssignRole);

        let permissions = form.page_permissions.permissions_for(user_id);
        if let Err(e) = self.backend.insert_page_permissions(&permissions).await {
            return Err(fail(ProvisionStep::GrantPages, &completed, e));
        }

        info!(%user_id, pages = permissions.len(), "User provisioned");
        Ok(ProvisionedUser {
            user_id,
            full_name: identity.display_name,
            granted_pages: permissions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, Role};
    use crate::testing::{memory_backend, Call, RecordingBackend};
    use crate::storage::SqliteBackend;

    fn seed_pages(backend: &SqliteBackend) -> (Page, Page) {
        let reports = Page::new("Relatórios", "/reports", None);
        let audit = Page::new("Auditoria", "/audit", None);
        backend.seed_page(&reports).unwrap();
        backend.seed_page(&audit).unwrap();
        (reports, audit)
    }

    fn form(email: &str, pages: &[&Page]) -> NewUserForm {
        NewUserForm {
            first_name: "Bruno".to_string(),
            last_name: "Costa".to_string(),
            email: email.to_string(),
            role: Role::AnalystII,
            password: "segredo1".to_string(),
            page_permissions: pages.iter().map(|p| p.id).collect(),
        }
    }

    #[tokio::test]
    async fn test_provision_runs_steps_in_order() {
        let sqlite = memory_backend();
        let (reports, audit) = seed_pages(&sqlite);
        let backend = RecordingBackend::new(sqlite);

        let user = Provisioner::new(&backend)
            .provision(&form("bruno@exemplo.com", &[&reports, &audit]))
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::FindProfileByEmail,
                Call::CreateIdentity,
                Call::UpdateRole,
                Call::InsertPagePermissions,
            ]
        );
        assert_eq!(backend.permission_rows(), 2);
        assert_eq!(user.granted_pages, 2);
        assert_eq!(user.full_name, "Bruno Costa");

        let inner = backend.inner();
        assert_eq!(inner.fetch_latest_role(user.user_id).await.unwrap(), Some(Role::AnalystII));
        assert_eq!(inner.list_granted_pages(user.user_id).await.unwrap().len(), 2);
        inner.sign_in("bruno@exemplo.com", "segredo1").await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_email_performs_no_writes() {
        let sqlite = memory_backend();
        let (reports, _) = seed_pages(&sqlite);
        let backend = RecordingBackend::new(sqlite);
        let provisioner = Provisioner::new(&backend);

        provisioner.provision(&form("bruno@exemplo.com", &[&reports])).await.unwrap();
        backend.clear_calls();

        let err = provisioner
            .provision(&form("bruno@exemplo.com", &[&reports]))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::DuplicateEmail(_)));
        assert_eq!(backend.calls(), vec![Call::FindProfileByEmail]);
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_backend() {
        let backend = RecordingBackend::new(memory_backend());
        let mut invalid = form("bruno@exemplo.com", &[]);
        invalid.role = Role::Admin;

        let err = Provisioner::new(&backend).provision(&invalid).await.unwrap_err();

        let ProvisionError::Invalid(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("role").is_some());
        assert!(fields.get("page_permissions").is_some());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_role_update_halts_and_keeps_identity() {
        let sqlite = memory_backend();
        let (reports, audit) = seed_pages(&sqlite);
        let backend = RecordingBackend::new(sqlite);
        backend.fail_on(Call::UpdateRole);

        let err = Provisioner::new(&backend)
            .provision(&form("bruno@exemplo.com", &[&reports, &audit]))
            .await
            .unwrap_err();

        match &err {
            ProvisionError::StepFailed { step, completed, .. } => {
                assert_eq!(*step, ProvisionStep::AssignRole);
                assert_eq!(
                    completed,
                    &vec![ProvisionStep::CheckEmail, ProvisionStep::CreateIdentity]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_partial());
        assert_eq!(backend.count(Call::InsertPagePermissions), 0);

        // No rollback: the identity is still there
        let leftover = backend.inner().find_profile_by_email("bruno@exemplo.com").await.unwrap();
        assert!(leftover.is_some());
    }

    #[tokio::test]
    async fn test_failed_email_check_is_not_partial() {
        let backend = RecordingBackend::new(memory_backend());
        backend.fail_on(Call::FindProfileByEmail);
        let page = Page::new("Relatórios", "/reports", None);

        let err = Provisioner::new(&backend)
            .provision(&form("bruno@exemplo.com", &[&page]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::StepFailed { step: ProvisionStep::CheckEmail, .. }
        ));
        assert!(!err.is_partial());
        assert!(backend.writes().is_empty());
    }
}

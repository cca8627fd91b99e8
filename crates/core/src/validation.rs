//! New-user form validation
//!
//! Field rules run before any backend call; a form with errors is never
//! submitted.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{PageSelection, Role};

/// Values entered in the provisioning form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewUserForm {
    #[validate(length(min = 2, message = "Nome deve ter pelo menos 2 caracteres"))]
    pub first_name: String,

    #[validate(length(min = 2, message = "Sobrenome deve ter pelo menos 2 caracteres"))]
    pub last_name: String,

    #[validate(email(message = "E-mail inválido"))]
    pub email: String,

    #[validate(custom(function = "validate_grantable_role"))]
    pub role: Role,

    #[validate(length(min = 6, message = "Senha deve ter pelo menos 6 caracteres"))]
    pub password: String,

    #[validate(custom(function = "validate_page_selection"))]
    pub page_permissions: PageSelection,
}

fn validate_grantable_role(role: &Role) -> Result<(), ValidationError> {
    if role.is_grantable() {
        return Ok(());
    }
    let mut err = ValidationError::new("grantable_role");
    err.message = Some(Cow::Borrowed("Nível de acesso inválido"));
    Err(err)
}

fn validate_page_selection(selection: &PageSelection) -> Result<(), ValidationError> {
    if !selection.is_empty() {
        return Ok(());
    }
    let mut err = ValidationError::new("page_permissions");
    err.message = Some(Cow::Borrowed("Selecione pelo menos uma página"));
    Err(err)
}

/// First message per invalid field, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl NewUserForm {
    /// Display name stored on the new identity
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Run all field rules
    pub fn check(&self) -> Result<(), FieldErrors> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };

        let mut fields = BTreeMap::new();
        for (field, errs) in errors.field_errors() {
            let message = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Valor inválido".to_string());
            fields.insert(field.to_string(), message);
        }
        Err(FieldErrors(fields))
    }
}

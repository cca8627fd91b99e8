//! Grantable pages and page permissions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An application route that can be granted to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    pub route: String,
    pub description: Option<String>,
}

impl Page {
    pub fn new(name: impl Into<String>, route: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            route: route.into(),
            description,
        }
    }
}

/// Grant of one page to one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PagePermission {
    pub user_id: Uuid,
    pub page_id: Uuid,
}

/// Pages ticked in the provisioning form, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection(Vec<Uuid>);

impl PageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, page_id: Uuid) -> bool {
        self.0.contains(&page_id)
    }

    /// Checkbox change for one page; other selections are untouched
    pub fn set(&mut self, page_id: Uuid, checked: bool) {
        if checked {
            if !self.contains(page_id) {
                self.0.push(page_id);
            }
        } else {
            self.0.retain(|id| *id != page_id);
        }
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One permission row per selected page for `user_id`
    pub fn permissions_for(&self, user_id: Uuid) -> Vec<PagePermission> {
        self.0
            .iter()
            .map(|page_id| PagePermission {
                user_id,
                page_id: *page_id,
            })
            .collect()
    }
}

impl FromIterator<Uuid> for PageSelection {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        let mut selection = PageSelection::new();
        for id in iter {
            selection.set(id, true);
        }
        selection
    }
}

//! Page catalogue and page grant storage

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_datetime, parse_uuid};
use crate::error::Result;
use crate::models::{Page, PagePermission};

pub struct PageStore<'a> {
    conn: &'a Connection,
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        route: row.get(2)?,
        description: row.get(3)?,
    })
}

impl<'a> PageStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Add a page to the catalogue; an existing route is left as is
    #[instrument(skip(self, page), fields(route = %page.route))]
    pub fn create(&self, page: &Page) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO pages (id, name, route, description) VALUES (?1, ?2, ?3, ?4)",
            params![page.id.to_string(), page.name, page.route, page.description],
        )?;
        Ok(inserted > 0)
    }

    /// All pages ordered by name
    pub fn list(&self) -> Result<Vec<Page>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, route, description FROM pages ORDER BY name")?;
        let pages = stmt
            .query_map([], page_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    /// Pages granted to a user, ordered by name
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Page>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.route, p.description FROM pages p
             INNER JOIN user_page_permissions up ON up.page_id = p.id
             WHERE up.user_id = ?1
             ORDER BY p.name",
        )?;
        let pages = stmt
            .query_map(params![user_id.to_string()], page_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    /// Insert all grants in one statement batch; any failure inserts none
    #[instrument(skip(self, permissions), fields(count = permissions.len()))]
    pub fn grant_all(&self, permissions: &[PagePermission]) -> Result<()> {
        let now = format_datetime(&Utc::now());
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO user_page_permissions (id, user_id, page_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for permission in permissions {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    permission.user_id.to_string(),
                    permission.page_id.to_string(),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_identity;
    use crate::storage::Database;

    #[test]
    fn test_list_ordered_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.pages().create(&Page::new("Relatórios", "/reports", None)).unwrap();
        db.pages().create(&Page::new("Auditoria", "/audit", Some("Trilhas".to_string()))).unwrap();

        let names: Vec<String> = db.pages().list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Auditoria", "Relatórios"]);
    }

    #[test]
    fn test_duplicate_route_ignored() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.pages().create(&Page::new("Relatórios", "/reports", None)).unwrap());
        assert!(!db.pages().create(&Page::new("Outro", "/reports", None)).unwrap());
        assert_eq!(db.pages().list().unwrap().len(), 1);
    }

    #[test]
    fn test_grants_listed_per_user() {
        let db = Database::open_in_memory().unwrap();
        let user_id = create_test_identity(&db, "ana@exemplo.com");
        let reports = Page::new("Relatórios", "/reports", None);
        let audit = Page::new("Auditoria", "/audit", None);
        db.pages().create(&reports).unwrap();
        db.pages().create(&audit).unwrap();

        db.pages()
            .grant_all(&[PagePermission { user_id, page_id: reports.id }])
            .unwrap();

        let granted = db.pages().list_for_user(user_id).unwrap();
        assert_eq!(granted, vec![reports]);
    }

    #[test]
    fn test_failed_batch_inserts_nothing() {
        let db = Database::open_in_memory().unwrap();
        let user_id = create_test_identity(&db, "ana@exemplo.com");
        let reports = Page::new("Relatórios", "/reports", None);
        db.pages().create(&reports).unwrap();

        // Second row references a page that does not exist
        let result = db.pages().grant_all(&[
            PagePermission { user_id, page_id: reports.id },
            PagePermission { user_id, page_id: Uuid::new_v4() },
        ]);
        assert!(result.is_err());
        assert!(db.pages().list_for_user(user_id).unwrap().is_empty());
    }
}

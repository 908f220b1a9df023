//! User database operations.

use rusqlite::{params, OptionalExtension};

use super::{constraint_context, Database, DbResult};
use crate::models::User;

impl Database {
    /// Insert a new user. Fails with `Constraint` on a duplicate e-mail.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                params![user.id, user.email, user.created_at],
            )
            .map_err(|e| constraint_context(e, &format!("user {}", user.email)))?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a user by e-mail (case-insensitive).
    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?",
                [email.trim().to_lowercase()],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let user = User::new("pat@example.com".into());
        db.insert_user(&user).unwrap();

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved, user);

        let by_email = db.get_user_by_email("PAT@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = setup_db();
        db.insert_user(&User::new("pat@example.com".into())).unwrap();
        let err = db.insert_user(&User::new("Pat@Example.com".into())).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_missing_user() {
        let db = setup_db();
        assert!(db.get_user("nope").unwrap().is_none());
    }
}

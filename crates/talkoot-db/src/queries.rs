use crate::Database;
use crate::models::{
    AnnouncementInput, AnnouncementRow, ClassRow, ClassificationRow, MessageRow, UserRow,
};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Insert a new user. Returns the new row id, or `None` when the
    /// username is already taken (UNIQUE constraint).
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO user (username, password_hash) VALUES (?1, ?2)",
                (username, password_hash),
            ) {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &[&id as &dyn rusqlite::types::ToSql]))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "username = ?1",
                &[&username as &dyn rusqlite::types::ToSql],
            )
        })
    }

    pub fn get_announcement_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM announcement WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn get_user_announcements(&self, user_id: i64) -> Result<Vec<AnnouncementRow>> {
        self.with_conn(|conn| {
            query_announcements(
                conn,
                "WHERE a.user_id = ?1",
                &[&user_id as &dyn rusqlite::types::ToSql],
            )
        })
    }

    // -- Announcements --

    /// Insert an announcement together with its classification rows.
    /// Runs in one transaction so a failed classification insert leaves
    /// nothing behind.
    pub fn create_announcement(
        &self,
        input: &AnnouncementInput,
        user_id: i64,
        classes: &[(String, String)],
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO announcement (title, description, location, time, slots_needed, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    input.title,
                    input.description,
                    input.location,
                    input.time,
                    input.slots_needed,
                    user_id,
                ],
            )?;
            let id = tx.last_insert_rowid();
            insert_classifications(&tx, id, classes)?;
            tx.commit()?;
            Ok(id)
        })
    }

    pub fn get_announcements(&self) -> Result<Vec<AnnouncementRow>> {
        self.with_conn(|conn| query_announcements(conn, "", &[]))
    }

    pub fn get_announcement(&self, id: i64) -> Result<Option<AnnouncementRow>> {
        self.with_conn(|conn| {
            let mut rows = query_announcements(
                conn,
                "WHERE a.id = ?1",
                &[&id as &dyn rusqlite::types::ToSql],
            )?;
            Ok(rows.pop())
        })
    }

    /// Keyword substring search over title and description.
    pub fn find_announcements(&self, keyword: &str) -> Result<Vec<AnnouncementRow>> {
        let like = format!("%{}%", keyword);
        self.with_conn(|conn| {
            query_announcements(
                conn,
                "WHERE a.title LIKE ?1 OR a.description LIKE ?1",
                &[&like as &dyn rusqlite::types::ToSql],
            )
        })
    }

    /// Update the announcement row and replace its classification set.
    /// The delete-then-insert runs inside the same transaction as the
    /// field update, so readers never observe a half-replaced set.
    pub fn update_announcement(
        &self,
        id: i64,
        input: &AnnouncementInput,
        classes: &[(String, String)],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE announcement
                 SET title = ?1, description = ?2, location = ?3, time = ?4, slots_needed = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    input.title,
                    input.description,
                    input.location,
                    input.time,
                    input.slots_needed,
                    id,
                ],
            )?;
            tx.execute(
                "DELETE FROM classification WHERE announcement_id = ?1",
                [id],
            )?;
            insert_classifications(&tx, id, classes)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Delete an announcement and its dependent rows. The cascade runs
    /// inside one transaction: classification and message rows go first,
    /// then the announcement itself.
    pub fn delete_announcement(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM classification WHERE announcement_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM message WHERE announcement_id = ?1", [id])?;
            tx.execute("DELETE FROM announcement WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Classes --

    pub fn get_classes(&self) -> Result<Vec<ClassRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT title, value FROM classes ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ClassRow {
                        title: row.get(0)?,
                        value: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_classifications(&self, announcement_id: i64) -> Result<Vec<ClassificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, value FROM classification WHERE announcement_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([announcement_id], |row| {
                    Ok(ClassificationRow {
                        category: row.get(0)?,
                        value: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn add_message(&self, announcement_id: i64, user_id: i64, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message (announcement_id, user_id, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![announcement_id, user_id, content],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_messages(&self, announcement_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.announcement_id, m.user_id, u.username, m.content, m.created_at
                 FROM message m
                 JOIN user u ON m.user_id = u.id
                 WHERE m.announcement_id = ?1
                 ORDER BY m.id DESC",
            )?;
            let rows = stmt
                .query_map([announcement_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        announcement_id: row.get(1)?,
                        user_id: row.get(2)?,
                        username: row.get(3)?,
                        content: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_classifications(
    conn: &Connection,
    announcement_id: i64,
    classes: &[(String, String)],
) -> Result<()> {
    for (category, value) in classes {
        conn.execute(
            "INSERT INTO classification (announcement_id, category, value) VALUES (?1, ?2, ?3)",
            rusqlite::params![announcement_id, category, value],
        )?;
    }
    Ok(())
}

fn query_user(
    conn: &Connection,
    filter: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password_hash FROM user WHERE {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params, |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_announcements(
    conn: &Connection,
    filter: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<AnnouncementRow>> {
    // JOIN user to fetch the creator's username in a single query
    let sql = format!(
        "SELECT a.id, a.title, a.description, a.location, a.time, a.slots_needed,
                a.user_id, u.username
         FROM announcement a
         JOIN user u ON a.user_id = u.id
         {}
         ORDER BY a.id DESC",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(AnnouncementRow {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                location: row.get(3)?,
                time: row.get(4)?,
                slots_needed: row.get(5)?,
                user_id: row.get(6)?,
                username: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

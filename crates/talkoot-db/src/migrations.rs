use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS user (
            id              INTEGER PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password_hash   TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS announcement (
            id              INTEGER PRIMARY KEY,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            location        TEXT NOT NULL,
            time            TEXT NOT NULL,
            slots_needed    INTEGER NOT NULL,
            user_id         INTEGER NOT NULL REFERENCES user(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_announcement_user
            ON announcement(user_id);

        CREATE TABLE IF NOT EXISTS classes (
            id          INTEGER PRIMARY KEY,
            title       TEXT NOT NULL,
            value       TEXT NOT NULL,
            UNIQUE(title, value)
        );

        CREATE TABLE IF NOT EXISTS classification (
            id              INTEGER PRIMARY KEY,
            announcement_id INTEGER NOT NULL REFERENCES announcement(id),
            category        TEXT NOT NULL,
            value           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_classification_announcement
            ON classification(announcement_id);

        CREATE TABLE IF NOT EXISTS message (
            id              INTEGER PRIMARY KEY,
            announcement_id INTEGER NOT NULL REFERENCES announcement(id),
            user_id         INTEGER NOT NULL REFERENCES user(id),
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_message_announcement
            ON message(announcement_id);

        -- Seed the classification vocabulary
        INSERT OR IGNORE INTO classes (title, value) VALUES
            ('urgency', 'low'),
            ('urgency', 'normal'),
            ('urgency', 'high'),
            ('kind', 'moving'),
            ('kind', 'gardening'),
            ('kind', 'repairs'),
            ('kind', 'errands'),
            ('kind', 'childcare');
        ",
    )?;

    info!("Database schema bootstrapped");
    Ok(())
}

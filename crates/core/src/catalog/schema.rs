use rusqlite::Connection;

use crate::error::{Error, Result};

/// Version stamped into `PRAGMA user_version` by this build.
pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS media (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            filename    TEXT NOT NULL,
            relpath     TEXT NOT NULL,
            filetype    TEXT NOT NULL,
            created     TEXT NOT NULL,
            hash        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS sidecars (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            media_id    INTEGER NOT NULL REFERENCES media(id) ON DELETE CASCADE,
            filename    TEXT NOT NULL,
            relpath     TEXT NOT NULL,
            filetype    TEXT NOT NULL,
            created     TEXT NOT NULL,
            modified    TEXT NOT NULL,
            hash        TEXT NOT NULL,
            UNIQUE (media_id, filename)
        );

        CREATE INDEX IF NOT EXISTS idx_media_created ON media(created, filename);
        CREATE INDEX IF NOT EXISTS idx_media_location ON media(relpath, filename);
        CREATE INDEX IF NOT EXISTS idx_sidecars_location ON sidecars(relpath, filename);
        ",
    )?;
    Ok(())
}

/// Stamp a fresh catalog, or refuse one written by a newer build.
pub fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(Error::SchemaTooNew {
            db: version,
            code: SCHEMA_VERSION,
        });
    }
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

pub mod schema;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::domain::*;
use crate::error::{Error, Result};

/// File name of the catalog inside a library root.
pub const CATALOG_FILE: &str = "library.db";

/// SQLite-backed index of the media and sidecar files in one library.
pub struct Catalog {
    conn: Connection,
    path: Option<PathBuf>,
}

/// Outcome of [`CatalogTx::upsert_media`], carrying the record as stored afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaUpsert {
    Inserted(MediaRef),
    /// Identity moved to a new filename; prior sidecars were deleted.
    Renamed(MediaRef),
    Unchanged(MediaRef),
}

impl MediaUpsert {
    pub fn record(&self) -> &MediaRef {
        match self {
            Self::Inserted(r) | Self::Renamed(r) | Self::Unchanged(r) => r,
        }
    }

    pub fn id(&self) -> i64 {
        self.record().id
    }
}

/// Outcome of [`CatalogTx::upsert_sidecar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarUpsert {
    Inserted(i64),
    /// Stored hash differed; content fields were rewritten.
    Updated(i64),
    Unchanged(i64),
}

/// A sidecar row as seen by the drift pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarLocation {
    pub id: i64,
    pub filename: String,
    pub relpath: String,
    pub hash: String,
}

impl SidecarLocation {
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relpath).join(&self.filename)
    }
}

impl Catalog {
    /// Create a new catalog in `root`. Fails if one already exists there.
    pub fn create(root: &Path) -> Result<Self> {
        let path = root.join(CATALOG_FILE);
        if path.exists() {
            return Err(Error::LibraryExists(root.to_path_buf()));
        }
        std::fs::create_dir_all(root)?;
        Self::open_file(path)
    }

    /// Open the existing catalog in `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(CATALOG_FILE);
        if !path.is_file() {
            return Err(Error::LibraryNotFound(root.to_path_buf()));
        }
        Self::open_file(path)
    }

    fn open_file(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Location of the database file; `None` for in-memory catalogs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Begin the single write transaction of a top-level operation.
    /// Dropping the returned handle without [`CatalogTx::commit`] rolls back.
    pub fn transaction(&mut self) -> Result<CatalogTx<'_>> {
        Ok(CatalogTx {
            tx: self.conn.transaction()?,
        })
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn find_media_by_hash(&self, hash: &str) -> Result<Option<MediaRef>> {
        find_media_by_hash(&self.conn, hash)
    }

    /// Every media record with its sidecars, ordered by creation time then filename.
    pub fn list_all(&self) -> Result<Vec<MediaRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.filename, m.relpath, m.filetype, m.created, m.hash,
                    s.id, s.filename, s.relpath, s.filetype, s.created, s.modified, s.hash
             FROM media m
             LEFT JOIN sidecars s ON s.media_id = m.id
             ORDER BY m.created, m.filename, m.id, s.filename",
        )?;
        let mut rows = stmt.query([])?;

        let mut media: Vec<MediaRecord> = Vec::new();
        while let Some(row) = rows.next()? {
            let media_id: i64 = row.get(0)?;
            if media.last().map(|m| m.id) != Some(media_id) {
                media.push(MediaRecord {
                    id: media_id,
                    filename: row.get(1)?,
                    relpath: row.get(2)?,
                    file_type: row.get(3)?,
                    created: timestamp_column(row, 4)?,
                    hash: row.get(5)?,
                    sidecars: Vec::new(),
                });
            }
            let sidecar_id: Option<i64> = row.get(6)?;
            if let (Some(id), Some(current)) = (sidecar_id, media.last_mut()) {
                current.sidecars.push(SidecarRecord {
                    id,
                    media_id,
                    filename: row.get(7)?,
                    relpath: row.get(8)?,
                    file_type: row.get(9)?,
                    created: timestamp_column(row, 10)?,
                    modified: timestamp_column(row, 11)?,
                    hash: row.get(12)?,
                });
            }
        }
        Ok(media)
    }

    /// Totals by file type plus the creation-time range.
    pub fn summary(&self) -> Result<LibrarySummary> {
        let (media, sidecars, oldest, newest) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM media),
                (SELECT COUNT(*) FROM sidecars),
                (SELECT MIN(created) FROM media),
                (SELECT MAX(created) FROM media)",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)? as usize,
                    row.get::<_, i64>(1)? as usize,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT filetype, COUNT(*) FROM media
             GROUP BY filetype ORDER BY COUNT(*) DESC, filetype",
        )?;
        let by_type = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LibrarySummary {
            media,
            sidecars,
            by_type,
            oldest: oldest.and_then(|s| parse_timestamp(&s).ok()),
            newest: newest.and_then(|s| parse_timestamp(&s).ok()),
        })
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Catalog mutations grouped into one SQLite transaction.
pub struct CatalogTx<'conn> {
    tx: Transaction<'conn>,
}

impl CatalogTx<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    /// Discard every write made through this transaction.
    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }

    // ── Media ────────────────────────────────────────────────────────

    pub fn find_media_by_hash(&self, hash: &str) -> Result<Option<MediaRef>> {
        find_media_by_hash(&self.tx, hash)
    }

    pub fn insert_media(&self, media: &NewMedia<'_>) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO media (filename, relpath, filetype, created, hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                media.filename,
                media.relpath,
                media.file_type,
                format_timestamp(media.created),
                media.hash,
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Point an existing record at a new filename and location.
    pub fn update_media_identity(&self, id: i64, media: &NewMedia<'_>) -> Result<()> {
        self.tx.execute(
            "UPDATE media SET filename = ?1, relpath = ?2, filetype = ?3, created = ?4
             WHERE id = ?5",
            params![
                media.filename,
                media.relpath,
                media.file_type,
                format_timestamp(media.created),
                id,
            ],
        )?;
        Ok(())
    }

    /// Insert by hash, or reconcile against the record already holding it.
    ///
    /// An existing record takes the new identity only when `rename` accepts
    /// it; its sidecars are then deleted since they belonged to the old name.
    pub fn upsert_media(
        &self,
        media: &NewMedia<'_>,
        rename: impl FnOnce(&MediaRef) -> bool,
    ) -> Result<MediaUpsert> {
        match self.find_media_by_hash(media.hash)? {
            None => {
                let id = self.insert_media(media)?;
                Ok(MediaUpsert::Inserted(media_ref(id, media)))
            }
            Some(existing) => {
                if existing.filename == media.filename || !rename(&existing) {
                    return Ok(MediaUpsert::Unchanged(existing));
                }
                self.update_media_identity(existing.id, media)?;
                self.delete_sidecars_for_media(existing.id)?;
                Ok(MediaUpsert::Renamed(media_ref(existing.id, media)))
            }
        }
    }

    /// Delete a media record; its sidecars go with it.
    pub fn delete_media(&self, id: i64) -> Result<()> {
        self.tx
            .execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// The media row stored at `relpath/filename`, whatever its hash.
    pub fn find_media_at(&self, relpath: &str, filename: &str) -> Result<Option<LocationHolder>> {
        let holder = self
            .tx
            .query_row(
                "SELECT id, hash FROM media WHERE relpath = ?1 AND filename = ?2",
                params![relpath, filename],
                |row| {
                    let id: i64 = row.get(0)?;
                    Ok(LocationHolder {
                        id,
                        media_id: id,
                        hash: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(holder)
    }

    pub fn media_locations(&self) -> Result<Vec<MediaRef>> {
        let mut stmt = self
            .tx
            .prepare("SELECT id, filename, relpath FROM media ORDER BY id")?;
        let media = stmt
            .query_map([], |row| {
                Ok(MediaRef {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    relpath: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(media)
    }

    // ── Sidecars ─────────────────────────────────────────────────────

    pub fn find_sidecar(&self, media_id: i64, filename: &str) -> Result<Option<SidecarRef>> {
        let sidecar = self
            .tx
            .query_row(
                "SELECT id, hash FROM sidecars WHERE media_id = ?1 AND filename = ?2",
                params![media_id, filename],
                |row| {
                    Ok(SidecarRef {
                        id: row.get(0)?,
                        hash: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(sidecar)
    }

    /// A sidecar row of any media stored at `relpath/filename`.
    pub fn find_sidecar_at(&self, relpath: &str, filename: &str) -> Result<Option<LocationHolder>> {
        let holder = self
            .tx
            .query_row(
                "SELECT id, media_id, hash FROM sidecars
                 WHERE relpath = ?1 AND filename = ?2
                 ORDER BY id LIMIT 1",
                params![relpath, filename],
                |row| {
                    Ok(LocationHolder {
                        id: row.get(0)?,
                        media_id: row.get(1)?,
                        hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(holder)
    }

    pub fn insert_sidecar(&self, media_id: i64, sidecar: &NewSidecar<'_>) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO sidecars (media_id, filename, relpath, filetype, created, modified, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                media_id,
                sidecar.filename,
                sidecar.relpath,
                sidecar.file_type,
                format_timestamp(sidecar.created),
                format_timestamp(sidecar.modified),
                sidecar.hash,
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Rewrite the content fields of a sidecar whose bytes changed.
    pub fn update_sidecar(&self, id: i64, sidecar: &NewSidecar<'_>) -> Result<()> {
        self.tx.execute(
            "UPDATE sidecars SET relpath = ?1, filetype = ?2, modified = ?3, hash = ?4
             WHERE id = ?5",
            params![
                sidecar.relpath,
                sidecar.file_type,
                format_timestamp(sidecar.modified),
                sidecar.hash,
                id,
            ],
        )?;
        Ok(())
    }

    /// Insert by (media, filename), or update when the stored hash differs.
    pub fn upsert_sidecar(&self, media_id: i64, sidecar: &NewSidecar<'_>) -> Result<SidecarUpsert> {
        match self.find_sidecar(media_id, sidecar.filename)? {
            None => Ok(SidecarUpsert::Inserted(
                self.insert_sidecar(media_id, sidecar)?,
            )),
            Some(existing) if existing.hash != sidecar.hash => {
                self.update_sidecar(existing.id, sidecar)?;
                Ok(SidecarUpsert::Updated(existing.id))
            }
            Some(existing) => Ok(SidecarUpsert::Unchanged(existing.id)),
        }
    }

    /// Refresh a sidecar edited in place; its name and location stay put.
    pub fn update_sidecar_hash(&self, id: i64, hash: &str, modified: &NaiveDateTime) -> Result<()> {
        self.tx.execute(
            "UPDATE sidecars SET hash = ?1, modified = ?2 WHERE id = ?3",
            params![hash, format_timestamp(modified), id],
        )?;
        Ok(())
    }

    pub fn delete_sidecar(&self, id: i64) -> Result<()> {
        self.tx
            .execute("DELETE FROM sidecars WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn delete_sidecars_for_media(&self, media_id: i64) -> Result<usize> {
        let n = self
            .tx
            .execute("DELETE FROM sidecars WHERE media_id = ?1", params![media_id])?;
        Ok(n)
    }

    pub fn sidecar_locations(&self) -> Result<Vec<SidecarLocation>> {
        let mut stmt = self
            .tx
            .prepare("SELECT id, filename, relpath, hash FROM sidecars ORDER BY id")?;
        let sidecars = stmt
            .query_map([], |row| {
                Ok(SidecarLocation {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    relpath: row.get(2)?,
                    hash: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sidecars)
    }
}

fn find_media_by_hash(conn: &Connection, hash: &str) -> Result<Option<MediaRef>> {
    let media = conn
        .query_row(
            "SELECT id, filename, relpath FROM media WHERE hash = ?1",
            params![hash],
            |row| {
                Ok(MediaRef {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    relpath: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(media)
}

fn media_ref(id: i64, media: &NewMedia<'_>) -> MediaRef {
    MediaRef {
        id,
        filename: media.filename.to_string(),
        relpath: media.relpath.to_string(),
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

//! SQLite persistence for status events and user profiles.
//!
//! Two tables: `user_status` is an append-only event log, one row per
//! status change; `user_info` is an upsert table keyed by user id where an
//! empty incoming value never erases a previously stored one.

mod error;

pub use error::{Result, StoreError};

use rusqlite::{Connection, OpenFlags, params};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "\
create table if not exists user_status (
    telegram_user_id integer not null,
    timestamp integer not null,
    status integer not null
);
create table if not exists user_info (
    telegram_user_id integer unique primary key,
    full_name text,
    profile_photo blob,
    username text
);
";

const INSERT_STATUS: &str =
    "insert into user_status (telegram_user_id, timestamp, status) values (?1, ?2, ?3)";

// Empty values count as "unknown"; coalesce keeps whatever was stored
// before instead of erasing it.
const UPSERT_USER_INFO: &str = "\
insert into user_info (telegram_user_id, full_name, profile_photo, username)
values (?1, ?2, ?3, ?4)
on conflict (telegram_user_id) do update set
    full_name = coalesce(nullif(excluded.full_name, ''), full_name),
    profile_photo = coalesce(nullif(excluded.profile_photo, x''), profile_photo),
    username = coalesce(nullif(excluded.username, ''), username)";

/// One row of the `user_info` table.
#[derive(Debug, Clone)]
pub struct UserInfoRow {
    pub user_id: i64,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

/// One row of the `user_status` log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSample {
    pub timestamp: i64,
    pub is_online: bool,
}

/// Wraps the SQLite database file behind the two write operations the
/// event dispatcher needs, plus the read queries the stats tool uses.
///
/// The connection is `Send` but not `Sync`, so it sits behind a mutex;
/// in the live client all writes come from the single receive loop anyway.
pub struct StatusStore {
    conn: Mutex<Connection>,
}

impl StatusStore {
    /// Opens (creating if absent) the database, ensures the schema exists
    /// and warms the prepared-statement cache for the two writes. Any
    /// failure here is fatal to startup.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::wrap("open"))?;
        conn.execute_batch(SCHEMA)
            .map_err(StoreError::wrap("create schema"))?;
        conn.prepare_cached(INSERT_STATUS)
            .map_err(StoreError::wrap("prepare insert_status"))?;
        conn.prepare_cached(UPSERT_USER_INFO)
            .map_err(StoreError::wrap("prepare update_user_info"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read-only open for the stats tool; fails if the file is missing.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(StoreError::wrap("open read-only"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends one row to the status log.
    pub fn insert_status(&self, user_id: i64, timestamp: i32, is_online: bool) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(INSERT_STATUS)
            .map_err(StoreError::wrap("insert_status"))?;
        stmt.execute(params![user_id, timestamp, i32::from(is_online)])
            .map_err(StoreError::wrap("insert_status"))?;
        Ok(())
    }

    /// Upserts the profile row for `user_id`. Empty strings and an empty
    /// photo mean "unknown" and never overwrite a stored non-empty value.
    pub fn update_user_info(
        &self,
        user_id: i64,
        full_name: &str,
        username: &str,
        profile_photo: &[u8],
    ) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(UPSERT_USER_INFO)
            .map_err(StoreError::wrap("update_user_info"))?;
        stmt.execute(params![user_id, full_name, profile_photo, username])
            .map_err(StoreError::wrap("update_user_info"))?;
        Ok(())
    }

    /// All known users, ordered by id.
    pub fn list_users(&self) -> Result<Vec<UserInfoRow>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "select telegram_user_id, full_name, username from user_info \
                 order by telegram_user_id",
            )
            .map_err(StoreError::wrap("list_users"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(UserInfoRow {
                    user_id: row.get(0)?,
                    full_name: row.get(1)?,
                    username: row.get(2)?,
                })
            })
            .map_err(StoreError::wrap("list_users"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::wrap("list_users"))?;
        Ok(rows)
    }

    /// The full status log for one user, oldest first.
    pub fn statuses_for_user(&self, user_id: i64) -> Result<Vec<StatusSample>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "select timestamp, status from user_status \
                 where telegram_user_id = ?1 order by timestamp asc",
            )
            .map_err(StoreError::wrap("statuses_for_user"))?;
        let rows = stmt
            .query_map([user_id], |row| {
                Ok(StatusSample {
                    timestamp: row.get(0)?,
                    is_online: row.get::<_, i64>(1)? == 1,
                })
            })
            .map_err(StoreError::wrap("statuses_for_user"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::wrap("statuses_for_user"))?;
        Ok(rows)
    }
}

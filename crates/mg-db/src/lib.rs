//! Storage layer for Mindful Gamer.
//!
//! Provides persistence for the session log, the user's game library and the
//! key-value state blobs using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The tracker keeps it behind a mutex.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 with millisecond precision
//! (e.g. `2026-03-01T10:30:00.000Z`), so lexicographic order matches
//! chronological order. Durations are REAL minutes.
//!
//! The `kv` table holds JSON blobs written by `mg_core::store::save_json`. The
//! background configuration blob mirrors the `games` table: every library change
//! rewrites its `userLibraryGames` projection.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use mg_core::resolver::MappingSources;
use mg_core::store::{self, BACKGROUND_CONFIG_KEY, BackgroundConfig};
use mg_core::{KeyValueStore, LibraryGame, SessionLog, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Default number of sessions shown as "recent".
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A state blob could not be read or written.
    #[error(transparent)]
    State(#[from] StoreError),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for session {session_id}: {timestamp}")]
    TimestampParse {
        session_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A game name was empty after trimming.
    #[error("game name must not be empty")]
    EmptyGameName,
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::State(inner) => inner,
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A game in the user's library with its accumulated play time.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEntry {
    pub id: String,
    pub name: String,
    pub package_name: Option<String>,
    pub total_minutes: f64,
}

impl GameEntry {
    pub fn to_library_game(&self) -> LibraryGame {
        LibraryGame {
            id: self.id.clone(),
            name: self.name.clone(),
            package_name: self.package_name.clone(),
        }
    }
}

/// A recorded play session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub game_name: String,
    pub duration_minutes: f64,
    pub created_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- User library; total_minutes accumulates over appended sessions
            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                package_name TEXT,
                total_minutes REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_package ON games(package_name);

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                game_name TEXT NOT NULL,
                duration_minutes REAL NOT NULL,
                created_at TEXT NOT NULL,
                note TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_created ON sessions(created_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_game ON sessions(game_name);

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Adds a game to the library.
    ///
    /// If a game with the same name exists it is returned instead, gaining
    /// `package_name` when it had none.
    pub fn add_game(
        &mut self,
        name: &str,
        package_name: Option<&str>,
    ) -> Result<GameEntry, DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::EmptyGameName);
        }
        let package_name = package_name.map(str::trim).filter(|pkg| !pkg.is_empty());

        let entry = if let Some(mut existing) = self.find_game(name)? {
            if existing.package_name.is_none() && package_name.is_some() {
                self.conn.execute(
                    "UPDATE games SET package_name = ? WHERE id = ?",
                    params![package_name, existing.id],
                )?;
                existing.package_name = package_name.map(str::to_string);
            }
            existing
        } else {
            let entry = GameEntry {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                package_name: package_name.map(str::to_string),
                total_minutes: 0.0,
            };
            self.conn.execute(
                "INSERT INTO games (id, name, package_name, total_minutes, created_at) VALUES (?, ?, ?, 0, ?)",
                params![
                    entry.id,
                    entry.name,
                    entry.package_name,
                    format_timestamp(Utc::now())
                ],
            )?;
            tracing::debug!(
                game = %entry.name,
                package = ?entry.package_name,
                "added library game"
            );
            entry
        };

        self.sync_background_library()?;
        Ok(entry)
    }

    /// Looks up a library game by exact name.
    pub fn find_game(&self, name: &str) -> Result<Option<GameEntry>, DbError> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, name, package_name, total_minutes FROM games WHERE name = ?",
                [name],
                |row| {
                    Ok(GameEntry {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        package_name: row.get(2)?,
                        total_minutes: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Lists library games ordered by name.
    pub fn list_games(&self) -> Result<Vec<GameEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, package_name, total_minutes FROM games ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(GameEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                package_name: row.get(2)?,
                total_minutes: row.get(3)?,
            })
        })?;
        let mut games = Vec::new();
        for row in rows {
            games.push(row?);
        }
        Ok(games)
    }

    /// The library reduced to what package resolution needs.
    pub fn library_games(&self) -> Result<Vec<LibraryGame>, DbError> {
        Ok(self
            .list_games()?
            .iter()
            .map(GameEntry::to_library_game)
            .collect())
    }

    /// Records a session at `created_at` and credits its minutes to the library.
    ///
    /// A missing library game is created, with its package name found by inverse
    /// lookup over the library, custom mappings and the built-in catalog.
    pub fn record_session(
        &mut self,
        game_name: &str,
        duration_minutes: f64,
        note: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<SessionRecord, DbError> {
        let game_name = game_name.trim();
        if game_name.is_empty() {
            return Err(DbError::EmptyGameName);
        }

        let config: BackgroundConfig = store::load_json(self, BACKGROUND_CONFIG_KEY)?;
        let library = self.library_games()?;
        let package_name = MappingSources::from_user(config.user_mappings, library)
            .find_package_by_game_name(game_name);

        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            game_name: game_name.to_string(),
            duration_minutes,
            created_at,
            note: note.map(str::to_string),
        };

        let created = self.in_transaction(|db| {
            db.conn.execute(
                "INSERT INTO sessions (id, game_name, duration_minutes, created_at, note) VALUES (?, ?, ?, ?, ?)",
                params![
                    record.id,
                    record.game_name,
                    record.duration_minutes,
                    format_timestamp(record.created_at),
                    record.note
                ],
            )?;
            let updated = db.conn.execute(
                "
                UPDATE games
                SET total_minutes = total_minutes + ?1,
                    package_name = COALESCE(package_name, ?2)
                WHERE name = ?3
                ",
                params![duration_minutes, package_name, game_name],
            )?;
            let created = updated == 0;
            if created {
                db.conn.execute(
                    "INSERT INTO games (id, name, package_name, total_minutes, created_at) VALUES (?, ?, ?, ?, ?)",
                    params![
                        Uuid::new_v4().to_string(),
                        game_name,
                        package_name,
                        duration_minutes,
                        format_timestamp(created_at)
                    ],
                )?;
            }
            // the projection commits or rolls back together with the session row
            if created || package_name.is_some() {
                db.sync_background_library()?;
            }
            Ok(created)
        })?;

        tracing::debug!(
            game = %record.game_name,
            minutes = record.duration_minutes,
            new_game = created,
            "recorded session"
        );
        Ok(record)
    }

    /// Deletes every session for `game_name` and removes their minutes from the game.
    pub fn delete_sessions_for_game(&mut self, game_name: &str) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let removed_minutes: f64 = tx.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM sessions WHERE game_name = ?",
            [game_name],
            |row| row.get(0),
        )?;
        let removed = tx.execute("DELETE FROM sessions WHERE game_name = ?", [game_name])?;
        tx.execute(
            "UPDATE games SET total_minutes = MAX(total_minutes - ?1, 0) WHERE name = ?2",
            params![removed_minutes, game_name],
        )?;
        tx.commit()?;
        if removed > 0 {
            tracing::debug!(game = %game_name, removed, removed_minutes, "deleted sessions");
        }
        Ok(removed)
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, game_name, duration_minutes, created_at, note
            FROM sessions
            ORDER BY created_at DESC, id ASC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            let (id, game_name, duration_minutes, created_at, note) = row?;
            let created_at = parse_timestamp(&id, &created_at)?;
            sessions.push(SessionRecord {
                id,
                game_name,
                duration_minutes,
                created_at,
                note,
            });
        }
        Ok(sessions)
    }

    /// Sum of session minutes with `start <= created_at < end`.
    pub fn minutes_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DbError> {
        if end <= start {
            return Ok(0.0);
        }
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM sessions WHERE created_at >= ? AND created_at < ?",
            [format_timestamp(start), format_timestamp(end)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Runs `f` inside one SQLite transaction, rolling back when it fails.
    ///
    /// `f` gets the whole database, so key-value writes join the transaction.
    fn in_transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        let result = f(self).and_then(|value| {
            self.conn.execute_batch("COMMIT")?;
            Ok(value)
        });
        if result.is_err() && !self.conn.is_autocommit() {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "rollback failed");
            }
        }
        result
    }

    /// Rewrites the library projection inside the background configuration blob.
    pub fn sync_background_library(&mut self) -> Result<(), DbError> {
        let mut config: BackgroundConfig = store::load_json(self, BACKGROUND_CONFIG_KEY)?;
        config.user_library_games = self.library_games()?;
        store::save_json(self, BACKGROUND_CONFIG_KEY, &config)?;
        Ok(())
    }
}

impl SessionLog for Database {
    fn add_session(&mut self, game_name: &str, duration_minutes: f64) -> Result<(), StoreError> {
        self.record_session(game_name, duration_minutes, None, Utc::now())?;
        Ok(())
    }

    fn remove_sessions_for_game(&mut self, game_name: &str) -> Result<usize, StoreError> {
        Ok(self.delete_sessions_for_game(game_name)?)
    }
}

impl KeyValueStore for Database {
    fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()
            .map_err(|err| DbError::from(err).into())
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "
                INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key, value, format_timestamp(Utc::now())],
            )
            .map_err(DbError::from)?;
        Ok(())
    }

    fn remove_value(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", [key])
            .map_err(DbError::from)?;
        Ok(())
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(session_id: &str, timestamp: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            session_id: session_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

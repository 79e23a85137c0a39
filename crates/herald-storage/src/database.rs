// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes;
//! the atomic create-if-absent guarantees in the query modules depend
//! on the single-writer model.

use herald_core::HeraldError;
use tracing::debug;

/// Handle to the SQLite database, wrapping a single background connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled
    /// and run any pending migrations.
    pub async fn open(path: &str) -> Result<Self, HeraldError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit WAL-mode choice (config-driven).
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, HeraldError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| HeraldError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            crate::migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. All query modules go
    /// through this; closure calls are serialized on one thread.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), HeraldError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> HeraldError {
    HeraldError::Storage {
        source: Box::new(e),
    }
}

/// Current timestamp in the stored format: RFC 3339 UTC with
/// millisecond precision and a `Z` suffix.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

//! SQLite-backed store.
//!
//! One connection behind a mutex; every call runs on the blocking pool.
//! Ledger mutations run inside `BEGIN IMMEDIATE` transactions so the
//! conditional increment is the only arbiter of the quota cap.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{LedgerDrift, NewResume, NewUser, Resume, User};
use crate::store::{DocumentStore, IdentityStore};
use resumevault_common::{Email, Error, ResumeId, Result, SizeMb, UserId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        provider TEXT NOT NULL,
        provider_id TEXT,
        total_size INTEGER NOT NULL DEFAULT 0 CHECK (total_size >= 0),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        CHECK ((provider = 'local') = (password_hash IS NOT NULL))
    );

    CREATE TABLE IF NOT EXISTS resumes (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        filename TEXT NOT NULL,
        url TEXT NOT NULL,
        storage_key TEXT NOT NULL,
        size INTEGER NOT NULL CHECK (size >= 0),
        created_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_resumes_owner ON resumes(user_id, created_at);
"#;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, provider, provider_id, total_size, created_at, updated_at";

const RESUME_COLUMNS: &str = "id, user_id, filename, url, storage_key, size, created_at";

/// SQLite implementation of `IdentityStore` and `DocumentStore`.
///
/// Sizes are stored as integer hundredths of a megabyte and timestamps as
/// Unix milliseconds.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store database.
    ///
    /// `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    /// - Database creation or migration failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(db)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db)?;
        conn.execute_batch(SCHEMA).map_err(db)?;

        info!(path = %db_path.as_ref().display(), "Store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Database("Store connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Database(format!("Store task failed: {}", e)))?
    }
}

fn db(err: rusqlite::Error) -> Error {
    Error::Database(err.to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn time_from_sql(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Database(format!("Timestamp out of range: {}", millis)))
}

fn size_to_sql(size: SizeMb) -> Result<i64> {
    i64::try_from(size.hundredths())
        .map_err(|_| Error::Validation(format!("Size out of range: {} MB", size)))
}

fn size_from_sql(hundredths: i64) -> SizeMb {
    SizeMb::from_hundredths(hundredths.max(0) as u64)
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: Option<String>,
    provider: String,
    provider_id: Option<String>,
    total_size: i64,
    created_at: i64,
    updated_at: i64,
}

impl UserRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            provider: row.get(4)?,
            provider_id: row.get(5)?,
            total_size: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_user(self) -> Result<User> {
        Ok(User {
            id: UserId::from_trusted(self.id),
            name: self.name,
            email: Email::parse(&self.email)?,
            password_hash: self.password_hash,
            provider: self.provider.parse()?,
            provider_id: self.provider_id,
            total_size: size_from_sql(self.total_size),
            created_at: time_from_sql(self.created_at)?,
            updated_at: time_from_sql(self.updated_at)?,
        })
    }
}

struct ResumeRow {
    id: String,
    user_id: String,
    filename: String,
    url: String,
    storage_key: String,
    size: i64,
    created_at: i64,
}

impl ResumeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            filename: row.get(2)?,
            url: row.get(3)?,
            storage_key: row.get(4)?,
            size: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_resume(self) -> Result<Resume> {
        Ok(Resume {
            id: ResumeId::from_trusted(self.id),
            user: UserId::from_trusted(self.user_id),
            filename: self.filename,
            url: self.url,
            storage_key: self.storage_key,
            size: size_from_sql(self.size),
            created_at: time_from_sql(self.created_at)?,
        })
    }
}

fn user_not_found() -> Error {
    Error::NotFound("User not found".to_string())
}

fn reconcile_in(conn: &Connection, user_id: &str) -> Result<LedgerDrift> {
    let (email, recorded): (String, i64) = conn
        .query_row(
            "SELECT email, total_size FROM users WHERE id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(db)?
        .ok_or_else(user_not_found)?;

    let actual: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(size), 0) FROM resumes WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(db)?;

    if recorded != actual {
        conn.execute(
            "UPDATE users SET total_size = ?1, updated_at = ?2 WHERE id = ?3",
            params![actual, now().timestamp_millis(), user_id],
        )
        .map_err(db)?;
        warn!(
            user_id,
            recorded = %size_from_sql(recorded),
            actual = %size_from_sql(actual),
            "Ledger drift corrected"
        );
    }

    Ok(LedgerDrift {
        user_id: UserId::from_trusted(user_id),
        email: Email::parse(&email)?,
        recorded: size_from_sql(recorded),
        actual: size_from_sql(actual),
    })
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.run(move |conn| {
            let created_at = now();
            let user = User {
                id: UserId::generate(),
                name: new_user.name,
                email: new_user.email,
                password_hash: new_user.password_hash,
                provider: new_user.provider,
                provider_id: new_user.provider_id,
                total_size: SizeMb::ZERO,
                created_at,
                updated_at: created_at,
            };

            conn.execute(
                &format!(
                    "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    USER_COLUMNS
                ),
                params![
                    user.id.as_str(),
                    user.name,
                    user.email.as_str(),
                    user.password_hash,
                    user.provider.as_str(),
                    user.provider_id,
                    0i64,
                    created_at.timestamp_millis(),
                    created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict("User already exists".to_string())
                } else {
                    db(e)
                }
            })?;

            info!(user_id = %user.id, provider = user.provider.as_str(), "User created");
            Ok(user)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let email = email.clone();
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email.as_str()],
                UserRow::read,
            )
            .optional()
            .map_err(db)?
            .map(UserRow::into_user)
            .transpose()
        })
        .await
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        let id = id.clone();
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.as_str()],
                UserRow::read,
            )
            .optional()
            .map_err(db)?
            .map(UserRow::into_user)
            .transpose()
        })
        .await
    }

    async fn update_password_hash(&self, id: &UserId, password_hash: String) -> Result<()> {
        let id = id.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                    params![password_hash, now().timestamp_millis(), id.as_str()],
                )
                .map_err(db)?;
            if changed == 0 {
                return Err(user_not_found());
            }
            debug!(user_id = %id, "Password hash replaced");
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ledger_total(&self, user: &UserId) -> Result<SizeMb> {
        let user = user.clone();
        self.run(move |conn| {
            conn.query_row(
                "SELECT total_size FROM users WHERE id = ?1",
                params![user.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(db)?
            .map(size_from_sql)
            .ok_or_else(user_not_found)
        })
        .await
    }

    async fn commit_upload(&self, new_resume: NewResume, limit: SizeMb) -> Result<Resume> {
        self.run(move |conn| {
            let size = size_to_sql(new_resume.size)?;
            let limit_sql = size_to_sql(limit)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db)?;

            let used: i64 = tx
                .query_row(
                    "SELECT total_size FROM users WHERE id = ?1",
                    params![new_resume.user.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db)?
                .ok_or_else(user_not_found)?;

            let created_at = now();
            let charged = tx
                .execute(
                    "UPDATE users SET total_size = total_size + ?1, updated_at = ?2 \
                     WHERE id = ?3 AND total_size + ?1 <= ?4",
                    params![
                        size,
                        created_at.timestamp_millis(),
                        new_resume.user.as_str(),
                        limit_sql
                    ],
                )
                .map_err(db)?;

            if charged == 0 {
                // Dropping `tx` rolls back.
                return Err(Error::QuotaExceeded {
                    used: size_from_sql(used),
                    requested: new_resume.size,
                    limit,
                });
            }

            let resume = Resume {
                id: ResumeId::generate(),
                user: new_resume.user,
                filename: new_resume.filename,
                url: new_resume.url,
                storage_key: new_resume.storage_key,
                size: new_resume.size,
                created_at,
            };

            tx.execute(
                &format!(
                    "INSERT INTO resumes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    RESUME_COLUMNS
                ),
                params![
                    resume.id.as_str(),
                    resume.user.as_str(),
                    resume.filename,
                    resume.url,
                    resume.storage_key,
                    size,
                    created_at.timestamp_millis(),
                ],
            )
            .map_err(db)?;

            tx.commit().map_err(db)?;

            info!(
                user_id = %resume.user,
                resume_id = %resume.id,
                size_mb = %resume.size,
                total_mb = %(size_from_sql(used) + resume.size),
                "Upload committed"
            );
            Ok(resume)
        })
        .await
    }

    async fn commit_delete(&self, user: &UserId, resume: &ResumeId) -> Result<Resume> {
        let user = user.clone();
        let resume = resume.clone();
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db)?;

            let removed = tx
                .query_row(
                    &format!(
                        "SELECT {} FROM resumes WHERE id = ?1 AND user_id = ?2",
                        RESUME_COLUMNS
                    ),
                    params![resume.as_str(), user.as_str()],
                    ResumeRow::read,
                )
                .optional()
                .map_err(db)?
                .ok_or_else(|| Error::NotFound("Document not found".to_string()))?
                .into_resume()?;

            tx.execute(
                "DELETE FROM resumes WHERE id = ?1",
                params![removed.id.as_str()],
            )
            .map_err(db)?;

            tx.execute(
                "UPDATE users SET total_size = MAX(0, total_size - ?1), updated_at = ?2 \
                 WHERE id = ?3",
                params![
                    size_to_sql(removed.size)?,
                    now().timestamp_millis(),
                    user.as_str()
                ],
            )
            .map_err(db)?;

            tx.commit().map_err(db)?;

            info!(
                user_id = %user,
                resume_id = %removed.id,
                size_mb = %removed.size,
                "Delete committed"
            );
            Ok(removed)
        })
        .await
    }

    async fn list_resumes(&self, user: &UserId) -> Result<Vec<Resume>> {
        let user = user.clone();
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM resumes WHERE user_id = ?1 \
                     ORDER BY created_at DESC, rowid DESC",
                    RESUME_COLUMNS
                ))
                .map_err(db)?;

            let rows = stmt
                .query_map(params![user.as_str()], ResumeRow::read)
                .map_err(db)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db)?;

            rows.into_iter().map(ResumeRow::into_resume).collect()
        })
        .await
    }

    async fn reconcile_user(&self, user: &UserId) -> Result<LedgerDrift> {
        let user = user.clone();
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db)?;
            let drift = reconcile_in(&tx, user.as_str())?;
            tx.commit().map_err(db)?;
            Ok(drift)
        })
        .await
    }

    async fn reconcile_all(&self) -> Result<Vec<LedgerDrift>> {
        self.run(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db)?;

            let ids = {
                let mut stmt = tx
                    .prepare("SELECT id FROM users ORDER BY created_at, rowid")
                    .map_err(db)?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(db)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(db)?;
                ids
            };

            let drifts = ids
                .iter()
                .map(|id| reconcile_in(&tx, id))
                .collect::<Result<Vec<_>>>()?;

            tx.commit().map_err(db)?;
            Ok(drifts)
        })
        .await
    }
}

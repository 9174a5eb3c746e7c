//! `SQLite` storage for users, follow edges and messages.
//!
//! Writes go through [`SocialStorage`] directly. Reads that feed the
//! paginator go through a [`StoreReader`], which holds the connection lock
//! for its whole lifetime so that a feed walk and the graph lookups it makes
//! share one lock acquisition.

// SQLite operations need to hold the lock for the duration of the operation.
// Dropping the guard earlier would require restructuring all methods.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};

use super::error::{Result, SocialError};
use super::types::{
    is_valid_username, AccountStatus, Message, MessageId, NewUser, Privacy, User, UserId,
};
use crate::feed::{self, CandidateQuery, CandidateSource, Candidates, FeedError, RelationshipGraph};

const USER_COLUMNS: &str = "u.id, u.username, u.full_name, u.join_date, u.is_disabled";

const HOME_CANDIDATES: &str = r"
    SELECT id, author_id, text, pub_date, privacy
    FROM messages
    WHERE author_id = ?1
       OR author_id IN (SELECT to_user FROM relationships WHERE from_user = ?1)
    ORDER BY pub_date DESC, id DESC
";

const ALL_CANDIDATES: &str = r"
    SELECT id, author_id, text, pub_date, privacy
    FROM messages
    ORDER BY pub_date DESC, id DESC
";

const AUTHOR_CANDIDATES: &str = r"
    SELECT id, author_id, text, pub_date, privacy
    FROM messages
    WHERE author_id = ?1
    ORDER BY pub_date DESC, id DESC
";

/// `SQLite`-based storage for social data.
///
/// Thread-safe wrapper around a `SQLite` connection.
pub struct SocialStorage {
    conn: Mutex<Connection>,
}

impl SocialStorage {
    /// Creates a new storage instance at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        tracing::debug!(path = %path.display(), "opened social storage");
        Ok(storage)
    }

    /// Creates an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SocialError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                join_date INTEGER NOT NULL,
                is_disabled INTEGER NOT NULL DEFAULT 0
            );

            -- Directed follow edges, unique per (from_user, to_user)
            CREATE TABLE IF NOT EXISTS relationships (
                from_user INTEGER NOT NULL REFERENCES users(id),
                to_user INTEGER NOT NULL REFERENCES users(id),
                created_date INTEGER NOT NULL,
                PRIMARY KEY (from_user, to_user)
            );
            CREATE INDEX IF NOT EXISTS relationships_by_target
                ON relationships (to_user, from_user);

            -- Messages; pub_date is Unix milliseconds
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                pub_date INTEGER NOT NULL,
                privacy INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS messages_by_date
                ON messages (pub_date DESC, id DESC);
            CREATE INDEX IF NOT EXISTS messages_by_author
                ON messages (author_id, pub_date DESC, id DESC);
            ",
        )?;

        Ok(())
    }

    /// Acquires a reader over the current contents of the store.
    ///
    /// The reader holds the connection lock until it is dropped; writes from
    /// other threads wait for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn reader(&self) -> Result<StoreReader<'_>> {
        Ok(StoreReader { conn: self.lock()? })
    }

    // ==================== User Operations ====================

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::InvalidUsername`] if the username breaks the
    /// username rules, [`SocialError::AlreadyExists`] if it is taken, or a
    /// database error.
    pub fn create_user(&self, new_user: &NewUser, joined_at: DateTime<Utc>) -> Result<User> {
        if !is_valid_username(&new_user.username) {
            return Err(SocialError::InvalidUsername(new_user.username.clone()));
        }
        let conn = self.lock()?;

        let inserted = conn.execute(
            r"
            INSERT INTO users (username, full_name, join_date, is_disabled)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                &new_user.username,
                &new_user.full_name,
                joined_at.timestamp_millis(),
                AccountStatus::Active.code(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(SocialError::AlreadyExists(new_user.username.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let user = User {
            id: UserId(conn.last_insert_rowid()),
            username: new_user.username.clone(),
            full_name: new_user.full_name.clone(),
            join_date: from_millis(joined_at.timestamp_millis())?,
            status: AccountStatus::Active,
        };
        tracing::info!(user = %user.id, username = %user.username, "registered user");
        Ok(user)
    }

    /// Retrieves a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.reader()?.user(id)
    }

    /// Retrieves a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.reader()?.user_by_username(username)
    }

    /// Changes a user's account state.
    ///
    /// # Errors
    ///
    /// Returns an error if the user doesn't exist or the database operation fails.
    pub fn set_account_status(&self, id: UserId, status: AccountStatus) -> Result<()> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "UPDATE users SET is_disabled = ?1 WHERE id = ?2",
            params![status.code(), id.0],
        )?;

        if rows == 0 {
            return Err(SocialError::NotFound(id.to_string()));
        }
        Ok(())
    }

    // ==================== Relationship Operations ====================

    /// Creates the follow edge `from -> to`.
    ///
    /// Returns `false` if the edge already existed.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if either user doesn't exist, or a
    /// database error.
    pub fn follow(&self, from: UserId, to: UserId, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        ensure_user(&conn, from)?;
        ensure_user(&conn, to)?;

        let rows = conn.execute(
            r"
            INSERT INTO relationships (from_user, to_user, created_date)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(from_user, to_user) DO NOTHING
            ",
            params![from.0, to.0, at.timestamp_millis()],
        )?;

        if rows > 0 {
            tracing::info!(%from, %to, "created follow edge");
        }
        Ok(rows > 0)
    }

    /// Removes the follow edge `from -> to`.
    ///
    /// Returns `false` if there was no such edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unfollow(&self, from: UserId, to: UserId) -> Result<bool> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "DELETE FROM relationships WHERE from_user = ?1 AND to_user = ?2",
            params![from.0, to.0],
        )?;

        if rows > 0 {
            tracing::info!(%from, %to, "removed follow edge");
        }
        Ok(rows > 0)
    }

    // ==================== Message Operations ====================

    /// Stores a new message.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the author doesn't exist, or a
    /// database error.
    pub fn post_message(
        &self,
        author: UserId,
        text: &str,
        privacy: Privacy,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        let (message, ()) = self.post_message_with(author, text, privacy, at, |_, _| Ok(()))?;
        Ok(message)
    }

    /// Stores a new message and runs `inspect` on it before committing.
    ///
    /// `inspect` sees the store, new message included, under the same lock
    /// as the insert. If it fails, the insert is rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the author doesn't exist, the
    /// error from `inspect`, or a database error. In every error case the
    /// message is not stored.
    pub fn post_message_with<R, F>(
        &self,
        author: UserId,
        text: &str,
        privacy: Privacy,
        at: DateTime<Utc>,
        inspect: F,
    ) -> Result<(Message, R)>
    where
        F: FnOnce(&StoreReader<'_>, &Message) -> Result<R>,
    {
        let reader = self.reader()?;
        let tx = reader.conn.unchecked_transaction()?;
        ensure_user(&tx, author)?;

        tx.execute(
            r"
            INSERT INTO messages (author_id, text, pub_date, privacy)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![author.0, text, at.timestamp_millis(), privacy.code()],
        )?;

        let message = Message {
            id: MessageId(tx.last_insert_rowid()),
            author,
            text: text.to_string(),
            published_at: from_millis(at.timestamp_millis())?,
            privacy,
        };
        let extra = inspect(&reader, &message)?;
        tx.commit()?;

        tracing::info!(message = %message.id, %author, ?privacy, "posted message");
        Ok((message, extra))
    }

    /// Replaces a message's text and privacy and moves it to `at`.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the message doesn't exist,
    /// [`SocialError::Forbidden`] if `editor` is not its author, or a
    /// database error.
    pub fn edit_message(
        &self,
        editor: UserId,
        id: MessageId,
        text: &str,
        privacy: Privacy,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        let (message, ()) =
            self.edit_message_with(editor, id, text, privacy, at, |_, _| Ok(()))?;
        Ok(message)
    }

    /// Edits a message and runs `inspect` on the result before committing.
    ///
    /// If `inspect` fails, the edit is rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::NotFound`] if the message doesn't exist,
    /// [`SocialError::Forbidden`] if `editor` is not its author, the error
    /// from `inspect`, or a database error. In every error case the message
    /// is left unchanged.
    pub fn edit_message_with<R, F>(
        &self,
        editor: UserId,
        id: MessageId,
        text: &str,
        privacy: Privacy,
        at: DateTime<Utc>,
        inspect: F,
    ) -> Result<(Message, R)>
    where
        F: FnOnce(&StoreReader<'_>, &Message) -> Result<R>,
    {
        let reader = self.reader()?;
        let tx = reader.conn.unchecked_transaction()?;

        let mut message =
            find_message(&tx, id)?.ok_or_else(|| SocialError::NotFound(id.to_string()))?;
        if !message.is_authored_by(editor) {
            return Err(SocialError::Forbidden(format!(
                "{editor} is not the author of {id}"
            )));
        }

        tx.execute(
            r"
            UPDATE messages
            SET text = ?1, privacy = ?2, pub_date = ?3
            WHERE id = ?4
            ",
            params![text, privacy.code(), at.timestamp_millis(), id.0],
        )?;

        message.text = text.to_string();
        message.privacy = privacy;
        message.published_at = from_millis(at.timestamp_millis())?;
        let extra = inspect(&reader, &message)?;
        tx.commit()?;

        tracing::info!(message = %id, ?privacy, "edited message");
        Ok((message, extra))
    }

    /// Retrieves a message by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_message(&self, id: MessageId) -> Result<Option<Message>> {
        let conn = self.lock()?;
        find_message(&conn, id)
    }
}

/// A locked, read-only view of a [`SocialStorage`].
///
/// Implements the feed's [`CandidateSource`] and [`RelationshipGraph`].
/// The lock is released when the reader is dropped.
pub struct StoreReader<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl StoreReader<'_> {
    /// Retrieves a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user(&self, id: UserId) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
                params![id.0],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    /// Retrieves a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
                params![username],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    fn related_users(&self, sql: &str, user: UserId) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![user.0], UserRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(UserRow::into_user).collect()
    }
}

impl RelationshipGraph for StoreReader<'_> {
    fn is_following(&self, from: UserId, to: UserId) -> feed::Result<bool> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM relationships WHERE from_user = ?1 AND to_user = ?2)",
        )?;
        Ok(stmt.query_row(params![from.0, to.0], |row| row.get(0))?)
    }

    fn following(&self, user: UserId) -> feed::Result<Vec<User>> {
        Ok(self.related_users(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u
                 JOIN relationships r ON r.to_user = u.id
                 WHERE r.from_user = ?1
                 ORDER BY u.username"
            ),
            user,
        )?)
    }

    fn followers(&self, user: UserId) -> feed::Result<Vec<User>> {
        Ok(self.related_users(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u
                 JOIN relationships r ON r.from_user = u.id
                 WHERE r.to_user = ?1
                 ORDER BY u.username"
            ),
            user,
        )?)
    }
}

impl CandidateSource for StoreReader<'_> {
    fn user_exists(&self, user: UserId) -> feed::Result<bool> {
        Ok(user_exists(&self.conn, user)?)
    }

    fn scan<R, F>(&self, query: CandidateQuery, walk: F) -> feed::Result<R>
    where
        F: FnOnce(&mut Candidates<'_>) -> feed::Result<R>,
    {
        let (sql, user) = match query {
            CandidateQuery::Home(viewer) => (HOME_CANDIDATES, Some(viewer.0)),
            CandidateQuery::All => (ALL_CANDIDATES, None),
            CandidateQuery::Author(author) => (AUTHOR_CANDIDATES, Some(author.0)),
        };
        tracing::debug!(?query, "opening candidate cursor");

        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(user), MessageRow::from_row)?;
        let mut candidates = rows.map(|row| {
            row.map_err(FeedError::from)
                .and_then(|row| row.into_message().map_err(FeedError::from))
        });
        walk(&mut candidates)
    }
}

fn user_exists(conn: &Connection, id: UserId) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![id.0],
        |row| row.get(0),
    )?)
}

fn ensure_user(conn: &Connection, id: UserId) -> Result<()> {
    if user_exists(conn, id)? {
        Ok(())
    } else {
        Err(SocialError::NotFound(id.to_string()))
    }
}

fn find_message(conn: &Connection, id: MessageId) -> Result<Option<Message>> {
    let row = conn
        .query_row(
            "SELECT id, author_id, text, pub_date, privacy FROM messages WHERE id = ?1",
            params![id.0],
            MessageRow::from_row,
        )
        .optional()?;
    row.map(MessageRow::into_message).transpose()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| SocialError::InvalidData(format!("Invalid timestamp: {ms}")))
}

/// Raw `users` row.
struct UserRow {
    id: i64,
    username: String,
    full_name: String,
    join_date: i64,
    is_disabled: i64,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            full_name: row.get(2)?,
            join_date: row.get(3)?,
            is_disabled: row.get(4)?,
        })
    }

    fn into_user(self) -> Result<User> {
        let status = AccountStatus::from_code(self.is_disabled).ok_or_else(|| {
            SocialError::InvalidData(format!("Invalid account status: {}", self.is_disabled))
        })?;
        Ok(User {
            id: UserId(self.id),
            username: self.username,
            full_name: self.full_name,
            join_date: from_millis(self.join_date)?,
            status,
        })
    }
}

/// Raw `messages` row.
struct MessageRow {
    id: i64,
    author_id: i64,
    text: String,
    pub_date: i64,
    privacy: i64,
}

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            text: row.get(2)?,
            pub_date: row.get(3)?,
            privacy: row.get(4)?,
        })
    }

    fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: MessageId(self.id),
            author: UserId(self.author_id),
            text: self.text,
            published_at: from_millis(self.pub_date)?,
            privacy: Privacy::from_code_or_deny(self.privacy),
        })
    }
}

//! Embedded key-value engine binding.
//!
//! The store keeps every record in a single SQLite file used as a plain
//! key-value engine: `buckets` is the partition registry (and holds each
//! partition's id sequence), `entries` holds the records keyed by
//! `(bucket, 8-byte big-endian id)`. Because keys are BLOBs, SQLite's bytewise
//! ordering gives ascending numeric iteration.
//!
//! All access goes through transaction scopes:
//!
//! - [`Store::view`] runs a closure against a [`ReadTx`] and never writes.
//! - [`Store::update`] runs a closure against a [`WriteTx`] and commits only if
//!   the closure returns `Ok`.
//!
//! The connection runs in exclusive locking mode, so once a store is open no
//! other process can read or write the file until [`Store::close`].

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, trace};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};

use crate::codec::{self, Record};
use crate::error::{RecordKind, Result, StoreError};

/// Version stamped into `PRAGMA user_version` of every file this build writes.
pub const SCHEMA_VERSION: i64 = 1;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS buckets (
    name     TEXT PRIMARY KEY,
    sequence INTEGER NOT NULL DEFAULT 0 CHECK(sequence >= 0)
);

CREATE TABLE IF NOT EXISTS entries (
    bucket TEXT NOT NULL REFERENCES buckets(name),
    key    BLOB NOT NULL CHECK(length(key) = 8),
    value  BLOB NOT NULL,
    PRIMARY KEY (bucket, key)
) WITHOUT ROWID;
";

/// A named partition of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Tasks,
    Tags,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Tasks, Bucket::Tags];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Tags => "tags",
        }
    }

    pub fn kind(self) -> RecordKind {
        match self {
            Self::Tasks => RecordKind::Task,
            Self::Tags => RecordKind::Tag,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long `open` waits for another process to release the file.
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Opens the store at `path`, creating the file (mode 0600) and both
    /// partitions if they do not exist yet.
    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        create_file(&path)?;

        let mut conn = Connection::open(&path).map_err(|e| open_error(&path, e))?;
        set_pragmas(&conn, options.lock_timeout).map_err(|e| open_error(&path, e))?;
        init(&mut conn, &path)?;

        info!("opened store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` inside a read-only transaction.
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let tx = ReadTx {
            tx: conn.transaction_with_behavior(TransactionBehavior::Deferred)?,
        };
        let out = f(&tx)?;
        tx.tx.rollback()?;
        Ok(out)
    }

    /// Runs `f` inside a read-write transaction. Every write made by `f` is
    /// committed if it returns `Ok` and discarded if it returns `Err`.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let mut tx = WriteTx {
            tx: conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
        };
        match f(&mut tx) {
            Ok(out) => {
                tx.tx.commit()?;
                Ok(out)
            }
            Err(e) => {
                debug!("rolling back write transaction: {e}");
                Err(e)
            }
        }
    }

    /// Flushes and releases the file, making it available to other processes.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, e)| StoreError::Engine(e))?;
        info!("closed store at {}", self.path.display());
        Ok(())
    }

    // A panic inside a scope drops its transaction, which rolls back, so the
    // connection behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

mod sealed {
    pub trait Sealed {
        fn conn(&self) -> &rusqlite::Connection;
    }
}

/// Typed record reads, available in both transaction scopes.
pub trait Reader: sealed::Sealed {
    fn get<R: Record>(&self, key: u64) -> Result<Option<R>> {
        let bucket = R::BUCKET;
        trace!("get {}/{key}", bucket.name());
        let value: Option<Vec<u8>> = self
            .conn()
            .prepare_cached("SELECT value FROM entries WHERE bucket = ?1 AND key = ?2")?
            .query_row(
                params![bucket.name(), codec::encode_key(key).as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        value.map(|bytes| codec::decode(key, &bytes)).transpose()
    }

    fn contains<R: Record>(&self, key: u64) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .prepare_cached("SELECT 1 FROM entries WHERE bucket = ?1 AND key = ?2")?
            .query_row(
                params![R::BUCKET.name(), codec::encode_key(key).as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Decodes every record of the partition in ascending key order and keeps
    /// those for which `keep` returns true.
    fn scan<R, F>(&self, mut keep: F) -> Result<Vec<R>>
    where
        R: Record,
        F: FnMut(&R) -> bool,
    {
        let bucket = R::BUCKET;
        trace!("scan {}", bucket.name());
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT key, value FROM entries WHERE bucket = ?1 ORDER BY key")?;
        let mut rows = stmt.query([bucket.name()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let raw_key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            let key = codec::decode_key(bucket.kind(), &raw_key)?;
            let record: R = codec::decode(key, &value)?;
            if keep(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }
}

pub struct ReadTx<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl sealed::Sealed for ReadTx<'_> {
    fn conn(&self) -> &Connection {
        &self.tx
    }
}

impl Reader for ReadTx<'_> {}

pub struct WriteTx<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl sealed::Sealed for WriteTx<'_> {
    fn conn(&self) -> &Connection {
        &self.tx
    }
}

impl Reader for WriteTx<'_> {}

impl WriteTx<'_> {
    /// Inserts or replaces the record stored under `record.key()`.
    pub fn put<R: Record>(&mut self, record: &R) -> Result<()> {
        let bucket = R::BUCKET;
        let key = record.key();
        let value = codec::encode(record)?;
        trace!("put {}/{key} ({} bytes)", bucket.name(), value.len());
        self.tx
            .prepare_cached(
                "INSERT INTO entries (bucket, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (bucket, key) DO UPDATE SET value = excluded.value",
            )?
            .execute(params![
                bucket.name(),
                codec::encode_key(key).as_slice(),
                value
            ])?;
        Ok(())
    }

    /// Removes the record under `key`. Returns whether one existed.
    pub fn delete<R: Record>(&mut self, key: u64) -> Result<bool> {
        let bucket = R::BUCKET;
        trace!("delete {}/{key}", bucket.name());
        let removed = self
            .tx
            .prepare_cached("DELETE FROM entries WHERE bucket = ?1 AND key = ?2")?
            .execute(params![bucket.name(), codec::encode_key(key).as_slice()])?;
        Ok(removed > 0)
    }

    /// Allocates the next id of `R`'s partition. Ids start at 1, only grow,
    /// and are never handed out twice even if the record using one is deleted.
    pub fn next_id<R: Record>(&mut self) -> Result<u64> {
        let bucket = R::BUCKET;
        let seq: i64 = self
            .tx
            .prepare_cached("UPDATE buckets SET sequence = sequence + 1 WHERE name = ?1 RETURNING sequence")?
            .query_row([bucket.name()], |row| row.get(0))?;
        let id = u64::try_from(seq).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, seq))?;
        trace!("next id for {}: {id}", bucket.name());
        Ok(id)
    }
}

fn create_file(path: &Path) -> Result<()> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(path)
        .map(drop)
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn set_pragmas(conn: &Connection, lock_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(lock_timeout)?;
    let locking: String =
        conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| row.get(0))?;
    let journal: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    debug!("locking_mode={locking} journal_mode={journal}");
    Ok(())
}

fn init(conn: &mut Connection, path: &Path) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .map_err(|e| open_error(path, e))?;

    let found: i64 = tx
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| open_error(path, e))?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
            supported: SCHEMA_VERSION,
        });
    }

    tx.execute_batch(SCHEMA).map_err(|e| open_error(path, e))?;
    for bucket in Bucket::ALL {
        tx.execute(
            "INSERT OR IGNORE INTO buckets (name) VALUES (?1)",
            [bucket.name()],
        )
        .map_err(|e| open_error(path, e))?;
    }
    if found < SCHEMA_VERSION {
        debug!("stamping schema version {SCHEMA_VERSION} (was {found})");
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| open_error(path, e))?;
    }
    tx.commit().map_err(|e| open_error(path, e))?;
    Ok(())
}

fn open_error(path: &Path, err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::Locked {
            path: path.to_path_buf(),
        },
        Some(ErrorCode::NotADatabase) => StoreError::NotAStore {
            path: path.to_path_buf(),
        },
        _ => StoreError::Engine(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::model::{Tag, Task};

    fn open_temp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("tsk.db")).unwrap();
        (dir, store)
    }

    fn put_task(store: &Store, text: &str) -> u64 {
        store
            .update(|tx| {
                let key = tx.next_id::<Task>()?;
                tx.put(&Task::new(key, text, Utc::now()))?;
                Ok(key)
            })
            .unwrap()
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store>();
    }

    #[test]
    fn open_creates_file_and_buckets() {
        let (dir, store) = open_temp();
        assert!(dir.path().join("tsk.db").exists());
        let names: Vec<String> = {
            let conn = store.lock();
            let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY name").unwrap();
            let rows = stmt.query_map([], |row| row.get(0)).unwrap();
            rows.collect::<rusqlite::Result<_>>().unwrap()
        };
        assert_eq!(names, vec!["tags", "tasks"]);
    }

    #[cfg(unix)]
    #[test]
    fn open_creates_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, _store) = open_temp();
        let mode = std::fs::metadata(dir.path().join("tsk.db"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn open_in_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Store::open(dir.path().join("nope").join("tsk.db")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "{err:?}");
    }

    #[test]
    fn second_open_of_held_file_is_locked() {
        let (dir, _store) = open_temp();
        let err = Store::open_with(
            dir.path().join("tsk.db"),
            StoreOptions {
                lock_timeout: Duration::from_millis(50),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }), "{err:?}");
    }

    #[test]
    fn foreign_file_is_not_a_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "shopping list\n".repeat(100)).unwrap();

        let err = Store::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::NotAStore { .. }), "{err:?}");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "shopping list\n".repeat(100)
        );
    }

    #[test]
    fn close_releases_the_file() {
        let (dir, store) = open_temp();
        let key = put_task(&store, "persisted");
        store.close().unwrap();

        let store = Store::open(dir.path().join("tsk.db")).unwrap();
        let task: Option<Task> = store.view(|tx| tx.get(key)).unwrap();
        assert_eq!(task.unwrap().value, "persisted");
    }

    #[test]
    fn newer_schema_is_refused() {
        let (dir, store) = open_temp();
        let path = dir.path().join("tsk.db");
        store.close().unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        drop(conn);

        let err = Store::open(&path).unwrap_err();
        assert!(
            matches!(err, StoreError::UnsupportedVersion { found: 2, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn sequences_are_per_bucket() {
        let (_dir, store) = open_temp();
        let (a, b, c) = store
            .update(|tx| Ok((tx.next_id::<Task>()?, tx.next_id::<Task>()?, tx.next_id::<Tag>()?)))
            .unwrap();
        assert_eq!((a, b, c), (1, 2, 1));
    }

    #[test]
    fn sequence_survives_delete_and_reopen() {
        let (dir, store) = open_temp();
        let first = put_task(&store, "a");
        let second = put_task(&store, "b");
        store
            .update(|tx| {
                tx.delete::<Task>(first)?;
                tx.delete::<Task>(second)?;
                Ok(())
            })
            .unwrap();
        store.close().unwrap();

        let store = Store::open(dir.path().join("tsk.db")).unwrap();
        assert_eq!(put_task(&store, "c"), 3);
    }

    #[test]
    fn failed_update_leaves_no_trace() {
        let (_dir, store) = open_temp();
        let err = store
            .update(|tx| -> Result<()> {
                let key = tx.next_id::<Task>()?;
                tx.put(&Task::new(key, "half written", Utc::now()))?;
                Err(StoreError::NotFound {
                    kind: RecordKind::Tag,
                    key: 99,
                })
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { key: 99, .. }));

        let tasks: Vec<Task> = store.view(|tx| tx.scan(|_| true)).unwrap();
        assert!(tasks.is_empty());
        // the allocation was rolled back with the insert
        assert_eq!(put_task(&store, "next"), 1);
    }

    #[test]
    fn scan_is_in_numeric_key_order() {
        let (_dir, store) = open_temp();
        store
            .update(|tx| {
                for key in [256u64, 1, 65_536, 2] {
                    tx.put(&Tag::new(key, format!("tag {key}")))?;
                }
                Ok(())
            })
            .unwrap();
        let keys: Vec<u64> = store
            .view(|tx| tx.scan::<Tag, _>(|_| true))
            .unwrap()
            .iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec![1, 2, 256, 65_536]);
    }

    #[test]
    fn put_replaces_and_delete_reports_presence() {
        let (_dir, store) = open_temp();
        let key = put_task(&store, "old");
        store
            .update(|tx| {
                let mut task: Task = tx.get(key)?.unwrap();
                task.value = "new".into();
                tx.put(&task)
            })
            .unwrap();
        let task: Task = store.view(|tx| tx.get(key)).unwrap().unwrap();
        assert_eq!(task.value, "new");

        assert!(store.update(|tx| tx.delete::<Task>(key)).unwrap());
        assert!(!store.update(|tx| tx.delete::<Task>(key)).unwrap());
        assert!(!store.view(|tx| tx.contains::<Task>(key)).unwrap());
    }

    #[test]
    fn buckets_are_independent_keyspaces() {
        let (_dir, store) = open_temp();
        store
            .update(|tx| {
                tx.put(&Task::new(1, "task one", Utc::now()))?;
                tx.put(&Tag::new(1, "tag one"))
            })
            .unwrap();
        let (task, tag) = store
            .view(|tx| Ok((tx.get::<Task>(1)?, tx.get::<Tag>(1)?)))
            .unwrap();
        assert_eq!(task.unwrap().value, "task one");
        assert_eq!(tag.unwrap().value, "tag one");
    }

    #[test]
    fn corrupt_value_surfaces_as_decode_error() {
        let (_dir, store) = open_temp();
        {
            let conn = store.lock();
            conn.execute(
                "INSERT INTO entries (bucket, key, value) VALUES ('tasks', ?1, ?2)",
                params![codec::encode_key(5).as_slice(), b"{not json".as_slice()],
            )
            .unwrap();
        }
        let err = store.view(|tx| tx.get::<Task>(5)).unwrap_err();
        assert!(matches!(err, StoreError::Decode { key: 5, .. }), "{err:?}");
        let err = store.view(|tx| tx.scan::<Task, _>(|_| true)).unwrap_err();
        assert!(err.is_encoding());
    }

    #[test]
    fn concurrent_writers_never_share_an_id() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..10)
                        .map(|i| put_task(&store, &format!("worker {n} item {i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
    }
}

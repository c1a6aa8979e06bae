//! SQLite datastore

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::common::Credentials;

use super::schema;
use super::{Datastore, StoreError};

/// SQLite-backed datastore.
/// Uses parking_lot::Mutex for synchronous access (rusqlite is not Sync).
pub struct SqliteDatastore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteDatastore {
    /// Open or create a datastore at the given path.
    ///
    /// Any failure to reach the file is reported as
    /// [`StoreError::Unavailable`] so startup can fall back to memory-only
    /// mode.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("create dir: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        conn.execute_batch(schema::PRAGMAS)
            .map_err(|e| StoreError::Unavailable(format!("pragmas: {e}")))?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

        info!(path = %path.display(), "datastore opened");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_owned()),
        })
    }

    /// Open an in-memory datastore (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Datastore for SqliteDatastore {
    fn ping(&self) -> Result<(), StoreError> {
        self.conn
            .lock()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn get_password(&self) -> Result<Option<String>, StoreError> {
        let password = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [schema::PASSWORD_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(password)
    }

    fn set_password(&self, password: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![schema::PASSWORD_KEY, password],
        )?;
        Ok(())
    }

    fn get_networks(&self) -> Result<HashMap<String, Credentials>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name, hostname, port, nickname, username, realname, password, usermode
             FROM networks",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut networks = HashMap::new();
        for row in rows {
            let (network, hostname, port, nickname, username, realname, password, usermode) = row?;
            let port = u16::try_from(port)
                .map_err(|_| StoreError::Corrupt(format!("{network}: port {port} out of range")))?;
            let usermode = u32::try_from(usermode)
                .map_err(|_| StoreError::Corrupt(format!("{network}: usermode {usermode}")))?;
            networks.insert(
                network.clone(),
                Credentials {
                    network,
                    hostname,
                    port,
                    nickname,
                    username,
                    realname,
                    password,
                    usermode,
                },
            );
        }

        debug!(count = networks.len(), "loaded networks");
        Ok(networks)
    }

    fn add_network(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO networks (name, hostname, port, nickname, username, realname, password, usermode)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(name) DO UPDATE SET
                hostname = excluded.hostname,
                port = excluded.port,
                nickname = excluded.nickname,
                username = excluded.username,
                realname = excluded.realname,
                password = excluded.password,
                usermode = excluded.usermode",
            params![
                credentials.network,
                credentials.hostname,
                credentials.port,
                credentials.nickname,
                credentials.username,
                credentials.realname,
                credentials.password,
                credentials.usermode,
            ],
        )?;
        Ok(())
    }

    fn remove_network(&self, name: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM networks WHERE name = ?1", [name])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(name: &str) -> Credentials {
        Credentials {
            network: name.to_string(),
            hostname: "irc.example.org".to_string(),
            port: 6667,
            nickname: "alice".to_string(),
            username: "alice".to_string(),
            realname: "Alice".to_string(),
            password: None,
            usermode: 0,
        }
    }

    #[test]
    fn test_ping() {
        let store = SqliteDatastore::in_memory().unwrap();
        assert!(store.ping().is_ok());
    }

    #[test]
    fn test_password_roundtrip() {
        let store = SqliteDatastore::in_memory().unwrap();
        assert_eq!(store.get_password().unwrap(), None);

        store.set_password("hunter2").unwrap();
        store.set_password("correct horse").unwrap();
        assert_eq!(store.get_password().unwrap().as_deref(), Some("correct horse"));
    }

    #[test]
    fn test_add_network_upserts_by_name() {
        let store = SqliteDatastore::in_memory().unwrap();
        store.add_network(&credentials("freenode")).unwrap();

        let mut updated = credentials("freenode");
        updated.password = Some("secret".to_string());
        updated.port = 6697;
        store.add_network(&updated).unwrap();

        let networks = store.get_networks().unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks["freenode"], updated);
    }

    #[test]
    fn test_remove_network_is_idempotent() {
        let store = SqliteDatastore::in_memory().unwrap();
        store.add_network(&credentials("freenode")).unwrap();
        store.add_network(&credentials("oftc")).unwrap();

        store.remove_network("freenode").unwrap();
        store.remove_network("freenode").unwrap();
        store.remove_network("never-added").unwrap();

        let networks = store.get_networks().unwrap();
        assert_eq!(networks.keys().collect::<Vec<_>>(), vec!["oftc"]);
    }

    #[test]
    fn test_open_unreachable_path_is_unavailable() {
        // A regular file cannot be used as a parent directory
        let blocker = std::env::temp_dir().join(format!("sputnik-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"").unwrap();

        let result = SqliteDatastore::open(&blocker.join("bouncer.db"));
        let _ = std::fs::remove_file(&blocker);

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_open_file_persists() {
        let dir = std::env::temp_dir().join(format!("sputnik-store-{}", std::process::id()));
        let path = dir.join("bouncer.db");
        {
            let store = SqliteDatastore::open(&path).unwrap();
            store.add_network(&credentials("libera")).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }
        let reopened = SqliteDatastore::open(&path).unwrap();
        assert!(reopened.get_networks().unwrap().contains_key("libera"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Fixed names of the persisted preferences
pub mod keys {
  pub const TOKEN: &str = "token";
  pub const THEME: &str = "theme";
  pub const LANGUAGE: &str = "language";
  pub const COLUMNS_USERS: &str = "columns.users";
  pub const COLUMNS_ALL_KEYS: &str = "columns.all_keys";
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS preferences (
  name  TEXT PRIMARY KEY NOT NULL,
  value TEXT NOT NULL
);
";

/// Small key/value store for client state that survives restarts
pub struct Preferences {
  conn: Connection,
}

impl Preferences {
  /// Open or create the store at the default location
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    Self::open_at(&path)
  }

  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open preferences at {}: {}", path.display(), e))?;
    Self::with_connection(conn)
  }

  /// Throwaway store, used by tests and when the data directory is unusable
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory preferences: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(Self { conn })
  }

  /// Directory holding the store and the log files
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("keydeck"))
  }

  fn default_path() -> Result<PathBuf> {
    Ok(Self::data_dir()?.join("keydeck.db"))
  }

  pub fn get(&self, name: &str) -> Result<Option<String>> {
    self
      .conn
      .query_row(
        "SELECT value FROM preferences WHERE name = ?1",
        params![name],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read preference {}: {}", name, e))
  }

  pub fn set(&self, name: &str, value: &str) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO preferences (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        params![name, value],
      )
      .map_err(|e| eyre!("Failed to write preference {}: {}", name, e))?;
    Ok(())
  }

  pub fn remove(&self, name: &str) -> Result<()> {
    self
      .conn
      .execute("DELETE FROM preferences WHERE name = ?1", params![name])
      .map_err(|e| eyre!("Failed to remove preference {}: {}", name, e))?;
    Ok(())
  }

  pub fn token(&self) -> Result<Option<String>> {
    self.get(keys::TOKEN)
  }

  /// Store the bearer token, or forget it with `None`
  pub fn set_token(&self, token: Option<&str>) -> Result<()> {
    match token {
      Some(token) => self.set(keys::TOKEN, token),
      None => self.remove(keys::TOKEN),
    }
  }

  /// Column names stored as a comma separated list
  pub fn hidden_columns(&self, name: &str) -> Result<Vec<String>> {
    Ok(
      self
        .get(name)?
        .map(|v| {
          v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  pub fn set_hidden_columns(&self, name: &str, columns: &[String]) -> Result<()> {
    self.set(name, &columns.join(","))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_get_overwrite_remove() {
    let prefs = Preferences::in_memory().unwrap();
    assert_eq!(prefs.get(keys::THEME).unwrap(), None);

    prefs.set(keys::THEME, "dark").unwrap();
    assert_eq!(prefs.get(keys::THEME).unwrap().as_deref(), Some("dark"));

    prefs.set(keys::THEME, "light").unwrap();
    assert_eq!(prefs.get(keys::THEME).unwrap().as_deref(), Some("light"));

    prefs.remove(keys::THEME).unwrap();
    assert_eq!(prefs.get(keys::THEME).unwrap(), None);
  }

  #[test]
  fn test_token_round_trip() {
    let prefs = Preferences::in_memory().unwrap();
    prefs.set_token(Some("abc")).unwrap();
    assert_eq!(prefs.token().unwrap().as_deref(), Some("abc"));
    prefs.set_token(None).unwrap();
    assert_eq!(prefs.token().unwrap(), None);
  }

  #[test]
  fn test_hidden_columns() {
    let prefs = Preferences::in_memory().unwrap();
    assert!(prefs.hidden_columns(keys::COLUMNS_USERS).unwrap().is_empty());

    let cols = vec!["email".to_string(), "last_ip".to_string()];
    prefs.set_hidden_columns(keys::COLUMNS_USERS, &cols).unwrap();
    assert_eq!(prefs.hidden_columns(keys::COLUMNS_USERS).unwrap(), cols);

    prefs.set_hidden_columns(keys::COLUMNS_USERS, &[]).unwrap();
    assert!(prefs.hidden_columns(keys::COLUMNS_USERS).unwrap().is_empty());
  }

  #[test]
  fn test_file_store_persists() {
    let path = std::env::temp_dir().join(format!("keydeck-test-{}.db", std::process::id()));
    {
      let prefs = Preferences::open_at(&path).unwrap();
      prefs.set(keys::LANGUAGE, "ru").unwrap();
    }
    let prefs = Preferences::open_at(&path).unwrap();
    assert_eq!(prefs.get(keys::LANGUAGE).unwrap().as_deref(), Some("ru"));
    drop(prefs);
    let _ = std::fs::remove_file(&path);
  }
}

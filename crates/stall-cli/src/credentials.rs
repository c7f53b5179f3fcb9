//! Storage for the one session token the CLI holds.

use std::{
  collections::BTreeMap,
  io::Write as _,
  path::{Path, PathBuf},
};

use crate::error::{ClientError, Result};

/// Key the token is stored under.
pub const TOKEN_KEY: &str = "token";

/// An opaque key-value store that holds at most one session token.
pub trait CredentialStore: Send + Sync {
  fn get(&self) -> Result<Option<String>>;
  fn set(&self, token: &str) -> Result<()>;
  fn delete(&self) -> Result<()>;
}

// ─── File-backed ─────────────────────────────────────────────────────────────

/// A TOML file such as `~/.config/stall/credentials.toml`.
#[derive(Debug, Clone)]
pub struct FileCredentials {
  path: PathBuf,
}

impl FileCredentials {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  /// `$HOME/.config/stall/credentials.toml`, if `HOME` is set.
  pub fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
      .map(|home| Path::new(&home).join(".config").join("stall").join("credentials.toml"))
  }

  #[cfg(test)]
  pub fn path(&self) -> &Path { &self.path }

  fn read(&self) -> Result<BTreeMap<String, String>> {
    match std::fs::read_to_string(&self.path) {
      Ok(raw) => toml::from_str(&raw).map_err(|e| {
        ClientError::Credentials(format!("parsing {}: {e}", self.path.display()))
      }),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
      Err(e) => Err(io_error(&self.path, e)),
    }
  }

  fn write(&self, entries: &BTreeMap<String, String>) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }
    let raw = toml::to_string(entries).map_err(|e| ClientError::Credentials(e.to_string()))?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt as _;
      options.mode(0o600);
    }
    let mut file = options.open(&self.path).map_err(|e| io_error(&self.path, e))?;

    // `mode` only applies on creation; an older file is tightened before
    // the token goes in.
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt as _;
      file
        .set_permissions(std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_error(&self.path, e))?;
    }
    file.write_all(raw.as_bytes()).map_err(|e| io_error(&self.path, e))?;
    Ok(())
  }
}

fn io_error(path: &Path, e: std::io::Error) -> ClientError {
  ClientError::Credentials(format!("{}: {e}", path.display()))
}

impl CredentialStore for FileCredentials {
  fn get(&self) -> Result<Option<String>> {
    Ok(self.read()?.remove(TOKEN_KEY).filter(|t| !t.is_empty()))
  }

  fn set(&self, token: &str) -> Result<()> {
    let mut entries = self.read()?;
    entries.insert(TOKEN_KEY.to_owned(), token.to_owned());
    self.write(&entries)
  }

  fn delete(&self) -> Result<()> {
    let mut entries = self.read()?;
    if entries.remove(TOKEN_KEY).is_some() {
      self.write(&entries)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::MemoryCredentials;

  fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir()
      .join(format!("stall-cli-{}-{name}", uuid::Uuid::new_v4()))
      .join("credentials.toml")
  }

  #[test]
  fn file_store_roundtrip() {
    let store = FileCredentials::new(temp_file("roundtrip"));
    assert_eq!(store.get().unwrap(), None);

    store.set("abc.def.ghi").unwrap();
    assert_eq!(store.get().unwrap().as_deref(), Some("abc.def.ghi"));

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("token = \"abc.def.ghi\""));

    store.delete().unwrap();
    assert_eq!(store.get().unwrap(), None);
    // Deleting twice is fine.
    store.delete().unwrap();

    std::fs::remove_dir_all(store.path().parent().unwrap()).ok();
  }

  #[test]
  fn corrupt_file_is_an_error() {
    let path = temp_file("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "token = ").unwrap();
    assert!(matches!(FileCredentials::new(&path).get(), Err(ClientError::Credentials(_))));
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
  }

  #[cfg(unix)]
  #[test]
  fn token_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt as _;

    let store = FileCredentials::new(temp_file("mode"));
    store.set("secret").unwrap();
    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    // A file left world-readable by something else is tightened on write.
    std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
    store.set("rotated").unwrap();
    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(store.get().unwrap().as_deref(), Some("rotated"));

    std::fs::remove_dir_all(store.path().parent().unwrap()).ok();
  }

  #[test]
  fn memory_store() {
    let store = MemoryCredentials::default();
    assert_eq!(store.get().unwrap(), None);
    store.set("t").unwrap();
    assert_eq!(store.get().unwrap().as_deref(), Some("t"));
    store.delete().unwrap();
    assert_eq!(store.get().unwrap(), None);
  }
}

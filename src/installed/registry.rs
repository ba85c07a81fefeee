//! Storage for installed servers.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{InstalledError, InstalledResult, InstalledServer, InstalledServers};

pub const INSTALLED_FILE_VAR: &str = "MKT_INSTALLED_FILE";

#[derive(Debug, Default, Serialize, Deserialize)]
struct InstalledFile {
    #[serde(default)]
    servers: Vec<InstalledServer>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Installed servers kept in a single JSON file (`{"servers": [...]}`).
///
/// A missing file reads as an empty list. Every write rewrites the whole
/// file.
pub struct JsonInstalledServers {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonInstalledServers {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// `MKT_INSTALLED_FILE`, else `~/.config/marketplace/installed.json`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(INSTALLED_FILE_VAR)
            && !path.trim().is_empty()
        {
            return PathBuf::from(path);
        }
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home)
            .join(".config")
            .join("marketplace")
            .join("installed.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> InstalledResult<InstalledFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(InstalledFile::default());
            }
            Err(source) => {
                return Err(InstalledError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(InstalledFile::default());
        }
        serde_json::from_str(&content).map_err(|source| InstalledError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, file: &InstalledFile) -> InstalledResult<()> {
        let io_err = |source| InstalledError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let output =
            serde_json::to_string_pretty(file).map_err(|source| InstalledError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, output).map_err(io_err)?;
        debug!(path = %self.path.display(), count = file.servers.len(), "Saved installed servers");
        Ok(())
    }
}

impl InstalledServers for JsonInstalledServers {
    fn list(&self) -> InstalledResult<Vec<InstalledServer>> {
        let _guard = locked(&self.guard);
        Ok(self.load()?.servers)
    }

    fn add(&self, server: InstalledServer) -> InstalledResult<()> {
        let _guard = locked(&self.guard);
        let mut file = self.load()?;
        file.servers.retain(|s| s.id != server.id);
        file.servers.push(server);
        self.save(&file)
    }

    fn update(&self, server: InstalledServer) -> InstalledResult<()> {
        let _guard = locked(&self.guard);
        let mut file = self.load()?;
        let slot = file
            .servers
            .iter_mut()
            .find(|s| s.id == server.id)
            .ok_or_else(|| InstalledError::NotFound {
                id: server.id.clone(),
            })?;
        *slot = server;
        self.save(&file)
    }

    fn remove(&self, id: &str) -> InstalledResult<Option<InstalledServer>> {
        let _guard = locked(&self.guard);
        let mut file = self.load()?;
        let Some(pos) = file.servers.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let removed = file.servers.remove(pos);
        self.save(&file)?;
        Ok(Some(removed))
    }
}

/// Installed servers held in memory, for embedding and tests.
#[derive(Default)]
pub struct MemoryInstalledServers {
    servers: Mutex<Vec<InstalledServer>>,
}

impl MemoryInstalledServers {
    pub fn new(servers: Vec<InstalledServer>) -> Self {
        Self {
            servers: Mutex::new(servers),
        }
    }
}

impl InstalledServers for MemoryInstalledServers {
    fn list(&self) -> InstalledResult<Vec<InstalledServer>> {
        Ok(locked(&self.servers).clone())
    }

    fn add(&self, server: InstalledServer) -> InstalledResult<()> {
        let mut servers = locked(&self.servers);
        servers.retain(|s| s.id != server.id);
        servers.push(server);
        Ok(())
    }

    fn update(&self, server: InstalledServer) -> InstalledResult<()> {
        let mut servers = locked(&self.servers);
        match servers.iter_mut().find(|s| s.id == server.id) {
            Some(slot) => {
                *slot = server;
                Ok(())
            }
            None => Err(InstalledError::NotFound { id: server.id }),
        }
    }

    fn remove(&self, id: &str) -> InstalledResult<Option<InstalledServer>> {
        let mut servers = locked(&self.servers);
        Ok(servers
            .iter()
            .position(|s| s.id == id)
            .map(|pos| servers.remove(pos)))
    }
}

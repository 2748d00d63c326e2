//! Credential persisted to a file between CLI invocations.
//!
//! The file holds only the Base64 token. On Unix it is opened with mode
//! `0600` before the token is written, matching how the browser build keeps
//! the token per-origin.

#[cfg(test)]
#[path = "credential_file_test.rs"]
mod credential_file_test;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tavern_admin::{Credential, CredentialStore};

const DEFAULT_DIR: &str = ".tavern-admin";
const DEFAULT_FILE: &str = "credential";

/// `~/.tavern-admin/credential`, or `None` when `HOME` is unset.
pub fn default_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").filter(|home| !home.is_empty())?;
    Some(PathBuf::from(home).join(DEFAULT_DIR).join(DEFAULT_FILE))
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten a file left by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(token.as_bytes())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Credential> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| Credential::from_token(token))
    }

    fn save(&self, credential: &Credential) {
        if let Err(e) = self.write(credential.as_str()) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not write credential file");
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "could not remove credential file"),
        }
    }
}

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde_yaml::Value as YamlValue;
use tracing::{debug, warn};

use crate::error::Result;

/// File name of the credential file inside the user's home directory.
pub const CREDENTIAL_FILE_NAME: &str = ".mlabrc.yml";

/// Environment variable overriding the credential file path.
pub const CREDENTIAL_PATH_ENV_VAR: &str = "MLAB_CREDENTIALS";

/// An mLab Data API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Reads and writes the single stored API key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$MLAB_CREDENTIALS`, or `~/.mlabrc.yml` when unset.
    /// Returns `None` if no home directory can be determined.
    pub fn from_env() -> Option<Self> {
        default_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored key. A missing, empty, or unreadable file yields `None`.
    pub fn load(&self) -> Option<Credential> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no credential file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read credential file");
                return None;
            }
        };
        if text.trim().is_empty() {
            debug!(path = %self.path.display(), "empty credential file");
            return None;
        }
        let value = match serde_yaml::from_str::<YamlValue>(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed credential file");
                return None;
            }
        };
        if value.is_null() {
            return None;
        }
        let key = scalar_key(&value);
        if key.is_none() {
            warn!(path = %self.path.display(), "credential file does not hold a single key");
        }
        key.map(Credential::new)
    }

    /// Overwrite the file with `credential`, creating the parent directory if needed.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_yaml::to_string(credential.as_str())?)?;
        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }
}

fn default_path() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(CREDENTIAL_PATH_ENV_VAR) {
        if !p.is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CREDENTIAL_FILE_NAME))
}

/// The file holds one YAML scalar. Numeric keys are taken as written.
fn scalar_key(value: &YamlValue) -> Option<String> {
    let key = match value {
        YamlValue::String(s) => s.trim().to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!key.is_empty()).then_some(key)
}

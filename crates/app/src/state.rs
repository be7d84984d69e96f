use std::{fs, path::PathBuf};

use common::capability::{Capability, WritableCapability};
use common::codec::CborEncoded;
use common::prelude::SecretKey;
use common::sharing::SharingConfig;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "capstore";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const VAULT_DIR_NAME: &str = "vault";
pub const USERS_DIR_NAME: &str = "users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level; `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling log files (optional, stderr only if unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub sharing: SharingConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            sharing: SharingConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the capstore directory (~/.capstore)
    pub capstore_dir: PathBuf,
    /// Path to the local vault (blobs + pointer table)
    pub vault_path: PathBuf,
    /// Path to the per-user keys and home capabilities
    pub users_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the capstore directory path (custom or default ~/.capstore)
    pub fn capstore_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new capstore state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let capstore_dir = Self::capstore_dir(custom_path)?;

        if capstore_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&capstore_dir)?;

        let vault_path = capstore_dir.join(VAULT_DIR_NAME);
        fs::create_dir_all(&vault_path)?;
        let users_path = capstore_dir.join(USERS_DIR_NAME);
        fs::create_dir_all(&users_path)?;

        let config = config.unwrap_or_default();
        let config_path = capstore_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            capstore_dir,
            vault_path,
            users_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the capstore directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let capstore_dir = Self::capstore_dir(custom_path)?;

        if !capstore_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let vault_path = capstore_dir.join(VAULT_DIR_NAME);
        let users_path = capstore_dir.join(USERS_DIR_NAME);
        let config_path = capstore_dir.join(CONFIG_FILE_NAME);

        if !vault_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", VAULT_DIR_NAME)));
        }
        if !users_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", USERS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            capstore_dir,
            vault_path,
            users_path,
            config_path,
            config,
        })
    }

    fn key_path(&self, username: &str) -> PathBuf {
        self.users_path.join(format!("{}.pem", username))
    }

    fn cap_path(&self, username: &str) -> PathBuf {
        self.users_path.join(format!("{}.cap", username))
    }

    /// Store a registered user's identity key and home capability
    pub fn save_user(
        &self,
        username: &str,
        key: &SecretKey,
        home: &WritableCapability,
    ) -> Result<(), StateError> {
        let cap = Capability::from(home.clone())
            .encode()
            .map_err(|e| StateError::InvalidCapability(e.to_string()))?;
        fs::write(self.key_path(username), key.to_pem())?;
        fs::write(self.cap_path(username), cap)?;
        Ok(())
    }

    /// Load a user's identity key and home capability
    pub fn load_user(&self, username: &str) -> Result<(SecretKey, WritableCapability), StateError> {
        let key_path = self.key_path(username);
        if !key_path.exists() {
            return Err(StateError::UnknownUser(username.to_string()));
        }

        let pem = fs::read_to_string(&key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;

        let bytes = fs::read(self.cap_path(username))?;
        let home = Capability::decode(&bytes)
            .map_err(|e| StateError::InvalidCapability(e.to_string()))?
            .as_writable()
            .cloned()
            .ok_or_else(|| StateError::InvalidCapability("home is not writable".to_string()))?;
        Ok((key, home))
    }

    /// Names of the users whose keys are stored locally
    pub fn users(&self) -> Result<Vec<String>, StateError> {
        let mut users = Vec::new();
        for entry in fs::read_dir(&self.users_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "pem") {
                if let Some(stem) = path.file_stem() {
                    users.push(stem.to_string_lossy().to_string());
                }
            }
        }
        users.sort();
        Ok(users)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("capstore directory not initialized. Run 'capstore init' first")]
    NotInitialized,

    #[error("capstore directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("no local key for user: {0}")]
    UnknownUser(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid capability: {0}")]
    InvalidCapability(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

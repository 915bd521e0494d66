use quillboard_api::{CredentialStore, StoredCredentials};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Session tokens persisted on disk
///
/// Tokens are encrypted using XOR with a machine-specific key for basic
/// obfuscation. For production use, consider using proper encryption
/// libraries like ring or sodiumoxide.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct TokenFile {
    access_token: Option<Vec<u8>>,
    refresh_token: Option<Vec<u8>>,
}

/// File-backed credential store so a login survives process restarts
///
/// Reads and writes are lenient: a missing or corrupt token file is
/// treated as an empty one, and write failures are logged rather than
/// surfaced, since losing persistence must never fail a request.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Open the store at the default location under the user data dir
    pub fn open() -> crate::Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::TokenStoreError("Could not find data directory".into()))?
            .join("quillboard");

        Ok(Self {
            path: data_dir.join("tokens.json"),
        })
    }

    /// Open the store at an explicit path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_file(&self) -> TokenFile {
        if !self.path.exists() {
            return TokenFile::default();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Token file at {} is corrupt: {}", self.path.display(), e);
                    TokenFile::default()
                }
            },
            Err(e) => {
                warn!("Failed to read token file {}: {}", self.path.display(), e);
                TokenFile::default()
            }
        }
    }

    fn write_file(&self, file: &TokenFile) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create token dir {}: {}", parent.display(), e);
                return;
            }
        }

        match serde_json::to_string_pretty(file) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&self.path, contents) {
                    warn!("Failed to write token file {}: {}", self.path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize token file: {}", e),
        }
    }

    /// Simple XOR encryption with machine-specific key
    /// For basic obfuscation - not cryptographically secure
    fn encrypt(data: &str) -> Vec<u8> {
        let key = Self::machine_key();
        data.bytes()
            .enumerate()
            .map(|(i, b)| b ^ key[i % key.len()])
            .collect()
    }

    /// Decrypt XOR-encrypted data
    fn decrypt(data: &[u8]) -> String {
        let key = Self::machine_key();
        let decrypted: Vec<u8> = data
            .iter()
            .enumerate()
            .map(|(i, &b)| b ^ key[i % key.len()])
            .collect();
        String::from_utf8_lossy(&decrypted).to_string()
    }

    /// Generate a machine-specific key for encryption
    /// Uses hostname + username as seed
    fn machine_key() -> Vec<u8> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let hostname = hostname::get()
            .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
            .to_string_lossy()
            .to_string();

        let username = whoami::username();
        let seed = format!("quillboard-{}-{}", hostname, username);

        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        let hash = hasher.finish();

        // Generate 32-byte key from hash
        let mut key = Vec::with_capacity(32);
        let mut val = hash;
        for _ in 0..4 {
            key.extend_from_slice(&val.to_le_bytes());
            val = val.wrapping_mul(1103515245).wrapping_add(12345);
        }
        key
    }
}

impl CredentialStore for FileTokenStore {
    fn load(&self) -> StoredCredentials {
        let file = self.read_file();
        StoredCredentials {
            access_token: file.access_token.as_deref().map(Self::decrypt),
            refresh_token: file.refresh_token.as_deref().map(Self::decrypt),
        }
    }

    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        let mut file = self.read_file();
        file.access_token = Some(Self::encrypt(access_token));
        if let Some(refresh) = refresh_token {
            file.refresh_token = Some(Self::encrypt(refresh));
        }
        self.write_file(&file);
    }

    fn store_access_token(&self, access_token: &str) {
        let mut file = self.read_file();
        file.access_token = Some(Self::encrypt(access_token));
        self.write_file(&file);
    }

    fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove token file {}: {}", self.path.display(), e);
            }
        }
    }
}

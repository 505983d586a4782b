//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::path::PathBuf;

/// Where user profiles are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileBackend {
    Firestore,
    /// In-process only, lost on restart
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted auth provider (e.g. `https://xyz.supabase.co`)
    pub auth_url: String,
    /// Public (anon) API key sent with every provider request
    pub auth_anon_key: String,
    /// GCP project ID for the profile collection
    pub gcp_project_id: String,
    pub profile_backend: ProfileBackend,
    /// Directory holding the client-local store (session, demo flag)
    pub data_dir: PathBuf,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// How many times registration tries to write the new profile
    pub profile_write_attempts: u32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:54321".to_string(),
            auth_anon_key: "test_anon_key".to_string(),
            gcp_project_id: "test-project".to_string(),
            profile_backend: ProfileBackend::Memory,
            data_dir: PathBuf::from(".fittrack-test"),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            profile_write_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let profile_backend = match env::var("FITTRACK_PROFILE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => ProfileBackend::Firestore,
            "memory" => ProfileBackend::Memory,
            other => {
                return Err(ConfigError::Invalid(
                    "FITTRACK_PROFILE_BACKEND",
                    other.to_string(),
                ))
            }
        };

        Ok(Self {
            auth_url: env::var("FITTRACK_AUTH_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FITTRACK_AUTH_URL"))?,
            auth_anon_key: env::var("FITTRACK_AUTH_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FITTRACK_AUTH_ANON_KEY"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            profile_backend,
            data_dir: env::var("FITTRACK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".fittrack")),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            profile_write_attempts: env::var("PROFILE_WRITE_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|attempts| *attempts > 0)
                .unwrap_or(3),
        })
    }

    /// Path of the client-local store file.
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join("local_storage.json")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

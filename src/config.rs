use std::{env, path::PathBuf, time::Duration};

/// Remote document-store settings. All three parts must be present for the
/// session to start on the remote backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the document store, e.g. `https://store.example.com/v1`.
    pub endpoint: String,
    /// Application namespace the records live under.
    pub app_id: String,
    /// Opaque per-user identifier.
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the local collection file.
    pub data_dir: PathBuf,
    /// Remote backend, when configured. Absent means local-only.
    pub remote: Option<RemoteConfig>,
    /// How often the remote backend re-reads the collection.
    pub poll_interval: Duration,
}

impl Config {
    /// Read configuration from the environment, defaulting to a local-only
    /// store under `./data`.
    pub fn from_env() -> Config {
        let data_dir = env::var("FIELDBOOK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let remote = match (
            env::var("FIELDBOOK_ENDPOINT"),
            env::var("FIELDBOOK_APP_ID"),
            env::var("FIELDBOOK_USER_ID"),
        ) {
            (Ok(endpoint), Ok(app_id), Ok(user_id)) => Some(RemoteConfig {
                endpoint,
                app_id,
                user_id,
            }),
            _ => None,
        };

        let poll_interval = env::var("FIELDBOOK_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(1_000));

        Config {
            data_dir,
            remote,
            poll_interval,
        }
    }
}

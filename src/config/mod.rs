use serde::{Deserialize, Serialize};

/// Where every tracked click is redirected, whatever the outcome.
pub const DEFAULT_DESTINATION: &str = "https://nonai.life/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    /// Fixed redirect target for /track requests.
    pub destination_url: String,
    /// Externally reachable base URL, used when building tracking URLs.
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    /// Snapshot path for the file backend.
    pub data_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Sqlite,
    Postgres,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::File => "file",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "file".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => StorageBackend::Postgres,
            "sqlite" => StorageBackend::Sqlite,
            "file" => StorageBackend::File,
            other => {
                tracing::warn!(
                    "Unknown STORAGE_BACKEND '{other}', falling back to 'file'. \
                     Supported values: file, sqlite, postgres"
                );
                StorageBackend::File
            }
        };

        // Managed Postgres providers hand out postgres:// URLs.
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./clicktrack.db".to_string())
            .replacen("postgres://", "postgresql://", 1);

        let data_file = std::env::var("DATA_FILE").unwrap_or_else(|_| "clicks.json".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()?;

        let destination_url =
            std::env::var("FINAL_DESTINATION").unwrap_or_else(|_| DEFAULT_DESTINATION.to_string());

        let public_url = public_url_from_env(port);

        Ok(Config {
            storage: StorageConfig {
                backend,
                database_url,
                data_file,
            },
            server: ServerConfig { host, port },
            destination_url,
            public_url,
        })
    }
}

/// Derive the externally reachable base URL from the deployment environment,
/// falling back to localhost for development.
fn public_url_from_env(port: u16) -> String {
    let domain = std::env::var("RAILWAY_PUBLIC_DOMAIN")
        .or_else(|_| std::env::var("RAILWAY_STATIC_URL"))
        .or_else(|_| std::env::var("RAILWAY_SERVICE_URL"))
        .ok();

    match domain {
        Some(domain) => {
            let domain = domain
                .trim_start_matches("https://")
                .trim_start_matches("http://");
            format!("https://{domain}")
        }
        None => format!("http://localhost:{port}"),
    }
}

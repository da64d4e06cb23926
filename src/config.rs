/// Runtime configuration loaded from the environment (and `.env` via dotenv)
use std::env;

const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Cloudinary,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expiration_secs: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt: JwtSettings,
    pub cors_origins: Vec<String>,
    pub public_base_url: String,
    pub upload_dir: String,
    pub storage_backend: StorageBackend,
    pub cloudinary: Option<CloudinaryConfig>,
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub admin_email: String,
    pub redis_url: String,
    pub max_image_bytes: usize,
    pub max_document_bytes: usize,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Split a comma separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = match non_empty("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                log::warn!("JWT_SECRET is not set, falling back to an insecure default");
                "secret".to_string()
            }
        };

        let storage_backend = match var_or("STORAGE_BACKEND", "local").to_lowercase().as_str() {
            "cloudinary" => StorageBackend::Cloudinary,
            _ => StorageBackend::Local,
        };

        let cloudinary = match (
            non_empty("CLOUD_NAME"),
            non_empty("CLOUDINARY_API_KEY"),
            non_empty("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let port = parsed_or("SERVER_PORT", 5000u16);

        Self {
            host: var_or("SERVER_HOST", "127.0.0.1"),
            port,
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
            database_name: var_or("DATABASE_NAME", "printkart"),
            jwt: JwtSettings {
                secret: jwt_secret,
                expiration_secs: parsed_or("JWT_EXPIRATION", 86400i64),
            },
            cors_origins: parse_origins(&var_or("CORS_ALLOWED_ORIGINS", "")),
            public_base_url: var_or("PUBLIC_BASE_URL", &format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            upload_dir: var_or("UPLOAD_DIR", "./uploads"),
            storage_backend,
            cloudinary,
            resend_api_key: non_empty("RESEND_API_KEY"),
            mail_from: var_or("MAIL_FROM", "PrintKart <noreply@printkart.com>"),
            admin_email: var_or("ADMIN_EMAIL", "printkart0001@gmail.com"),
            redis_url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            max_image_bytes: parsed_or("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            max_document_bytes: parsed_or("MAX_DOCUMENT_BYTES", DEFAULT_MAX_DOCUMENT_BYTES),
        }
    }

    /// Fixed configuration that never touches the environment
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            mongodb_uri: "mongodb://127.0.0.1:27017".to_string(),
            database_name: "printkart_test".to_string(),
            jwt: JwtSettings {
                secret: "test-secret".to_string(),
                expiration_secs: 3600,
            },
            cors_origins: Vec::new(),
            public_base_url: "http://localhost:5000".to_string(),
            upload_dir: env::temp_dir()
                .join("printkart-test-uploads")
                .to_string_lossy()
                .to_string(),
            storage_backend: StorageBackend::Local,
            cloudinary: None,
            resend_api_key: None,
            mail_from: "PrintKart <noreply@printkart.com>".to_string(),
            admin_email: "admin@printkart.test".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

//! Error types for CampusFeed

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CampusfeedError>;

#[derive(Error, Debug)]
pub enum CampusfeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Data store error: {0}")]
    Db(#[from] DbError),

    #[error("Feed error: {0}")]
    Load(#[from] LoadError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CampusfeedError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CampusfeedError::InvalidInput(_) => 3,
            CampusfeedError::Auth(_) => 2,
            CampusfeedError::Config(_) => 1,
            CampusfeedError::Upload(_) => 1,
            CampusfeedError::Db(_) => 1,
            CampusfeedError::Load(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Email not verified: {0}")]
    EmailNotVerified(String),

    #[error("No active session: {0}")]
    NotSignedIn(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Auth provider error: {0}")]
    Provider(String),
}

#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("Object store rejected write to '{path}': {reason}")]
    Rejected { path: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Error, Debug, Clone)]
pub enum DbError {
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Data store error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("Feed fetch failed: {0}")]
    Fetch(String),

    #[error("Feed record could not be decoded: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = CampusfeedError::InvalidInput("Empty post".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_auth_error() {
        let error =
            CampusfeedError::Auth(AuthError::InvalidCredentials("bad password".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_upload_error() {
        let error = CampusfeedError::Upload(UploadError::Rejected {
            path: "images/a.png".to_string(),
            reason: "quota exceeded".to_string(),
        });
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_db_and_load_errors() {
        let db = CampusfeedError::Db(DbError::NotFound("posts/42".to_string()));
        assert_eq!(db.exit_code(), 1);

        let load = CampusfeedError::Load(LoadError::Fetch("connection refused".to_string()));
        assert_eq!(load.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_upload() {
        let error = CampusfeedError::Upload(UploadError::Rejected {
            path: "videos/clip.mp4".to_string(),
            reason: "payload too large".to_string(),
        });
        assert_eq!(
            format!("{}", error),
            "Upload error: Object store rejected write to 'videos/clip.mp4': payload too large"
        );
    }

    #[test]
    fn test_error_message_formatting_auth() {
        let error = CampusfeedError::Auth(AuthError::EmailNotVerified(
            "check your inbox".to_string(),
        ));
        let message = format!("{}", error);
        assert!(message.contains("Email not verified"));
        assert!(message.contains("check your inbox"));
    }

    #[test]
    fn test_error_conversion_from_sub_errors() {
        let db: CampusfeedError = DbError::Constraint("duplicate id".to_string()).into();
        assert!(matches!(db, CampusfeedError::Db(_)));

        let load: CampusfeedError = LoadError::Decode("missing user_id".to_string()).into();
        assert!(matches!(load, CampusfeedError::Load(_)));

        let auth: CampusfeedError = AuthError::Network("timeout".to_string()).into();
        assert!(matches!(auth, CampusfeedError::Auth(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_err() -> Result<()> {
            Err(CampusfeedError::InvalidInput("test".to_string()))
        }

        assert!(returns_err().is_err());
    }
}

use thiserror::Error;

pub const UNAUTHORIZED: &str = "Error: account unauthorized, please provide a valid API key.";
pub const DATABASE_NOT_SET: &str = "Error: database not set";
pub const INVALID_FILE_TYPE: &str = "Error: invalid file type";

#[derive(Error, Debug)]
pub enum Error {
    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    #[error("remote request failed: {0}")]
    Remote(String),

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The text shown to the user at the command boundary.
    ///
    /// Remote and parse failures collapse into the "database not set" message;
    /// the underlying detail is only logged.
    pub fn user_message(&self) -> String {
        match self {
            Error::Auth(_) => UNAUTHORIZED.to_string(),
            Error::NoDatabaseSelected | Error::Remote(_) | Error::Parse(_) => {
                DATABASE_NOT_SET.to_string()
            }
            Error::InvalidFileType(_) => INVALID_FILE_TYPE.to_string(),
            Error::InvalidName(name) => format!("Error: invalid name <{name}>"),
            Error::Io(e) => format!("Error: {e}"),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Remote(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_messages() {
        assert_eq!(Error::Auth("blank key".into()).user_message(), UNAUTHORIZED);
        assert_eq!(Error::NoDatabaseSelected.user_message(), DATABASE_NOT_SET);
        assert_eq!(Error::Remote("503".into()).user_message(), DATABASE_NOT_SET);
        assert_eq!(Error::Parse("bad".into()).user_message(), DATABASE_NOT_SET);
        assert_eq!(
            Error::InvalidFileType("a.txt".into()).user_message(),
            INVALID_FILE_TYPE
        );
    }

    #[test]
    fn test_invalid_name_message() {
        assert_eq!(
            Error::InvalidName("..".into()).user_message(),
            "Error: invalid name <..>"
        );
    }

    #[test]
    fn test_io_error_keeps_detail() {
        let e = Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only file system",
        ));
        assert_eq!(e.user_message(), "Error: read-only file system");
    }

    #[test]
    fn test_json_error_is_parse() {
        let e: Error = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(matches!(e, Error::Parse(_)));
    }
}

use crate::error::{Error, Result};

/// Interactive session: the authorized API client and the selected database.
///
/// Owned by the dispatcher for the lifetime of the shell. Only `authorize`
/// and `use` mutate it.
pub struct Session<C> {
    client: Option<C>,
    database: Option<String>,
}

impl<C> Default for Session<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Session<C> {
    pub fn new() -> Self {
        Self {
            client: None,
            database: None,
        }
    }

    /// Session pre-populated from a stored credential.
    pub fn with_client(client: C) -> Self {
        Self {
            client: Some(client),
            database: None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_database_selected(&self) -> bool {
        self.database.is_some()
    }

    /// Replace the client. Any selected database belonged to the previous
    /// account and is dropped.
    pub fn set_client(&mut self, client: C) {
        self.client = Some(client);
        self.database = None;
    }

    pub fn set_database(&mut self, name: impl Into<String>) {
        self.database = Some(name.into());
    }

    pub fn client(&self) -> Option<&C> {
        self.client.as_ref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn require_client(&self) -> Result<&C> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::Auth("no API key configured".into()))
    }

    /// Client and database together, for data operations.
    pub fn require_database(&self) -> Result<(&C, &str)> {
        let client = self.require_client()?;
        let db = self.database().ok_or(Error::NoDatabaseSelected)?;
        Ok((client, db))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session() {
        let s: Session<()> = Session::new();
        assert!(!s.is_authorized());
        assert!(!s.is_database_selected());
        assert!(matches!(s.require_client(), Err(Error::Auth(_))));
    }

    #[test]
    fn test_database_requires_client_first() {
        let mut s: Session<()> = Session::new();
        s.set_database("app");
        assert!(matches!(s.require_database(), Err(Error::Auth(_))));
    }

    #[test]
    fn test_require_database() {
        let mut s = Session::with_client(7u8);
        assert!(matches!(s.require_database(), Err(Error::NoDatabaseSelected)));
        s.set_database("app");
        let (client, db) = s.require_database().unwrap();
        assert_eq!((*client, db), (7, "app"));
    }

    #[test]
    fn test_set_client_clears_database() {
        let mut s = Session::with_client(1u8);
        s.set_database("app");
        s.set_client(2u8);
        assert_eq!(s.client(), Some(&2));
        assert_eq!(s.database(), None);
    }
}

use serde_json::Value;

use crate::admin::AdminCommand;
use crate::error::Result;
use crate::request::{DeleteRequest, FindRequest, InsertRequest, UpdateRequest};

/// What the remote API answered: either the expected payload or an
/// informational message in its place.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Message(String),
}

/// The remote document-database API, as seen by the dispatcher.
///
/// Every call is a single request/response round trip; there is no local
/// caching or retry.
#[allow(async_fn_in_trait)]
pub trait DataApi {
    async fn list_databases(&self) -> Result<Vec<String>>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;

    async fn list_documents(&self, request: &FindRequest) -> Result<Outcome<Value>>;

    /// Returns the number of documents inserted.
    async fn insert_documents(&self, request: &InsertRequest) -> Result<u64>;

    /// Returns the number of documents updated.
    async fn update_documents(&self, request: &UpdateRequest) -> Result<u64>;

    /// Returns the number of documents removed.
    async fn delete_documents(&self, request: &DeleteRequest) -> Result<Outcome<u64>>;

    async fn run_command(&self, database: &str, command: &AdminCommand) -> Result<Outcome<Value>>;
}

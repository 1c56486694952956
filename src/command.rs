use serde_json::Value;

use crate::request::{DeleteOptions, FindOptions, UpdateOptions};

/// A top-level shell command with its arguments already split and typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Authorize {
        key: String,
    },
    Use {
        database: String,
    },
    ShowDatabases,
    ShowCollections,
    Find {
        collection: String,
        options: FindOptions,
    },
    Insert {
        collection: String,
        file: String,
    },
    Update {
        collection: String,
        /// JSON update document, parsed by the dispatcher.
        data: String,
        options: UpdateOptions,
    },
    Delete {
        collection: String,
        options: DeleteOptions,
    },
}

/// What a command produced, ready for the front end to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// One entry per line, in the given order.
    Lines(Vec<String>),
    /// Documents or a command result.
    Json(Value),
    Message(String),
    /// A failure, already turned into its user-facing text.
    Failure(String),
}

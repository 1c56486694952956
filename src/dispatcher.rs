use serde_json::{Value, json};
use tracing::{debug, info};

use crate::admin::{ADMIN_COMMANDS, AdminCommand, AdminInput, INVALID_COMMAND};
use crate::client::{DataApi, Outcome};
use crate::command::{Command, Reply};
use crate::credential::{Credential, CredentialStore};
use crate::error::{Error, Result};
use crate::request::{
    DeleteOptions, DeleteRequest, FindOptions, FindRequest, InsertRequest, UpdateOptions,
    UpdateRequest, check_name,
};
use crate::session::Session;

pub const SYSTEM_INDEXES: &str = "system.indexes";

pub const QUOTE_HINT: &str = "Make sure to surround your payload data with quotes ('')";

pub const DELETE_WARNING: &str =
    "Warning: Are you sure that you want to permanently delete this data?";

pub const ABORT_NOTICE: &str = "Aborting task...";

pub const KEY_SET: &str = "A new Data API key has been set.";

/// Yes/no question asked before destructive operations. Anything but an
/// explicit yes counts as no.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Executes shell commands against the session.
///
/// `connect` builds an API client from a credential; it runs on `authorize`
/// and when a stored credential is restored at startup.
pub struct Dispatcher<C, F> {
    session: Session<C>,
    store: CredentialStore,
    connect: F,
}

impl<C, F> Dispatcher<C, F>
where
    C: DataApi,
    F: Fn(&Credential) -> Result<C>,
{
    /// Start a session, authorized if the store holds a usable key.
    pub fn open(store: CredentialStore, connect: F) -> Self {
        let session = match store.load() {
            Some(cred) => match connect(&cred) {
                Ok(client) => {
                    info!(path = %store.path().display(), "restored stored API key");
                    Session::with_client(client)
                }
                Err(e) => {
                    debug!(error = %e, "stored API key rejected");
                    Session::new()
                }
            },
            None => Session::new(),
        };
        Self {
            session,
            store,
            connect,
        }
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Run one command to completion. Never fails: errors come back as
    /// `Reply::Failure`.
    pub async fn dispatch(&mut self, command: Command, confirm: &mut impl Confirm) -> Reply {
        let result = match command {
            Command::Authorize { key } => self.authorize(&key),
            Command::Use { database } => self.use_database(&database).await,
            Command::ShowDatabases => self.show_databases().await,
            Command::ShowCollections => self.show_collections().await,
            Command::Find {
                collection,
                options,
            } => self.find(&collection, options).await,
            Command::Insert { collection, file } => self.insert(&collection, &file).await,
            Command::Update {
                collection,
                data,
                options,
            } => self.update(&collection, &data, options).await,
            Command::Delete {
                collection,
                options,
            } => self.delete(&collection, options, confirm).await,
        };
        result.unwrap_or_else(|e| {
            debug!(error = %e, "command failed");
            Reply::Failure(e.user_message())
        })
    }

    /// Handle one admin sub-mode line. `None` means the sub-mode should end.
    pub async fn admin(&self, line: &str) -> Option<Reply> {
        let input = match AdminInput::parse(line) {
            Ok(i) => i,
            Err(e) => {
                debug!(error = %e, "rejected admin input");
                return Some(Reply::Failure(INVALID_COMMAND.to_string()));
            }
        };
        let reply = match input {
            AdminInput::Exit => return None,
            AdminInput::Help => Reply::Message(format!(
                "\nSupported commands:\n\n{}\n",
                ADMIN_COMMANDS.join("\n")
            )),
            AdminInput::Command(cmd) => self.run_admin(&cmd).await.unwrap_or_else(|e| {
                debug!(error = %e, command = ?cmd.name(), "admin command failed");
                Reply::Failure(e.user_message())
            }),
        };
        Some(reply)
    }

    fn authorize(&mut self, key: &str) -> Result<Reply> {
        let credential = Credential::new(key.trim());
        let client = (self.connect)(&credential)?;
        self.session.set_client(client);
        info!("API key replaced");
        // The new key stays active even if it cannot be persisted.
        self.store.save(&credential)?;
        Ok(Reply::Message(KEY_SET.to_string()))
    }

    async fn use_database(&mut self, name: &str) -> Result<Reply> {
        let client = self.session.require_client()?;
        let databases = client.list_databases().await?;
        if !databases.iter().any(|db| db == name) {
            return Ok(Reply::Message(format!("database <{name}> does not exist")));
        }

        let ping = client
            .run_command(name, &AdminCommand::single("ping", json!(1)))
            .await;
        let server = match ping {
            Ok(Outcome::Done(result)) => result
                .get("serverUsed")
                .and_then(Value::as_str)
                .map(String::from),
            Ok(Outcome::Message(m)) => {
                debug!(message = %m, "ping answered with a message");
                None
            }
            Err(e) => {
                debug!(error = %e, "ping failed");
                None
            }
        };

        self.session.set_database(name);
        info!(database = name, "switched database");
        Ok(Reply::Message(match server {
            Some(s) => format!("switched to db {name} (Server: {s})"),
            None => format!("switched to db {name}"),
        }))
    }

    async fn show_databases(&self) -> Result<Reply> {
        let client = self.session.require_client()?;
        Ok(Reply::Lines(client.list_databases().await?))
    }

    async fn show_collections(&self) -> Result<Reply> {
        let (client, db) = self.session.require_database()?;
        let mut names = client.list_collections(db).await?;
        if let Some(i) = names.iter().position(|n| n == SYSTEM_INDEXES) {
            names.remove(i);
        }
        Ok(Reply::Lines(names))
    }

    async fn find(&self, collection: &str, options: FindOptions) -> Result<Reply> {
        let (client, db) = self.session.require_database()?;
        check_name(collection)?;
        let request = FindRequest {
            database: db.to_string(),
            collection: collection.to_string(),
            options,
        };
        Ok(match client.list_documents(&request).await? {
            Outcome::Done(docs) => Reply::Json(docs),
            Outcome::Message(m) => Reply::Message(format!("{m}\n{QUOTE_HINT}")),
        })
    }

    async fn insert(&self, collection: &str, file: &str) -> Result<Reply> {
        if !file.contains(".json") {
            return Err(Error::InvalidFileType(file.to_string()));
        }
        let (client, db) = self.session.require_database()?;
        check_name(collection)?;

        let text = tokio::fs::read_to_string(file).await?;
        let documents = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(docs)) => docs,
            Ok(_) => return Err(Error::InvalidFileType(format!("{file}: not a JSON array"))),
            Err(e) => return Err(Error::InvalidFileType(format!("{file}: {e}"))),
        };
        let request = InsertRequest {
            database: db.to_string(),
            collection: collection.to_string(),
            documents,
        };
        let n = client.insert_documents(&request).await?;
        Ok(Reply::Message(format!("{n} document(s) added")))
    }

    async fn update(&self, collection: &str, data: &str, options: UpdateOptions) -> Result<Reply> {
        let (client, db) = self.session.require_database()?;
        check_name(collection)?;
        let request = UpdateRequest {
            database: db.to_string(),
            collection: collection.to_string(),
            data: serde_json::from_str(data)?,
            options,
        };
        let n = client.update_documents(&request).await?;
        Ok(Reply::Message(format!("{n} document(s) updated")))
    }

    async fn delete(
        &self,
        collection: &str,
        options: DeleteOptions,
        confirm: &mut impl Confirm,
    ) -> Result<Reply> {
        let (client, db) = self.session.require_database()?;
        check_name(collection)?;
        if !confirm.confirm(DELETE_WARNING) {
            info!(collection, "delete aborted");
            return Ok(Reply::Message(ABORT_NOTICE.to_string()));
        }
        let request = DeleteRequest {
            database: db.to_string(),
            collection: collection.to_string(),
            options,
        };
        Ok(match client.delete_documents(&request).await? {
            Outcome::Done(n) => Reply::Message(format!("{n} document(s) deleted")),
            Outcome::Message(m) => Reply::Message(m),
        })
    }

    async fn run_admin(&self, command: &AdminCommand) -> Result<Reply> {
        let (client, db) = self.session.require_database()?;
        Ok(match client.run_command(db, command).await? {
            Outcome::Done(result) => Reply::Json(result),
            Outcome::Message(m) => Reply::Message(m),
        })
    }
}

pub mod admin;
pub mod client;
pub mod command;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod request;
pub mod session;

pub use admin::{AdminCommand, AdminInput};
pub use client::{DataApi, Outcome};
pub use command::{Command, Reply};
pub use credential::{Credential, CredentialStore};
pub use dispatcher::{Confirm, Dispatcher};
pub use error::{Error, Result};
pub use http::MlabClient;
pub use session::Session;

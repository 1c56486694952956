mod display;
mod parser;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use mlab_shell::http::{API_URL_ENV_VAR, DEFAULT_API_URL};
use mlab_shell::{Confirm, Credential, CredentialStore, Dispatcher, MlabClient, Reply, Result};

use parser::Line;

#[derive(Parser)]
#[command(name = "mlab", version, about = "Interactive shell for the mLab Data API")]
struct Cli {
    /// Credential file (default ~/.mlabrc.yml)
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Data API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Run a single shell line and exit
    #[arg(long)]
    eval: Option<String>,

    /// Output raw JSON (no pretty-printing)
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match cli.credentials.map(CredentialStore::new) {
        Some(store) => store,
        None => match CredentialStore::from_env() {
            Some(store) => store,
            None => {
                eprintln!("Error: cannot locate the home directory, pass --credentials <PATH>");
                std::process::exit(1);
            }
        },
    };
    let api_url = cli
        .api_url
        .or_else(|| std::env::var(API_URL_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    tracing::debug!(%api_url, path = %store.path().display(), "starting shell");

    let connect = move |credential: &Credential| MlabClient::new(credential, &api_url);
    let mut dispatcher = Dispatcher::open(store, connect);

    if let Some(line) = &cli.eval {
        run_one(&mut dispatcher, line, cli.json).await;
    } else {
        run_repl(&mut dispatcher, cli.json).await;
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Answers confirmation questions through the line editor. Default is no.
struct EditorConfirm<'a>(&'a mut DefaultEditor);

impl Confirm for EditorConfirm<'_> {
    fn confirm(&mut self, question: &str) -> bool {
        match self.0.readline(&format!("{question} (y/N) ")) {
            Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn new_editor() -> DefaultEditor {
    match DefaultEditor::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to initialize readline: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_one<F>(dispatcher: &mut Dispatcher<MlabClient, F>, line: &str, raw_json: bool)
where
    F: Fn(&Credential) -> Result<MlabClient>,
{
    let command = match parser::parse(line) {
        Ok(Line::Command(c)) => c,
        Ok(Line::Exit) => return,
        Ok(Line::Admin) => {
            eprintln!("Error: the db sub-mode needs an interactive shell");
            std::process::exit(1);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let mut rl = new_editor();
    let reply = dispatcher
        .dispatch(command, &mut EditorConfirm(&mut rl))
        .await;
    display::print_reply(&reply, raw_json);
    if matches!(reply, Reply::Failure(_)) {
        std::process::exit(1);
    }
}

async fn run_repl<F>(dispatcher: &mut Dispatcher<MlabClient, F>, raw_json: bool)
where
    F: Fn(&Credential) -> Result<MlabClient>,
{
    let mut rl = new_editor();

    display::print_banner(
        env!("CARGO_PKG_VERSION"),
        dispatcher.session().is_authorized(),
    );

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let _ = rl.add_history_entry(line);

        match parser::parse(line) {
            Ok(Line::Exit) => break,
            Ok(Line::Admin) => run_admin_mode(&mut rl, dispatcher, raw_json).await,
            Ok(Line::Command(command)) => {
                let reply = dispatcher
                    .dispatch(command, &mut EditorConfirm(&mut rl))
                    .await;
                display::print_reply(&reply, raw_json);
            }
            Err(e) => {
                let _ = e.print();
            }
        }
    }
}

/// Read database commands until `exit` or EOF, then hand back to the main loop.
async fn run_admin_mode<F>(
    rl: &mut DefaultEditor,
    dispatcher: &Dispatcher<MlabClient, F>,
    raw_json: bool,
) where
    F: Fn(&Credential) -> Result<MlabClient>,
{
    display::print_admin_intro();

    loop {
        let line = match rl.readline("~ db: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let _ = rl.add_history_entry(line);

        match dispatcher.admin(line).await {
            Some(reply) => display::print_reply(&reply, raw_json),
            None => break,
        }
    }
}

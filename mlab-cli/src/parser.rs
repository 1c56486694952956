use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};

use mlab_shell::Command;
use mlab_shell::request::{DeleteOptions, FindOptions, UpdateOptions};

/// One parsed line of top-level shell input.
#[derive(Debug, PartialEq)]
pub enum Line {
    Command(Command),
    /// Enter the admin sub-mode.
    Admin,
    Exit,
}

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Set a new mLab account key
    Authorize { key: String },

    /// Set current database
    Use { database: String },

    /// Show database names (`show dbs`, `show databases`) or collections in the current database
    Show {
        #[arg(value_enum)]
        target: ShowTarget,
    },

    /// Find documents in the specified collection
    Find {
        collection_name: String,

        /// Restrict results by the specified JSON query
        #[arg(short = 'q', long)]
        query: Option<String>,

        /// Return the result count for the query
        #[arg(short = 'c', long = "resultCount")]
        result_count: bool,

        /// Fields to include or exclude in each document (1 - include; 0 - exclude)
        #[arg(long = "setFields")]
        set_fields: Option<String>,

        /// Return a single document from the result set
        #[arg(short = 'o', long = "findOne")]
        find_one: bool,

        /// Sort order per field (1 - ascending; -1 - descending)
        #[arg(long = "sortOrder")]
        sort_order: Option<String>,

        /// Number of documents to skip
        #[arg(short = 's', long = "skipResults")]
        skip_results: Option<u64>,

        /// Number of documents to return
        #[arg(short = 'l', long)]
        limit: Option<u64>,
    },

    /// Create new document(s) from a .json file holding an array of documents
    Insert { collection_name: String, file: String },

    /// Update one or more documents in the specified collection
    Update {
        collection_name: String,

        /// JSON update document
        new_data: String,

        /// Only update document(s) matching the specified JSON query
        #[arg(short = 'q', long)]
        query: Option<String>,

        /// Update every matching document instead of only the first
        #[arg(short = 'a', long)]
        all: bool,

        /// Insert the document if none match the query
        #[arg(short = 'u', long)]
        upsert: bool,
    },

    /// Delete one or more documents in the specified collection
    Delete {
        collection_name: String,

        /// Only delete the document(s) matching the specified JSON query
        #[arg(short = 'q', long)]
        query: Option<String>,
    },

    /// Run MongoDB database commands against the current database
    Db,

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ShowTarget {
    #[value(alias = "databases")]
    Dbs,
    Collections,
}

/// Parse one input line. Help requests also come back as `Err`; `print()`
/// sends those to stdout.
pub fn parse(input: &str) -> Result<Line, clap::Error> {
    let words = split_words(input).map_err(|e| clap::Error::raw(ErrorKind::InvalidValue, e))?;
    let parsed = ShellLine::try_parse_from(words)?;
    Ok(match parsed.command {
        ShellCommand::Authorize { key } => Line::Command(Command::Authorize { key }),
        ShellCommand::Use { database } => Line::Command(Command::Use { database }),
        ShellCommand::Show {
            target: ShowTarget::Dbs,
        } => Line::Command(Command::ShowDatabases),
        ShellCommand::Show {
            target: ShowTarget::Collections,
        } => Line::Command(Command::ShowCollections),
        ShellCommand::Find {
            collection_name,
            query,
            result_count,
            set_fields,
            find_one,
            sort_order,
            skip_results,
            limit,
        } => Line::Command(Command::Find {
            collection: collection_name,
            options: FindOptions {
                query,
                result_count,
                set_fields,
                find_one,
                sort_order,
                skip: skip_results,
                limit,
            },
        }),
        ShellCommand::Insert {
            collection_name,
            file,
        } => Line::Command(Command::Insert {
            collection: collection_name,
            file,
        }),
        ShellCommand::Update {
            collection_name,
            new_data,
            query,
            all,
            upsert,
        } => Line::Command(Command::Update {
            collection: collection_name,
            data: new_data,
            options: UpdateOptions {
                query,
                all_documents: all,
                upsert,
            },
        }),
        ShellCommand::Delete {
            collection_name,
            query,
        } => Line::Command(Command::Delete {
            collection: collection_name,
            options: DeleteOptions { query },
        }),
        ShellCommand::Db => Line::Admin,
        ShellCommand::Exit => Line::Exit,
    })
}

/// Split a line into words. Single quotes are literal, double quotes allow
/// backslash escapes, and a backslash outside quotes escapes the next char.
fn split_words(input: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".into()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err("unterminated double quote".into()),
                        },
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".into()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err("trailing backslash".into()),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(input: &str) -> Command {
        match parse(input).unwrap() {
            Line::Command(c) => c,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words(r#"find users -q '{"name": "Ann"}'"#).unwrap(),
            vec!["find", "users", "-q", r#"{"name": "Ann"}"#]
        );
        assert_eq!(
            split_words(r#"update c "{\"a\": 1}"  -a"#).unwrap(),
            vec!["update", "c", r#"{"a": 1}"#, "-a"]
        );
        assert_eq!(split_words(r"a\ b ''").unwrap(), vec!["a b", ""]);
        assert!(split_words("find 'oops").is_err());
        assert!(split_words("find \"oops").is_err());
    }

    #[test]
    fn test_authorize_and_use() {
        assert_eq!(
            command("authorize abc123"),
            Command::Authorize {
                key: "abc123".into()
            }
        );
        assert_eq!(
            command("use app"),
            Command::Use {
                database: "app".into()
            }
        );
    }

    #[test]
    fn test_show_aliases() {
        assert_eq!(command("show dbs"), Command::ShowDatabases);
        assert_eq!(command("show databases"), Command::ShowDatabases);
        assert_eq!(command("show collections"), Command::ShowCollections);
        assert!(parse("show tables").is_err());
    }

    #[test]
    fn test_find_defaults() {
        assert_eq!(
            command("find users"),
            Command::Find {
                collection: "users".into(),
                options: FindOptions::default(),
            }
        );
    }

    #[test]
    fn test_find_all_flags() {
        let cmd = command(
            r#"find users -q '{"age":{"$gt":30}}' -c --setFields '{"name":1}' -o --sortOrder '{"age":-1}' -s 10 -l 5"#,
        );
        assert_eq!(
            cmd,
            Command::Find {
                collection: "users".into(),
                options: FindOptions {
                    query: Some(r#"{"age":{"$gt":30}}"#.into()),
                    result_count: true,
                    set_fields: Some(r#"{"name":1}"#.into()),
                    find_one: true,
                    sort_order: Some(r#"{"age":-1}"#.into()),
                    skip: Some(10),
                    limit: Some(5),
                },
            }
        );
    }

    #[test]
    fn test_find_long_flags() {
        let cmd = command("find users --query {} --resultCount --findOne --skipResults 1 --limit 2");
        match cmd {
            Command::Find { options, .. } => {
                assert_eq!(options.query.as_deref(), Some("{}"));
                assert!(options.result_count && options.find_one);
                assert_eq!((options.skip, options.limit), (Some(1), Some(2)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            command("insert users ./docs.json"),
            Command::Insert {
                collection: "users".into(),
                file: "./docs.json".into()
            }
        );
        assert!(parse("insert users").is_err());
    }

    #[test]
    fn test_update() {
        assert_eq!(
            command(r#"update users '{"$set":{"a":1}}' -q '{"b":2}' -a -u"#),
            Command::Update {
                collection: "users".into(),
                data: r#"{"$set":{"a":1}}"#.into(),
                options: UpdateOptions {
                    query: Some(r#"{"b":2}"#.into()),
                    all_documents: true,
                    upsert: true,
                },
            }
        );
        match command(r#"update users '{}'"#) {
            Command::Update { options, .. } => assert_eq!(options, UpdateOptions::default()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_delete() {
        assert_eq!(
            command("delete users"),
            Command::Delete {
                collection: "users".into(),
                options: DeleteOptions::default()
            }
        );
        assert_eq!(
            command(r#"delete users -q '{"a":1}'"#),
            Command::Delete {
                collection: "users".into(),
                options: DeleteOptions {
                    query: Some(r#"{"a":1}"#.into())
                }
            }
        );
    }

    #[test]
    fn test_mode_and_exit() {
        assert_eq!(parse("db").unwrap(), Line::Admin);
        assert_eq!(parse("exit").unwrap(), Line::Exit);
        assert_eq!(parse("quit").unwrap(), Line::Exit);
    }

    #[test]
    fn test_help_is_display_error() {
        let err = parse("help").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("drop users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_non_numeric_limit() {
        assert!(parse("find users -l ten").is_err());
    }
}

use colored::Colorize;
use serde_json::Value;

use mlab_shell::Reply;

pub const AUTHORIZE_HINT: &str =
    "Type \"authorize\" and provide your API key to authorize your mLab account.";

/// Render a reply for the terminal, or `None` when there is nothing to show.
/// With `raw_json`, JSON replies are printed compact and uncolored.
pub fn format_reply(reply: &Reply, raw_json: bool) -> Option<String> {
    match reply {
        Reply::Lines(lines) if lines.is_empty() => None,
        Reply::Lines(lines) => Some(lines.join("\n")),
        Reply::Json(value) if raw_json => Some(value.to_string()),
        Reply::Json(value) => Some(format_value(value)),
        Reply::Message(text) => Some(text.clone()),
        Reply::Failure(text) => Some(text.red().to_string()),
    }
}

/// Print a reply; failures go to stderr.
pub fn print_reply(reply: &Reply, raw_json: bool) {
    let Some(text) = format_reply(reply, raw_json) else {
        return;
    };
    if matches!(reply, Reply::Failure(_)) {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Array(arr) if arr.is_empty() => "[]".dimmed().to_string(),
        Value::Null => "null".dimmed().to_string(),
        Value::Number(n) => n.to_string().cyan().to_string(),
        _ => pretty_json(value),
    }
}

fn pretty_json(value: &Value) -> String {
    let formatted = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    colorize_json(&formatted)
}

fn colorize_json(json_str: &str) -> String {
    let mut result = String::with_capacity(json_str.len() * 2);
    let mut in_key = false;
    let mut in_string = false;
    let mut is_key = true;
    let mut escape = false;
    let mut token = String::new();
    let mut containers: Vec<char> = Vec::new();

    for ch in json_str.chars() {
        if escape {
            token.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' && (in_key || in_string) {
            token.push(ch);
            escape = true;
            continue;
        }

        if ch == '"' {
            token.push('"');
            if in_key {
                result.push_str(&token.blue().bold().to_string());
                token.clear();
                in_key = false;
                is_key = false;
            } else if in_string {
                result.push_str(&token.green().to_string());
                token.clear();
                in_string = false;
            } else if is_key {
                in_key = true;
            } else {
                in_string = true;
            }
            continue;
        }

        if in_key || in_string {
            token.push(ch);
            continue;
        }

        match ch {
            ':' => {
                result.push_str(&":".dimmed().to_string());
                is_key = false;
            }
            ',' => {
                flush_primitive(&mut result, &mut token);
                result.push(',');
                is_key = containers.last() == Some(&'{');
            }
            '{' | '[' => {
                containers.push(ch);
                result.push(ch);
                is_key = ch == '{';
            }
            '}' | ']' => {
                flush_primitive(&mut result, &mut token);
                containers.pop();
                result.push(ch);
                is_key = false;
            }
            _ if ch.is_whitespace() => {
                flush_primitive(&mut result, &mut token);
                result.push(ch);
            }
            _ => token.push(ch),
        }
    }

    flush_primitive(&mut result, &mut token);
    result
}

fn flush_primitive(result: &mut String, token: &mut String) {
    if !token.is_empty() {
        result.push_str(&colorize_primitive(token));
        token.clear();
    }
}

fn colorize_primitive(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed {
        "true" | "false" => trimmed.yellow().to_string(),
        "null" => trimmed.dimmed().to_string(),
        _ if trimmed.parse::<f64>().is_ok() => trimmed.cyan().to_string(),
        _ => s.to_string(),
    }
}

pub fn print_banner(version: &str, authorized: bool) {
    println!("{} {}", "mLab CLI version:".green(), version.white().bold());
    if !authorized {
        println!("{}", AUTHORIZE_HINT.dimmed());
    }
    println!();
}

pub const ADMIN_INTRO: &str = "You can now directly enter arbitrary MongoDB commands. To exit, type `exit`. To see the full list of supported commands, type `help`.";

pub fn print_admin_intro() {
    println!("{}", ADMIN_INTRO.dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_lines() {
        plain();
        let reply = Reply::Lines(vec!["app".into(), "logs".into()]);
        assert_eq!(format_reply(&reply, false).as_deref(), Some("app\nlogs"));
        assert_eq!(format_reply(&Reply::Lines(vec![]), false), None);
    }

    #[test]
    fn test_raw_json_is_compact() {
        let reply = Reply::Json(json!([{"a": 1}]));
        assert_eq!(format_reply(&reply, true).as_deref(), Some(r#"[{"a":1}]"#));
    }

    #[test]
    fn test_pretty_json_keeps_layout() {
        plain();
        let value = json!({"name": "Ann", "tags": ["x", "y"], "n": 2, "ok": true});
        let reply = Reply::Json(value.clone());
        assert_eq!(
            format_reply(&reply, false).unwrap(),
            serde_json::to_string_pretty(&value).unwrap()
        );
    }

    #[test]
    fn test_messages_pass_through() {
        plain();
        assert_eq!(
            format_reply(&Reply::Message("3 document(s) added".into()), false).as_deref(),
            Some("3 document(s) added")
        );
        assert_eq!(
            format_reply(&Reply::Failure("Error: database not set".into()), false).as_deref(),
            Some("Error: database not set")
        );
    }

    #[test]
    fn test_admin_intro_names_exit_and_help() {
        assert_eq!(
            ADMIN_INTRO,
            "You can now directly enter arbitrary MongoDB commands. To exit, type `exit`. \
             To see the full list of supported commands, type `help`."
        );
    }
}

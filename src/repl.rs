// Line-oriented front end for a query session. Everything interesting lives in
// `session`; this module only parses commands and prints the message history.

use std::fmt::Write as _;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::api::QueryBackend;
use crate::session::models::QueryResult;
use crate::session::store::{AssistantPayload, Message, Payload};
use crate::session::{QuerySessionManager, SessionError};

const HELP: &str = "\
Type a question in Malay to translate it into SQL.
  /run [sql]        execute the latest SQL (or the given statement)
  /feedback [sql]   confirm the latest SQL, or send a corrected statement
  /schema <file>    upload a JSON table schema
  /history          show the whole conversation
  /help             show this help
  /quit             exit";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Query(&'a str),
    Run(Option<&'a str>),
    Feedback(Option<&'a str>),
    Schema(&'a str),
    History,
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Query(line);
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        match name {
            "run" => Command::Run(arg),
            "feedback" => Command::Feedback(arg),
            "schema" => arg.map(Command::Schema).unwrap_or(Command::Unknown(line)),
            "history" => Command::History,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line),
        }
    }
}

pub fn render_result(out: &mut String, result: &QueryResult) {
    if !result.english_translation.is_empty() {
        let _ = writeln!(out, "  Translation: {}", result.english_translation);
    }
    let _ = writeln!(out, "  SQL: {}", result.sql_query);
    if !result.relevant_columns.is_empty() {
        let _ = writeln!(out, "  Relevant columns:");
        for (column, description) in &result.relevant_columns {
            let _ = writeln!(out, "    - {}: {}", column, description);
        }
    }
    if result.execution_time_seconds > 0.0 {
        let _ = writeln!(out, "  Translated in {:.2}s", result.execution_time_seconds);
    }

    if let Some(execution) = &result.execution_result {
        let _ = writeln!(
            out,
            "  {} {} ({} rows affected, {:.2}s)",
            execution.query_type,
            execution.status,
            execution.rows_affected,
            execution.execution_time_seconds
        );
        // Only queries return rows worth listing; writes just report the count above.
        if execution.is_select() {
            for row in &execution.rows {
                let _ = writeln!(out, "    {}", row);
            }
        }
    }
}

pub fn render_message(out: &mut String, message: &Message) {
    match &message.payload {
        Payload::User(text) => {
            let _ = writeln!(out, "you> {}", text);
        }
        Payload::Assistant(AssistantPayload::Result(result)) => {
            let _ = writeln!(out, "sql>");
            render_result(out, result);
        }
        Payload::Assistant(AssistantPayload::Failure(failure)) => {
            let _ = writeln!(out, "sql>");
            render_result(out, &failure.degraded_result());
            if failure.missing_schema {
                let _ = writeln!(out, "  Upload a schema first with /schema <file>");
            }
        }
    }
}

async fn print(text: &str) {
    let mut stdout = tokio::io::stdout();
    let _ = stdout.write_all(text.as_bytes()).await;
    let _ = stdout.flush().await;
}

async fn print_last<B: QueryBackend>(session: &QuerySessionManager<B>) {
    if let Some(message) = session.messages().await.last() {
        let mut out = String::new();
        render_message(&mut out, message);
        print(&out).await;
    }
}

/// Drives a session from stdin until EOF or `/quit`.
pub async fn run<B: QueryBackend>(session: &QuerySessionManager<B>) -> std::io::Result<()> {
    print(&format!("{}\n\n", HELP)).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = Command::parse(&line);
        debug!("Command: {:?}", command);

        match command {
            Command::Query(text) => {
                if let Err(e) = session.submit_query(text).await {
                    print(&format!("! {}\n", e)).await;
                } else if !text.is_empty() {
                    print_last(session).await;
                }
            }
            Command::Run(sql) => {
                let sql = match sql {
                    Some(sql) => sql.to_string(),
                    None => match session.last_result().await {
                        Some(result) => result.sql_query,
                        None => {
                            print(&format!("! {}\n", SessionError::NoActiveResult)).await;
                            continue;
                        }
                    },
                };
                match session.execute_sql(&sql).await {
                    Ok(_) => print_last(session).await,
                    Err(e) => {
                        error!("Execution failed: {}", e);
                        print(&format!("! {}\n", e)).await;
                    }
                }
            }
            Command::Feedback(corrected) => match session.last_result().await {
                Some(original) => match session.submit_feedback(&original, corrected).await {
                    Ok(()) => print("Feedback sent. Terima kasih!\n").await,
                    Err(e) => print(&format!("! {}\n", e)).await,
                },
                None => print("! there is no query result to give feedback on\n").await,
            },
            Command::Schema(path) => match session.provision_schema_file(Path::new(path)).await {
                Ok(schema) => {
                    print(&format!(
                        "Schema for '{}' uploaded. You can now start querying in Malay.\n",
                        schema.table_name
                    ))
                    .await
                }
                Err(e) => print(&format!("! {}\n", e)).await,
            },
            Command::History => {
                let mut out = String::new();
                for message in session.messages().await {
                    render_message(&mut out, &message);
                }
                print(&out).await;
            }
            Command::Help => print(&format!("{}\n", HELP)).await,
            Command::Quit => break,
            Command::Unknown(text) => print(&format!("! unknown command: {}\n", text)).await,
        }
    }

    Ok(())
}

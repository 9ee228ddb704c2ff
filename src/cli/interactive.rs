//! Line commands served on stdin while the refresh loop runs

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::services::ProvenanceSession;

const HELP: &str = "commands: query <kind> <name|*>, dump, kinds, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Query { kind: String, name: String },
    Dump,
    Kinds,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `Ok(None)`
pub fn parse_line(line: &str) -> Result<Option<LineCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["query", kind, name] => LineCommand::Query {
            kind: (*kind).to_string(),
            name: (*name).to_string(),
        },
        ["query", ..] => return Err("usage: query <kind> <name|*>".to_string()),
        ["dump"] => LineCommand::Dump,
        ["kinds"] => LineCommand::Kinds,
        ["help"] => LineCommand::Help,
        ["quit"] | ["exit"] => LineCommand::Quit,
        [other, ..] => return Err(format!("unknown command '{}'; {}", other, HELP)),
    };
    Ok(Some(command))
}

/// Read commands from stdin until `quit` or end of input
pub async fn run_interactive(session: &ProvenanceSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        match command {
            LineCommand::Query { kind, name } => match session.query(&kind, &name) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("query failed: {}", e),
            },
            LineCommand::Dump => print!("{}", session.dump()),
            LineCommand::Kinds => {
                for kind in session.kinds() {
                    println!("{}", kind);
                }
            }
            LineCommand::Help => println!("{}", HELP),
            LineCommand::Quit => break,
        }
    }
    Ok(())
}

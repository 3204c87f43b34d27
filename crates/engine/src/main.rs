//! Terminal chat over a single form
//!
//! Usage: `convoform [schema.yaml]` (default `config/schemas/pizza_order.yaml`).
//! The first line starts the form; later lines are routed to it until the
//! action runs, the user leaves, or input ends.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use convoform_config::{init_tracing, load_settings, Settings};
use convoform_engine::{FormEngine, SessionContext, Turn, TurnOutcome};

const DEFAULT_SCHEMA: &str = "config/schemas/pizza_order.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("CONVOFORM_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // tracing is not up yet
            eprintln!("Warning: failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };
    init_tracing(&settings.observability);

    let engine = FormEngine::from_settings(&settings)?;
    let schema_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
    let schema = engine
        .load_schema(&schema_path)
        .with_context(|| format!("loading form schema {}", schema_path))?;
    tracing::info!(form = schema.key(), path = %schema_path, "Schema loaded");

    let mut session = SessionContext::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("[{}] {}", schema.key(), schema.description());

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let turn = Turn::new(line);
        let outcome = if session.active().is_none() {
            engine.start(&mut session, schema.key(), &turn).await?
        } else {
            engine.handle_turn(&mut session, &turn).await
        };

        match outcome {
            TurnOutcome::Reply(text) => println!("> {}", text),
            TurnOutcome::ActionCompleted { result, .. } => {
                println!("{}", result);
                break;
            }
            TurnOutcome::Exited { key } => {
                println!("> Leaving {}.", key);
                break;
            }
            TurnOutcome::NoReply | TurnOutcome::NoActiveForm => {}
        }
    }

    Ok(())
}

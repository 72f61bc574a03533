use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use chatstream_cite::dedup;
use chatstream_coordinator::{ScriptedTransport, StreamCoordinator, TurnOutcome};
use chatstream_core::config::{resolve_with_base, Config};
use chatstream_core::traits::EscapingRenderer;
use chatstream_core::types::{AnswerSegment, Message};
use tracing_subscriber::EnvFilter;

fn parse_args() -> (String, String) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <log.jsonl> [question]", prog);
        std::process::exit(1);
    }
    let log_path = args.remove(0);
    let question = if args.is_empty() { "replay".to_string() } else { args.join(" ") };
    (log_path, question)
}

fn print_answer(message: &Message) {
    let mut out = String::new();
    for segment in &message.segments {
        match segment {
            AnswerSegment::Text { html } => out.push_str(html),
            AnswerSegment::Citation { source_index, .. } => out.push_str(&format!("[{}]", source_index + 1)),
        }
    }
    if out.is_empty() {
        out.clone_from(&message.content);
    }
    println!("{out}");

    let sources = message.sources.clone().unwrap_or_default();
    let deduped = dedup(&sources);
    if deduped.filtered.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for (i, source) in deduped.filtered.iter().enumerate() {
        let title = source.title.as_deref().unwrap_or("(untitled)");
        match source.url.as_deref() {
            Some(url) => println!("[{}] {} <{}>", i + 1, title, url),
            None => println!("[{}] {}", i + 1, title),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let (log_path, question) = parse_args();

    let path = resolve_with_base(Path::new("."), &log_path);
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let transport = ScriptedTransport::from_jsonl(BufReader::new(file))?;
    tracing::info!(chunks = transport.len(), path = %path.display(), "replaying patch log");

    let coordinator = StreamCoordinator::new(transport, EscapingRenderer, &settings);
    match coordinator.send_message(&question).await? {
        TurnOutcome::Completed { message: Some(message), skipped_ops } => {
            if skipped_ops > 0 {
                tracing::warn!(skipped_ops, "some patch ops could not be applied");
            }
            print_answer(&message);
        }
        TurnOutcome::Completed { message: None, .. } => println!("(the log produced no answer text)"),
        TurnOutcome::Ignored => println!("(question ignored)"),
    }
    Ok(())
}

//! Command-line entry points and the interactive console loops.
//!
//! Every loop reads from any `AsyncBufRead` and writes to any `Write`, so
//! the same code drives a terminal session and a scripted test.

use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::errors::AppError;
use crate::models::{BookingKind, ConversationSession};
use crate::services::documents::{self, DocumentIndex};
use crate::services::hybrid::{AnswerSource, HybridQa};
use crate::state::AppState;

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];
const BACK_WORDS: [&str; 3] = ["back", "exit", "quit"];

#[derive(Debug, Parser)]
#[command(
    name = "frontdesk",
    version,
    about = "Booking assistant for call requests and appointments, with document Q&A",
    after_help = "Examples:\n  frontdesk\n  frontdesk book\n  frontdesk records --limit 5\n  frontdesk ask handbook.pdf"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Book a call request or an appointment")]
    Book,
    #[command(about = "Show the most recent call requests and appointments")]
    Records {
        #[arg(
            long,
            default_value_t = 10,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Rows to show per table"
        )]
        limit: u32,
    },
    #[command(about = "Ask questions about a PDF or text document")]
    Ask {
        #[arg(help = "Path to the document")]
        document: PathBuf,
    },
}

/// Line-oriented terminal: prompts go out, trimmed lines come back.
pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn say(&mut self, text: impl Display) -> std::io::Result<()> {
        writeln!(self.out, "{text}")
    }

    /// `None` once input is exhausted.
    async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }
}

pub async fn run<R, W>(
    state: &AppState,
    command: Option<Command>,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match command {
        None => menu(state, console).await,
        Some(Command::Book) => booking_flow(state, console).await,
        Some(Command::Records { limit }) => show_records(state, console, limit),
        Some(Command::Ask { document }) => {
            let mut loaded = None;
            document_flow(state, console, &mut loaded, Some(document.as_path())).await
        }
    }
}

/// Top-level menu routing free text to the booking and document flows.
pub async fn menu<R, W>(state: &AppState, console: &mut Console<R, W>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let rule = "=".repeat(60);
    console.say(format!("\n{rule}"))?;
    console.say("Welcome to the Assistant System!")?;
    console.say("You can request assistance with:")?;
    console.say("  - Appointments (say 'appointment' or 'book')")?;
    console.say("  - Call requests (say 'call' or 'phone')")?;
    console.say("  - Documents (say 'pdf' or 'document')")?;
    console.say("Type 'exit' to quit at any time")?;
    console.say(&rule)?;

    // Indexed once, then reused for every later visit to the document flow.
    let mut loaded: Option<DocumentIndex> = None;

    while let Some(line) = console.prompt("\nHow can I help you? ").await? {
        let choice = line.to_lowercase();
        if choice.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&choice.as_str()) {
            console.say("\nGoodbye! Have a great day!")?;
            break;
        }

        if choice.contains("appointment") || choice.contains("book") {
            console.say("\nStarting appointment booking system...")?;
            booking_flow(state, console).await?;
        } else if choice.contains("call") || choice.contains("phone") {
            console.say("\nStarting call request system...")?;
            booking_flow(state, console).await?;
        } else if choice.contains("pdf") || choice.contains("document") {
            console.say("\nStarting document assistance module...")?;
            document_flow(state, console, &mut loaded, None).await?;
        } else {
            console.say("I'm not sure what you need. Please specify if you want help with:")?;
            console.say("- Appointment booking")?;
            console.say("- Call request")?;
            console.say("- Document questions")?;
        }
    }
    Ok(())
}

pub async fn booking_flow<R, W>(
    state: &AppState,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let engine = state.dialogue_engine();
    let mut session = ConversationSession::new();

    console.say(engine.start_conversation())?;
    console.say("Type 'exit' at any time to return to the main menu.\n")?;

    while let Some(line) = console.prompt("You: ").await? {
        if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
            console.say("Returning to main menu...\n")?;
            break;
        }

        match engine.advance(&mut session, &line) {
            Ok(turn) => {
                console.say(format!("\nAssistant: {}", turn.reply))?;
                if turn.completed {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    state = session.state.as_str(),
                    "failed to save booking"
                );
                console.say(
                    "\nAssistant: Sorry, I couldn't save your booking just now. \
                     Type 'yes' to try again.",
                )?;
            }
        }
    }
    Ok(())
}

pub async fn document_flow<R, W>(
    state: &AppState,
    console: &mut Console<R, W>,
    loaded: &mut Option<DocumentIndex>,
    path: Option<&Path>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let qa = match state.hybrid_qa() {
        Ok(qa) => qa,
        Err(e) => {
            console.say(format!("{e}. Returning to main menu."))?;
            return Ok(());
        }
    };

    if loaded.is_none() {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match console.prompt("\nPlease provide the path to the document: ").await? {
                Some(raw) => PathBuf::from(raw),
                None => return Ok(()),
            },
        };
        match index_document(console, &path).await? {
            Some(index) => *loaded = Some(index),
            None => return Ok(()),
        }
    }
    let Some(index) = loaded.as_ref() else {
        return Ok(());
    };

    console.say("\nAsk questions about the document (type 'back' to return to main menu)")?;
    while let Some(question) = console.prompt("\nDocument Question: ").await? {
        if BACK_WORDS.contains(&question.to_lowercase().as_str()) {
            console.say("Returning to main menu...\n")?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        answer_question(&qa, index, console, &question).await?;
        console.say(state.llm_quota.status())?;
        if qa.web().is_some() {
            console.say(state.web_quota.status())?;
        }
    }
    Ok(())
}

async fn index_document<R, W>(
    console: &mut Console<R, W>,
    path: &Path,
) -> anyhow::Result<Option<DocumentIndex>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if !path.exists() {
        console.say("Error: File not found. Returning to main menu.")?;
        return Ok(None);
    }

    console.say("Processing document...")?;
    let text = match documents::load_document(path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "document extraction failed");
            console.say(format!("Failed to extract text ({e}). Returning to main menu."))?;
            return Ok(None);
        }
    };

    let chunks = documents::chunk_text(
        &text,
        documents::DEFAULT_CHUNK_SIZE,
        documents::DEFAULT_OVERLAP,
    );
    match DocumentIndex::build(chunks) {
        Ok(index) => {
            console.say(format!("Document processed. {} chunks indexed.", index.len()))?;
            Ok(Some(index))
        }
        Err(e) => {
            console.say(format!("Failed to build index ({e}). Returning to main menu."))?;
            Ok(None)
        }
    }
}

async fn answer_question<R, W>(
    qa: &HybridQa,
    index: &DocumentIndex,
    console: &mut Console<R, W>,
    question: &str,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match qa.answer(index, question).await {
        Ok(answer) => {
            if answer.source != AnswerSource::Document {
                console.say("\nNot fully covered by the document. Searched the web.")?;
            }
            console.say(format!("\nAnswer: {}", answer.text))?;
        }
        Err(e) => match e.downcast_ref::<AppError>() {
            Some(quota) if quota.is_quota() => {
                console.say(format!("\nAnswer: {quota}. Please try again tomorrow."))?;
            }
            _ => {
                tracing::error!(error = %e, "failed to answer question");
                console.say(format!("\nAnswer: Sorry, I couldn't answer that ({e})."))?;
            }
        },
    }
    Ok(())
}

/// Print recent rows of both booking tables.
pub fn show_records<R, W>(
    state: &AppState,
    console: &mut Console<R, W>,
    limit: u32,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let store = state.booking_store();

    for (kind, title) in [
        (BookingKind::CallRequest, "Call Requests"),
        (BookingKind::Appointment, "Appointments"),
    ] {
        let rows = store.recent(kind, limit)?;
        let total = store.count(kind)?;

        console.say(format!("\n{title} ({} of {total}):", rows.len()))?;
        if rows.is_empty() {
            console.say("  (none)")?;
        }
        for row in rows {
            console.say(format!(
                "  #{:<4} {:<20} {:<16} {:<28} {}  (created {})",
                row.id,
                row.name,
                row.phone,
                row.email,
                row.date.format("%Y-%m-%d"),
                row.created_at.format("%Y-%m-%d %H:%M"),
            ))?;
        }
    }
    Ok(())
}

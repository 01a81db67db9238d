use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dispatch::io::read_document;
use dispatch::{
    generate_for_step, merge_sources, parse_raw_items_file, parse_submission_file,
    publish_document, AnthropicClient, AnthropicConfig, AssembledDocument, Assembler,
    DispatchConfig, DispatchError, FallbackGenerator, StepKey, StepMachine, Submission,
    WebhookConfig, WebhookPublisher,
};

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(author, version, about = "Weekly dispatch newsletter workflow", long_about = None)]
struct Cli {
    /// Directory holding session checkpoints
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Session id (one checkpoint file per session)
    #[arg(long, global = true)]
    session: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show completed steps and the current step
    Status,

    /// Aggregate candidate files and list them with tags and duplicate flags
    Candidates {
        /// Step the candidates are for
        #[arg(short, long)]
        step: StepKey,

        /// Scraper output files (JSON), merged in order
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,
    },

    /// Submit a step
    Submit {
        #[arg(short, long)]
        step: StepKey,

        /// Candidate files to select from
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Candidate indices to select (comma separated)
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,

        /// JSON file with fields and manual items
        #[arg(long)]
        payload: Option<PathBuf>,

        /// Field value as name=value (repeatable)
        #[arg(short, long, value_parser = parse_field)]
        field: Vec<(String, String)>,

        /// Skip an optional step
        #[arg(long)]
        skip: bool,
    },

    /// Draft text for a step from what the session holds
    Generate {
        #[arg(short, long)]
        step: StepKey,

        /// Use the deterministic generator even if an API key is set
        #[arg(long)]
        fallback: bool,
    },

    /// Render the session into a new HTML document
    Assemble {
        /// Output directory (overrides DISPATCH_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the HTML instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Push an assembled document to the publish endpoint
    Publish {
        /// Document written by `assemble`
        #[arg(short, long)]
        document: PathBuf,
    },

    /// Clear the session and delete its checkpoint
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = DispatchConfig::from_env()?;
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    if let Some(session) = cli.session {
        config.session_id = session;
    }

    match cli.command {
        Commands::Status => {
            let machine = open_session(&config)?;
            print_status(&machine)
        }
        Commands::Candidates { step, input } => {
            let mut machine = open_session(&config)?;
            list_candidates(&mut machine, step, &input)
        }
        Commands::Submit {
            step,
            input,
            select,
            payload,
            field,
            skip,
        } => {
            let mut machine = open_session(&config)?;
            submit_step(&mut machine, step, &input, &select, payload, field, skip)
        }
        Commands::Generate { step, fallback } => {
            let machine = open_session(&config)?;
            generate_text(&machine, step, fallback).await
        }
        Commands::Assemble {
            output_dir,
            dry_run,
        } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            let mut machine = open_session(&config)?;
            assemble_document(&mut machine, &config, dry_run)
        }
        Commands::Publish { document } => publish(&document).await,
        Commands::Reset => {
            let mut machine = config.machine()?;
            machine.reset();
            println!("Session {} reset", config.session_id);
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn parse_field(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got {:?}", s))
}

/// Resume the configured session, starting fresh when none is stored
fn open_session(config: &DispatchConfig) -> Result<StepMachine> {
    let mut machine = config.machine()?;
    match machine.resume() {
        Ok(_) => {}
        Err(DispatchError::NoCheckpoint { session_id }) => {
            info!("No checkpoint for session {}, starting a new one", session_id);
        }
        Err(e) => return Err(e).context("Failed to resume session"),
    }
    Ok(machine)
}

fn load_candidates(inputs: &[PathBuf]) -> Result<Vec<dispatch::RawItem>> {
    let mut sources = Vec::with_capacity(inputs.len());
    for path in inputs {
        let items = parse_raw_items_file(path)
            .with_context(|| format!("Failed to load candidates from {:?}", path))?;
        info!("Loaded {} items from {:?}", items.len(), path);
        sources.push(items);
    }
    Ok(merge_sources(sources))
}

fn print_status(machine: &StepMachine) -> Result<()> {
    let progress = machine.progress();
    println!("Session {} ({})", machine.store().session_id(), progress.region);
    println!("==================");
    for step in &progress.all_steps {
        let definition = machine.definition(*step);
        let marker = if progress.completed.contains(step) {
            if machine.state().is_skipped(*step) { "-" } else { "x" }
        } else if progress.current_step.step() == Some(*step) {
            ">"
        } else {
            " "
        };
        println!("[{}] {:<14} {}", marker, step.as_str(), definition.title);
    }
    println!();
    println!("Current step: {}", progress.current_step);
    Ok(())
}

fn list_candidates(machine: &mut StepMachine, step: StepKey, inputs: &[PathBuf]) -> Result<()> {
    let raw = load_candidates(inputs)?;
    let batch = machine.offer(step, raw);

    println!("Candidates for {} (batch {})", step, batch.batch_id);
    println!("------------------");
    for item in &batch.items {
        let tags = item.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        let date = item
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        print!("{:>3}  {}  {}", item.index, date, item.title);
        if !tags.is_empty() {
            print!("  [{}]", tags);
        }
        if let Some(earlier) = item.duplicate_of {
            print!("  (possible duplicate of {})", earlier);
        }
        println!();
    }
    Ok(())
}

fn submit_step(
    machine: &mut StepMachine,
    step: StepKey,
    inputs: &[PathBuf],
    select: &[usize],
    payload: Option<PathBuf>,
    fields: Vec<(String, String)>,
    skip: bool,
) -> Result<()> {
    let mut submission = match payload {
        Some(path) => parse_submission_file(&path)?,
        None if skip => Submission::skip(),
        None => Submission::new(),
    };
    for (name, value) in fields {
        submission = submission.with_field(name, Value::String(value));
    }

    if !select.is_empty() {
        if inputs.is_empty() {
            anyhow::bail!("--select needs --input candidate files");
        }
        let raw = load_candidates(inputs)?;
        let batch = machine.offer(step, raw);
        submission = submission.with_selections(batch.select_many(select));
    }

    let state = machine.submit(step, submission)?;
    println!("Step {} saved, current step: {}", step, state.current_step);
    Ok(())
}

async fn generate_text(machine: &StepMachine, step: StepKey, fallback: bool) -> Result<()> {
    let text = if fallback {
        generate_for_step(&FallbackGenerator, step, machine.state()).await?
    } else {
        match AnthropicConfig::from_env() {
            Ok(api_config) => {
                let client = AnthropicClient::new(api_config);
                generate_for_step(&client, step, machine.state()).await?
            }
            Err(e) => {
                info!("{:#}; using fallback generator", e);
                generate_for_step(&FallbackGenerator, step, machine.state()).await?
            }
        }
    };
    println!("{}", text);
    Ok(())
}

fn assemble_document(machine: &mut StepMachine, config: &DispatchConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        // Previewing does not need the assemble step itself
        let mut preview_config = config.assembler_config();
        preview_config.required_steps.retain(|step| *step != StepKey::Assemble);
        let rendered = Assembler::new(preview_config).preview(machine.state())?;
        println!("{}", rendered.html);
        return Ok(());
    }

    if machine.current_step().step() == Some(StepKey::Assemble) {
        machine.submit(StepKey::Assemble, Submission::new())?;
    }
    let assembler = Assembler::new(config.assembler_config());
    let document = assembler.assemble(machine.state())?;

    println!("Subject: {}", document.subject);
    println!("Preview: {}", document.preview_text);
    println!(
        "Wrote {} bytes to {}",
        document.byte_length,
        document.output_path.display()
    );
    Ok(())
}

async fn publish(path: &Path) -> Result<()> {
    let (html, metadata) = read_document(path)?;
    let document = AssembledDocument {
        byte_length: html.len(),
        html,
        subject: metadata.subject,
        preview_text: metadata.preview_text,
        output_path: path.to_path_buf(),
    };

    let publisher = WebhookPublisher::new(WebhookConfig::from_env()?);
    let receipt = publish_document(&publisher, &document).await?;
    println!("Published as {}", receipt.remote_id);
    Ok(())
}

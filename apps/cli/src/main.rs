use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mshield::kernel::config::load_shield_config;
use mshield::prelude::*;
use mshield_logger::Logger;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::info;

/// Phishing risk scoring and envelope encryption from the command line.
#[derive(Debug, Parser)]
#[command(name = "mshield", version, about)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML). `MSHIELD__SECTION__KEY` variables override it.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Disable console logging so stdout carries only command output.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score one message and print the verdict as JSON.
    Analyze(AnalyzeArgs),
    /// Generate key pairs and print their handles and public keys.
    Keys {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Generate a key, then encrypt and decrypt a message with it.
    Envelope {
        #[arg(long, default_value = "hello")]
        message: String,
    },
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(long)]
    sender: String,
    #[arg(long, default_value = "")]
    subject: String,
    /// Message body; read from stdin when omitted.
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    pretty: bool,
}

#[mshield_runtime::main(high_performance)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_shield_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;
    let mut logging = config.logging.clone();
    logging.console &= !cli.quiet;
    let mut log = Logger::from_config(&logging)?;

    let shield = Shield::from_config(config).context("Failed to initialize shield")?;
    let mut out = io::stdout().lock();

    let outcome = match cli.command {
        Command::Analyze(args) => analyze(&shield, args, &mut out).await,
        Command::Keys { count } => keys(&shield, count, &mut out).await,
        Command::Envelope { message } => envelope(&shield, message, &mut out).await,
    };
    log.flush();
    outcome
}

async fn analyze(shield: &Shield, args: AnalyzeArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let body = match args.body {
        Some(body) => body,
        None => {
            let mut body = String::new();
            io::stdin().read_to_string(&mut body).context("Failed to read message body from stdin")?;
            body
        }
    };

    let verdict = shield.analyze(&EmailMessage::new(args.sender, args.subject, body)).await;
    let json = if args.pretty { serde_json::to_string_pretty(&verdict) } else { serde_json::to_string(&verdict) }?;
    writeln!(out, "{json}")?;
    Ok(())
}

async fn keys(shield: &Shield, count: usize, out: &mut impl Write) -> anyhow::Result<()> {
    for _ in 0..count {
        let handle = shield.generate_key(KeyAlgorithm::X25519).await?;
        writeln!(out, "{}", serde_json::to_string(&handle)?)?;
        write!(out, "{}", shield.export_public_key(&handle.id)?)?;
    }
    info!(generated = count, "Keys generated");
    Ok(())
}

async fn envelope(shield: &Shield, message: String, out: &mut impl Write) -> anyhow::Result<()> {
    let key = shield.generate_key(KeyAlgorithm::X25519).await?;
    write!(out, "{}", shield.export_public_key(&key.id)?)?;

    let envelope = shield.encrypt(message, &key.id).await?;
    writeln!(out, "{}", envelope.to_json()?)?;

    let plaintext = shield.decrypt(&envelope, &key.id).await?;
    writeln!(out, "{}", String::from_utf8_lossy(&plaintext))?;
    Ok(())
}

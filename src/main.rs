use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use mogisend::{AttachmentMode, EmailMessage, SmtpConfig, SubmitError, parse_cc_list, parse_port};
use tracing_subscriber::EnvFilter;

/// Send a single email through an SMTP relay
#[derive(Parser, Debug)]
#[command(name = "mogisend")]
#[command(about = "Send a single email through an SMTP relay", long_about = None)]
#[command(version)]
struct Cli {
    /// SMTP server hostname or IP address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number
    #[arg(short, long, default_value = "25")]
    port: String,

    /// Sender address
    #[arg(short, long)]
    from: String,

    /// Recipient address
    #[arg(short, long)]
    to: String,

    /// Comma-separated CC addresses
    #[arg(long, default_value = "")]
    cc: String,

    #[arg(short, long, default_value = "")]
    subject: String,

    /// Message body
    #[arg(short, long, default_value = "")]
    body: String,

    /// Files to attach (repeatable)
    #[arg(short, long = "attach")]
    attachments: Vec<PathBuf>,

    /// Stream attachments raw in extra DATA cycles instead of skipping them
    #[arg(long)]
    raw_attachments: bool,

    /// Domain to announce in HELO (defaults to the server host)
    #[arg(long)]
    helo: Option<String>,

    /// Seconds to wait for each server reply
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Seconds to wait for the connection to be established
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Log every command and reply
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<(), SubmitError> {
    let port = parse_port(&cli.port)?;

    let mut config = SmtpConfig::new(cli.host, port);
    if let Some(helo) = cli.helo {
        config = config.with_helo_domain(helo);
    }
    if let Some(secs) = cli.read_timeout {
        config = config.with_read_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.connect_timeout {
        config = config.with_connect_timeout(Duration::from_secs(secs));
    }
    if cli.raw_attachments {
        config = config.with_attachment_mode(AttachmentMode::RawStream);
    }

    let message = EmailMessage::new(cli.from, cli.to)
        .with_cc(parse_cc_list(&cli.cc))
        .with_subject(cli.subject)
        .with_body(cli.body)
        .with_attachments(cli.attachments);

    mogisend::send_email(&config, &message)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => {
            println!("Email sent");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

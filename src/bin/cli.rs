use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use image_info_relay::{
    config, convert,
    relay::{DownstreamEvent, EventStream, Relay, RelayOutcome},
    schema::{InferenceRequest, SchemaValidator},
    upstream::HttpUpstreamClient,
};
use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "imgi-cli",
    about = "Utilities to streamline common tasks like converting file formats and extracting information from images"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert YAML to JSON
    Y2j {
        /// YAML input file
        input: PathBuf,
        /// JSON output file
        output: PathBuf,
    },
    /// Extract info from an image
    Imgi {
        /// Image file (jpeg, png, gif or webp)
        image: PathBuf,
        /// Prompt for the image
        prompt: String,
        /// Print the answer as it streams in
        #[arg(short, long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Y2j { input, output } => {
            convert::yaml_to_json(&input, &output).await?;
            println!(
                "Successfully converted {} to {}",
                input.display(),
                output.display()
            );
        }
        Command::Imgi {
            image,
            prompt,
            stream,
        } => extract_info(image, prompt, stream).await?,
    }

    Ok(())
}

async fn extract_info(image: PathBuf, prompt: String, stream: bool) -> Result<()> {
    let config = config::load().await?;
    let relay = Relay::new(
        Arc::new(SchemaValidator::new()?),
        Arc::new(HttpUpstreamClient::new(config.upstream.clone())?),
    )
    .with_idle_timeout(Duration::from_secs(config.upstream.idle_timeout_secs));

    println!("Extracting info from: {}\n", image.display());

    let request = InferenceRequest {
        id: Uuid::new_v4().to_string(),
        prompt,
        stream,
        blob: convert::load_image_data_uri(&image).await?,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match relay.handle_request(request, cancel).await? {
        RelayOutcome::Answered(response) => println!("Response: {}", response.text),
        RelayOutcome::Rejected(status) | RelayOutcome::Failed(status) => bail!(status.message),
        RelayOutcome::Streaming(events) => print_events(events, &mut std::io::stdout()).await?,
    }

    Ok(())
}

/// Writes deltas as they arrive; an error event fails the command once the stream ends.
async fn print_events(mut events: EventStream, out: &mut impl Write) -> Result<()> {
    let mut failure = None;
    while let Some(event) = events.next().await {
        match event {
            DownstreamEvent::Delta(text) => {
                write!(out, "{}", text)?;
                out.flush()?;
            }
            DownstreamEvent::Error(message) => failure = Some(message),
            DownstreamEvent::Done => writeln!(out, "\n--- Stream finished ---")?,
        }
    }

    match failure {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

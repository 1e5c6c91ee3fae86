use anyhow::{bail, Result};
use brochure_app::{build_service, log_config, server};
use brochure_common::observability::init_logging;
use brochure_config::{BrochureConfig, BrochureConfigLoader, DEFAULT_CONFIG_FILE};
use brochure_pipeline::{BrochureFrame, BrochureRequest};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brochure", version, about = "Generate company brochures from their websites")]
struct Cli {
    /// YAML config file; defaults to ./brochure.yaml when present.
    #[arg(long, global = true, env = "BROCHURE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate one brochure and print it to stdout.
    Generate {
        #[arg(long)]
        company: String,
        #[arg(long)]
        url: String,
        /// Print chunks as the model produces them.
        #[arg(long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Env always wins over the file.
    let loader = match &cli.config {
        Some(path) => BrochureConfigLoader::new().with_file(path),
        None => BrochureConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg: BrochureConfig = loader.load()?;

    let log_path = init_logging(log_config(&cfg))?;
    tracing::debug!(log = %log_path.display(), "logging initialised");

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                cfg.server.host = host;
            }
            if let Some(port) = port {
                cfg.server.port = port;
            }
            let service = build_service(&cfg)?;
            let app = server::router(service, &cfg.server.cors_origins)?;
            server::serve(app, &cfg.server.bind_addr()).await
        }
        Command::Generate {
            company,
            url,
            stream,
        } => {
            let service = build_service(&cfg)?;
            let request = BrochureRequest {
                company_name: company,
                url,
            };
            if !stream {
                println!("{}", service.generate_brochure(&request).await?);
                return Ok(());
            }

            let mut frames = service.generate_brochure_stream(&request).await?;
            let mut stdout = std::io::stdout();
            while let Some(frame) = frames.next().await {
                match frame {
                    BrochureFrame::Content(text) => {
                        stdout.write_all(text.as_bytes())?;
                        stdout.flush()?;
                    }
                    BrochureFrame::Error(message) => {
                        writeln!(stdout)?;
                        bail!(message);
                    }
                    BrochureFrame::Done => writeln!(stdout)?,
                }
            }
            Ok(())
        }
    }
}

//! `upscale`: enhance page images from the command line.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use upscaler_client::{
    verify_access_code, Archive, AuthMode, ClientConfig, ExportError, ExportFormat, Page, PageImage,
    PageProcessor, PageStatus, ARCHIVE_RETENTION_DAYS, DEFAULT_SERVER_URL,
};
use upscaler_types::models::ImageSize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enhance page images one after another
    Run {
        /// Page images, processed in the given order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for enhanced pages
        #[arg(long, short)]
        out: PathBuf,
        /// Output resolution
        #[arg(long, default_value = "2K")]
        resolution: ImageSize,
        /// Personal Gemini API key (direct mode)
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        key: Option<String>,
        /// Access code (gateway mode, takes precedence over --key)
        #[arg(long, env = "UPSCALER_ACCESS_CODE", hide_env_values = true)]
        code: Option<String>,
        /// Gateway base URL
        #[arg(long, env = "UPSCALER_SERVER", default_value = DEFAULT_SERVER_URL)]
        server: String,
        /// Also bundle the results (zip, pdf, pptx; comma-separated)
        #[arg(long, value_delimiter = ',')]
        export: Vec<ExportFormat>,
        /// Do not copy results into the local archive
        #[arg(long)]
        no_archive: bool,
        #[arg(long, env = "UPSCALER_ARCHIVE_DIR")]
        archive_dir: Option<PathBuf>,
    },
    /// Check an access code without spending quota
    Verify {
        #[arg(long, env = "UPSCALER_ACCESS_CODE", hide_env_values = true)]
        code: String,
        #[arg(long, env = "UPSCALER_SERVER", default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
    /// Inspect the local archive
    Archive {
        #[command(subcommand)]
        action: ArchiveAction,
        #[arg(long, env = "UPSCALER_ARCHIVE_DIR")]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ArchiveAction {
    /// List archived images, newest first
    List,
    /// Drop entries past the retention window
    Prune,
    /// Delete entries by id
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Delete every entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { inputs, out, resolution, key, code, server, export, no_archive, archive_dir } => {
            let config = ClientConfig { server_url: server, image_size: resolution, ..ClientConfig::default() };
            let mode = AuthMode::resolve(key, code)?;
            let archive = if no_archive {
                None
            } else {
                Some(Archive::open(archive_dir.unwrap_or_else(Archive::default_dir))?)
            };
            run(inputs, &out, config, &mode, &export, archive).await
        },
        Commands::Verify { code, server } => {
            let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
            let response = verify_access_code(&http, &server, &code).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.valid {
                bail!(response.error.unwrap_or_else(|| "access code rejected".to_string()));
            }
            Ok(())
        },
        Commands::Archive { action, dir } => {
            let mut archive = Archive::open(dir.unwrap_or_else(Archive::default_dir))?;
            match action {
                ArchiveAction::List => {
                    for entry in archive.list() {
                        let created = chrono::DateTime::from_timestamp_millis(entry.created_at)
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!(
                            "#{:<4} {}  {}x{}  {:>8.2} MB  {}",
                            entry.id,
                            created,
                            entry.width,
                            entry.height,
                            entry.size as f64 / 1024.0 / 1024.0,
                            entry.source_name.as_deref().unwrap_or(&entry.file_name)
                        );
                    }
                },
                ArchiveAction::Prune => {
                    let removed = archive.prune_older_than(
                        chrono::Utc::now().timestamp_millis(),
                        chrono::Duration::days(ARCHIVE_RETENTION_DAYS),
                    )?;
                    println!("Removed {removed} entries");
                },
                ArchiveAction::Delete { ids } => {
                    let removed = archive.delete(&ids)?;
                    println!("Deleted {removed} of {} entries", ids.len());
                },
                ArchiveAction::Clear => {
                    let removed = archive.clear()?;
                    println!("Cleared {removed} entries");
                },
            }
            Ok(())
        },
    }
}

async fn run(
    inputs: Vec<PathBuf>,
    out: &Path,
    config: ClientConfig,
    mode: &AuthMode,
    exports: &[ExportFormat],
    mut archive: Option<Archive>,
) -> Result<()> {
    let mut pages = Vec::with_capacity(inputs.len());
    for (index, path) in inputs.iter().enumerate() {
        let image = PageImage::load(path).with_context(|| format!("loading {}", path.display()))?;
        pages.push(Page::new(index, image));
    }
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let processor = PageProcessor::new(mode.upscaler(&config)?, config.image_size);
    let cancel = processor.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stopping after the current page...");
            cancel.cancel();
        }
    });

    let summary = processor.run(&mut pages).await;

    for page in &pages {
        let Some(result) = &page.result else { continue };
        let stem = Path::new(&page.source.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("page_{}", page.index + 1));
        let target = out.join(format!("{stem}_enhanced.{}", result.extension()));
        std::fs::write(&target, &result.bytes).with_context(|| format!("writing {}", target.display()))?;
        info!("Saved {}", target.display());

        if let Some(archive) = archive.as_mut() {
            archive.save(result, page.source.width, page.source.height, Some(&page.source.name))?;
        }
    }

    for format in exports {
        match format.render(&pages) {
            Ok(bytes) => {
                let target = out.join(format.file_name());
                std::fs::write(&target, bytes).with_context(|| format!("writing {}", target.display()))?;
                info!("Exported {}", target.display());
            },
            Err(ExportError::NothingToExport) => warn!("Skipping {} export: no completed pages", format),
            Err(e) => return Err(e).with_context(|| format!("exporting {format}")),
        }
    }

    for page in &pages {
        if let PageStatus::Error(message) = &page.status {
            println!("page {} ({}): {}", page.index + 1, page.source.name, message);
        }
    }
    if let Some(quota) = summary.quota {
        println!("Quota: {} of {} remaining", quota.remaining, quota.total);
    }
    println!(
        "{} completed, {} failed{}",
        summary.completed,
        summary.failed,
        if summary.stopped { ", stopped early" } else { "" }
    );

    if summary.failed > 0 && !summary.has_results() {
        bail!("no page could be enhanced");
    }
    Ok(())
}

//! File transfer commands.

use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use super::{Cli, parse_id};
use crate::output::{self, OutputFormat};
use folio_core::error::AppError;

/// Arguments for the upload command
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Path to the file to upload
    pub file: PathBuf,

    /// Entity whose primary folder receives the file
    #[arg(short, long)]
    pub entity: String,

    /// Override file name
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the download command
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Entity whose primary folder holds the file
    #[arg(short, long)]
    pub entity: String,

    /// File path relative to the entity folder
    pub path: String,

    /// Where to write the file (defaults to the file name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the upload command
pub async fn upload(args: &UploadArgs, cli: &Cli, format: OutputFormat) -> Result<(), AppError> {
    let entity_id = parse_id(&args.entity, "entity")?;
    if !args.file.is_file() {
        return Err(AppError::not_found(format!(
            "File not found: {}",
            args.file.display()
        )));
    }

    let file_name = args.name.clone().unwrap_or_else(|| {
        args.file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string()
    });
    let content = tokio::fs::read(&args.file).await?;

    println!("Uploading '{}' ({} bytes)...", file_name, content.len());
    let orchestrator = cli.orchestrator().await?;
    let file = orchestrator
        .upload_file(entity_id, &file_name, Bytes::from(content))
        .await?;

    output::print_success(&format!("Uploaded to {}", file.path));
    if format == OutputFormat::Json {
        output::print_item(&file, format);
    }
    Ok(())
}

/// Execute the download command
pub async fn download(args: &DownloadArgs, cli: &Cli) -> Result<(), AppError> {
    let entity_id = parse_id(&args.entity, "entity")?;
    let orchestrator = cli.orchestrator().await?;
    let fetched = orchestrator.fetch_file(entity_id, &args.path).await?;

    let target = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&fetched.file.name));
    let mut out = tokio::fs::File::create(&target).await?;
    let mut stream = fetched.stream;
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;

    output::print_success(&format!("Wrote {written} bytes to {}", target.display()));
    Ok(())
}

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;

use entrevista_core::{
    FsObjectStore, HttpInferenceService, HttpVisionService, JsonRecordTable, Pipeline,
    PipelineConfig, RecordTable, SessionRecord, submit_recording,
};

#[derive(Parser)]
#[command(name = "entrevista")]
#[command(about = "Submit interview recordings, run the analysis pipeline and inspect results")]
struct Cli {
    /// Data directory holding uploaded objects and session records
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a recording and create its session record
    Submit {
        /// Path to the recorded interview video
        video: PathBuf,

        /// Owner email the record is filed under
        #[arg(short, long)]
        email: String,

        /// Recording duration in seconds
        #[arg(short, long, default_value_t = 30.0)]
        duration: f64,
    },

    /// Run the analysis pipeline for a submitted recording
    Process {
        /// Record id returned by submit
        record_id: String,

        /// Extension the recording was uploaded with
        #[arg(long, default_value = "mp4")]
        extension: String,

        /// Vision service base URL
        #[arg(long, default_value = "http://localhost:8181")]
        vision_url: String,

        /// Inference service base URL
        #[arg(long, default_value = "http://localhost:8282")]
        inference_url: String,

        /// Treat this deployment as decoder-less: conversion copies the
        /// source and visual analysis degrades to the neutral result
        #[arg(long)]
        no_decode: bool,
    },

    /// Print one session record
    Show { record_id: String },

    /// List session records for an owner email
    List {
        #[arg(short, long)]
        email: String,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn resolve_data_dir(cli_dir: Option<PathBuf>) -> PathBuf {
    cli_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("entrevista")
    })
}

fn print_record(record: &SessionRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("entrevista=info,entrevista_core=info")
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);
    let store = FsObjectStore::new(&data_dir);
    let table = JsonRecordTable::new(data_dir.join("records"));

    match cli.command {
        Command::Submit {
            video,
            email,
            duration,
        } => {
            let bytes = fs::read(&video).await?;
            let extension = video
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_else(|| "mp4".to_string());

            let pb = create_spinner("Submitting recording...");
            let (record, key) =
                submit_recording(&store, &table, &email, bytes, &extension, duration).await?;
            pb.finish_with_message(format!(
                "{} recording stored as {}",
                style("✓").green(),
                key
            ));

            println!(
                "Record id: {}",
                style(&record.record_id).cyan().bold()
            );
            println!(
                "Drop the speech-to-text result at transcription/{}.json before processing.",
                record.record_id
            );
        }

        Command::Process {
            record_id,
            extension,
            vision_url,
            inference_url,
            no_decode,
        } => {
            let inference = match HttpInferenceService::new(inference_url) {
                Ok(service) => service,
                Err(e) => {
                    eprintln!("{} {}", style("Error:").red().bold(), e);
                    std::process::exit(1);
                }
            };

            let mut config = PipelineConfig::default();
            config.decode_available = !no_decode;

            let pipeline = Pipeline::new(
                Arc::new(store),
                Arc::new(table),
                Arc::new(HttpVisionService::new(vision_url)),
                Arc::new(inference),
                config,
            );

            let pb = create_spinner("Analyzing session...");
            let source_key = format!("uploads/{}.{}", record_id, extension);
            match pipeline.run(&source_key).await {
                Ok(record) => {
                    pb.finish_with_message(format!(
                        "{} analysis fused into record {}",
                        style("✓").green(),
                        record.record_id
                    ));
                    print_record(&record)?;
                }
                Err(e) => {
                    pb.finish_and_clear();
                    eprintln!("{} {}", style("Error:").red().bold(), e);
                    std::process::exit(1);
                }
            }
        }

        Command::Show { record_id } => match table.get(&record_id).await? {
            Some(record) => print_record(&record)?,
            None => {
                eprintln!(
                    "{} record {} not found",
                    style("Error:").red().bold(),
                    record_id
                );
                std::process::exit(1);
            }
        },

        Command::List { email } => {
            let records = table.find_by_owner(&email).await?;
            if records.is_empty() {
                println!("No records for {}", email);
            }
            for record in records {
                let status = if record.report.is_some() {
                    style("analyzed").green()
                } else {
                    style("pending").yellow()
                };
                println!(
                    "{}  {}  {}",
                    style(&record.record_id).cyan(),
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    status
                );
            }
        }
    }

    Ok(())
}

//! `fieldlog` - CLI for the field data collection client
//!
//! This binary submits records and reports, and lists or deletes what has
//! been submitted.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::warn;

use fieldlog::cli::{
    Cli, Command, ConfigCommand, DeleteCommand, ListCommand, OutputFormat, ReportCommand,
    StdinConfirm, SubmitCommand,
};
use fieldlog::listing::{format_date, ListedRecord};
use fieldlog::report::{ReportFile, ReportReceipt};
use fieldlog::store::http_client;
use fieldlog::{
    init_logging, open_media, open_store, CaptureFlow, Config, Confirm, DeleteOutcome,
    FixedLocation, Listing, Record, RecordId, ReportDraft, ReportUploader,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // `config validate` reports load errors itself
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        handle_validate(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Submit(cmd) => handle_submit(&config, cmd).await,
        Command::List(cmd) => handle_list(&config, &cmd).await,
        Command::Delete(cmd) => handle_delete(&config, &cmd).await,
        Command::Report(cmd) => handle_report(&config, cmd).await,
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

async fn handle_submit(config: &Config, cmd: SubmitCommand) -> anyhow::Result<()> {
    let client = http_client()?;
    let store = open_store(config, &client)?;
    let media = open_media(config, &client)?;
    let flow = CaptureFlow::new(store, media, config.placeholder());

    let provider = FixedLocation::from_option(cmd.fix().or_else(|| config.device_fix()));
    let position = flow.locate(&provider).await;

    let draft = cmd.load_draft().await?;

    let record = flow.submit(&draft, position).await?;
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Plain | OutputFormat::Table => {
            println!("Data submitted successfully!");
            print_record(&record, record.image.as_deref());
        }
    }
    Ok(())
}

async fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let client = http_client()?;
    let store = open_store(config, &client)?;
    let media = open_media(config, &client)?;

    let mut listing = Listing::new(media.base_url());
    listing.refresh(store.as_ref()).await?;
    listing.set_query(cmd.query.clone());

    let broken = if cmd.check_images {
        listing.broken_images(media.as_ref()).await
    } else {
        Vec::new()
    };

    let visible = listing.visible();
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&visible)?),
        OutputFormat::Table => print_table(&visible, &broken),
        OutputFormat::Plain => {
            for listed in &visible {
                let image = if broken.contains(&listed.record.id) {
                    Some("image not available")
                } else {
                    listed.image_url.as_deref()
                };
                print_record(&listed.record, image);
                println!();
            }
        }
    }
    if visible.is_empty() && cmd.format != OutputFormat::Json {
        println!("No records found.");
    }
    Ok(())
}

async fn handle_delete(config: &Config, cmd: &DeleteCommand) -> anyhow::Result<()> {
    let client = http_client()?;
    let store = open_store(config, &client)?;

    let always = |_: &str| true;
    let confirm: &dyn Confirm = if cmd.yes { &always } else { &StdinConfirm };

    let mut listing = Listing::default();
    let id = RecordId::new(cmd.id.clone());
    match listing.delete(store.as_ref(), &id, confirm).await? {
        DeleteOutcome::Deleted => println!("Deleted record {id}."),
        DeleteOutcome::Cancelled => println!("Cancelled."),
    }
    Ok(())
}

async fn handle_report(config: &Config, cmd: ReportCommand) -> anyhow::Result<()> {
    let file = match &cmd.file {
        Some(path) => Some(ReportFile::load(path).await?),
        None => None,
    };
    let draft = ReportDraft {
        name: cmd.name,
        email: cmd.email,
        project: cmd.project,
        date: cmd.date.unwrap_or_else(|| Local::now().date_naive()),
        file,
    };

    let uploader = ReportUploader::new(http_client()?, config.reports.endpoint.as_deref())?;
    match uploader.submit(&draft).await? {
        ReportReceipt::Uploaded => println!("Report uploaded."),
        ReportReceipt::Logged => {
            warn!("reports.endpoint is not set; the report was not sent anywhere");
            println!("Report recorded.");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { .. } => unreachable!("handled before loading"),
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}

fn print_record(record: &Record, image: Option<&str>) {
    println!("Id:          {}", record.id);
    println!("Name:        {}", record.name);
    println!("Email:       {}", record.email);
    println!("Designation: {}", record.designation);
    println!("Description: {}", record.description);
    println!("Latitude:    {}", record.latitude);
    println!("Longitude:   {}", record.longitude);
    println!("Date:        {}", format_date(record.created_at));
    if let Some(image) = image {
        println!("Image:       {image}");
    }
}

fn print_table(visible: &[&ListedRecord], broken: &[RecordId]) {
    println!(
        "{:<8} {:<24} {:<20} {:<20} {}",
        "ID", "NAME", "DESIGNATION", "DATE", "IMAGE"
    );
    for listed in visible {
        let record = &listed.record;
        let image = match &listed.image_url {
            _ if broken.contains(&record.id) => "not available",
            Some(_) => "yes",
            None => "-",
        };
        println!(
            "{:<8} {:<24} {:<20} {:<20} {}",
            record.id.as_str(),
            truncate(&record.name, 24),
            truncate(&record.designation, 20),
            format_date(record.created_at),
            image
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width - 1).collect();
        short.push('~');
        short
    }
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Store]");
    println!("  Backend:            {:?}", config.store.backend);
    println!("  URL:                {}", config.store.url.as_deref().unwrap_or("-"));
    println!("  Table:              {}", config.store.table);
    println!(
        "  Form endpoint:      {}",
        config.store.form_endpoint.as_deref().unwrap_or("-")
    );
    println!("  Database path:      {}", config.database_path().display());
    println!();
    println!("[Media]");
    println!("  Backend:            {:?}", config.media.backend);
    println!(
        "  Cloud name:         {}",
        config.media.cloud_name.as_deref().unwrap_or("-")
    );
    println!("  Media dir:          {}", config.media_dir().display());
    println!();
    println!("[Capture]");
    let placeholder = config.placeholder();
    println!(
        "  Placeholder:        {}, {}",
        placeholder.latitude, placeholder.longitude
    );
    match config.device_fix() {
        Some(fix) => println!("  Device fix:         {}, {}", fix.latitude, fix.longitude),
        None => println!("  Device fix:         none"),
    }
    println!();
    println!("[Reports]");
    println!(
        "  Endpoint:           {}",
        config.reports.endpoint.as_deref().unwrap_or("(log only)")
    );
}

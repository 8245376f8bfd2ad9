mod api_client;
mod config;
mod error;
mod flatten;
mod keywords;
mod pipeline;
mod query;
mod report_stream;
mod sheet_writer;
mod sheets;
mod runner;
mod walker;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use config::Config;
use error::Error;
use log::error;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Export,
}

#[derive(Subcommand)]
enum Export {
    /// Writes the responsive search ads served between two dates to the spreadsheet.
    Pull {
        #[arg(help = "Date should be in the form YYYY-MM-DD", value_parser = validate_date)]
        begin: NaiveDate,

        #[arg(help = "Date should be in the form YYYY-MM-DD", value_parser = validate_date)]
        end: NaiveDate,
    },
}

fn validate_date(s: &str) -> Result<NaiveDate, String> {
    let error_message = "Invalid date, expected YYYY-MM-DD";

    let parts = s
        .split("-")
        .map(|part| part.parse::<u16>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| error_message)?;

    match parts.as_slice() {
        &[year, month, day] if month <= 12 && day <= 31 => {
            Ok(
                NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .ok_or(error_message)?,
            )
        }
        _ => Err(error_message.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    env_logger::init();

    match args.command {
        Export::Pull { begin, end } => {
            match runner::export_ads_to_sheet(args.config, &begin, &end).await {
                Ok(summary) if summary.failure.is_none() => {}
                Ok(_) => std::process::exit(1),
                Err(err) => {
                    error!("failed to export ads data: {}", err);
                    std::process::exit(1);
                }
            }
        }
    };

    Ok(())
}

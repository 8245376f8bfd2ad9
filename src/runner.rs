use crate::api_client::GoogleAdsClient;
use crate::config::{Config, RunConfig};
use crate::error::Error;
use crate::sheets::{spreadsheet_id_from_url, GoogleSheetsClient};
use crate::walker::{walk_accounts, RunSummary};
use chrono::NaiveDate;
use log::info;

pub async fn export_ads_to_sheet(
    config: Config,
    begin: &NaiveDate,
    end: &NaiveDate,
) -> Result<RunSummary, Error> {
    let run_config = RunConfig::from_config(&config, *begin, *end)?;
    let spreadsheet_id = spreadsheet_id_from_url(&config.spreadsheet_url)?;

    let ads_client = GoogleAdsClient::new(&config).with_login_customer_id(&config.customer_id);
    let sheets_client = GoogleSheetsClient::new(&config);

    info!(
        "Starting export for account {} in the following timeframe: {} - {}",
        config.customer_id, run_config.begin, run_config.end
    );

    let summary = walk_accounts(
        &ads_client,
        &sheets_client,
        &spreadsheet_id,
        &config.customer_id,
        &run_config,
    )
    .await;

    info!(
        "Exported {} rows from {} accounts",
        summary.rows_written,
        summary.accounts.len()
    );

    Ok(summary)
}

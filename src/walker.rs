use crate::api_client::{Account, AdsApi};
use crate::config::RunConfig;
use crate::error::Error;
use crate::pipeline::collect_account_rows;
use crate::sheet_writer::{AppendOutcome, SheetWriter};
use crate::sheets::SheetsApi;
use log::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMode {
    /// The starting account is exported on its own.
    Single,
    /// The starting account is a manager, its sub-accounts are exported.
    Aggregator,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub accounts: Vec<String>,
    pub rows_written: usize,
    /// The error that ended the run early, if any.
    pub failure: Option<Error>,
}

/// An account whose manager flag cannot be read is treated as one without sub-accounts.
pub async fn detect_mode<A: AdsApi + ?Sized>(api: &A, customer_id: &str) -> AccountMode {
    match api.is_manager(customer_id).await {
        Ok(true) => AccountMode::Aggregator,
        Ok(false) => AccountMode::Single,
        Err(err) => {
            debug!("Account {} cannot list sub-accounts: {}", customer_id, err);
            AccountMode::Single
        }
    }
}

async fn export_account<A, S>(
    ads: &A,
    sheets: &S,
    spreadsheet_id: &str,
    account: &Account,
    config: &RunConfig,
    summary: &mut RunSummary,
) -> Result<(), Error>
where
    A: AdsApi + ?Sized,
    S: SheetsApi + ?Sized,
{
    info!("Processing account {} - {}", account.id, account.name);

    let writer = SheetWriter::initialize(
        sheets,
        spreadsheet_id,
        &account.id,
        config.max_headlines,
        config.max_descriptions,
    )
    .await?;

    let collected = collect_account_rows(ads, account, config).await?;
    if let AppendOutcome::Written { rows, .. } = writer.append_rows(&collected.rows).await? {
        summary.rows_written += rows;
    }
    summary.accounts.push(account.id.clone());

    Ok(())
}

async fn export_all<A, S>(
    ads: &A,
    sheets: &S,
    spreadsheet_id: &str,
    customer_id: &str,
    config: &RunConfig,
    summary: &mut RunSummary,
) -> Result<(), Error>
where
    A: AdsApi + ?Sized,
    S: SheetsApi + ?Sized,
{
    match detect_mode(ads, customer_id).await {
        AccountMode::Aggregator => {
            let accounts = ads
                .fetch_client_accounts(customer_id, &config.account_ids)
                .await?;
            info!("Manager account {} has {} accounts to export", customer_id, accounts.len());
            for account in &accounts {
                export_account(ads, sheets, spreadsheet_id, account, config, summary).await?;
            }
        }
        AccountMode::Single => {
            let account = ads.fetch_customer(customer_id).await?;
            export_account(ads, sheets, spreadsheet_id, &account, config, summary).await?;
        }
    }
    Ok(())
}

/// Exports the starting account, or each selected sub-account of it, one
/// after another.
///
/// The first error ends the run. It is logged and handed back in
/// [`RunSummary::failure`] together with whatever was exported before it.
pub async fn walk_accounts<A, S>(
    ads: &A,
    sheets: &S,
    spreadsheet_id: &str,
    customer_id: &str,
    config: &RunConfig,
) -> RunSummary
where
    A: AdsApi + ?Sized,
    S: SheetsApi + ?Sized,
{
    let mut summary = RunSummary::default();

    if let Err(err) = export_all(ads, sheets, spreadsheet_id, customer_id, config, &mut summary).await {
        error!("Unable to retrieve data from the account: {}", err);
        summary.failure = Some(err);
    }

    summary
}

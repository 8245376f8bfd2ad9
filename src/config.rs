use crate::error::Error;
use chrono::NaiveDate;
use clap::Args as ClapArgs;

const DEFAULT_ADS_API_URL: &str = "https://googleads.googleapis.com";
const DEFAULT_ADS_API_VERSION: &str = "v19";
const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com";

/// Max headlines a responsive search ad can carry.
pub const MAX_NUM_HEADLINES: usize = 15;
/// Max descriptions a responsive search ad can carry.
pub const MAX_NUM_DESCRIPTIONS: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(ClapArgs)]
pub struct Config {
    #[arg(long, default_value = DEFAULT_ADS_API_URL, env = "ADS_API_URL")]
    pub(crate) ads_api_url: String,

    #[arg(long, default_value = DEFAULT_ADS_API_VERSION, env = "ADS_API_VERSION")]
    pub(crate) ads_api_version: String,

    #[arg(long, env = "ADS_ACCESS_TOKEN")]
    pub(crate) ads_access_token: String,

    #[arg(long, env = "ADS_DEVELOPER_TOKEN")]
    pub(crate) developer_token: String,

    /// Account the run starts from. A manager account walks its sub-accounts.
    #[arg(long, env = "ADS_CUSTOMER_ID")]
    pub(crate) customer_id: String,

    #[arg(long, default_value = DEFAULT_SHEETS_API_URL, env = "SHEETS_API_URL")]
    pub(crate) sheets_api_url: String,

    #[arg(long, env = "SHEETS_ACCESS_TOKEN")]
    pub(crate) sheets_access_token: String,

    #[arg(long, env = "SPREADSHEET_URL")]
    pub(crate) spreadsheet_url: String,

    /// Only these sub-accounts are exported. Empty means all of them.
    #[arg(long, env = "ACCOUNT_IDS", value_delimiter = ',')]
    pub(crate) account_ids: Vec<String>,

    /// Only these campaigns are exported. Empty means all of them.
    #[arg(long, env = "CAMPAIGN_IDS", value_delimiter = ',')]
    pub(crate) campaign_ids: Vec<u64>,

    #[arg(long, default_value_t = MAX_NUM_HEADLINES, env = "MAX_HEADLINES")]
    pub(crate) max_headlines: usize,

    #[arg(long, default_value_t = MAX_NUM_DESCRIPTIONS, env = "MAX_DESCRIPTIONS")]
    pub(crate) max_descriptions: usize,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, env = "BATCH_SIZE")]
    pub(crate) batch_size: usize,
}

/// Immutable settings shared by every stage of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub account_ids: Vec<String>,
    pub campaign_ids: Vec<u64>,
    pub max_headlines: usize,
    pub max_descriptions: usize,
    pub batch_size: usize,
}

impl RunConfig {
    pub fn new(
        begin: NaiveDate,
        end: NaiveDate,
        account_ids: &[String],
        campaign_ids: &[u64],
        max_headlines: usize,
        max_descriptions: usize,
        batch_size: usize,
    ) -> Result<Self, Error> {
        if begin > end {
            return Err(Error::StartDateAfterEndDate {
                start_date: begin.to_string(),
                end_date: end.to_string(),
            });
        }

        if batch_size == 0 {
            return Err(Error::InvalidBatchSize(batch_size));
        }

        Ok(RunConfig {
            begin,
            end,
            account_ids: account_ids
                .iter()
                .map(|id| normalize_customer_id(id))
                .filter(|id| !id.is_empty())
                .collect(),
            campaign_ids: campaign_ids.to_vec(),
            max_headlines,
            max_descriptions,
            batch_size,
        })
    }

    pub fn from_config(config: &Config, begin: NaiveDate, end: NaiveDate) -> Result<Self, Error> {
        RunConfig::new(
            begin,
            end,
            &config.account_ids,
            &config.campaign_ids,
            config.max_headlines,
            config.max_descriptions,
            config.batch_size,
        )
    }

    /// Number of cells in every row this run emits.
    pub fn row_width(&self) -> usize {
        crate::flatten::FIXED_COLUMNS + self.max_headlines + self.max_descriptions
    }
}

/// Strips the dashes from ids written as `111-222-3333`.
pub fn normalize_customer_id(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_run_config_rejects_reversed_dates() {
        let result = RunConfig::new(date("2024-02-01"), date("2024-01-01"), &[], &[], 15, 4, 10);
        assert!(matches!(
            result.unwrap_err(),
            Error::StartDateAfterEndDate { start_date, end_date }
                if start_date == "2024-02-01" && end_date == "2024-01-01"
        ));
    }

    #[test]
    fn test_run_config_accepts_single_day() {
        let config = RunConfig::new(date("2024-01-01"), date("2024-01-01"), &[], &[], 15, 4, 10);
        assert!(config.is_ok());
    }

    #[test]
    fn test_run_config_rejects_zero_batch_size() {
        let result = RunConfig::new(date("2024-01-01"), date("2024-01-31"), &[], &[], 15, 4, 0);
        assert!(matches!(result.unwrap_err(), Error::InvalidBatchSize(0)));
    }

    #[test]
    fn test_run_config_normalizes_account_ids() {
        let ids = vec![
            "111-222-3333".to_string(),
            "4445556666".to_string(),
            " ".to_string(),
        ];
        let config =
            RunConfig::new(date("2024-01-01"), date("2024-01-31"), &ids, &[], 15, 4, 10).unwrap();
        assert_eq!(config.account_ids, vec!["1112223333", "4445556666"]);
    }

    #[test]
    fn test_row_width() {
        let config =
            RunConfig::new(date("2024-01-01"), date("2024-01-31"), &[], &[], 3, 2, 10).unwrap();
        assert_eq!(config.row_width(), 16);
    }
}

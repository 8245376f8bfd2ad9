use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The start date: '{start_date}' is greater than the end date: '{end_date}'")]
    StartDateAfterEndDate {
        start_date: String,
        end_date: String,
    },

    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    #[error("API request failed: {0}")]
    ApiFailure(#[from] reqwest::Error),

    #[error("API {endpoint} responded with status {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse URL: {0}")]
    UrlParsingFailed(#[from] url::ParseError),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Report row is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("'{url}' is not a spreadsheet URL or id")]
    InvalidSpreadsheetUrl { url: String },

    #[error("Inconsistent rows - cannot write to spreadsheet (row {row} has {found} cells, expected {expected})")]
    InconsistentRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{message}")]
    NoData { message: String },
}

use crate::config::Config;
use crate::error::Error;
use log::{debug, error};
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A named sheet (tab) inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub spreadsheet_id: String,
    pub title: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SheetsApi: Send + Sync + 'static {
    /// Returns the sheet with the given title, adding it when missing.
    async fn get_or_create_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<Sheet, Error>;

    /// Removes every value from the sheet.
    async fn clear(&self, sheet: &Sheet) -> Result<(), Error>;

    /// Writes `rows` in one call, the first of them at the 1-based `start_row`.
    async fn write_rows(
        &self,
        sheet: &Sheet,
        start_row: usize,
        rows: Vec<Vec<String>>,
    ) -> Result<(), Error>;

    /// 1-based index of the last non-empty row, 0 for an empty sheet.
    async fn last_populated_row(&self, sheet: &Sheet) -> Result<usize, Error>;
}

/// Extracts the spreadsheet id from a `https://docs.google.com/spreadsheets/d/<id>/edit`
/// style URL. A bare id is returned as is.
pub fn spreadsheet_id_from_url(spreadsheet_url: &str) -> Result<String, Error> {
    let invalid = || Error::InvalidSpreadsheetUrl {
        url: spreadsheet_url.to_string(),
    };
    let trimmed = spreadsheet_url.trim();

    match Url::parse(trimmed) {
        Ok(url) => {
            let mut segments = url.path_segments().ok_or_else(invalid)?;
            segments
                .by_ref()
                .find(|segment| *segment == "d")
                .ok_or_else(invalid)?;
            match segments.next() {
                Some(id) if !id.is_empty() => Ok(id.to_string()),
                _ => Err(invalid()),
            }
        }
        Err(url::ParseError::RelativeUrlWithoutBase)
            if !trimmed.is_empty()
                && trimmed
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            Ok(trimmed.to_string())
        }
        Err(_) => Err(invalid()),
    }
}

/// Spreadsheet column name of a 1-based column index: 1 -> A, 27 -> AA.
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 notation for a block of `width` columns and `height` rows starting at
/// column A of `start_row`.
pub fn a1_range(title: &str, start_row: usize, width: usize, height: usize) -> String {
    format!(
        "{}!A{}:{}{}",
        quote_title(title),
        start_row,
        column_letter(width.max(1)),
        start_row + height.max(1) - 1
    )
}

fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[derive(Deserialize, Default)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize, Default)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: &'a str,
    values: Vec<Vec<String>>,
}

#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GoogleSheetsClient {
    pub fn new(config: &Config) -> Self {
        GoogleSheetsClient {
            client: Client::new(),
            base_url: config.sheets_api_url.to_string(),
            token: config.sheets_access_token.to_string(),
        }
    }

    fn spreadsheet_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::UrlParsingFailed(url::ParseError::SetHostOnCannotBeABaseUrl))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, sheet: &Sheet, range: &str, suffix: &str) -> Result<Url, Error> {
        let last = format!("{}{}", range, suffix);
        self.spreadsheet_url(&[sheet.spreadsheet_id.as_str(), "values", last.as_str()])
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn send(&self, request: RequestBuilder, endpoint: &Url) -> Result<String, Error> {
        let resp = self.authorized(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Sheets request {} failed: {}", endpoint, status);
            return Err(Error::ApiStatus {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_or_create_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<Sheet, Error> {
        let mut url = self.spreadsheet_url(&[spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");

        let body = self.send(self.client.get(url.clone()), &url).await?;
        let metadata: SpreadsheetMetadata = serde_json::from_str(&body)?;
        let sheet = Sheet {
            spreadsheet_id: spreadsheet_id.to_string(),
            title: title.to_string(),
        };

        if metadata.sheets.iter().any(|entry| entry.properties.title == title) {
            return Ok(sheet);
        }

        debug!("Adding sheet '{}' to spreadsheet {}", title, spreadsheet_id);
        let method = format!("{}:batchUpdate", spreadsheet_id);
        let url = self.spreadsheet_url(&[method.as_str()])?;
        let request = self.client.post(url.clone()).json(&json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        }));
        self.send(request, &url).await?;

        Ok(sheet)
    }

    async fn clear(&self, sheet: &Sheet) -> Result<(), Error> {
        let url = self.values_url(sheet, &quote_title(&sheet.title), ":clear")?;
        self.send(self.client.post(url.clone()).json(&json!({})), &url)
            .await?;
        Ok(())
    }

    async fn write_rows(
        &self,
        sheet: &Sheet,
        start_row: usize,
        rows: Vec<Vec<String>>,
    ) -> Result<(), Error> {
        let width = rows.first().map(Vec::len).unwrap_or_default();
        let range = a1_range(&sheet.title, start_row, width, rows.len());
        let mut url = self.values_url(sheet, &range, "")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        let request = self.client.put(url.clone()).json(&ValueRangeBody {
            range: &range,
            major_dimension: "ROWS",
            values: rows,
        });
        self.send(request, &url).await?;
        Ok(())
    }

    async fn last_populated_row(&self, sheet: &Sheet) -> Result<usize, Error> {
        let range = format!("{}!A:A", quote_title(&sheet.title));
        let url = self.values_url(sheet, &range, "")?;
        let body = self.send(self.client.get(url.clone()), &url).await?;
        let values: ValueRange = serde_json::from_str(&body)?;
        Ok(values.values.len())
    }
}

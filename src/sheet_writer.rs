use crate::error::Error;
use crate::flatten::{header_row, OutputRow};
use crate::sheets::{Sheet, SheetsApi};
use log::{error, info};

/// What [`SheetWriter::append_rows`] did with the rows it was given.
#[derive(Debug)]
pub enum AppendOutcome {
    /// Nothing to write.
    Empty,
    /// The rows disagreed on their width, nothing was written. Carries the
    /// logged error.
    Rejected(Error),
    Written { start_row: usize, rows: usize },
}

/// Checks that every row has as many cells as the first one.
pub fn validate_rows(rows: &[OutputRow]) -> Result<usize, Error> {
    let expected = rows.first().map(OutputRow::len).unwrap_or_default();
    if expected == 0 {
        return Err(Error::InconsistentRows {
            row: 0,
            expected,
            found: 0,
        });
    }

    match rows.iter().position(|row| row.len() != expected) {
        Some(row) => Err(Error::InconsistentRows {
            row,
            expected,
            found: rows[row].len(),
        }),
        None => Ok(expected),
    }
}

/// Writes the rows of one account into its own sheet.
pub struct SheetWriter<'a, S: SheetsApi + ?Sized> {
    api: &'a S,
    sheet: Sheet,
}

impl<'a, S: SheetsApi + ?Sized> SheetWriter<'a, S> {
    /// Opens (or adds) the sheet named `title`, clears it and writes the header row.
    ///
    /// # Arguments
    /// * `api` - Spreadsheet API
    /// * `spreadsheet_id` - Spreadsheet holding the sheet
    /// * `title` - Sheet name, the account id
    /// * `max_headlines` - Number of headline columns
    /// * `max_descriptions` - Number of description columns
    ///
    /// # Returns
    /// A Result containing either the [`SheetWriter`] or an [`Error`]
    pub async fn initialize(
        api: &'a S,
        spreadsheet_id: &str,
        title: &str,
        max_headlines: usize,
        max_descriptions: usize,
    ) -> Result<Self, Error> {
        let sheet = api.get_or_create_sheet(spreadsheet_id, title).await?;
        api.clear(&sheet).await?;

        let header = header_row(max_headlines, max_descriptions);
        api.write_rows(&sheet, 1, vec![header.cells().to_vec()]).await?;

        Ok(SheetWriter { api, sheet })
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Appends `rows` below the last populated row in a single write.
    pub async fn append_rows(&self, rows: &[OutputRow]) -> Result<AppendOutcome, Error> {
        if rows.is_empty() {
            info!("No values to write to sheet '{}'", self.sheet.title);
            return Ok(AppendOutcome::Empty);
        }

        if let Err(err) = validate_rows(rows) {
            error!("{}", err);
            return Ok(AppendOutcome::Rejected(err));
        }

        let start_row = self.api.last_populated_row(&self.sheet).await? + 1;
        let values = rows.iter().map(|row| row.cells().to_vec()).collect();
        self.api.write_rows(&self.sheet, start_row, values).await?;

        info!(
            "Wrote {} rows to sheet '{}' starting at row {}",
            rows.len(),
            self.sheet.title,
            start_row
        );

        Ok(AppendOutcome::Written {
            start_row,
            rows: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MockSheetsApi;
    use mockall::predicate::eq;

    fn row(cells: &[&str]) -> OutputRow {
        OutputRow::from(cells.iter().map(|c| c.to_string()).collect::<Vec<_>>())
    }

    fn sheet() -> Sheet {
        Sheet {
            spreadsheet_id: "abc".to_string(),
            title: "1112223333".to_string(),
        }
    }

    fn writer(api: &MockSheetsApi) -> SheetWriter<'_, MockSheetsApi> {
        SheetWriter { api, sheet: sheet() }
    }

    #[test]
    fn test_validate_rows() {
        assert_eq!(validate_rows(&[row(&["a", "b"]), row(&["c", "d"])]).unwrap(), 2);
        assert!(matches!(
            validate_rows(&[row(&["a", "b"]), row(&["c"])]).unwrap_err(),
            Error::InconsistentRows { row: 1, expected: 2, found: 1 }
        ));
        assert!(matches!(
            validate_rows(&[row(&[])]).unwrap_err(),
            Error::InconsistentRows { row: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_initialize_writes_header() {
        let mut api = MockSheetsApi::new();
        api.expect_get_or_create_sheet()
            .withf(|spreadsheet_id, title| spreadsheet_id == "abc" && title == "1112223333")
            .times(1)
            .returning(|_, _| Ok(sheet()));
        api.expect_clear().with(eq(sheet())).times(1).returning(|_| Ok(()));
        api.expect_write_rows()
            .withf(|_, start_row, rows| {
                *start_row == 1
                    && rows.len() == 1
                    && rows[0].len() == 11 + 2 + 1
                    && rows[0][11] == "Headline 1"
                    && rows[0][13] == "Description 1"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let writer = SheetWriter::initialize(&api, "abc", "1112223333", 2, 1)
            .await
            .unwrap();
        assert_eq!(writer.sheet().title, "1112223333");
    }

    #[tokio::test]
    async fn test_append_empty_rows_writes_nothing() {
        let mut api = MockSheetsApi::new();
        api.expect_last_populated_row().times(0);
        api.expect_write_rows().times(0);

        let outcome = writer(&api).append_rows(&[]).await.unwrap();
        assert!(matches!(outcome, AppendOutcome::Empty));
    }

    #[tokio::test]
    async fn test_append_inconsistent_rows_writes_nothing() {
        let mut api = MockSheetsApi::new();
        api.expect_last_populated_row().times(0);
        api.expect_write_rows().times(0);

        let outcome = writer(&api)
            .append_rows(&[row(&["a", "b"]), row(&["c"])])
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AppendOutcome::Rejected(Error::InconsistentRows { row: 1, expected: 2, found: 1 })
        ));
    }

    #[tokio::test]
    async fn test_append_after_last_row() {
        let mut api = MockSheetsApi::new();
        api.expect_last_populated_row().times(1).returning(|_| Ok(4));
        api.expect_write_rows()
            .withf(|_, start_row, rows| *start_row == 5 && rows.len() == 2)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let outcome = writer(&api)
            .append_rows(&[row(&["a", "b"]), row(&["c", "d"])])
            .await
            .unwrap();
        assert!(matches!(outcome, AppendOutcome::Written { start_row: 5, rows: 2 }));
    }

    #[tokio::test]
    async fn test_append_write_failure_propagates() {
        let mut api = MockSheetsApi::new();
        api.expect_last_populated_row().returning(|_| Ok(1));
        api.expect_write_rows().returning(|_, _, _| {
            Err(Error::NoData {
                message: "quota exceeded".to_string(),
            })
        });

        let result = writer(&api).append_rows(&[row(&["a"])]).await;
        assert!(result.is_err());
    }
}

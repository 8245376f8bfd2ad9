use crate::api_client::{AdsApi, GoogleAdsRow};
use crate::error::Error;
use std::collections::VecDeque;

/// Forward-only view over the rows of one report query.
///
/// Pages are fetched on demand. Creating a new stream for the same query
/// starts again from the first page.
pub struct ReportStream<'a, A: AdsApi + ?Sized> {
    api: &'a A,
    customer_id: String,
    query: String,
    buffered: VecDeque<GoogleAdsRow>,
    next_page_token: Option<String>,
    exhausted: bool,
}

impl<'a, A: AdsApi + ?Sized> ReportStream<'a, A> {
    pub fn new(api: &'a A, customer_id: &str, query: String) -> Self {
        ReportStream {
            api,
            customer_id: customer_id.to_string(),
            query,
            buffered: VecDeque::new(),
            next_page_token: None,
            exhausted: false,
        }
    }

    async fn fill(&mut self) -> Result<(), Error> {
        while self.buffered.is_empty() && !self.exhausted {
            let page = self
                .api
                .search(&self.customer_id, &self.query, self.next_page_token.take())
                .await?;
            self.buffered.extend(page.results);
            match page.next_page_token {
                Some(token) if !token.is_empty() => self.next_page_token = Some(token),
                _ => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Pulls up to `size` rows. An empty batch means the stream is exhausted.
    pub async fn next_batch(&mut self, size: usize) -> Result<Vec<GoogleAdsRow>, Error> {
        let mut batch = Vec::new();
        while batch.len() < size {
            self.fill().await?;
            match self.buffered.pop_front() {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok(batch)
    }

    pub async fn collect_all(mut self) -> Result<Vec<GoogleAdsRow>, Error> {
        let mut rows = Vec::new();
        loop {
            self.fill().await?;
            if self.buffered.is_empty() {
                return Ok(rows);
            }
            rows.extend(self.buffered.drain(..));
        }
    }
}

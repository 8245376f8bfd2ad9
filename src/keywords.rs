use crate::api_client::{AdsApi, KeywordRecord};
use crate::config::RunConfig;
use crate::error::Error;
use crate::query;
use crate::report_stream::ReportStream;
use indexmap::IndexSet;
use log::debug;
use std::collections::HashMap;

/// Keyword texts of one ad group, unique, kept in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeywordSet(IndexSet<String>);

impl KeywordSet {
    pub fn insert(&mut self, keyword: String) -> bool {
        self.0.insert(keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// campaign id -> ad group id -> keywords.
///
/// Built for a single batch of ads and dropped once that batch is flattened.
#[derive(Debug, Default, Clone)]
pub struct KeywordIndex {
    campaigns: HashMap<String, HashMap<String, KeywordSet>>,
}

impl KeywordIndex {
    pub fn insert(&mut self, record: KeywordRecord) {
        self.campaigns
            .entry(record.campaign_id)
            .or_default()
            .entry(record.ad_group_id)
            .or_default()
            .insert(record.text);
    }

    pub fn get(&self, campaign_id: &str, ad_group_id: &str) -> Option<&KeywordSet> {
        self.campaigns
            .get(campaign_id)
            .and_then(|ad_groups| ad_groups.get(ad_group_id))
    }

    pub fn ad_group_count(&self) -> usize {
        self.campaigns.values().map(HashMap::len).sum()
    }
}

impl FromIterator<KeywordRecord> for KeywordIndex {
    fn from_iter<I: IntoIterator<Item = KeywordRecord>>(records: I) -> Self {
        let mut index = KeywordIndex::default();
        for record in records {
            index.insert(record);
        }
        index
    }
}

/// Loads the keywords of the given campaigns and ad groups into a fresh index.
///
/// # Arguments
/// * `api` - Ads API the keyword report is read from
/// * `customer_id` - Account the batch belongs to
/// * `config` - Run settings, only the date range is used
/// * `campaign_ids` - Campaigns seen in the batch, must be non-empty
/// * `ad_group_ids` - Ad groups seen in the batch, must be non-empty
///
/// # Returns
/// A Result containing either a [`KeywordIndex`] or an [`Error`]
pub async fn build_keyword_index<A: AdsApi + ?Sized>(
    api: &A,
    customer_id: &str,
    config: &RunConfig,
    campaign_ids: &[String],
    ad_group_ids: &[String],
) -> Result<KeywordIndex, Error> {
    if campaign_ids.is_empty() || ad_group_ids.is_empty() {
        return Ok(KeywordIndex::default());
    }

    let query = query::keywords_query(config, campaign_ids, ad_group_ids);
    let rows = ReportStream::new(api, customer_id, query).collect_all().await?;

    let index = rows
        .into_iter()
        .map(KeywordRecord::try_from)
        .collect::<Result<KeywordIndex, Error>>()?;

    debug!(
        "Loaded keywords for {} ad groups across {} campaigns",
        index.ad_group_count(),
        campaign_ids.len()
    );

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{
        AdGroupCriterionResource, GoogleAdsRow, KeywordInfo, MockAdsApi, NamedResource, SearchPage,
    };
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn keyword(campaign_id: &str, ad_group_id: &str, text: &str) -> KeywordRecord {
        KeywordRecord {
            campaign_id: campaign_id.to_string(),
            ad_group_id: ad_group_id.to_string(),
            text: text.to_string(),
        }
    }

    fn keyword_row(campaign_id: &str, ad_group_id: &str, text: &str) -> GoogleAdsRow {
        GoogleAdsRow {
            campaign: Some(NamedResource {
                id: Some(campaign_id.to_string()),
                name: None,
            }),
            ad_group: Some(NamedResource {
                id: Some(ad_group_id.to_string()),
                name: None,
            }),
            ad_group_criterion: Some(AdGroupCriterionResource {
                keyword: Some(KeywordInfo {
                    text: text.to_string(),
                }),
            }),
            ..Default::default()
        }
    }

    fn run_config() -> RunConfig {
        RunConfig::new(
            NaiveDate::from_str("2024-01-01").unwrap(),
            NaiveDate::from_str("2024-01-31").unwrap(),
            &[],
            &[],
            15,
            4,
            5000,
        )
        .unwrap()
    }

    #[test]
    fn test_index_collapses_duplicates() {
        let index: KeywordIndex = vec![
            keyword("1", "10", "+foo"),
            keyword("1", "10", "bar"),
            keyword("1", "10", "+foo"),
            keyword("1", "11", "+foo"),
        ]
        .into_iter()
        .collect();

        let set = index.get("1", "10").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["+foo", "bar"]);
        assert_eq!(index.get("1", "11").unwrap().len(), 1);
        assert_eq!(index.ad_group_count(), 2);
    }

    #[test]
    fn test_index_missing_entries() {
        let index: KeywordIndex = vec![keyword("1", "10", "foo")].into_iter().collect();
        assert!(index.get("1", "99").is_none());
        assert!(index.get("2", "10").is_none());
    }

    #[tokio::test]
    async fn test_build_keyword_index_scopes_query() {
        let mut api = MockAdsApi::new();
        api.expect_search()
            .withf(|customer_id, query, _| {
                customer_id == "42"
                    && query.contains("FROM keyword_view")
                    && query.contains("campaign.id IN (1,2)")
                    && query.contains("ad_group.id IN (10,20)")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(SearchPage {
                    results: vec![
                        keyword_row("1", "10", "shoes"),
                        keyword_row("1", "10", "shoes"),
                        keyword_row("2", "20", "boots"),
                    ],
                    next_page_token: None,
                })
            });

        let index = build_keyword_index(
            &api,
            "42",
            &run_config(),
            &["1".to_string(), "2".to_string()],
            &["10".to_string(), "20".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(index.get("1", "10").unwrap().len(), 1);
        assert_eq!(index.get("2", "20").unwrap().iter().collect::<Vec<_>>(), vec!["boots"]);
    }

    #[tokio::test]
    async fn test_build_keyword_index_propagates_errors() {
        let mut api = MockAdsApi::new();
        api.expect_search().returning(|_, _, _| {
            Err(Error::NoData {
                message: "keyword report unavailable".to_string(),
            })
        });

        let result = build_keyword_index(
            &api,
            "42",
            &run_config(),
            &["1".to_string()],
            &["10".to_string()],
        )
        .await;
        assert!(result.is_err());
    }
}

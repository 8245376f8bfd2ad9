//! GAQL query assembly. Nothing here touches the network.

use crate::config::RunConfig;
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn date_range(begin: &NaiveDate, end: &NaiveDate) -> String {
    format!(
        "segments.date BETWEEN '{}' AND '{}'",
        begin.format(DATE_FORMAT),
        end.format(DATE_FORMAT)
    )
}

fn in_list<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Enabled responsive search ads served within the run's date range.
pub fn ads_query(config: &RunConfig) -> String {
    let mut query = format!(
        "SELECT \
            ad_group.id, \
            ad_group_ad.ad.id, \
            ad_group_ad.ad.responsive_search_ad.descriptions, \
            ad_group_ad.ad.responsive_search_ad.headlines, \
            campaign.id, \
            campaign.name, \
            ad_group.name, \
            ad_group_ad.ad_strength, \
            ad_group_ad.ad.type, \
            ad_group_ad.ad.final_urls \
        FROM ad_group_ad \
        WHERE ad_group_ad.status = 'ENABLED' \
            AND ad_group_ad.ad.type = 'RESPONSIVE_SEARCH_AD' \
            AND {}",
        date_range(&config.begin, &config.end)
    );

    if !config.campaign_ids.is_empty() {
        query.push_str(&format!(
            " AND campaign.id IN ({})",
            in_list(&config.campaign_ids)
        ));
    }

    query
}

/// Keyword texts of the given campaigns and ad groups.
///
/// The id sets come from the batch being flattened, not from the run's
/// allow-list, so both must be non-empty.
pub fn keywords_query(config: &RunConfig, campaign_ids: &[String], ad_group_ids: &[String]) -> String {
    format!(
        "SELECT \
            campaign.id, \
            ad_group.id, \
            ad_group_criterion.keyword.text \
        FROM keyword_view \
        WHERE campaign.id IN ({}) \
            AND ad_group.id IN ({}) \
            AND {} \
            AND ad_group_criterion.status != 'REMOVED'",
        in_list(campaign_ids),
        in_list(ad_group_ids),
        date_range(&config.begin, &config.end)
    )
}

pub fn customer_query() -> String {
    "SELECT customer.id, customer.descriptive_name, customer.manager FROM customer LIMIT 1"
        .to_string()
}

/// Enabled, non-manager accounts anywhere below a manager account.
pub fn client_accounts_query(account_ids: &[String]) -> String {
    let mut query = "SELECT \
            customer_client.id, \
            customer_client.descriptive_name, \
            customer_client.manager \
        FROM customer_client \
        WHERE customer_client.manager = FALSE \
            AND customer_client.status = 'ENABLED'"
        .to_string();

    if !account_ids.is_empty() {
        query.push_str(&format!(" AND customer_client.id IN ({})", in_list(account_ids)));
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn run_config(campaign_ids: &[u64]) -> RunConfig {
        RunConfig::new(
            NaiveDate::from_str("2024-01-01").unwrap(),
            NaiveDate::from_str("2024-01-31").unwrap(),
            &[],
            campaign_ids,
            15,
            4,
            5000,
        )
        .unwrap()
    }

    #[test]
    fn test_ads_query_without_campaign_filter() {
        let query = ads_query(&run_config(&[]));
        assert!(query.contains("FROM ad_group_ad"));
        assert!(query.contains("ad_group_ad.status = 'ENABLED'"));
        assert!(query.contains("ad_group_ad.ad.type = 'RESPONSIVE_SEARCH_AD'"));
        assert!(query.contains("segments.date BETWEEN '2024-01-01' AND '2024-01-31'"));
        assert!(!query.contains("campaign.id IN"));
    }

    #[test]
    fn test_ads_query_with_campaign_filter() {
        let query = ads_query(&run_config(&[12345678901, 98765432109]));
        assert!(query.ends_with("AND campaign.id IN (12345678901,98765432109)"));
    }

    #[test]
    fn test_keywords_query_scoped_to_ids() {
        let query = keywords_query(
            &run_config(&[555]),
            &["1".to_string(), "2".to_string()],
            &["10".to_string()],
        );
        assert!(query.contains("FROM keyword_view"));
        assert!(query.contains("campaign.id IN (1,2)"));
        assert!(query.contains("ad_group.id IN (10)"));
        assert!(query.contains("ad_group_criterion.status != 'REMOVED'"));
        assert!(query.contains("segments.date BETWEEN '2024-01-01' AND '2024-01-31'"));
        // the run's campaign allow-list never leaks into the keyword query
        assert!(!query.contains("555"));
    }

    #[test]
    fn test_client_accounts_query_filter() {
        assert!(!client_accounts_query(&[]).contains("customer_client.id IN"));
        let query = client_accounts_query(&["1112223333".to_string(), "4445556666".to_string()]);
        assert!(query.ends_with("AND customer_client.id IN (1112223333,4445556666)"));
    }

    #[test]
    fn test_client_accounts_query_covers_whole_hierarchy() {
        let query = client_accounts_query(&["5556667777".to_string()]);
        assert!(!query.contains("customer_client.level"));
        assert!(query.contains("customer_client.manager = FALSE"));
        assert!(query.contains("customer_client.status = 'ENABLED'"));
        assert!(query.contains("customer_client.id IN (5556667777)"));
    }
}

use crate::config::{normalize_customer_id, Config};
use crate::error::Error;
use crate::query;
use crate::report_stream::ReportStream;
use log::{debug, error};
use reqwest::{header::AUTHORIZATION, Client, Url};
use serde::{Deserialize, Deserializer, Serialize};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AdsApi: Send + Sync + 'static {
    /// Runs a report query and returns one page of it.
    /// # Arguments
    /// * `customer_id` - The account the query runs against.
    /// * `query` - GAQL query text.
    /// * `page_token` - Token returned by the previous page, `None` for the first page.
    /// # Returns
    /// A Result containing either a [`SearchPage`] or an Error.
    async fn search(
        &self,
        customer_id: &str,
        query: &str,
        page_token: Option<String>,
    ) -> Result<SearchPage, Error>;

    /// Whether the account is a manager account able to list sub-accounts.
    async fn is_manager(&self, customer_id: &str) -> Result<bool, Error>;

    /// Fetches id and name of a single account.
    async fn fetch_customer(&self, customer_id: &str) -> Result<Account, Error>;

    /// Fetches the sub-accounts of a manager account.
    /// # Arguments
    /// * `manager_id` - The manager account to list.
    /// * `account_ids` - Restricts the listing to these ids. Empty means no restriction.
    async fn fetch_client_accounts(
        &self,
        manager_id: &str,
        account_ids: &[String],
    ) -> Result<Vec<Account>, Error>;
}

/// One page of a report query.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<GoogleAdsRow>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A report row. Only the resources named in the query are populated.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsRow {
    pub customer: Option<CustomerResource>,
    pub customer_client: Option<CustomerResource>,
    pub campaign: Option<NamedResource>,
    pub ad_group: Option<NamedResource>,
    pub ad_group_ad: Option<AdGroupAdResource>,
    pub ad_group_criterion: Option<AdGroupCriterionResource>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResource {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    pub descriptive_name: Option<String>,
    #[serde(default)]
    pub manager: bool,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct NamedResource {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupAdResource {
    pub ad: Option<AdResource>,
    pub ad_strength: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdResource {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub ad_type: Option<String>,
    #[serde(default)]
    pub final_urls: Vec<String>,
    pub responsive_search_ad: Option<ResponsiveSearchAd>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ResponsiveSearchAd {
    #[serde(default)]
    pub headlines: Vec<AdTextAsset>,
    #[serde(default)]
    pub descriptions: Vec<AdTextAsset>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct AdTextAsset {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct AdGroupCriterionResource {
    pub keyword: Option<KeywordInfo>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct KeywordInfo {
    #[serde(default)]
    pub text: String,
}

/// int64 fields arrive as JSON strings, but plain numbers are accepted too.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

/// An advertising account the export runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
}

/// A responsive search ad as read from the ads report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdRecord {
    pub campaign_id: String,
    pub campaign_name: String,
    pub ad_group_id: String,
    pub ad_group_name: String,
    pub ad_id: String,
    pub ad_type: String,
    pub ad_strength: String,
    pub final_urls: Vec<String>,
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
}

/// One row of the keyword report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRecord {
    pub campaign_id: String,
    pub ad_group_id: String,
    pub text: String,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, Error> {
    value.ok_or(Error::MissingField { field })
}

impl TryFrom<GoogleAdsRow> for AdRecord {
    type Error = Error;

    fn try_from(row: GoogleAdsRow) -> Result<Self, Error> {
        let campaign = required(row.campaign, "campaign")?;
        let ad_group = required(row.ad_group, "ad_group")?;
        let ad_group_ad = required(row.ad_group_ad, "ad_group_ad")?;
        let ad = required(ad_group_ad.ad, "ad_group_ad.ad")?;
        let rsa = ad.responsive_search_ad.unwrap_or_default();

        Ok(AdRecord {
            campaign_id: required(campaign.id, "campaign.id")?,
            campaign_name: campaign.name.unwrap_or_default(),
            ad_group_id: required(ad_group.id, "ad_group.id")?,
            ad_group_name: ad_group.name.unwrap_or_default(),
            ad_id: required(ad.id, "ad_group_ad.ad.id")?,
            ad_type: ad.ad_type.unwrap_or_default(),
            ad_strength: ad_group_ad.ad_strength.unwrap_or_default(),
            final_urls: ad.final_urls,
            headlines: rsa.headlines.into_iter().map(|asset| asset.text).collect(),
            descriptions: rsa.descriptions.into_iter().map(|asset| asset.text).collect(),
        })
    }
}

impl TryFrom<GoogleAdsRow> for KeywordRecord {
    type Error = Error;

    fn try_from(row: GoogleAdsRow) -> Result<Self, Error> {
        let campaign = required(row.campaign, "campaign")?;
        let ad_group = required(row.ad_group, "ad_group")?;
        let criterion = required(row.ad_group_criterion, "ad_group_criterion")?;
        let keyword = required(criterion.keyword, "ad_group_criterion.keyword")?;

        Ok(KeywordRecord {
            campaign_id: required(campaign.id, "campaign.id")?,
            ad_group_id: required(ad_group.id, "ad_group.id")?,
            text: keyword.text,
        })
    }
}

impl TryFrom<CustomerResource> for Account {
    type Error = Error;

    fn try_from(customer: CustomerResource) -> Result<Self, Error> {
        Ok(Account {
            id: required(customer.id, "customer.id")?,
            name: customer.descriptive_name.unwrap_or_default(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Clone)]
pub struct GoogleAdsClient {
    client: Client,
    base_url: String,
    api_version: String,
    token: String,
    developer_token: String,
    login_customer_id: Option<String>,
}

impl GoogleAdsClient {
    pub fn new(config: &Config) -> Self {
        GoogleAdsClient {
            client: Client::new(),
            base_url: config.ads_api_url.to_string(),
            api_version: config.ads_api_version.to_string(),
            token: config.ads_access_token.to_string(),
            developer_token: config.developer_token.to_string(),
            login_customer_id: None,
        }
    }

    /// Runs every subsequent request through the given manager account.
    pub fn with_login_customer_id(mut self, manager_id: &str) -> Self {
        self.login_customer_id = Some(normalize_customer_id(manager_id));
        self
    }

    fn search_url(&self, customer_id: &str) -> Result<Url, Error> {
        let method = format!("{}:googleAds:search", normalize_customer_id(customer_id));
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::UrlParsingFailed(url::ParseError::SetHostOnCannotBeABaseUrl))?
            .pop_if_empty()
            .extend([self.api_version.as_str(), "customers", method.as_str()]);
        Ok(url)
    }

    async fn search_all(&self, customer_id: &str, query: String) -> Result<Vec<GoogleAdsRow>, Error> {
        ReportStream::new(self, customer_id, query).collect_all().await
    }
}

#[async_trait::async_trait]
impl AdsApi for GoogleAdsClient {
    async fn search(
        &self,
        customer_id: &str,
        query: &str,
        page_token: Option<String>,
    ) -> Result<SearchPage, Error> {
        let url = self.search_url(customer_id)?;
        debug!("Searching account {}: {}", customer_id, query);

        let mut request = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header("developer-token", &self.developer_token)
            .json(&SearchRequest { query, page_token });

        if let Some(login_customer_id) = &self.login_customer_id {
            request = request.header("login-customer-id", login_customer_id);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Search for account {} failed: {}", customer_id, status);
            return Err(Error::ApiStatus {
                endpoint: url.to_string(),
                status,
                body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn is_manager(&self, customer_id: &str) -> Result<bool, Error> {
        let rows = self.search_all(customer_id, query::customer_query()).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.customer)
            .any(|customer| customer.manager))
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<Account, Error> {
        let rows = self.search_all(customer_id, query::customer_query()).await?;
        let customer = rows
            .into_iter()
            .find_map(|row| row.customer)
            .ok_or_else(|| Error::NoData {
                message: format!("Account {} not found", customer_id),
            })?;
        Account::try_from(customer)
    }

    async fn fetch_client_accounts(
        &self,
        manager_id: &str,
        account_ids: &[String],
    ) -> Result<Vec<Account>, Error> {
        let rows = self
            .search_all(manager_id, query::client_accounts_query(account_ids))
            .await?;
        rows.into_iter()
            .filter_map(|row| row.customer_client)
            .map(Account::try_from)
            .collect()
    }
}

use crate::api_client::{Account, AdRecord, AdsApi};
use crate::config::RunConfig;
use crate::error::Error;
use crate::flatten::{flatten_ad, OutputRow};
use crate::keywords::{build_keyword_index, KeywordIndex};
use crate::query;
use crate::report_stream::ReportStream;
use indexmap::IndexSet;
use log::{debug, info};

/// Stages one account goes through while its ads are exported.
#[derive(Debug)]
enum PipelineState {
    Idle,
    Paging,
    BuildingKeywordIndex(Vec<AdRecord>),
    FlatteningBatch(Vec<AdRecord>, KeywordIndex),
    Done,
}

/// Everything the pipeline produced for one account.
#[derive(Debug, Default)]
pub struct AccountRows {
    pub rows: Vec<OutputRow>,
    /// Number of batches read, one keyword index was built for each.
    pub batches: usize,
}

/// Distinct ids in first-seen order.
fn distinct_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    ids.collect::<IndexSet<&'a String>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Reads the account's ads in batches and flattens each batch against the
/// keywords of the campaigns and ad groups it contains.
///
/// # Arguments
/// * `api` - Ads API of the account
/// * `account` - Account the ads are read from
/// * `config` - Run settings
///
/// # Returns
/// A Result containing either the [`AccountRows`] or the first [`Error`] hit
pub async fn collect_account_rows<A: AdsApi + ?Sized>(
    api: &A,
    account: &Account,
    config: &RunConfig,
) -> Result<AccountRows, Error> {
    let mut stream = ReportStream::new(api, &account.id, query::ads_query(config));
    let mut output = AccountRows::default();
    let mut state = PipelineState::Idle;

    loop {
        state = match state {
            PipelineState::Idle => PipelineState::Paging,
            PipelineState::Paging => {
                let batch = stream.next_batch(config.batch_size).await?;
                if batch.is_empty() {
                    PipelineState::Done
                } else {
                    let ads = batch
                        .into_iter()
                        .map(AdRecord::try_from)
                        .collect::<Result<Vec<_>, Error>>()?;
                    PipelineState::BuildingKeywordIndex(ads)
                }
            }
            PipelineState::BuildingKeywordIndex(ads) => {
                let campaign_ids = distinct_ids(ads.iter().map(|ad| &ad.campaign_id));
                let ad_group_ids = distinct_ids(ads.iter().map(|ad| &ad.ad_group_id));
                debug!(
                    "Batch {} of account {}: {} ads, {} campaigns, {} ad groups",
                    output.batches + 1,
                    account.id,
                    ads.len(),
                    campaign_ids.len(),
                    ad_group_ids.len()
                );

                let index =
                    build_keyword_index(api, &account.id, config, &campaign_ids, &ad_group_ids)
                        .await?;
                output.batches += 1;
                PipelineState::FlatteningBatch(ads, index)
            }
            PipelineState::FlatteningBatch(ads, index) => {
                output.rows.extend(ads.iter().map(|ad| {
                    flatten_ad(
                        account,
                        ad,
                        &index,
                        config.max_headlines,
                        config.max_descriptions,
                    )
                }));
                PipelineState::Paging
            }
            PipelineState::Done => break,
        };
    }

    info!(
        "Collected {} rows in {} batches for account {}",
        output.rows.len(),
        output.batches,
        account.id
    );

    Ok(output)
}

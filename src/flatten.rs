use crate::api_client::{Account, AdRecord};
use crate::keywords::KeywordIndex;
use log::warn;

/// Columns before the headline and description blocks.
pub const FIXED_COLUMNS: usize = 11;

const FIXED_HEADER: [&str; FIXED_COLUMNS] = [
    "Account ID",
    "Account",
    "Campaign ID",
    "Campaign Name",
    "Ad Group ID",
    "Ad Group name",
    "Ad ID",
    "Ad Type",
    "Ad Strength",
    "Ad Final URLs",
    "Keywords",
];

/// One sheet row. Never changed after it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow(Vec<String>);

impl OutputRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<String>> for OutputRow {
    fn from(cells: Vec<String>) -> Self {
        OutputRow(cells)
    }
}

pub fn header_row(max_headlines: usize, max_descriptions: usize) -> OutputRow {
    let mut cells: Vec<String> = FIXED_HEADER.iter().map(|name| name.to_string()).collect();
    cells.extend((1..=max_headlines).map(|i| format!("Headline {}", i)));
    cells.extend((1..=max_descriptions).map(|i| format!("Description {}", i)));
    OutputRow(cells)
}

/// Joins the keywords with `,` behind a leading `'`, which keeps the sheet
/// from reading a list starting with `+` as a formula.
pub fn keyword_cell<'a>(keywords: impl IntoIterator<Item = &'a str>) -> String {
    format!("'{}", keywords.into_iter().collect::<Vec<_>>().join(","))
}

/// Returns exactly `width` cells, padding with empty strings and dropping
/// anything past `width`.
fn fixed_width(texts: &[String], width: usize) -> impl Iterator<Item = String> + '_ {
    (0..width).map(move |i| texts.get(i).cloned().unwrap_or_default())
}

/// Builds the sheet row for one ad.
///
/// # Arguments
/// * `account` - Account the ad belongs to
/// * `ad` - The ad as read from the report
/// * `keywords` - Keyword index of the batch the ad came in
/// * `max_headlines` - Number of headline columns
/// * `max_descriptions` - Number of description columns
///
/// # Returns
/// An [`OutputRow`] of `FIXED_COLUMNS + max_headlines + max_descriptions` cells
pub fn flatten_ad(
    account: &Account,
    ad: &AdRecord,
    keywords: &KeywordIndex,
    max_headlines: usize,
    max_descriptions: usize,
) -> OutputRow {
    if ad.headlines.len() > max_headlines || ad.descriptions.len() > max_descriptions {
        warn!(
            "Ad {} has {} headlines and {} descriptions, only {} and {} are exported",
            ad.ad_id,
            ad.headlines.len(),
            ad.descriptions.len(),
            max_headlines,
            max_descriptions
        );
    }

    let keyword_texts = keywords
        .get(&ad.campaign_id, &ad.ad_group_id)
        .map(|set| set.iter().collect::<Vec<_>>())
        .unwrap_or_default();

    let mut cells = Vec::with_capacity(FIXED_COLUMNS + max_headlines + max_descriptions);
    cells.extend([
        account.id.clone(),
        account.name.clone(),
        ad.campaign_id.clone(),
        ad.campaign_name.clone(),
        ad.ad_group_id.clone(),
        ad.ad_group_name.clone(),
        ad.ad_id.clone(),
        ad.ad_type.clone(),
        ad.ad_strength.clone(),
        ad.final_urls.join(","),
        keyword_cell(keyword_texts),
    ]);
    cells.extend(fixed_width(&ad.headlines, max_headlines));
    cells.extend(fixed_width(&ad.descriptions, max_descriptions));

    OutputRow(cells)
}

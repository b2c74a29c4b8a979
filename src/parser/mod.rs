pub mod extract;
pub mod locators;
pub mod resolve;

use chrono::Utc;
use scraper::{ElementRef, Html};
use url::Url;

use crate::campaign::Campaign;
use crate::error::ExtractError;
use locators::FieldTable;

/// Parse a card's outer HTML and extract it. Fails only when the HTML holds
/// no element at all.
pub fn parse_card(
    outer_html: &str,
    index: usize,
    table: &FieldTable,
    base: Option<&Url>,
) -> Result<Campaign, ExtractError> {
    let fragment = Html::parse_fragment(outer_html);
    let card = fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
        .ok_or_else(|| ExtractError::ContainerExtractionFailed {
            index,
            reason: "card HTML contains no element".to_string(),
        })?;
    Ok(extract::extract(card, index, table, base, Utc::now()))
}

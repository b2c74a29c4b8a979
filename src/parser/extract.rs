use chrono::{DateTime, Utc};
use scraper::ElementRef;
use url::Url;

use super::locators::FieldTable;
use super::resolve::{resolve, select_first_chain};
use crate::campaign::{Campaign, Drop};

/// Build a campaign from one card. Never fails: a field whose chain finds
/// nothing is left as `""`.
pub fn extract(
    card: ElementRef<'_>,
    index: usize,
    table: &FieldTable,
    base: Option<&Url>,
    scraped_at: DateTime<Utc>,
) -> Campaign {
    let id = card
        .value()
        .attr(&table.id_attribute)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Campaign::synthetic_id(index));

    let mut campaign = Campaign::blank(id, scraped_at);
    campaign.name = resolve(card, &table.name);
    campaign.game = resolve(card, &table.game);
    campaign.end_date = resolve(card, &table.end_date);
    campaign.status = resolve(card, &table.status);
    campaign.description = resolve(card, &table.description);
    campaign.image_url = absolutize(resolve(card, &table.image), base);
    campaign.drops = select_first_chain(card, &table.drops)
        .into_iter()
        .map(|drop| extract_drop(drop, table))
        .collect();
    campaign
}

fn extract_drop(drop: ElementRef<'_>, table: &FieldTable) -> Drop {
    Drop {
        name: resolve(drop, &table.drop_name),
        reward: resolve(drop, &table.drop_reward),
        requirement: resolve(drop, &table.drop_requirement),
    }
}

fn absolutize(src: String, base: Option<&Url>) -> String {
    if src.is_empty() {
        return src;
    }
    match base.and_then(|b| b.join(&src).ok()) {
        Some(u) => u.to_string(),
        None => src,
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One drops campaign as rendered on the campaigns page.
///
/// `id` is only unique within a single session: when the card carries no
/// `data-campaign-id` it is a positional `campaign_<index>`. Downstream
/// deduplication has to key on `(name, game, end_date)` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub game: String,
    pub end_date: String,
    pub status: String,
    pub description: String,
    pub image_url: String,
    pub drops: Vec<Drop>,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drop {
    pub name: String,
    pub reward: String,
    pub requirement: String,
}

impl Campaign {
    /// Empty record for `id`; every text field starts as `""`.
    pub fn blank(id: impl Into<String>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            game: String::new(),
            end_date: String::new(),
            status: String::new(),
            description: String::new(),
            image_url: String::new(),
            drops: Vec::new(),
            scraped_at,
        }
    }

    /// Positional identifier used when the card has no id attribute.
    ///
    /// Only unique within one session: the same campaign can get a different
    /// id next time, so downstream dedup has to key on name, game and end date.
    pub fn synthetic_id(index: usize) -> String {
        format!("campaign_{}", index)
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// One way of finding a value inside a container: a CSS selector, and
/// optionally the attribute to read instead of the element's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl Locator {
    pub fn text(css: &str) -> Self {
        Self { css: css.to_string(), attr: None }
    }

    pub fn attr(css: &str, attr: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: Some(attr.to_string()),
        }
    }

    pub fn selector(&self) -> Option<Selector> {
        Selector::parse(&self.css).ok()
    }
}

/// Ordered fallback chains per field. Earlier entries are page-specific,
/// later ones are generic structural tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTable {
    pub containers: Vec<Locator>,
    pub id_attribute: String,
    pub expand: Vec<Locator>,
    pub expanded_class: String,

    pub name: Vec<Locator>,
    pub game: Vec<Locator>,
    pub end_date: Vec<Locator>,
    pub status: Vec<Locator>,
    pub description: Vec<Locator>,
    pub image: Vec<Locator>,

    pub drops: Vec<Locator>,
    pub drop_name: Vec<Locator>,
    pub drop_reward: Vec<Locator>,
    pub drop_requirement: Vec<Locator>,
}

fn texts(list: &[&str]) -> Vec<Locator> {
    list.iter().map(|css| Locator::text(css)).collect()
}

impl Default for FieldTable {
    fn default() -> Self {
        Self {
            containers: texts(&[
                r#"[data-a-target="drops-campaign-card"]"#,
                r#"[data-test-selector="drops-campaign-card"]"#,
                ".drops-campaign-card",
                r#"[class*="CampaignCard"]"#,
                r#"[class*="campaign-card"]"#,
            ]),
            id_attribute: "data-campaign-id".to_string(),
            expand: texts(&["button", r#"[role="button"]"#]),
            expanded_class: "expanded".to_string(),

            name: texts(&[
                r#"[data-a-target="campaign-name"]"#,
                r#"[class*="campaign-name"]"#,
                r#"[class*="CampaignName"]"#,
                "h3",
                "h4",
            ]),
            game: texts(&[
                r#"[data-a-target="campaign-game"]"#,
                r#"[class*="game-name"]"#,
                r#"[class*="GameName"]"#,
            ]),
            end_date: texts(&[
                r#"[data-a-target="campaign-end-date"]"#,
                r#"[class*="end-date"]"#,
                r#"[class*="EndDate"]"#,
                "time",
            ]),
            status: texts(&[
                r#"[data-a-target="campaign-status"]"#,
                r#"[class*="status"]"#,
            ]),
            description: texts(&[
                r#"[data-a-target="campaign-description"]"#,
                r#"[class*="description"]"#,
                "p",
            ]),
            image: vec![Locator::attr("img[src]", "src")],

            drops: texts(&[
                r#"[data-a-target="drop-card"]"#,
                r#"[class*="drop-card"]"#,
                r#"[class*="DropCard"]"#,
            ]),
            drop_name: texts(&[r#"[class*="drop-name"]"#, "h5", "h6"]),
            drop_reward: texts(&[r#"[class*="reward"]"#]),
            drop_requirement: texts(&[r#"[class*="requirement"]"#, r#"[class*="progress"]"#]),
        }
    }
}

impl FieldTable {
    /// Load a table from JSON. Fields left out keep their built-in chains.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read selector table {}", path.display()))?;
        let table: FieldTable = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed selector table {}", path.display()))?;
        table.validate()?;
        Ok(table)
    }

    /// Every locator must be a parseable CSS selector.
    pub fn validate(&self) -> Result<()> {
        let chains = [
            ("containers", &self.containers),
            ("expand", &self.expand),
            ("name", &self.name),
            ("game", &self.game),
            ("end_date", &self.end_date),
            ("status", &self.status),
            ("description", &self.description),
            ("image", &self.image),
            ("drops", &self.drops),
            ("drop_name", &self.drop_name),
            ("drop_reward", &self.drop_reward),
            ("drop_requirement", &self.drop_requirement),
        ];
        for (field, chain) in chains {
            for loc in chain.iter() {
                if loc.selector().is_none() {
                    anyhow::bail!("field '{}': invalid selector {:?}", field, loc.css);
                }
            }
        }
        Ok(())
    }
}

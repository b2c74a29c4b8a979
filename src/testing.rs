//! In-memory stand-ins for the browser and relay seams.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::browser::{PageContext, PageHost};
use crate::campaign::Campaign;
use crate::error::SessionError;
use crate::relay::{Relay, RelayMeta};

pub const CARD_SELECTOR: &str = ".drops-campaign-card";

#[derive(Debug, Clone, Default)]
pub struct FakeCard {
    pub html: String,
    pub classes: Vec<String>,
    pub has_button: bool,
    pub fail_click: bool,
}

impl FakeCard {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            ..Default::default()
        }
    }

    pub fn with_button(mut self) -> Self {
        self.has_button = true;
        self
    }

    pub fn expanded(mut self) -> Self {
        self.classes.push("expanded".to_string());
        self
    }

    pub fn failing_click(mut self) -> Self {
        self.fail_click = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeEl {
    Card(usize),
    Button(usize),
}

#[derive(Clone)]
pub struct FakePage {
    pub url: String,
    pub card_selector: String,
    pub cards: Vec<FakeCard>,
    pub clicks: Arc<Mutex<Vec<FakeEl>>>,
    pub scrolls: Arc<Mutex<Vec<usize>>>,
    /// Every query fails, as on a closed tab.
    pub dead: bool,
}

impl FakePage {
    pub fn new(cards: Vec<FakeCard>) -> Self {
        Self {
            url: "https://www.twitch.tv/drops/campaigns".to_string(),
            card_selector: CARD_SELECTOR.to_string(),
            cards,
            clicks: Arc::default(),
            scrolls: Arc::default(),
            dead: false,
        }
    }

    pub fn clicks(&self) -> Vec<FakeEl> {
        self.clicks.lock().unwrap().clone()
    }
}

/// `<div class="drops-campaign-card"><h3>{name}</h3></div>`
pub fn card_html(name: &str) -> String {
    format!(r#"<div class="drops-campaign-card"><h3>{}</h3><span class="game-name">Game {}</span></div>"#, name, name)
}

#[async_trait]
impl PageContext for FakePage {
    type Element = FakeEl;

    async fn url(&self) -> Option<String> {
        Some(self.url.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<FakeEl>> {
        if self.dead {
            return Err(anyhow!("target closed"));
        }
        if selector == self.card_selector {
            Ok((0..self.cards.len()).map(FakeEl::Card).collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn query_in(&self, el: &FakeEl, selector: &str) -> Result<Option<FakeEl>> {
        match el {
            FakeEl::Card(i) if selector == "button" && self.cards[*i].has_button => Ok(Some(FakeEl::Button(*i))),
            _ => Ok(None),
        }
    }

    async fn has_class(&self, el: &FakeEl, class: &str) -> Result<bool> {
        match el {
            FakeEl::Card(i) => Ok(self.cards[*i].classes.iter().any(|c| c == class)),
            FakeEl::Button(_) => Ok(false),
        }
    }

    async fn scroll_into_view(&self, el: &FakeEl) -> Result<()> {
        if let FakeEl::Card(i) = el {
            self.scrolls.lock().unwrap().push(*i);
        }
        Ok(())
    }

    async fn click(&self, el: &FakeEl) -> Result<()> {
        self.clicks.lock().unwrap().push(*el);
        let (FakeEl::Card(i) | FakeEl::Button(i)) = el;
        if self.cards[*i].fail_click {
            return Err(anyhow!("node is detached from document"));
        }
        Ok(())
    }

    async fn outer_html(&self, el: &FakeEl) -> Result<String> {
        match el {
            FakeEl::Card(i) => Ok(self.cards[*i].html.clone()),
            FakeEl::Button(_) => Ok("<button>more</button>".to_string()),
        }
    }
}

/// Host with an optionally pre-opened tab. `gate`, when set, holds every
/// lookup until notified.
#[derive(Default)]
pub struct FakeHost {
    pub open_tab: Option<FakePage>,
    pub new_tab: Option<FakePage>,
    pub gate: Option<Arc<Notify>>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn with_open_tab(page: FakePage) -> Self {
        Self {
            open_tab: Some(page),
            ..Default::default()
        }
    }

    pub fn opening(page: FakePage) -> Self {
        Self {
            new_tab: Some(page),
            ..Default::default()
        }
    }

    pub fn broken() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageHost for FakeHost {
    type Page = FakePage;

    async fn find_page(&self, url_prefix: &str) -> Result<Option<FakePage>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.open_tab.clone().filter(|p| p.url.starts_with(url_prefix)))
    }

    async fn open_page(&self, url: &str) -> Result<FakePage> {
        self.opened.lock().unwrap().push(url.to_string());
        self.new_tab
            .clone()
            .ok_or_else(|| anyhow!("browser connection closed"))
    }
}

/// Relay that records batches instead of sending them.
#[derive(Default)]
pub struct RecordingRelay {
    pub sent: Mutex<Vec<Vec<Campaign>>>,
    pub fail_with: Option<String>,
}

impl RecordingRelay {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Relay for RecordingRelay {
    async fn send(
        &self,
        endpoint: Option<&str>,
        campaigns: &[Campaign],
        _meta: &RelayMeta,
    ) -> Result<usize, SessionError> {
        if endpoint.is_none() {
            return Err(SessionError::MissingConfig);
        }
        self.sent.lock().unwrap().push(campaigns.to_vec());
        match &self.fail_with {
            Some(msg) => Err(SessionError::Transport(msg.clone())),
            None => Ok(campaigns.len()),
        }
    }
}

/// Serve `app` on an ephemeral local port; returns `http://127.0.0.1:<port>`.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

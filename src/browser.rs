use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Source of page contexts: finds an open tab or opens a new one.
#[async_trait]
pub trait PageHost: Send + Sync {
    type Page: PageContext;

    async fn find_page(&self, url_prefix: &str) -> Result<Option<Self::Page>>;
    async fn open_page(&self, url: &str) -> Result<Self::Page>;
}

/// The handful of DOM interactions the driver needs.
#[async_trait]
pub trait PageContext: Send + Sync {
    type Element: Send + Sync;

    async fn url(&self) -> Option<String>;
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>>;
    async fn query_in(&self, el: &Self::Element, selector: &str) -> Result<Option<Self::Element>>;
    async fn has_class(&self, el: &Self::Element, class: &str) -> Result<bool>;
    async fn scroll_into_view(&self, el: &Self::Element) -> Result<()>;
    async fn click(&self, el: &Self::Element) -> Result<()>;
    async fn outer_html(&self, el: &Self::Element) -> Result<String>;
}

/// Chromium over CDP. Nothing is launched or connected until the first
/// page lookup.
pub struct ChromeHost {
    conn: OnceCell<Connection>,
}

struct Connection {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromeHost {
    pub fn new() -> Self {
        Self { conn: OnceCell::new() }
    }

    async fn connection(&self) -> Result<&Connection> {
        self.conn.get_or_try_init(connect).await
    }
}

/// Attach to `CHROME_WS_URL` if set, otherwise launch a headless browser.
async fn connect() -> Result<Connection> {
    let (browser, mut handler) = match std::env::var("CHROME_WS_URL") {
        Ok(ws) => {
            info!("Connecting to browser at {}", ws);
            Browser::connect(ws)
                .await
                .context("Failed to connect to browser")?
        }
        Err(_) => {
            info!("Launching headless browser");
            let config = BrowserConfig::builder()
                .build()
                .map_err(|e| anyhow::anyhow!("Invalid browser config: {}", e))?;
            Browser::launch(config)
                .await
                .context("Failed to launch browser")?
        }
    };

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("Browser handler error: {}", e);
            }
        }
        debug!("Browser handler finished");
    });

    Ok(Connection {
        browser: Mutex::new(browser),
        handler,
    })
}

impl Default for ChromeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChromeHost {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get() {
            conn.handler.abort();
        }
    }
}

#[async_trait]
impl PageHost for ChromeHost {
    type Page = Page;

    async fn find_page(&self, url_prefix: &str) -> Result<Option<Page>> {
        let mut browser = self.connection().await?.browser.lock().await;
        // pick up tabs opened outside this process
        browser.fetch_targets().await?;
        for page in browser.pages().await? {
            if let Ok(Some(url)) = page.url().await {
                if url.starts_with(url_prefix) {
                    debug!("Reusing open tab {}", url);
                    return Ok(Some(page));
                }
            }
        }
        Ok(None)
    }

    async fn open_page(&self, url: &str) -> Result<Page> {
        let browser = self.connection().await?.browser.lock().await;
        let page = browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open {}", url))?;
        Ok(page)
    }
}

#[async_trait]
impl PageContext for Page {
    type Element = Element;

    async fn url(&self) -> Option<String> {
        Page::url(self).await.ok().flatten()
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        let found = self
            .find_elements(selector)
            .await
            .with_context(|| format!("Query {} failed", selector))?;
        Ok(found)
    }

    async fn query_in(&self, el: &Element, selector: &str) -> Result<Option<Element>> {
        Ok(el.find_element(selector).await.ok())
    }

    async fn has_class(&self, el: &Element, class: &str) -> Result<bool> {
        let classes = el.attribute("class").await?.unwrap_or_default();
        Ok(classes.split_whitespace().any(|c| c == class))
    }

    async fn scroll_into_view(&self, el: &Element) -> Result<()> {
        el.scroll_into_view().await?;
        Ok(())
    }

    async fn click(&self, el: &Element) -> Result<()> {
        el.click().await?;
        Ok(())
    }

    async fn outer_html(&self, el: &Element) -> Result<String> {
        el.outer_html()
            .await?
            .context("Element has no outer HTML")
    }
}

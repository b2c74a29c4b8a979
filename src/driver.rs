use futures::stream::{self, Stream};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::PageContext;
use crate::campaign::Campaign;
use crate::error::{ExtractError, SessionError};
use crate::parser::{self, locators::FieldTable};
use crate::wait::{Phase, WaitStrategy};

struct Walk<E> {
    cards: std::iter::Enumerate<std::vec::IntoIter<E>>,
    base: Option<Url>,
    pb: ProgressBar,
    skipped: usize,
}

enum Cursor<E> {
    Start,
    Walking(Walk<E>),
    Done,
}

/// Walk the campaign cards of `page` in document order, expanding each one
/// and yielding its campaign as soon as it is extracted.
///
/// A card that fails anywhere between scrolling and extraction is logged
/// and skipped. A page that cannot be queried at all yields a single
/// `ContextUnavailable` and ends the stream. Nothing touches the page until
/// the stream is first polled.
pub fn campaigns<'a, P: PageContext>(
    page: &'a P,
    table: &'a FieldTable,
    wait: &'a dyn WaitStrategy,
) -> impl Stream<Item = Result<Campaign, SessionError>> + Send + 'a {
    stream::unfold(Cursor::Start, move |cursor| async move {
        let mut walk = match cursor {
            Cursor::Start => {
                wait.settle(Phase::Initial).await;
                let cards = match discover(page, table).await {
                    Ok(cards) => cards,
                    Err(e) => {
                        let err = SessionError::ContextUnavailable(format!("{:#}", e));
                        return Some((Err(err), Cursor::Done));
                    }
                };
                info!("Found {} campaign cards", cards.len());
                Walk {
                    base: page.url().await.and_then(|u| Url::parse(&u).ok()),
                    pb: progress_bar(cards.len()),
                    cards: cards.into_iter().enumerate(),
                    skipped: 0,
                }
            }
            Cursor::Walking(walk) => walk,
            Cursor::Done => return None,
        };

        while let Some((index, card)) = walk.cards.next() {
            let result = process_card(page, &card, index, table, wait, walk.base.as_ref()).await;
            walk.pb.inc(1);
            match result {
                Ok(campaign) => return Some((Ok(campaign), Cursor::Walking(walk))),
                Err(e) => {
                    walk.skipped += 1;
                    warn!("Skipping card: {}", e);
                }
            }
        }

        walk.pb.finish_and_clear();
        if walk.skipped > 0 {
            warn!("{} campaign cards skipped", walk.skipped);
        }
        None
    })
}

/// Cards matched by the first container locator that matches anything.
/// No match is an empty page; a failed query means the page is gone.
async fn discover<P: PageContext>(page: &P, table: &FieldTable) -> anyhow::Result<Vec<P::Element>> {
    for loc in &table.containers {
        let found = page.query_all(&loc.css).await?;
        if !found.is_empty() {
            debug!("Container locator {} matched {}", loc.css, found.len());
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

async fn process_card<P: PageContext>(
    page: &P,
    card: &P::Element,
    index: usize,
    table: &FieldTable,
    wait: &dyn WaitStrategy,
    base: Option<&Url>,
) -> Result<Campaign, ExtractError> {
    let failed = |e: anyhow::Error| ExtractError::ContainerExtractionFailed {
        index,
        reason: format!("{:#}", e),
    };

    page.scroll_into_view(card).await.map_err(failed)?;
    wait.settle(Phase::Scroll).await;

    if !page.has_class(card, &table.expanded_class).await.map_err(failed)? {
        let clicked = match expand_affordance(page, card, table).await.map_err(failed)? {
            Some(button) => page.click(&button).await,
            None => page.click(card).await,
        };
        clicked.map_err(failed)?;
        wait.settle(Phase::Expand).await;
    }

    let html = page.outer_html(card).await.map_err(failed)?;
    parser::parse_card(&html, index, table, base)
}

async fn expand_affordance<P: PageContext>(
    page: &P,
    card: &P::Element,
    table: &FieldTable,
) -> anyhow::Result<Option<P::Element>> {
    for loc in &table.expand {
        if let Some(el) = page.query_in(card, &loc.css).await? {
            return Ok(Some(el));
        }
    }
    Ok(None)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} cards")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

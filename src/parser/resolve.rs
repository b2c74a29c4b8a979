use scraper::ElementRef;

use super::locators::Locator;

/// First candidate whose first match inside `container` has non-blank
/// content, or `""` when none does. Only descendants are searched. The
/// value is trimmed and otherwise left as the page has it.
pub fn resolve(container: ElementRef<'_>, candidates: &[Locator]) -> String {
    candidates
        .iter()
        .find_map(|loc| value_of(container, loc))
        .unwrap_or_default()
}

/// All matches of the first candidate that matches anything at all.
pub fn select_first_chain<'a>(container: ElementRef<'a>, candidates: &[Locator]) -> Vec<ElementRef<'a>> {
    for loc in candidates {
        let Some(sel) = loc.selector() else { continue };
        let found: Vec<_> = container.select(&sel).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn value_of(container: ElementRef<'_>, loc: &Locator) -> Option<String> {
    let sel = loc.selector()?;
    let el = container.select(&sel).next()?;
    let raw = match &loc.attr {
        Some(name) => el.value().attr(name)?.to_string(),
        None => el.text().collect::<String>(),
    };
    let value = raw.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

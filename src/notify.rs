use tracing::{error, info};

/// Fire-and-forget user alert.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, is_error: bool);
}

/// Headless notifier: the alert goes to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, is_error: bool) {
        if is_error {
            error!(target: "notify", "{}: {}", title, body);
        } else {
            info!(target: "notify", "{}: {}", title, body);
        }
    }
}

pub const TITLE: &str = "Drops Scraper";
pub const ERROR_TITLE: &str = "Drops Scraper - Error";

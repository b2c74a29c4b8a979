use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::browser::PageHost;
use crate::config::{validate_interval, Config, DEFAULT_INTERVAL_MINUTES};
use crate::db::Store;
use crate::error::SessionError;
use crate::session::{SessionController, Trigger};

/// Drive sessions on the configured period plus whatever arrives on
/// `on_demand`, until `shutdown` resolves.
///
/// The interval is read again after every periodic tick, so a changed
/// setting applies from the next tick onward. Each session runs in its own
/// task; sessions still in flight at shutdown are aborted.
pub async fn run<H>(
    controller: Arc<SessionController<H>>,
    mut on_demand: mpsc::Receiver<()>,
    run_now: bool,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    H: PageHost + 'static,
{
    tokio::pin!(shutdown);
    let mut tasks = JoinSet::new();

    let period = interval(controller.store());
    info!("Scheduler started, every {} min", period.as_secs() / 60);
    let mut next = Instant::now() + period;

    if run_now {
        spawn(&mut tasks, &controller, Trigger::OnDemand);
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down scheduler");
                break;
            }
            _ = sleep_until(next) => {
                spawn(&mut tasks, &controller, Trigger::Periodic);
                let period = interval(controller.store());
                next = Instant::now() + period;
                debug!("Next periodic session in {} min", period.as_secs() / 60);
            }
            Some(()) = on_demand.recv() => {
                spawn(&mut tasks, &controller, Trigger::OnDemand);
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!("Session task ended abnormally: {}", e);
                }
            }
        }
    }

    tasks.shutdown().await;
    Ok(())
}

fn spawn<H>(tasks: &mut JoinSet<()>, controller: &Arc<SessionController<H>>, trigger: Trigger)
where
    H: PageHost + 'static,
{
    let controller = Arc::clone(controller);
    tasks.spawn(async move {
        match controller.run(trigger).await {
            Ok(report) => debug!("{:?} session relayed {} campaigns", trigger, report.stored),
            // already logged by the controller
            Err(SessionError::Busy) => {}
            Err(e) => debug!("{:?} session failed: {}", trigger, e),
        }
    });
}

/// Current period. A stored value that is unreadable or under the floor
/// falls back to the default.
fn interval(store: &Store) -> Duration {
    let minutes = match Config::load(store) {
        Ok(cfg) => match validate_interval(cfg.interval_minutes) {
            Ok(m) => m,
            Err(e) => {
                warn!("Ignoring stored interval: {}", e);
                DEFAULT_INTERVAL_MINUTES
            }
        },
        Err(e) => {
            warn!("Could not read interval: {:#}", e);
            DEFAULT_INTERVAL_MINUTES
        }
    };
    Duration::from_secs(u64::from(minutes) * 60)
}

//! Bot service - Runs the dispatcher next to the reminder schedulers

use std::future::Future;
use std::io;
use std::sync::Arc;

use tracing::{error, info};

use crate::application::messaging::Dispatcher;
use crate::application::scheduler::{Clock, SchedulerGroup, SystemClock};
use crate::domain::traits::{Chat, EventSource};
use crate::plugins::LoadedPlugins;

/// A running bot: command replies go to one chat, reminders to another
pub struct BotService {
    dispatcher: Dispatcher,
    schedulers: SchedulerGroup,
}

impl BotService {
    /// Start every reminder set and build the dispatcher. Must run inside a
    /// tokio runtime.
    pub fn start(
        prefix: impl Into<String>,
        loaded: LoadedPlugins,
        replies: Arc<dyn Chat>,
        reminders: Arc<dyn Chat>,
    ) -> Self {
        Self::start_with_clock(prefix, loaded, replies, reminders, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        prefix: impl Into<String>,
        mut loaded: LoadedPlugins,
        replies: Arc<dyn Chat>,
        reminders: Arc<dyn Chat>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let schedulers = loaded.start_schedulers(reminders, clock);
        let dispatcher = Dispatcher::new(prefix, loaded.into_plugins(), replies);
        Self { dispatcher, schedulers }
    }

    pub fn reminder_sets(&self) -> usize {
        self.schedulers.len()
    }

    /// Serve `source` until `interrupt` resolves.
    ///
    /// If the source closes first and reminders are running, they keep going
    /// until the interrupt. A failed interrupt listener is logged and never
    /// counts as an interrupt.
    pub async fn run_until<S, F>(self, source: &mut S, interrupt: F)
    where
        S: EventSource + ?Sized,
        F: Future<Output = io::Result<()>>,
    {
        let Self { dispatcher, schedulers } = self;
        let interrupt = interrupted(interrupt);
        tokio::pin!(interrupt);

        tokio::select! {
            _ = dispatcher.run(source) => {
                if !schedulers.is_empty() {
                    info!("Input closed, reminders keep running until interrupted");
                    interrupt.as_mut().await;
                }
            }
            _ = interrupt.as_mut() => {}
        }

        schedulers.shutdown().await;
    }
}

async fn interrupted<F: Future<Output = io::Result<()>>>(signal: F) {
    match signal.await {
        Ok(()) => info!("Interrupted"),
        Err(e) => {
            error!("Cannot listen for interrupts: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

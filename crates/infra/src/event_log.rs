//! Background consumer that writes every committed event to the trace log.

use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value as JsonValue;

use setu_events::{EventBus, EventEnvelope, Subscription};

type Envelope = EventEnvelope<JsonValue>;

/// Handle to the logging thread.
#[derive(Debug)]
pub struct EventLogHandle {
    shutdown: mpsc::Sender<()>,
    join: thread::JoinHandle<usize>,
}

impl EventLogHandle {
    /// Stop after logging what is already buffered; returns how many events
    /// were logged in total.
    pub fn shutdown(self) -> usize {
        let _ = self.shutdown.send(());
        self.join.join().unwrap_or(0)
    }

    /// Let the thread run until the bus itself goes away.
    pub fn detach(self) {
        drop(self.join);
    }
}

pub struct EventLog;

impl EventLog {
    /// Subscribe now and log on a named thread.
    ///
    /// Events published after this returns are never missed.
    pub fn spawn<B>(bus: &B) -> io::Result<EventLogHandle>
    where
        B: EventBus<Envelope> + ?Sized,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();
        let join = thread::Builder::new()
            .name("setu-event-log".to_string())
            .spawn(move || log_loop(sub, shutdown_rx))?;
        Ok(EventLogHandle {
            shutdown: shutdown_tx,
            join,
        })
    }
}

fn log_loop(sub: Subscription<Envelope>, shutdown_rx: mpsc::Receiver<()>) -> usize {
    let tick = Duration::from_millis(250);
    let mut logged = 0;
    loop {
        if shutdown_rx.try_recv().is_ok() {
            for envelope in sub.drain() {
                log(&envelope);
                logged += 1;
            }
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                log(&envelope);
                logged += 1;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!(logged, "event log stopped");
    logged
}

fn log(envelope: &Envelope) {
    tracing::info!(
        event_type = envelope.event_type(),
        aggregate_type = envelope.aggregate_type(),
        aggregate_id = %envelope.aggregate_id(),
        sequence = envelope.sequence_number(),
        "event committed"
    );
}

#[cfg(test)]
mod tests {
    use setu_auth::{Caller, Role};
    use setu_catalog::{Category, Condition, ListingDetails};
    use setu_core::UserId;

    use super::*;
    use crate::{EngineConfig, in_memory_marketplace};

    #[test]
    fn logs_everything_published_before_shutdown() {
        let (market, _store, bus) = in_memory_marketplace(EngineConfig::default());
        let handle = EventLog::spawn(&*bus).unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        let agency = Caller::new(UserId::new(), Role::Agency, "Port Customs", "port@example.com");
        let admin = Caller::new(UserId::new(), Role::Admin, "Admin", "admin@example.com");
        let listed = market
            .catalog
            .list_product(
                &agency,
                ListingDetails {
                    title: "Outboard motor".to_string(),
                    description: "Seized at the dock".to_string(),
                    category: Category::Vehicles,
                    original_price: 90_000,
                    selling_price: 40_000,
                    quantity: 1,
                    condition: Condition::Fair,
                    images: vec![],
                },
            )
            .unwrap();
        market.catalog.approve_product(&admin, listed.id_typed()).unwrap();

        assert_eq!(handle.shutdown(), 2);
    }

    #[test]
    fn stops_when_the_bus_is_dropped() {
        let (market, store, bus) = in_memory_marketplace(EngineConfig::default());
        let handle = EventLog::spawn(&*bus).unwrap();
        drop((market, store, bus));
        assert_eq!(handle.join.join().unwrap(), 0);
    }
}

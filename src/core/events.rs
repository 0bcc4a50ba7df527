use crate::core::errors::Error;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;
use std::fmt;
use std::sync::Mutex;

/*-------------------------------------------------------------------------------------------------
  Lifecycle Events
-------------------------------------------------------------------------------------------------*/

/// Lifecycle notification emitted by a [Resolver](crate::Resolver).
///
/// Subscribers receive every event emitted after their subscription was
/// created; see [Resolver::subscribe](crate::Resolver::subscribe).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Continuous mode is being entered.
    Starting,
    /// Continuous mode is active; the first refresh cycle has been triggered.
    Started,
    /// A refresh cycle began.
    StartingUpdate,
    /// The fetched document differs from the one the current tables were
    /// derived from.
    NewPrefixes,
    /// A refresh cycle completed and the new snapshot was published.
    CompletedUpdate,
    /// A refresh cycle failed; the previous snapshot remains in place.
    Error(Error),
    /// Cancellation was requested.
    Stopping,
    /// The pending timer was cancelled; no further cycle will be scheduled.
    Stopped,
}

impl Event {
    /// Stable, hyphenated event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Starting => "starting",
            Event::Started => "started",
            Event::StartingUpdate => "starting-update",
            Event::NewPrefixes => "new-prefixes",
            Event::CompletedUpdate => "completed-update",
            Event::Error(_) => "error",
            Event::Stopping => "stopping",
            Event::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/*-------------------------------------------------------------------------------------------------
  Event Sink
-------------------------------------------------------------------------------------------------*/

// Per-resolver subscriber fan-out. Senders whose receiver was dropped are
// pruned on the next emit.
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl EventSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> Receiver<Event> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().unwrap().push(sender);
        receiver
    }

    pub(crate) fn emit(&self, event: Event) {
        trace!("Event: {event}");
        self.subscribers
            .lock()
            .unwrap()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

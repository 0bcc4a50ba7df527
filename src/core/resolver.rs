use crate::core::errors::{Error, Result};
use crate::core::events::{Event, EventSink};
use crate::core::fetcher::{get_env_var, Fetcher, HttpFetcher};
use crate::core::prefix_entry::Resolution;
use crate::core::snapshot::Snapshot;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use std::net::IpAddr;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;
use std::time::Duration;

/*-------------------------------------------------------------------------------------------------
  Refresh State
-------------------------------------------------------------------------------------------------*/

/// Phase of the refresh state machine.
///
/// `Idle` means the resolver was never started or has been stopped;
/// `Scheduled` means the interval timer is armed; `Fetching` and `Indexing`
/// track an in-flight cycle. At most one cycle is ever in flight.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshState {
    Idle,
    Scheduled,
    Fetching,
    Indexing,
}

/*-------------------------------------------------------------------------------------------------
  Resolver Builder
-------------------------------------------------------------------------------------------------*/

/// A builder for the [Resolver] struct that allows you to customize the
/// fetcher capability, the refresh interval, and the service filter.
///
/// ```no_run
/// use std::time::Duration;
///
/// let mut builder = awsipresolver::ResolverBuilder::new();
/// builder
///     .interval(Duration::from_secs(300))
///     .service("EC2");
/// let resolver = builder.build();
/// ```
///
/// The [ResolverBuilder::new] method attempts to source configuration values
/// from environment variables when set and uses default values when the
/// environment variables are not set. Use [ResolverBuilder::default] to
/// ignore the environment.
#[derive(Clone)]
pub struct ResolverBuilder {
    fetcher: Option<Arc<dyn Fetcher>>,
    interval: Duration,
    service: String,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self {
            fetcher: None,
            interval: Duration::from_millis(600_000), // 10 minutes
            service: "AMAZON".to_string(),
        }
    }
}

impl ResolverBuilder {
    /// Create a new [ResolverBuilder] reading initial configuration values
    /// from environment variables when set and default values when the
    /// environment variables are not set.
    ///
    /// The environment variables used to set the initial configuration values
    /// are:
    /// - `AWSIPRESOLVER_INTERVAL_MS`
    /// - `AWSIPRESOLVER_SERVICE`
    pub fn new() -> Self {
        let default = ResolverBuilder::default();

        Self {
            fetcher: None,
            interval: Duration::from_millis(get_env_var(
                "AWSIPRESOLVER_INTERVAL_MS",
                default.interval.as_millis() as u64,
            )),
            service: get_env_var("AWSIPRESOLVER_SERVICE", default.service),
        }
    }

    /*-------------------------------------------------------------------------
      Setters
    -------------------------------------------------------------------------*/

    /// Set the fetcher capability used to retrieve the IP Ranges document;
    /// defaults to an [HttpFetcher] bound to the canonical endpoint. Any
    /// `Fn() -> Result<String> + Send + Sync` closure works:
    ///
    /// ```
    /// # const IP_RANGES_JSON: &str = r#"{"syncToken": "1640995200",
    /// #   "createDate": "2022-01-01-00-00-00",
    /// #   "prefixes": [{"ip_prefix": "54.213.0.0/16", "region": "us-west-2",
    /// #     "network_border_group": "us-west-2", "service": "AMAZON"}],
    /// #   "ipv6_prefixes": []}"#;
    /// let mut builder = awsipresolver::ResolverBuilder::default();
    /// builder.fetcher(|| -> awsipresolver::Result<String> { Ok(IP_RANGES_JSON.to_string()) });
    /// let resolver = builder.build();
    ///
    /// resolver.refresh_once()?;
    /// let resolution = resolver.lookup("54.213.70.216")?;
    /// assert_eq!(resolution.region.as_ref(), "us-west-2");
    /// # Ok::<(), awsipresolver::Error>(())
    /// ```
    pub fn fetcher(&mut self, fetcher: impl Fetcher + 'static) -> &mut Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Set the delay between scheduled refresh cycles; defaults to 600,000
    /// milliseconds (10 minutes).
    pub fn interval(&mut self, interval: Duration) -> &mut Self {
        self.interval = interval;
        self
    }

    /// Set the service filter; defaults to `"AMAZON"`. The value is
    /// normalized to uppercase.
    pub fn service(&mut self, service: &str) -> &mut Self {
        self.service = service.to_string();
        self
    }

    /*-------------------------------------------------------------------------
      Build Method
    -------------------------------------------------------------------------*/

    pub fn build(&self) -> Resolver {
        let fetcher = self
            .fetcher
            .clone()
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()));

        Resolver {
            inner: Arc::new(Inner {
                fetcher,
                interval: self.interval,
                service: Mutex::new(self.service.to_uppercase()),
                state: RwLock::new(None),
                events: EventSink::new(),
                control: Mutex::new(Control {
                    running: false,
                    refresh: RefreshState::Idle,
                }),
                timer: Condvar::new(),
                cycle: Mutex::new(()),
            }),
        }
    }
}

/*-------------------------------------------------------------------------------------------------
  Resolver
-------------------------------------------------------------------------------------------------*/

/// Resolves IP addresses to the AWS region and service that announced them,
/// against a periodically refreshed snapshot of the published AWS IP Ranges.
///
/// Lookups may be invoked concurrently from any number of threads; each
/// observes a complete snapshot published by the most recent successful
/// refresh. `Resolver` is cheaply cloneable; clones share the same state,
/// schedule, and subscribers.
///
/// ```no_run
/// let resolver = awsipresolver::Resolver::new();
///
/// // Warm up, then resolve.
/// resolver.refresh_once()?;
/// let resolution = resolver.lookup("54.213.70.216")?;
/// println!("{} / {}", resolution.region, resolution.service);
///
/// // Or keep the tables fresh in the background.
/// resolver.start();
/// // ...
/// resolver.stop();
/// # Ok::<(), awsipresolver::Error>(())
/// ```
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    interval: Duration,
    service: Mutex<String>,
    state: RwLock<Option<Arc<Snapshot>>>,
    events: EventSink,
    control: Mutex<Control>,
    timer: Condvar,
    cycle: Mutex<()>,
}

struct Control {
    running: bool,
    refresh: RefreshState,
}

impl Default for Resolver {
    fn default() -> Self {
        ResolverBuilder::default().build()
    }
}

impl Resolver {
    /// Create a [Resolver] with the [ResolverBuilder::new] configuration: the
    /// built-in HTTP fetcher of the canonical endpoint, a 10-minute refresh
    /// interval, and the `"AMAZON"` service filter, each overridable through
    /// environment variables.
    pub fn new() -> Self {
        ResolverBuilder::new().build()
    }

    /*-------------------------------------------------------------------------
      Lookup
    -------------------------------------------------------------------------*/

    /// Resolve an IP address literal to the region and service of the first
    /// published prefix, in document order, that contains it.
    ///
    /// Fails with [Error::NoDataYet] before the first successful refresh,
    /// [Error::InvalidAddress] when the input is not a parsable IPv4/IPv6
    /// literal, and [Error::NotFound] when no prefix of the configured
    /// service covers the address.
    pub fn lookup(&self, ip: &str) -> Result<Resolution> {
        let snapshot = self
            .inner
            .state
            .read()
            .unwrap()
            .clone()
            .ok_or(Error::NoDataYet)?;

        let address: IpAddr = ip
            .parse()
            .map_err(|_| Error::InvalidAddress(ip.to_string()))?;

        snapshot.resolve(address).ok_or_else(|| Error::NotFound {
            service: snapshot.service().to_string(),
        })
    }

    /*-------------------------------------------------------------------------
      Refresh Lifecycle
    -------------------------------------------------------------------------*/

    /// Enter continuous mode: trigger the first refresh cycle immediately and
    /// re-arm the interval timer after each cycle completes, until
    /// [stop](Resolver::stop) is called. Emits [Event::Starting] and
    /// [Event::Started]. Calling `start` while already running has no effect.
    pub fn start(&self) {
        {
            let mut control = self.inner.control.lock().unwrap();
            if control.running {
                debug!("Resolver is already running");
                return;
            }
            control.running = true;
            control.refresh = RefreshState::Scheduled;
        }

        self.inner.events.emit(Event::Starting);

        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("awsipresolver-refresh".to_string())
            .spawn(move || refresh_worker(inner))
            .expect("failed to spawn refresh worker thread");

        self.inner.events.emit(Event::Started);
    }

    /// Run exactly one refresh cycle on the calling thread, without entering
    /// continuous mode, and return the cycle's result. Used for initial
    /// warm-up or a manual refresh. The cycle emits the same events a
    /// scheduled cycle does.
    pub fn refresh_once(&self) -> Result<()> {
        run_cycle(&self.inner)
    }

    /// Leave continuous mode: cancel any pending timer so no further cycle is
    /// scheduled. Emits [Event::Stopping] and [Event::Stopped]. A cycle
    /// already fetching or indexing is not interrupted; it completes (or
    /// fails) in the background and no cycle follows it.
    pub fn stop(&self) {
        self.inner.events.emit(Event::Stopping);

        {
            let mut control = self.inner.control.lock().unwrap();
            control.running = false;
            if control.refresh == RefreshState::Scheduled {
                control.refresh = RefreshState::Idle;
            }
        }
        self.inner.timer.notify_all();

        self.inner.events.emit(Event::Stopped);
    }

    /*-------------------------------------------------------------------------
      Service Filter
    -------------------------------------------------------------------------*/

    /// Change the service filter and re-derive both lookup tables from the
    /// last fetched raw document. No network fetch is performed; when no
    /// document has been fetched yet only the configured filter changes.
    /// The value is normalized to uppercase.
    pub fn set_service(&self, service: &str) -> Result<()> {
        let service = service.to_uppercase();

        let previous = self.inner.state.read().unwrap().clone();
        let rebuilt = match previous {
            Some(previous) => Some(Snapshot::build(
                Arc::clone(previous.raw_json()),
                &service,
            )?),
            None => None,
        };

        let mut current = self.inner.service.lock().unwrap();
        info!("Service filter changed: {} -> {}", *current, service);
        *current = service;
        if let Some(snapshot) = rebuilt {
            *self.inner.state.write().unwrap() = Some(Arc::new(snapshot));
        }

        Ok(())
    }

    /*-------------------------------------------------------------------------
      Getters
    -------------------------------------------------------------------------*/

    /// Get the configured service filter.
    pub fn service(&self) -> String {
        self.inner.service.lock().unwrap().clone()
    }

    /// Get the configured delay between scheduled refresh cycles.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Get the current phase of the refresh state machine.
    pub fn refresh_state(&self) -> RefreshState {
        self.inner.control.lock().unwrap().refresh
    }

    /// Get the currently published snapshot, if any successful refresh has
    /// completed.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.state.read().unwrap().clone()
    }

    /// Subscribe to lifecycle events. Each subscriber receives every event
    /// emitted after the subscription was created, in emission order.
    pub fn subscribe(&self) -> Receiver<Event> {
        self.inner.events.subscribe()
    }
}

/*-------------------------------------------------------------------------------------------------
  Refresh Worker
-------------------------------------------------------------------------------------------------*/

// Flat scheduler loop: run a cycle, then sleep on the control condvar until
// the interval elapses or `stop` wakes it. The next timer is armed only after
// the current cycle fully completes, so cycles are strictly serialized.
fn refresh_worker(inner: Arc<Inner>) {
    debug!("Refresh worker started");

    loop {
        let _ = run_cycle(&inner);

        let control = inner.control.lock().unwrap();
        if !control.running {
            break;
        }
        let (control, _timeout) = inner
            .timer
            .wait_timeout_while(control, inner.interval, |control| control.running)
            .unwrap();
        if !control.running {
            break;
        }
    }

    debug!("Refresh worker stopped");
}

/*-------------------------------------------------------------------------------------------------
  Refresh Cycle
-------------------------------------------------------------------------------------------------*/

/// Run one fetch-index-publish cycle and emit its lifecycle events. A failed
/// cycle leaves the published snapshot untouched; in continuous mode the
/// schedule continues on the normal interval afterwards.
fn run_cycle(inner: &Inner) -> Result<()> {
    let _in_flight = inner.cycle.lock().unwrap();

    inner.events.emit(Event::StartingUpdate);
    let result = try_cycle(inner);

    {
        let mut control = inner.control.lock().unwrap();
        control.refresh = if control.running {
            RefreshState::Scheduled
        } else {
            RefreshState::Idle
        };
    }

    match result {
        Ok(()) => {
            inner.events.emit(Event::CompletedUpdate);
            Ok(())
        }
        Err(error) => {
            warn!("Refresh cycle failed: {}", error);
            inner.events.emit(Event::Error(error.clone()));
            Err(error)
        }
    }
}

fn try_cycle(inner: &Inner) -> Result<()> {
    set_refresh_state(inner, RefreshState::Fetching);
    let raw_json = inner.fetcher.fetch()?;

    let service = inner.service.lock().unwrap().clone();
    let previous = inner.state.read().unwrap().clone();

    let changed = previous
        .as_ref()
        .map_or(true, |snapshot| snapshot.raw_json().as_ref() != raw_json.as_str());
    if changed {
        inner.events.emit(Event::NewPrefixes);
    }

    set_refresh_state(inner, RefreshState::Indexing);
    let snapshot = Snapshot::build(Arc::from(raw_json), &service)?;
    info!(
        "Published {} IPv4 and {} IPv6 {} prefixes (sync token {})",
        snapshot.ipv4().len(),
        snapshot.ipv6().len(),
        snapshot.service(),
        snapshot.sync_token()
    );

    *inner.state.write().unwrap() = Some(Arc::new(snapshot));
    Ok(())
}

fn set_refresh_state(inner: &Inner, refresh: RefreshState) {
    inner.control.lock().unwrap().refresh = refresh;
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

use awsipresolver::{Error, Event, RefreshState, Resolver, ResolverBuilder, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/*-------------------------------------------------------------------------------------------------
  Resolver Scenario Tests
-------------------------------------------------------------------------------------------------*/

/*--------------------------------------------------------------------------------------
  Test Fixtures
--------------------------------------------------------------------------------------*/

const IP_RANGES_JSON: &str = r#"{
  "syncToken": "1640995200",
  "createDate": "2022-01-01-00-00-00",
  "prefixes": [
    {
      "ip_prefix": "13.32.0.0/15",
      "region": "GLOBAL",
      "network_border_group": "GLOBAL",
      "service": "AMAZON"
    },
    {
      "ip_prefix": "54.213.0.0/16",
      "region": "us-west-2",
      "network_border_group": "us-west-2",
      "service": "AMAZON"
    },
    {
      "ip_prefix": "54.213.0.0/16",
      "region": "us-west-2",
      "network_border_group": "us-west-2",
      "service": "EC2"
    },
    {
      "ip_prefix": "52.94.76.0/22",
      "region": "us-west-2",
      "network_border_group": "us-west-2",
      "service": "S3"
    }
  ],
  "ipv6_prefixes": [
    {
      "ipv6_prefix": "2600:1f14::/35",
      "region": "us-west-2",
      "network_border_group": "us-west-2",
      "service": "AMAZON"
    },
    {
      "ipv6_prefix": "2600:1f14::/35",
      "region": "us-west-2",
      "network_border_group": "us-west-2",
      "service": "EC2"
    },
    {
      "ipv6_prefix": "2a05:d000:4000::/40",
      "region": "eu-central-1",
      "network_border_group": "eu-central-1",
      "service": "EC2"
    }
  ]
}"#;

/// Resolver backed by a static in-memory document, warmed with one refresh.
fn warmed_resolver() -> Resolver {
    let mut builder = ResolverBuilder::default();
    builder.fetcher(|| -> Result<String> { Ok(IP_RANGES_JSON.to_string()) });
    let resolver = builder.build();
    resolver.refresh_once().unwrap();
    resolver
}

/// Resolver that counts fetches and refreshes on a short interval.
fn counting_resolver(interval: Duration) -> (Resolver, Arc<AtomicUsize>) {
    let fetch_count = Arc::new(AtomicUsize::new(0));
    let fetcher_count = Arc::clone(&fetch_count);

    let mut builder = ResolverBuilder::default();
    builder
        .interval(interval)
        .fetcher(move || -> Result<String> {
            fetcher_count.fetch_add(1, Ordering::SeqCst);
            Ok(IP_RANGES_JSON.to_string())
        });

    (builder.build(), fetch_count)
}

/// Wait, bounded, until the condition holds.
fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/*--------------------------------------------------------------------------------------
  Lookup
--------------------------------------------------------------------------------------*/

#[test]
fn resolves_ipv4_address_to_region_and_service() {
    let resolver = warmed_resolver();

    let resolution = resolver.lookup("54.213.70.216").unwrap();
    assert_eq!(resolution.region.as_ref(), "us-west-2");
    assert_eq!(resolution.service.as_ref(), "AMAZON");
}

#[test]
fn resolves_ipv6_address_to_region_and_service() {
    let resolver = warmed_resolver();

    let resolution = resolver.lookup("2600:1f14::1").unwrap();
    assert_eq!(resolution.region.as_ref(), "us-west-2");
    assert_eq!(resolution.service.as_ref(), "AMAZON");
}

#[test]
fn overlapping_ranges_resolve_to_the_first_document_entry() {
    let resolver = warmed_resolver();

    // 13.33.0.0 is inside 13.32.0.0/15, announced GLOBAL.
    let resolution = resolver.lookup("13.33.0.0").unwrap();
    assert_eq!(resolution.region.as_ref(), "GLOBAL");
}

#[test]
fn lookup_before_any_refresh_is_no_data_yet_not_not_found() {
    let mut builder = ResolverBuilder::default();
    builder.fetcher(|| -> Result<String> { Ok(IP_RANGES_JSON.to_string()) });
    let resolver = builder.build();

    assert_eq!(resolver.lookup("54.213.70.216"), Err(Error::NoDataYet));
}

#[test]
fn lookup_of_unparsable_input_is_invalid_address() {
    let resolver = warmed_resolver();

    assert_eq!(
        resolver.lookup("not-an-ip"),
        Err(Error::InvalidAddress("not-an-ip".to_string()))
    );
}

#[test]
fn lookup_outside_all_ranges_names_the_configured_service() {
    let resolver = warmed_resolver();

    let error = resolver.lookup("104.16.40.2").unwrap_err();
    assert_eq!(
        error,
        Error::NotFound {
            service: "AMAZON".to_string()
        }
    );
    assert!(error.to_string().contains("AMAZON"));
}

/*--------------------------------------------------------------------------------------
  Service Filter
--------------------------------------------------------------------------------------*/

#[test]
fn changing_the_service_filter_reindexes_without_a_new_fetch() {
    let (resolver, fetch_count) = counting_resolver(Duration::from_millis(600_000));
    resolver.refresh_once().unwrap();
    assert_eq!(fetch_count.load(Ordering::SeqCst), 1);

    resolver.set_service("EC2").unwrap();
    let resolution = resolver.lookup("54.213.70.216").unwrap();
    assert_eq!(resolution.region.as_ref(), "us-west-2");
    assert_eq!(resolution.service.as_ref(), "EC2");

    // Same raw document, no additional fetch.
    assert_eq!(fetch_count.load(Ordering::SeqCst), 1);
}

#[test]
fn wrong_service_filter_fails_lookup_with_that_service_in_the_message() {
    let resolver = warmed_resolver();
    resolver.set_service("S3").unwrap();

    let error = resolver.lookup("2600:1f14::1").unwrap_err();
    assert_eq!(
        error,
        Error::NotFound {
            service: "S3".to_string()
        }
    );
    assert!(error.to_string().contains("S3"));
}

/*--------------------------------------------------------------------------------------
  Failed Refresh Cycles
--------------------------------------------------------------------------------------*/

#[test]
fn failed_refresh_keeps_serving_the_previous_snapshot() {
    let fetch_count = Arc::new(AtomicUsize::new(0));
    let fetcher_count = Arc::clone(&fetch_count);

    let mut builder = ResolverBuilder::default();
    builder.fetcher(move || -> Result<String> {
        if fetcher_count.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(IP_RANGES_JSON.to_string())
        } else {
            Err(Error::Fetch("connection reset".to_string()))
        }
    });
    let resolver = builder.build();

    resolver.refresh_once().unwrap();
    assert!(resolver.refresh_once().is_err());

    let resolution = resolver.lookup("54.213.70.216").unwrap();
    assert_eq!(resolution.region.as_ref(), "us-west-2");
}

#[test]
fn continuous_mode_keeps_refreshing_after_a_failed_cycle() {
    let fetch_count = Arc::new(AtomicUsize::new(0));
    let fetcher_count = Arc::clone(&fetch_count);

    let mut builder = ResolverBuilder::default();
    builder
        .interval(Duration::from_millis(10))
        .fetcher(move || -> Result<String> {
            // Every other fetch fails; a single bad fetch must not stop the
            // schedule.
            if fetcher_count.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                Err(Error::Fetch("connection reset".to_string()))
            } else {
                Ok(IP_RANGES_JSON.to_string())
            }
        });
    let resolver = builder.build();

    resolver.start();
    wait_for(|| fetch_count.load(Ordering::SeqCst) >= 4);
    resolver.stop();

    assert!(resolver.lookup("54.213.70.216").is_ok());
}

/*--------------------------------------------------------------------------------------
  Scheduling and Lifecycle Events
--------------------------------------------------------------------------------------*/

#[test]
fn start_triggers_the_first_cycle_immediately_and_reschedules() {
    let (resolver, fetch_count) = counting_resolver(Duration::from_millis(10));

    resolver.start();
    wait_for(|| fetch_count.load(Ordering::SeqCst) >= 3);
    resolver.stop();
}

#[test]
fn stop_prevents_any_further_refresh_cycles() {
    let (resolver, fetch_count) = counting_resolver(Duration::from_millis(10));

    resolver.start();
    wait_for(|| fetch_count.load(Ordering::SeqCst) >= 2);
    resolver.stop();

    // Let any in-flight cycle complete, then confirm the schedule is dead.
    std::thread::sleep(Duration::from_millis(50));
    let settled_count = fetch_count.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(fetch_count.load(Ordering::SeqCst), settled_count);
    assert_eq!(resolver.refresh_state(), RefreshState::Idle);
}

#[test]
fn no_starting_update_events_after_stop_settles() {
    let (resolver, fetch_count) = counting_resolver(Duration::from_millis(10));
    let events = resolver.subscribe();

    resolver.start();
    wait_for(|| fetch_count.load(Ordering::SeqCst) >= 2);
    resolver.stop();

    // Drain everything emitted up to (and including) the in-flight cycle.
    std::thread::sleep(Duration::from_millis(50));
    let drained: Vec<Event> = events.try_iter().collect();
    assert!(drained.contains(&Event::Starting));
    assert!(drained.contains(&Event::Started));
    assert!(drained.contains(&Event::StartingUpdate));
    assert!(drained.contains(&Event::CompletedUpdate));
    assert!(drained.contains(&Event::Stopping));
    assert!(drained.contains(&Event::Stopped));

    // Nothing further arrives once the schedule is cancelled.
    std::thread::sleep(Duration::from_millis(100));
    let trailing: Vec<Event> = events.try_iter().collect();
    assert!(!trailing.contains(&Event::StartingUpdate));
}

#[test]
fn one_shot_refresh_emits_cycle_events_and_does_not_reschedule() {
    let (resolver, fetch_count) = counting_resolver(Duration::from_millis(10));
    let events = resolver.subscribe();

    resolver.refresh_once().unwrap();

    let received: Vec<Event> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            Event::StartingUpdate,
            Event::NewPrefixes,
            Event::CompletedUpdate
        ]
    );

    // No timer was armed.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(fetch_count.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.refresh_state(), RefreshState::Idle);
}

#[test]
fn refetching_an_identical_document_does_not_announce_new_prefixes() {
    let (resolver, _fetch_count) = counting_resolver(Duration::from_millis(600_000));
    resolver.refresh_once().unwrap();

    let events = resolver.subscribe();
    resolver.refresh_once().unwrap();

    let received: Vec<Event> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![Event::StartingUpdate, Event::CompletedUpdate]
    );
}

#[test]
fn error_events_carry_the_cycle_failure() {
    let mut builder = ResolverBuilder::default();
    builder.fetcher(|| -> Result<String> { Err(Error::Fetch("timed out".to_string())) });
    let resolver = builder.build();

    let events = resolver.subscribe();
    assert!(resolver.refresh_once().is_err());

    let received: Vec<Event> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            Event::StartingUpdate,
            Event::Error(Error::Fetch("timed out".to_string()))
        ]
    );
}

/*--------------------------------------------------------------------------------------
  Concurrent Lookups
--------------------------------------------------------------------------------------*/

#[test]
fn lookups_from_many_threads_observe_consistent_snapshots() {
    let (resolver, fetch_count) = counting_resolver(Duration::from_millis(5));
    resolver.refresh_once().unwrap();
    resolver.start();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let resolver = resolver.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..200 {
                // Every observed snapshot is complete: both lookups succeed
                // against the same generation at all times.
                let ipv4 = resolver.lookup("54.213.70.216").unwrap();
                assert_eq!(ipv4.region.as_ref(), "us-west-2");
                let ipv6 = resolver.lookup("2600:1f14::1").unwrap();
                assert_eq!(ipv6.region.as_ref(), "us-west-2");
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    resolver.stop();
    assert!(fetch_count.load(Ordering::SeqCst) >= 1);
}

//! Resolve IP addresses to the AWS region and service that announced them.
//!
//! A [Resolver] keeps an in-memory snapshot of the published
//! [AWS IP Ranges](https://docs.aws.amazon.com/vpc/latest/userguide/aws-ip-ranges.html),
//! filtered to one service tag, and answers membership lookups against it:
//!
//! ```no_run
//! let resolver = awsipresolver::Resolver::new();
//!
//! // Warm up with a single refresh, then resolve addresses.
//! resolver.refresh_once()?;
//! let resolution = resolver.lookup("54.213.70.216")?;
//! println!("{} / {}", resolution.region, resolution.service);
//!
//! // Or keep the snapshot fresh on an interval until stopped.
//! resolver.start();
//! // ...
//! resolver.stop();
//! # Ok::<(), awsipresolver::Error>(())
//! ```
//!
//! Refresh cycles are observable through [Resolver::subscribe], which yields
//! typed lifecycle [Event]s. The document source is a pluggable [Fetcher]
//! capability; the default [HttpFetcher] retrieves the canonical JSON
//! endpoint.

/*-------------------------------------------------------------------------------------------------
  Library Modules and Interface
-------------------------------------------------------------------------------------------------*/

mod core;

pub use crate::core::errors::{Error, Result};
pub use crate::core::events::Event;
pub use crate::core::fetcher::{Fetcher, HttpFetcher};
pub use crate::core::prefix_entry::{PrefixEntry, Resolution};
pub use crate::core::prefix_table::PrefixTable;
pub use crate::core::resolver::{RefreshState, Resolver, ResolverBuilder};
pub use crate::core::snapshot::Snapshot;

// Re-export the `ipnetwork` crate, whose types are used in the public API.
pub use ipnetwork;

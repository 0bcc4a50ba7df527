use awsipresolver::{HttpFetcher, ResolverBuilder};
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

mod cli;

/*-------------------------------------------------------------------------------------------------
  Main CLI Entry Point
-------------------------------------------------------------------------------------------------*/

fn main() -> ExitCode {
    // Parse CLI arguments
    let args = cli::Args::parse();

    // Configure logging
    stderrlog::new()
        .module(module_path!())
        .module("awsipresolver")
        .verbosity(args.verbose.log_level_filter())
        .init()
        .unwrap();

    // Build the resolver
    let mut builder = ResolverBuilder::new();
    builder.service(&args.service);
    if let Some(url) = &args.url {
        let mut fetcher = HttpFetcher::new();
        fetcher.url(url);
        builder.fetcher(fetcher);
    }
    let resolver = builder.build();

    // Retrieve and index the AWS IP Ranges
    if let Err(fetch_error) = resolver.refresh_once() {
        error!("{}", fetch_error);
        return ExitCode::FAILURE;
    }

    if let Some(snapshot) = resolver.snapshot() {
        info!(
            "AWS IP Ranges published {} (sync token {}): {} IPv4 and {} IPv6 {} prefixes",
            snapshot.create_date(),
            snapshot.sync_token(),
            snapshot.ipv4().len(),
            snapshot.ipv6().len(),
            snapshot.service()
        );
    }

    // Resolve the requested addresses
    let mut resolutions = Vec::new();
    let mut failures = 0;
    for address in &args.addresses {
        match resolver.lookup(address) {
            Ok(resolution) => resolutions.push((address.clone(), resolution)),
            Err(lookup_error) => {
                error!("{}: {}", address, lookup_error);
                failures += 1;
            }
        }
    }

    if !resolutions.is_empty() {
        cli::output::resolution_table(&resolutions);
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

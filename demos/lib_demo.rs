use awsipresolver::{Resolver, Result};

fn main() -> Result<()> {
    let resolver = Resolver::new();

    // Listen for lifecycle events
    let events = resolver.subscribe();

    // Retrieve and index the AWS IP Ranges
    resolver.refresh_once()?;
    for event in events.try_iter() {
        println!("event: {event}");
    }

    // Resolve addresses against the AMAZON ranges
    let resolution = resolver.lookup("54.213.70.216")?;
    println!("54.213.70.216 -> {} / {}", resolution.region, resolution.service);

    // Narrow the filter to EC2 prefixes; no new fetch required
    resolver.set_service("EC2")?;
    let resolution = resolver.lookup("54.213.70.216")?;
    println!("54.213.70.216 -> {} / {}", resolution.region, resolution.service);

    Ok(())
}

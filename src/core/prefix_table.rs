use crate::core::errors::{Error, Result};
use crate::core::json::JsonIpRanges;
use crate::core::prefix_entry::PrefixEntry;
use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use log::debug;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

/*-------------------------------------------------------------------------------------------------
  Prefix Table
-------------------------------------------------------------------------------------------------*/

/// Ordered membership table for one address family and one service filter.
///
/// Entries keep the order they appear in the source document; overlapping
/// ranges are resolved by first-match-in-document-order, not by prefix
/// specificity. Tables are rebuilt wholesale on every refresh and never
/// mutated incrementally.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrefixTable {
    entries: Vec<PrefixEntry>,
}

impl PrefixTable {
    /// Find the first entry, in document order, whose network contains the
    /// address. Linear scan; tables hold a few thousand entries at most.
    pub fn find(&self, address: IpAddr) -> Option<&PrefixEntry> {
        self.entries
            .iter()
            .find(|entry| entry.prefix.contains(address))
    }

    pub fn entries(&self) -> &[PrefixEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<PrefixEntry>> for PrefixTable {
    fn from(entries: Vec<PrefixEntry>) -> Self {
        Self { entries }
    }
}

/*-------------------------------------------------------------------------------------------------
  Build Prefix Tables
-------------------------------------------------------------------------------------------------*/

/// Build the (IPv4, IPv6) table pair from a parsed document.
///
/// Entries whose service does not match the filter are skipped before their
/// CIDR string is ever parsed; a retained entry with a malformed CIDR fails
/// the whole build so a refresh never publishes partial data.
pub(crate) fn build_tables(
    document: &JsonIpRanges<'_>,
    service: &str,
) -> Result<(PrefixTable, PrefixTable)> {
    let mut shared_strings: BTreeSet<Arc<str>> = BTreeSet::new();

    let mut ipv4_entries: Vec<PrefixEntry> = Vec::new();
    for json_prefix in &document.prefixes {
        if !json_prefix.service.eq_ignore_ascii_case(service) {
            continue;
        }
        let network: Ipv4Network = json_prefix
            .ip_prefix
            .parse()
            .map_err(|error: ipnetwork::IpNetworkError| Error::PrefixParse {
                prefix: json_prefix.ip_prefix.to_string(),
                reason: error.to_string(),
            })?;
        ipv4_entries.push(PrefixEntry {
            prefix: IpNetwork::V4(network),
            region: intern(json_prefix.region, &mut shared_strings),
            service: intern(json_prefix.service, &mut shared_strings),
        });
    }

    let mut ipv6_entries: Vec<PrefixEntry> = Vec::new();
    for json_ipv6_prefix in &document.ipv6_prefixes {
        if !json_ipv6_prefix.service.eq_ignore_ascii_case(service) {
            continue;
        }
        let network: Ipv6Network = json_ipv6_prefix
            .ipv6_prefix
            .parse()
            .map_err(|error: ipnetwork::IpNetworkError| Error::PrefixParse {
                prefix: json_ipv6_prefix.ipv6_prefix.to_string(),
                reason: error.to_string(),
            })?;
        ipv6_entries.push(PrefixEntry {
            prefix: IpNetwork::V6(network),
            region: intern(json_ipv6_prefix.region, &mut shared_strings),
            service: intern(json_ipv6_prefix.service, &mut shared_strings),
        });
    }

    debug!(
        "Indexed {} document entries into {} IPv4 and {} IPv6 {} prefixes",
        document.prefixes.len() + document.ipv6_prefixes.len(),
        ipv4_entries.len(),
        ipv6_entries.len(),
        service
    );

    Ok((PrefixTable::from(ipv4_entries), PrefixTable::from(ipv6_entries)))
}

/*-------------------------------------------------------------------------------------------------
  Helper Functions
-------------------------------------------------------------------------------------------------*/

// Region and service strings repeat across thousands of entries; hand out one
// shared allocation per distinct value.
fn intern(value: &str, shared_strings: &mut BTreeSet<Arc<str>>) -> Arc<str> {
    if let Some(found) = shared_strings.get(value) {
        return Arc::clone(found);
    }
    let value: Arc<str> = Arc::from(value);
    shared_strings.insert(Arc::clone(&value));
    value
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

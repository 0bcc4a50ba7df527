use ipnetwork::IpNetwork;
use std::sync::Arc;

/*-------------------------------------------------------------------------------------------------
  Prefix Entry
-------------------------------------------------------------------------------------------------*/

/// One published address range retained by the service filter.
///
/// Region and service strings are reference-counted and shared across the
/// entries of a table generation; entries are immutable once constructed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrefixEntry {
    /// IPv4 or IPv6 network the range covers.
    pub prefix: IpNetwork,

    /// AWS region the range is announced from.
    pub region: Arc<str>,

    /// AWS service tag the range is published under.
    pub service: Arc<str>,
}

/*-------------------------------------------------------------------------------------------------
  Resolution
-------------------------------------------------------------------------------------------------*/

/// Successful lookup result: the region and service of the first prefix, in
/// document order, that contains the address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    pub region: Arc<str>,
    pub service: Arc<str>,
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

use crate::core::errors::Result;
use crate::core::json;
use crate::core::prefix_entry::Resolution;
use crate::core::prefix_table::{self, PrefixTable};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;

/*-------------------------------------------------------------------------------------------------
  Snapshot
-------------------------------------------------------------------------------------------------*/

/// One refresh generation: the (IPv4, IPv6) table pair, the raw document both
/// tables were derived from, and the document's publication metadata.
///
/// A snapshot is built fully off to the side and then published with a single
/// reference swap, so concurrent lookups always observe a complete,
/// self-consistent generation — never a table mid-construction. A failed
/// refresh leaves the previously published snapshot in place.
#[derive(Clone, Debug)]
pub struct Snapshot {
    service: Arc<str>,
    raw_json: Arc<str>,
    sync_token: String,
    create_date: DateTime<Utc>,
    ipv4: PrefixTable,
    ipv6: PrefixTable,
}

impl Snapshot {
    /// Parse the raw document and index both address families for `service`.
    pub(crate) fn build(raw_json: Arc<str>, service: &str) -> Result<Self> {
        let document = json::parse(&raw_json)?;
        let (ipv4, ipv6) = prefix_table::build_tables(&document, service)?;
        let sync_token = document.sync_token.to_string();
        let create_date = document.create_date;

        Ok(Self {
            service: Arc::from(service),
            sync_token,
            create_date,
            raw_json,
            ipv4,
            ipv6,
        })
    }

    /// Resolve an address against the table matching its family. Returns the
    /// first match in document order, or `None` when no retained prefix
    /// covers the address.
    pub fn resolve(&self, address: IpAddr) -> Option<Resolution> {
        let table = match address {
            IpAddr::V4(_) => &self.ipv4,
            IpAddr::V6(_) => &self.ipv6,
        };

        table.find(address).map(|entry| Resolution {
            region: Arc::clone(&entry.region),
            service: Arc::clone(&entry.service),
        })
    }

    /// The service filter the tables were derived with.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The raw JSON document this generation was derived from.
    pub(crate) fn raw_json(&self) -> &Arc<str> {
        &self.raw_json
    }

    /// The document's publication time, in Unix epoch time format.
    pub fn sync_token(&self) -> &str {
        &self.sync_token
    }

    pub fn create_date(&self) -> &DateTime<Utc> {
        &self.create_date
    }

    pub fn ipv4(&self) -> &PrefixTable {
        &self.ipv4
    }

    pub fn ipv6(&self) -> &PrefixTable {
        &self.ipv6
    }
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Error;

    /*----------------------------------------------------------------------------------
      Test Helper Functions
    ----------------------------------------------------------------------------------*/

    fn test_document_json() -> Arc<str> {
        Arc::from(
            r#"{
              "syncToken": "1640995200",
              "createDate": "2022-01-01-00-00-00",
              "prefixes": [
                {
                  "ip_prefix": "54.213.0.0/16",
                  "region": "us-west-2",
                  "network_border_group": "us-west-2",
                  "service": "AMAZON"
                }
              ],
              "ipv6_prefixes": [
                {
                  "ipv6_prefix": "2600:1f14::/35",
                  "region": "us-west-2",
                  "network_border_group": "us-west-2",
                  "service": "AMAZON"
                }
              ]
            }"#,
        )
    }

    /*----------------------------------------------------------------------------------
      Snapshot
    ----------------------------------------------------------------------------------*/

    #[test]
    fn test_build_snapshot() {
        let snapshot = Snapshot::build(test_document_json(), "AMAZON").unwrap();

        assert_eq!(snapshot.service(), "AMAZON");
        assert_eq!(snapshot.sync_token(), "1640995200");
        assert_eq!(snapshot.ipv4().len(), 1);
        assert_eq!(snapshot.ipv6().len(), 1);
    }

    #[test]
    fn test_build_snapshot_rejects_invalid_json() {
        let result = Snapshot::build(Arc::from("not json"), "AMAZON");
        assert!(matches!(result, Err(Error::DocumentParse(_))));
    }

    #[test]
    fn test_resolve_selects_table_by_family() {
        let snapshot = Snapshot::build(test_document_json(), "AMAZON").unwrap();

        let ipv4 = snapshot.resolve("54.213.70.216".parse().unwrap()).unwrap();
        assert_eq!(ipv4.region.as_ref(), "us-west-2");

        let ipv6 = snapshot.resolve("2600:1f14::1".parse().unwrap()).unwrap();
        assert_eq!(ipv6.region.as_ref(), "us-west-2");
    }

    #[test]
    fn test_resolve_no_match() {
        let snapshot = Snapshot::build(test_document_json(), "AMAZON").unwrap();

        assert!(snapshot.resolve("192.0.2.1".parse().unwrap()).is_none());
        assert!(snapshot.resolve("2001:db8::1".parse().unwrap()).is_none());
    }

    #[test]
    fn test_rebuild_with_different_service_changes_visibility() {
        let raw_json = test_document_json();

        let amazon = Snapshot::build(Arc::clone(&raw_json), "AMAZON").unwrap();
        assert_eq!(amazon.ipv4().len(), 1);

        let s3 = Snapshot::build(raw_json, "S3").unwrap();
        assert!(s3.ipv4().is_empty());
        assert!(s3.ipv6().is_empty());
    }
}

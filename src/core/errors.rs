/*-------------------------------------------------------------------------------------------------
  Errors and Results
-------------------------------------------------------------------------------------------------*/

/// Errors surfaced by the resolver.
///
/// The first three kinds ([Fetch](Error::Fetch), [DocumentParse](Error::DocumentParse),
/// [PrefixParse](Error::PrefixParse)) occur inside a refresh cycle; they are reported through the
/// [Error event](crate::Event::Error) and never tear down the refresh schedule. The remaining
/// kinds are returned synchronously to [lookup](crate::Resolver::lookup) callers.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The IP Ranges document could not be retrieved: transport failure or a
    /// non-2xx response status.
    #[error("failed to fetch IP ranges: {0}")]
    Fetch(String),

    /// The retrieved document body is not valid JSON, or does not have the
    /// expected document structure.
    #[error("IP ranges document is not parsable: {0}")]
    DocumentParse(String),

    /// A CIDR entry retained by the service filter is not a syntactically
    /// valid network in its address family.
    #[error("invalid IP prefix {prefix:?}: {reason}")]
    PrefixParse { prefix: String, reason: String },

    /// The lookup input is not a parsable IPv4 or IPv6 address literal.
    #[error("IP address is not parsable: {0:?}")]
    InvalidAddress(String),

    /// The address is valid but no prefix of the configured service covers it.
    #[error("IP is not in {service}")]
    NotFound { service: String },

    /// Lookup was attempted before any successful refresh completed.
    #[error("no IP prefixes available yet")]
    NoDataYet,
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::DocumentParse(error.to_string())
    }
}

// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/*--------------------------------------------------------------------------------------
  Log Error Function
--------------------------------------------------------------------------------------*/

#[cfg(test)]
pub(crate) fn log_error(error: &Error) {
    log::error!("{}", error);
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

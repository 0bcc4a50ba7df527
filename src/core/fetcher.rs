use crate::core::errors::{Error, Result};
use log::{info, warn};
use std::env;
use std::{thread, time};

/*-------------------------------------------------------------------------------------------------
  Fetcher Capability
-------------------------------------------------------------------------------------------------*/

/// Capability that produces the raw AWS IP Ranges document.
///
/// The resource locator is bound at construction; `fetch` takes no arguments
/// and yields the raw JSON body, validated to be parsable JSON, or fails with
/// [Error::Fetch] (transport failure, non-2xx status) or
/// [Error::DocumentParse] (body is not valid JSON).
///
/// Any `Fn() -> Result<String> + Send + Sync` closure is a `Fetcher`, which
/// keeps test doubles trivial:
///
/// ```
/// use awsipresolver::{Fetcher, Result};
///
/// let fetcher = || -> Result<String> { Ok(r#"{"prefixes": []}"#.to_string()) };
/// assert!(fetcher.fetch().is_ok());
/// ```
pub trait Fetcher: Send + Sync {
    /// Retrieve the raw IP Ranges JSON document.
    fn fetch(&self) -> Result<String>;
}

impl<F> Fetcher for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn fetch(&self) -> Result<String> {
        self()
    }
}

/*-------------------------------------------------------------------------------------------------
  HTTP Fetcher
-------------------------------------------------------------------------------------------------*/

/// Production [Fetcher] that retrieves the AWS IP Ranges JSON from a URL with
/// a simple exponential-backoff retry mechanism.
///
/// The [HttpFetcher::new] method attempts to source configuration values from
/// environment variables when set and uses default values when the
/// environment variables are not set. Use [HttpFetcher::default] to ignore
/// the environment.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    url: String,
    retry_count: u32,
    retry_initial_delay: u64,
    retry_backoff_factor: u64,
    retry_timeout: u64,
}

impl Default for HttpFetcher {
    /// Create a new [HttpFetcher] with default configuration values,
    /// ignoring any environment variables.
    ///
    /// ```
    /// let mut fetcher = awsipresolver::HttpFetcher::default();
    /// fetcher.url("https://my-ip-ranges.com/ip-ranges.json");
    /// fetcher.retry_count(2);
    /// ```
    fn default() -> Self {
        Self {
            url: "https://ip-ranges.amazonaws.com/ip-ranges.json".to_string(),
            retry_count: 4,
            retry_initial_delay: 200, // 200 ms
            retry_backoff_factor: 2,
            retry_timeout: 5000, // 5 seconds
        }
    }
}

impl HttpFetcher {
    /// Create a new [HttpFetcher] reading initial configuration values from
    /// environment variables when set and default values when the environment
    /// variables are not set.
    ///
    /// The environment variables used to set the initial configuration values
    /// are:
    /// - `AWSIPRESOLVER_URL`
    /// - `AWSIPRESOLVER_RETRY_COUNT`
    /// - `AWSIPRESOLVER_RETRY_INITIAL_DELAY`
    /// - `AWSIPRESOLVER_RETRY_BACKOFF_FACTOR`
    /// - `AWSIPRESOLVER_RETRY_TIMEOUT`
    pub fn new() -> Self {
        let default = HttpFetcher::default();

        Self {
            url: get_env_var("AWSIPRESOLVER_URL", default.url),
            retry_count: get_env_var("AWSIPRESOLVER_RETRY_COUNT", default.retry_count),
            retry_initial_delay: get_env_var(
                "AWSIPRESOLVER_RETRY_INITIAL_DELAY",
                default.retry_initial_delay,
            ),
            retry_backoff_factor: get_env_var(
                "AWSIPRESOLVER_RETRY_BACKOFF_FACTOR",
                default.retry_backoff_factor,
            ),
            retry_timeout: get_env_var("AWSIPRESOLVER_RETRY_TIMEOUT", default.retry_timeout),
        }
    }

    /*-------------------------------------------------------------------------
      Setters
    -------------------------------------------------------------------------*/

    /// Set the URL used to retrieve the AWS IP Ranges; defaults to
    /// `https://ip-ranges.amazonaws.com/ip-ranges.json` - see
    /// [AWS IP address ranges](https://docs.aws.amazon.com/vpc/latest/userguide/aws-ip-ranges.html)
    /// in the Amazon Virtual Private Cloud (VPC) User Guide for details.
    pub fn url<'s>(&'s mut self, url: &str) -> &'s mut Self {
        self.url = url.to_string();
        self
    }

    /// Set the number of retry attempts to retrieve the AWS IP Ranges JSON
    /// from the URL; defaults to `4` attempts.
    pub fn retry_count(&mut self, retry_count: u32) -> &mut Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the initial delay (in milliseconds) between retry attempts;
    /// defaults to `200` milliseconds.
    ///
    /// The delay between retry attempts is calculated as:
    /// `retry_initial_delay * (retry_backoff_factor ^ attempt)`.
    pub fn retry_initial_delay(&mut self, retry_initial_delay: u64) -> &mut Self {
        self.retry_initial_delay = retry_initial_delay;
        self
    }

    /// Set the backoff factor used to increase the delay between retry
    /// attempts; defaults to `2`.
    pub fn retry_backoff_factor(&mut self, retry_backoff_factor: u64) -> &mut Self {
        self.retry_backoff_factor = retry_backoff_factor;
        self
    }

    /// Set the maximum time (in milliseconds) to spend retrying; defaults to
    /// `5000` milliseconds (5 seconds).
    pub fn retry_timeout(&mut self, retry_timeout: u64) -> &mut Self {
        self.retry_timeout = retry_timeout;
        self
    }

    /*-------------------------------------------------------------------------
      Private Methods
    -------------------------------------------------------------------------*/

    /// Get the AWS IP Ranges JSON from the URL, retrying transient failures
    /// with exponential backoff.
    fn get_json_from_url(&self) -> Result<String> {
        let start_time = time::Instant::now();
        let max_elapsed_time = time::Duration::from_millis(self.retry_timeout);

        let mut attempt: u32 = 0;
        loop {
            info!(
                "Get AWS IP Ranges from URL; Attempt {}: GET {}",
                attempt, self.url
            );
            let json: Result<String> = reqwest::blocking::get(&self.url)
                .map_err(|error| Error::Fetch(error.to_string()))
                .and_then(check_response_status)
                .and_then(validate_json);

            match json {
                Ok(json) => {
                    info!("Get AWS IP Ranges from URL; Attempt {}: Ok", attempt);
                    break Ok(json);
                }
                Err(error) => {
                    warn!(
                        "Get AWS IP Ranges from URL; Attempt {}: FAILED: {}",
                        attempt, error
                    );

                    let delay = time::Duration::from_millis(
                        self.retry_initial_delay * (self.retry_backoff_factor.pow(attempt)),
                    );

                    attempt += 1;

                    if (start_time.elapsed() + delay < max_elapsed_time)
                        && (attempt < self.retry_count)
                    {
                        thread::sleep(delay);
                        continue;
                    } else {
                        break Err(error);
                    }
                }
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self) -> Result<String> {
        self.get_json_from_url()
    }
}

/*-------------------------------------------------------------------------------------------------
  Helper Functions
-------------------------------------------------------------------------------------------------*/

/// Require a 200-series response status and extract the body.
fn check_response_status(response: reqwest::blocking::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Fetch(format!(
            "expected 200-series response, got {status}"
        )));
    }
    response
        .text()
        .map_err(|error| Error::Fetch(error.to_string()))
}

/// Validate a string contains parsable JSON.
fn validate_json(json: String) -> Result<String> {
    serde_json::from_str::<serde::de::IgnoredAny>(&json)?;
    Ok(json)
}

/// Get and parse an environment variable value or return a default value.
pub(crate) fn get_env_var<T: std::str::FromStr>(env_var: &str, default: T) -> T {
    env::var(env_var)
        .ok()
        .and_then(|value| {
            value
                .parse::<T>()
                .inspect(|_| info!("Using {}: {}", env_var, value))
                .inspect_err(|_| warn!("Invalid {}: {}", env_var, value))
                .ok()
        })
        .unwrap_or(default)
}

/*-------------------------------------------------------------------------------------------------
  Unit Tests
-------------------------------------------------------------------------------------------------*/

use anyhow::Context;
use reqwest::Client;
use std::time::Duration;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Plain client with connection pooling and timeouts.
    ///
    /// No retry middleware: a failed market data request is reported to the
    /// caller as-is and retry policy stays with whoever invoked the pipeline.
    pub fn create_client(timeout: Duration) -> anyhow::Result<Client> {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        assert!(HttpClientFactory::create_client(Duration::from_secs(5)).is_ok());
    }
}

//! AWS executor configuration.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Connection and retry settings for [`crate::AwsExecutor`].
///
/// # Examples
///
/// ```
/// use tablekit_aws::AwsConfig;
///
/// let config = AwsConfig::builder()
///     .endpoint_url(Some("http://localhost:4566".into()))
///     .build();
/// assert_eq!(config.region, "us-east-1");
/// assert_eq!(config.max_unprocessed_retries, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    /// AWS region.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Endpoint override, e.g. a local DynamoDB-compatible server.
    #[builder(default)]
    pub endpoint_url: Option<String>,

    /// How many times unprocessed bulk writes are resubmitted.
    #[builder(default = 5)]
    pub max_unprocessed_retries: usize,

    /// Delay before the first resubmission, in milliseconds.
    #[builder(default = 100)]
    pub initial_backoff_ms: u64,

    /// Upper bound for the resubmission delay, in milliseconds.
    #[builder(default = 1600)]
    pub max_backoff_ms: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AwsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `AWS_REGION` | `DEFAULT_REGION`, then `us-east-1` |
    /// | `AWS_ENDPOINT_URL` | unset |
    /// | `TABLEKIT_MAX_UNPROCESSED_RETRIES` | `5` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("AWS_REGION").or_else(|_| std::env::var("DEFAULT_REGION")) {
            config.region = v;
        }
        if let Ok(v) = std::env::var("AWS_ENDPOINT_URL") {
            config.endpoint_url = Some(v);
        }
        if let Ok(v) = std::env::var("TABLEKIT_MAX_UNPROCESSED_RETRIES") {
            if let Ok(n) = v.parse() {
                config.max_unprocessed_retries = n;
            }
        }

        config
    }
}

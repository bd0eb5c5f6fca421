//! Normalized wire record exchanged with the control plane
//!
//! Field names follow the control plane's `PascalCase` contract. Every
//! collection is wrapped in [`Counted`], whose quantity is derived from its
//! items and checked again when a payload is decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::enums::{
    DistributionStatus, EventType, GeoRestrictionType, HttpVersion, ItemSelection, Method,
    MinimumProtocolVersion, OriginProtocolPolicy, PriceClass, SslProtocol, SslSupportMethod,
    ViewerProtocolPolicy,
};

/// Resource tags, reconciled outside the record
pub type Tags = BTreeMap<String, String>;

/// A decoded collection whose declared quantity disagrees with its items
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("collection declares Quantity={quantity} but carries {items} item(s)")]
pub struct CountMismatch {
    pub quantity: usize,
    pub items: usize,
}

/// A signer list whose `Enabled` flag contradicts its items
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToggledError {
    #[error(transparent)]
    Count(#[from] CountMismatch),

    #[error("list declares Enabled={enabled} with {items} item(s)")]
    Enabled { enabled: bool, items: usize },
}

/// Collection with an explicit item count
///
/// The count is never stored independently of the items: constructing a
/// `Counted` always derives it, and decoding rejects a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "RawCounted<T>",
    bound(deserialize = "T: Deserialize<'de>"),
    rename_all = "PascalCase"
)]
pub struct Counted<T> {
    quantity: usize,
    items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCounted<T> {
    quantity: usize,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

impl<T> TryFrom<RawCounted<T>> for Counted<T> {
    type Error = CountMismatch;

    fn try_from(raw: RawCounted<T>) -> Result<Self, Self::Error> {
        if raw.quantity != raw.items.len() {
            return Err(CountMismatch {
                quantity: raw.quantity,
                items: raw.items.len(),
            });
        }
        Ok(Self::from_items(raw.items))
    }
}

impl<T> Counted<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            quantity: items.len(),
            items,
        }
    }

    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn quantity(&self) -> usize {
        self.quantity
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Counted<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> FromIterator<T> for Counted<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter.into_iter().collect())
    }
}

/// Collection carrying an `Enabled` flag derived from its contents
///
/// `enabled` is true exactly when the list is non-empty. There is no setter:
/// the only way to build one is from its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "RawToggled<T>",
    bound(
        serialize = "T: Serialize",
        deserialize = "T: Deserialize<'de>"
    )
)]
pub struct Toggled<T> {
    #[serde(rename = "Enabled")]
    enabled: bool,

    #[serde(flatten)]
    items: Counted<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawToggled<T> {
    enabled: bool,
    quantity: usize,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

impl<T> TryFrom<RawToggled<T>> for Toggled<T> {
    type Error = ToggledError;

    fn try_from(raw: RawToggled<T>) -> Result<Self, Self::Error> {
        let items = Counted::try_from(RawCounted {
            quantity: raw.quantity,
            items: raw.items,
        })?;
        if raw.enabled == items.is_empty() {
            return Err(ToggledError::Enabled {
                enabled: raw.enabled,
                items: items.quantity(),
            });
        }
        Ok(Self::from_items(items.into_items()))
    }
}

impl<T> Toggled<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            enabled: !items.is_empty(),
            items: Counted::from_items(items),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn items(&self) -> &[T] {
        self.items.items()
    }

    pub fn quantity(&self) -> usize {
        self.items.quantity()
    }
}

impl<T> Default for Toggled<T> {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

/// Distribution configuration as the control plane stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DistributionRecord {
    /// Idempotency token, fixed at creation
    pub caller_reference: String,

    pub aliases: Counted<String>,

    pub default_root_object: String,

    pub origins: Counted<Origin>,

    pub origin_groups: Counted<OriginGroup>,

    pub default_cache_behavior: CacheSettings,

    pub cache_behaviors: Counted<CacheBehavior>,

    pub custom_error_responses: Counted<CustomErrorResponse>,

    pub comment: String,

    /// Always present; sent disabled with empty strings when not configured
    pub logging: Logging,

    pub price_class: PriceClass,

    pub enabled: bool,

    pub viewer_certificate: ViewerCertificate,

    pub restrictions: Restrictions,

    #[serde(rename = "WebACLId")]
    pub web_acl_id: String,

    pub http_version: HttpVersion,

    #[serde(rename = "IsIPV6Enabled")]
    pub is_ipv6_enabled: bool,

    pub staging: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous_deployment_policy_id: Option<String>,
}

impl DistributionRecord {
    /// Decode a record from its JSON wire form
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    /// Canonical pretty-printed JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Origin {
    pub id: String,

    pub domain_name: String,

    pub origin_path: String,

    pub connection_attempts: u8,

    pub connection_timeout: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_access_control_id: Option<String>,

    pub custom_headers: Counted<OriginCustomHeader>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_origin_config: Option<CustomOriginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_origin_config: Option<S3OriginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_shield: Option<OriginShield>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginCustomHeader {
    pub header_name: String,
    pub header_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomOriginConfig {
    #[serde(rename = "HTTPPort")]
    pub http_port: u16,

    #[serde(rename = "HTTPSPort")]
    pub https_port: u16,

    pub origin_protocol_policy: OriginProtocolPolicy,

    pub origin_ssl_protocols: Counted<SslProtocol>,

    pub origin_keepalive_timeout: u32,

    pub origin_read_timeout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3OriginConfig {
    /// Empty when the bucket is reached without an access identity
    pub origin_access_identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginShield {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_shield_region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginGroup {
    pub id: String,

    pub failover_criteria: FailoverCriteria,

    /// Primary first, then secondary
    pub members: Counted<OriginGroupMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailoverCriteria {
    pub status_codes: Counted<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginGroupMember {
    pub origin_id: String,
}

/// Fields shared by the default behavior and path-matched behaviors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CacheSettings {
    pub target_origin_id: String,

    pub viewer_protocol_policy: ViewerProtocolPolicy,

    pub allowed_methods: Counted<Method>,

    pub cached_methods: Counted<Method>,

    pub compress: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy_id: Option<String>,

    #[serde(rename = "MinTTL", default, skip_serializing_if = "Option::is_none")]
    pub min_ttl: Option<i64>,

    #[serde(rename = "DefaultTTL", default, skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<i64>,

    #[serde(rename = "MaxTTL", default, skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request_policy_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers_policy_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_level_encryption_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_log_config_arn: Option<String>,

    pub smooth_streaming: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_values: Option<ForwardedValues>,

    pub function_associations: Counted<FunctionAssociation>,

    pub lambda_function_associations: Counted<LambdaFunctionAssociation>,

    pub trusted_signers: Toggled<String>,

    pub trusted_key_groups: Toggled<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CacheBehavior {
    pub path_pattern: String,

    #[serde(flatten)]
    pub settings: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardedValues {
    pub query_string: bool,

    pub query_string_cache_keys: Counted<String>,

    pub headers: Counted<String>,

    pub cookies: CookiePreference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CookiePreference {
    pub forward: ItemSelection,

    pub whitelisted_names: Counted<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionAssociation {
    pub event_type: EventType,

    #[serde(rename = "FunctionARN")]
    pub function_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LambdaFunctionAssociation {
    pub event_type: EventType,

    #[serde(rename = "LambdaFunctionARN")]
    pub lambda_function_arn: String,

    pub include_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomErrorResponse {
    pub error_code: u16,

    /// Empty string when no replacement status is configured
    pub response_code: String,

    pub response_page_path: String,

    #[serde(rename = "ErrorCachingMinTTL", default, skip_serializing_if = "Option::is_none")]
    pub error_caching_min_ttl: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Logging {
    pub enabled: bool,
    pub include_cookies: bool,
    pub bucket: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Restrictions {
    pub geo_restriction: GeoRestriction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeoRestriction {
    pub restriction_type: GeoRestrictionType,

    pub locations: Counted<String>,
}

/// Certificate presented to viewers; exactly one identity source is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ViewerCertificate {
    #[serde(rename = "CloudFrontDefaultCertificate")]
    pub default_certificate: bool,

    #[serde(rename = "IAMCertificateId", default, skip_serializing_if = "Option::is_none")]
    pub iam_certificate_id: Option<String>,

    #[serde(rename = "ACMCertificateArn", default, skip_serializing_if = "Option::is_none")]
    pub acm_certificate_arn: Option<String>,

    #[serde(rename = "SSLSupportMethod", default, skip_serializing_if = "Option::is_none")]
    pub ssl_support_method: Option<SslSupportMethod>,

    pub minimum_protocol_version: MinimumProtocolVersion,
}

// ========== Read side ==========

/// A distribution as returned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Distribution {
    pub id: String,

    #[serde(rename = "ARN")]
    pub arn: String,

    pub domain_name: String,

    pub status: DistributionStatus,

    pub last_modified_time: DateTime<Utc>,

    #[serde(default)]
    pub in_progress_invalidation_batches: u32,

    #[serde(default)]
    pub active_trusted_signers: Toggled<ActiveSigner>,

    #[serde(default)]
    pub active_trusted_key_groups: Toggled<ActiveKeyGroup>,

    pub distribution_config: DistributionRecord,
}

impl Distribution {
    pub fn is_deployed(&self) -> bool {
        self.status.is_deployed()
    }

    pub fn is_enabled(&self) -> bool {
        self.distribution_config.enabled
    }
}

/// Account whose key pairs are currently able to sign URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActiveSigner {
    pub aws_account_number: String,

    pub key_pair_ids: Counted<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActiveKeyGroup {
    pub key_group_id: String,

    pub key_pair_ids: Counted<String>,
}

/// A distribution together with the concurrency token that accompanied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionOutput {
    pub distribution: Distribution,
    pub etag: String,
}

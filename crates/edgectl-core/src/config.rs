//! Declarative distribution configuration
//!
//! This is the user-facing tree, read from YAML or JSON with `snake_case`
//! keys. Collections documented as unordered are sets: their element order
//! carries no meaning and duplicates collapse in [`DistributionConfig::normalized`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::enums::{
    EventType, GeoRestrictionType, HttpVersion, ItemSelection, Method, MinimumProtocolVersion,
    OriginProtocolPolicy, PriceClass, SslProtocol, SslSupportMethod, ViewerProtocolPolicy,
};
use crate::error::Result;
use crate::identity::{canonicalize, IdentityWriter, SetIdentity};

/// TTL used for a missing `min_ttl` when a TTL triple is partially set
pub const DEFAULT_MIN_TTL: i64 = 0;

/// TTL used for a missing `default_ttl` (one day)
pub const DEFAULT_DEFAULT_TTL: i64 = 86_400;

/// TTL used for a missing `max_ttl` (one year)
pub const DEFAULT_MAX_TTL: i64 = 31_536_000;

/// A content-delivery distribution as the user declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_root_object: Option<String>,

    #[serde(default)]
    pub http_version: HttpVersion,

    #[serde(default)]
    pub is_ipv6_enabled: bool,

    #[serde(default)]
    pub price_class: PriceClass,

    /// Web application firewall association
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_acl_id: Option<String>,

    #[serde(default)]
    pub staging: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous_deployment_policy_id: Option<String>,

    /// Explicit idempotency token; generated at creation when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_reference: Option<String>,

    /// Alternate domain names (unordered)
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Origins (unordered, at least one)
    pub origins: Vec<Origin>,

    /// Failover groups (unordered)
    #[serde(default)]
    pub origin_groups: Vec<OriginGroup>,

    pub default_cache_behavior: CacheSettings,

    /// Path-matched behaviors, evaluated in order
    #[serde(default)]
    pub ordered_cache_behaviors: Vec<CacheBehavior>,

    /// Error page overrides (unordered)
    #[serde(default)]
    pub custom_error_responses: Vec<CustomErrorResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(default)]
    pub restrictions: Restrictions,

    pub viewer_certificate: ViewerCertificate,

    /// Resource tags; reconciled separately from the record
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub origin_id: String,

    pub domain_name: String,

    #[serde(default)]
    pub origin_path: String,

    #[serde(default = "default_connection_attempts")]
    pub connection_attempts: u8,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_access_control_id: Option<String>,

    /// Headers added to origin requests (unordered)
    #[serde(default)]
    pub custom_headers: Vec<CustomHeader>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_origin_config: Option<CustomOriginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_origin_config: Option<S3OriginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_shield: Option<OriginShield>,
}

fn default_connection_attempts() -> u8 {
    3
}

fn default_connection_timeout() -> u8 {
    10
}

impl Origin {
    /// An origin with every optional field at its default
    pub fn new(origin_id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            origin_id: origin_id.into(),
            domain_name: domain_name.into(),
            origin_path: String::new(),
            connection_attempts: default_connection_attempts(),
            connection_timeout: default_connection_timeout(),
            origin_access_control_id: None,
            custom_headers: Vec::new(),
            custom_origin_config: None,
            s3_origin_config: None,
            origin_shield: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOriginConfig {
    pub http_port: u16,

    pub https_port: u16,

    pub origin_protocol_policy: OriginProtocolPolicy,

    /// Allowed TLS protocols towards the origin (unordered)
    pub origin_ssl_protocols: Vec<SslProtocol>,

    #[serde(default = "default_keepalive_timeout")]
    pub origin_keepalive_timeout: u32,

    #[serde(default = "default_read_timeout")]
    pub origin_read_timeout: u32,
}

fn default_keepalive_timeout() -> u32 {
    5
}

fn default_read_timeout() -> u32 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3OriginConfig {
    #[serde(default)]
    pub origin_access_identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginShield {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_shield_region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginGroup {
    pub origin_id: String,

    /// Status codes that trigger failover (unordered)
    pub failover_status_codes: Vec<u16>,

    /// Primary then secondary origin id
    pub members: Vec<String>,
}

/// Settings shared by the default behavior and path-matched behaviors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub target_origin_id: String,

    pub viewer_protocol_policy: ViewerProtocolPolicy,

    /// Unordered
    pub allowed_methods: Vec<Method>,

    /// Unordered
    pub cached_methods: Vec<Method>,

    #[serde(default)]
    pub compress: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ttl: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request_policy_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers_policy_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_level_encryption_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_log_config_arn: Option<String>,

    #[serde(default)]
    pub smooth_streaming: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_values: Option<ForwardedValues>,

    /// Unordered, at most two
    #[serde(default)]
    pub function_associations: Vec<FunctionAssociation>,

    /// Unordered, at most four
    #[serde(default)]
    pub lambda_function_associations: Vec<LambdaFunctionAssociation>,

    #[serde(default)]
    pub trusted_signers: Vec<String>,

    #[serde(default)]
    pub trusted_key_groups: Vec<String>,
}

impl CacheSettings {
    /// Whether any member of the TTL triple is set
    pub fn has_ttl(&self) -> bool {
        self.min_ttl.is_some() || self.default_ttl.is_some() || self.max_ttl.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBehavior {
    pub path_pattern: String,

    #[serde(flatten)]
    pub settings: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedValues {
    pub query_string: bool,

    /// Ordered
    #[serde(default)]
    pub query_string_cache_keys: Vec<String>,

    /// Unordered
    #[serde(default)]
    pub headers: Vec<String>,

    pub cookies: CookiePreference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePreference {
    pub forward: ItemSelection,

    /// Unordered
    #[serde(default)]
    pub whitelisted_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAssociation {
    pub event_type: EventType,
    pub function_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaFunctionAssociation {
    pub event_type: EventType,

    pub lambda_arn: String,

    #[serde(default)]
    pub include_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomErrorResponse {
    pub error_code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_page_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_caching_min_ttl: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub bucket: String,

    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub include_cookies: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default)]
    pub geo_restriction: GeoRestriction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeoRestriction {
    pub restriction_type: GeoRestrictionType,

    /// ISO 3166-1 alpha-2 codes (unordered)
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewerCertificate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_certificate_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acm_certificate_arn: Option<String>,

    #[serde(default)]
    pub cloudfront_default_certificate: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_support_method: Option<SslSupportMethod>,

    #[serde(default)]
    pub minimum_protocol_version: MinimumProtocolVersion,
}

impl DistributionConfig {
    /// Load a configuration from a YAML or JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a configuration; JSON input is accepted as a YAML subset
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The view of this configuration that survives a round trip through the record
    ///
    /// Unordered collections are put in canonical order with duplicates
    /// removed, empty optional strings become `None`, a disabled origin shield
    /// and an S3 config without an identity are dropped, a partial TTL triple
    /// is completed, and only the winning certificate source is kept. Tags
    /// travel outside the record and are cleared.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();

        out.comment = non_empty(out.comment);
        out.default_root_object = non_empty(out.default_root_object);
        out.web_acl_id = non_empty(out.web_acl_id);
        out.continuous_deployment_policy_id = non_empty(out.continuous_deployment_policy_id);
        out.caller_reference = non_empty(out.caller_reference);

        out.aliases = canonicalize(&out.aliases);

        let origins: Vec<Origin> = out.origins.into_iter().map(Origin::normalized).collect();
        out.origins = canonicalize(&origins);

        let groups: Vec<OriginGroup> = out
            .origin_groups
            .into_iter()
            .map(|mut g| {
                g.failover_status_codes = canonicalize(&g.failover_status_codes);
                g
            })
            .collect();
        out.origin_groups = canonicalize(&groups);

        out.default_cache_behavior = out.default_cache_behavior.normalized();
        out.ordered_cache_behaviors = out
            .ordered_cache_behaviors
            .into_iter()
            .map(|b| CacheBehavior {
                path_pattern: b.path_pattern,
                settings: b.settings.normalized(),
            })
            .collect();

        let responses: Vec<CustomErrorResponse> = out
            .custom_error_responses
            .into_iter()
            .map(|mut r| {
                r.response_code = r.response_code.filter(|code| *code != 0);
                r.response_page_path = non_empty(r.response_page_path);
                r
            })
            .collect();
        out.custom_error_responses = canonicalize(&responses);

        out.restrictions.geo_restriction.locations =
            canonicalize(&out.restrictions.geo_restriction.locations);

        out.viewer_certificate = out.viewer_certificate.normalized();
        out.tags.clear();
        out
    }
}

impl Origin {
    fn normalized(mut self) -> Self {
        self.origin_access_control_id = non_empty(self.origin_access_control_id);
        self.custom_headers = canonicalize(&self.custom_headers);
        if let Some(custom) = self.custom_origin_config.as_mut() {
            custom.origin_ssl_protocols = canonicalize(&custom.origin_ssl_protocols);
        }
        self.s3_origin_config = self
            .s3_origin_config
            .filter(|s3| !s3.origin_access_identity.is_empty());
        self.origin_shield = self.origin_shield.filter(|shield| shield.enabled).map(|mut s| {
            s.origin_shield_region = non_empty(s.origin_shield_region);
            s
        });
        self
    }
}

impl CacheSettings {
    fn normalized(mut self) -> Self {
        self.allowed_methods = canonicalize(&self.allowed_methods);
        self.cached_methods = canonicalize(&self.cached_methods);

        self.cache_policy_id = non_empty(self.cache_policy_id);
        self.origin_request_policy_id = non_empty(self.origin_request_policy_id);
        self.response_headers_policy_id = non_empty(self.response_headers_policy_id);
        self.field_level_encryption_id = non_empty(self.field_level_encryption_id);
        self.realtime_log_config_arn = non_empty(self.realtime_log_config_arn);

        if self.cache_policy_id.is_none() && self.has_ttl() {
            self.min_ttl.get_or_insert(DEFAULT_MIN_TTL);
            self.default_ttl.get_or_insert(DEFAULT_DEFAULT_TTL);
            self.max_ttl.get_or_insert(DEFAULT_MAX_TTL);
        }

        if let Some(fv) = self.forwarded_values.as_mut() {
            fv.headers = canonicalize(&fv.headers);
            fv.cookies.whitelisted_names = canonicalize(&fv.cookies.whitelisted_names);
        }

        self.function_associations = canonicalize(&self.function_associations);
        self.lambda_function_associations = canonicalize(&self.lambda_function_associations);
        self
    }
}

impl ViewerCertificate {
    /// Keep only the highest-precedence identity source: IAM, then ACM, then default
    fn normalized(mut self) -> Self {
        self.iam_certificate_id = non_empty(self.iam_certificate_id);
        self.acm_certificate_arn = non_empty(self.acm_certificate_arn);

        if self.iam_certificate_id.is_some() {
            self.acm_certificate_arn = None;
            self.cloudfront_default_certificate = false;
        } else if self.acm_certificate_arn.is_some() {
            self.cloudfront_default_certificate = false;
        } else {
            self.ssl_support_method = None;
        }
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// ========== Set identities ==========

impl SetIdentity for Origin {
    fn write_identity(&self, w: &mut IdentityWriter) {
        w.field(&self.origin_id)
            .field(&self.domain_name)
            .field(&self.origin_path)
            .field(self.connection_attempts)
            .field(self.connection_timeout)
            .opt(self.origin_access_control_id.as_deref())
            .set(&self.custom_headers);

        match &self.custom_origin_config {
            Some(custom) => {
                w.field(custom.http_port)
                    .field(custom.https_port)
                    .field(custom.origin_protocol_policy)
                    .set(&custom.origin_ssl_protocols)
                    .field(custom.origin_keepalive_timeout)
                    .field(custom.origin_read_timeout);
            }
            None => {
                w.field("");
            }
        }

        w.opt(self.s3_origin_config.as_ref().map(|s3| &s3.origin_access_identity));

        match &self.origin_shield {
            Some(shield) => {
                w.field(shield.enabled).opt(shield.origin_shield_region.as_deref());
            }
            None => {
                w.field("");
            }
        }
    }
}

impl SetIdentity for CustomHeader {
    fn write_identity(&self, w: &mut IdentityWriter) {
        w.field(&self.name).field(&self.value);
    }
}

impl SetIdentity for OriginGroup {
    fn write_identity(&self, w: &mut IdentityWriter) {
        w.field(&self.origin_id)
            .set(&self.failover_status_codes)
            .list(&self.members);
    }
}

impl SetIdentity for FunctionAssociation {
    fn write_identity(&self, w: &mut IdentityWriter) {
        w.field(self.event_type).field(&self.function_arn);
    }
}

impl SetIdentity for LambdaFunctionAssociation {
    fn write_identity(&self, w: &mut IdentityWriter) {
        w.field(self.event_type)
            .field(&self.lambda_arn)
            .field(self.include_body);
    }
}

impl SetIdentity for CustomErrorResponse {
    fn write_identity(&self, w: &mut IdentityWriter) {
        w.field(self.error_code)
            .opt(self.response_code)
            .opt(self.response_page_path.as_deref())
            .opt(self.error_caching_min_ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SetIdentity;

    const MINIMAL: &str = r#"
enabled: true
origins:
  - origin_id: site
    domain_name: site.s3.amazonaws.com
default_cache_behavior:
  target_origin_id: site
  viewer_protocol_policy: redirect-to-https
  allowed_methods: [GET, HEAD]
  cached_methods: [GET, HEAD]
  cache_policy_id: 658327ea-f89d-4fab-a63d-7e88639e58f6
viewer_certificate:
  cloudfront_default_certificate: true
"#;

    #[test]
    fn test_parse_applies_defaults() {
        let config = DistributionConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.http_version, HttpVersion::Http2);
        assert_eq!(config.price_class, PriceClass::All);
        assert_eq!(config.origins[0].connection_attempts, 3);
        assert_eq!(config.origins[0].connection_timeout, 10);
        assert_eq!(config.origins[0].origin_path, "");
        assert_eq!(
            config.viewer_certificate.minimum_protocol_version,
            MinimumProtocolVersion::TlsV1
        );
        assert_eq!(
            config.restrictions.geo_restriction.restriction_type,
            GeoRestrictionType::None
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distribution.yaml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = DistributionConfig::load(&path).unwrap();
        assert!(config.enabled);
        assert_eq!(config.default_cache_behavior.target_origin_id, "site");
    }

    #[test]
    fn test_unknown_enum_symbol_fails_to_parse() {
        let input = MINIMAL.replace("redirect-to-https", "https-please");
        assert!(DistributionConfig::from_yaml_str(&input).is_err());
    }

    #[test]
    fn test_normalized_completes_partial_ttl() {
        let mut settings = DistributionConfig::from_yaml_str(MINIMAL)
            .unwrap()
            .default_cache_behavior;
        settings.cache_policy_id = None;
        settings.default_ttl = Some(3600);

        let normalized = settings.normalized();
        assert_eq!(normalized.min_ttl, Some(DEFAULT_MIN_TTL));
        assert_eq!(normalized.default_ttl, Some(3600));
        assert_eq!(normalized.max_ttl, Some(DEFAULT_MAX_TTL));
    }

    #[test]
    fn test_normalized_keeps_winning_certificate_source() {
        let cert = ViewerCertificate {
            iam_certificate_id: Some("ASCAEXAMPLE".to_string()),
            acm_certificate_arn: Some("arn:aws:acm:us-east-1:123456789012:certificate/x".to_string()),
            cloudfront_default_certificate: true,
            ssl_support_method: Some(SslSupportMethod::SniOnly),
            minimum_protocol_version: MinimumProtocolVersion::TlsV1_2_2021,
        };

        let normalized = cert.normalized();
        assert_eq!(normalized.iam_certificate_id.as_deref(), Some("ASCAEXAMPLE"));
        assert!(normalized.acm_certificate_arn.is_none());
        assert!(!normalized.cloudfront_default_certificate);
    }

    #[test]
    fn test_normalized_drops_disabled_shield_and_empty_identity() {
        let mut origin = Origin::new("site", "site.example");
        origin.origin_shield = Some(OriginShield {
            enabled: false,
            origin_shield_region: Some("us-east-1".to_string()),
        });
        origin.s3_origin_config = Some(S3OriginConfig {
            origin_access_identity: String::new(),
        });

        let normalized = origin.normalized();
        assert!(normalized.origin_shield.is_none());
        assert!(normalized.s3_origin_config.is_none());
    }

    #[test]
    fn test_origin_identity_ignores_header_order() {
        let mut a = Origin::new("api", "api.example");
        a.custom_headers = vec![
            CustomHeader { name: "X-A".into(), value: "1".into() },
            CustomHeader { name: "X-B".into(), value: "2".into() },
        ];
        let mut b = a.clone();
        b.custom_headers.reverse();

        assert_eq!(a.content_id(), b.content_id());
    }
}

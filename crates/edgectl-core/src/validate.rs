//! Structural validation of a declarative configuration
//!
//! Validation collects every violation instead of stopping at the first one,
//! so a user sees the full list in one pass.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

use crate::config::{
    CacheSettings, DistributionConfig, Origin, DEFAULT_DEFAULT_TTL, DEFAULT_MAX_TTL,
    DEFAULT_MIN_TTL,
};
use crate::enums::GeoRestrictionType;

/// Longest accepted comment
pub const MAX_COMMENT_LEN: usize = 128;

/// Most edge functions per cache behavior
pub const MAX_FUNCTION_ASSOCIATIONS: usize = 2;

/// Most lambda functions per cache behavior
pub const MAX_LAMBDA_ASSOCIATIONS: usize = 4;

static ARN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws[a-zA-Z-]*:[a-z0-9-]+:[a-z0-9-]*:\d{0,12}:.+$").expect("valid regex")
});

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid regex"));

/// Group of fields a violation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// Cache policy reference versus TTL triple
    CacheTtl,
    /// S3 versus custom origin config
    OriginConfig,
    /// Viewer certificate identity source
    ViewerCertificate,
    OriginGroupMembers,
    OriginIds,
    TargetOrigin,
    Limits,
    Format,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CacheTtl => "cache-ttl",
            Self::OriginConfig => "origin-config",
            Self::ViewerCertificate => "viewer-certificate",
            Self::OriginGroupMembers => "origin-group-members",
            Self::OriginIds => "origin-ids",
            Self::TargetOrigin => "target-origin",
            Self::Limits => "limits",
            Self::Format => "format",
        };
        f.write_str(name)
    }
}

/// One rule a configuration breaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub group: FieldGroup,
    /// Location in the declarative tree
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(group: FieldGroup, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Check a configuration without producing a record
pub fn validate(config: &DistributionConfig) -> Vec<Violation> {
    let mut out = Vec::new();

    if let Some(comment) = &config.comment {
        let len = comment.chars().count();
        if len > MAX_COMMENT_LEN {
            out.push(Violation::new(
                FieldGroup::Limits,
                "comment",
                format!("must be at most {MAX_COMMENT_LEN} characters, got {len}"),
            ));
        }
    }

    let origin_ids = check_origins(config, &mut out);
    let group_ids = check_origin_groups(config, &origin_ids, &mut out);

    let targets: HashSet<&str> = origin_ids.union(&group_ids).copied().collect();
    check_behavior(
        &config.default_cache_behavior,
        "default_cache_behavior",
        &targets,
        &mut out,
    );
    for (i, behavior) in config.ordered_cache_behaviors.iter().enumerate() {
        check_behavior(
            &behavior.settings,
            &format!("ordered_cache_behaviors[{i}]"),
            &targets,
            &mut out,
        );
    }

    check_viewer_certificate(config, &mut out);
    check_geo_restriction(config, &mut out);

    out
}

fn check_origins<'a>(config: &'a DistributionConfig, out: &mut Vec<Violation>) -> HashSet<&'a str> {
    let mut ids = HashSet::new();

    if config.origins.is_empty() {
        out.push(Violation::new(
            FieldGroup::OriginIds,
            "origins",
            "at least one origin is required",
        ));
    }

    for origin in &config.origins {
        let path = format!("origins[{}]", origin.origin_id);

        if !ids.insert(origin.origin_id.as_str()) {
            out.push(Violation::new(
                FieldGroup::OriginIds,
                &path,
                "origin id is declared more than once",
            ));
        }

        if origin.s3_origin_config.is_some() && origin.custom_origin_config.is_some() {
            out.push(Violation::new(
                FieldGroup::OriginConfig,
                &path,
                "s3_origin_config and custom_origin_config are mutually exclusive",
            ));
        }

        check_origin_limits(origin, &path, out);
    }

    ids
}

fn check_origin_limits(origin: &Origin, path: &str, out: &mut Vec<Violation>) {
    if !(1..=3).contains(&origin.connection_attempts) {
        out.push(Violation::new(
            FieldGroup::Limits,
            format!("{path}.connection_attempts"),
            format!("must be between 1 and 3, got {}", origin.connection_attempts),
        ));
    }
    if !(1..=10).contains(&origin.connection_timeout) {
        out.push(Violation::new(
            FieldGroup::Limits,
            format!("{path}.connection_timeout"),
            format!("must be between 1 and 10, got {}", origin.connection_timeout),
        ));
    }
}

fn check_origin_groups<'a>(
    config: &'a DistributionConfig,
    origin_ids: &HashSet<&'a str>,
    out: &mut Vec<Violation>,
) -> HashSet<&'a str> {
    let mut ids = HashSet::new();

    for group in &config.origin_groups {
        let path = format!("origin_groups[{}]", group.origin_id);

        if origin_ids.contains(group.origin_id.as_str()) || !ids.insert(group.origin_id.as_str()) {
            out.push(Violation::new(
                FieldGroup::OriginIds,
                &path,
                "origin id is declared more than once",
            ));
        }

        if group.members.len() != 2 {
            out.push(Violation::new(
                FieldGroup::OriginGroupMembers,
                format!("{path}.members"),
                format!("exactly two members are required, got {}", group.members.len()),
            ));
        }

        for member in &group.members {
            if !origin_ids.contains(member.as_str()) {
                out.push(Violation::new(
                    FieldGroup::OriginGroupMembers,
                    format!("{path}.members"),
                    format!("'{member}' is not a declared origin"),
                ));
            }
        }
    }

    ids
}

fn check_behavior(
    settings: &CacheSettings,
    path: &str,
    targets: &HashSet<&str>,
    out: &mut Vec<Violation>,
) {
    let has_policy = settings
        .cache_policy_id
        .as_deref()
        .is_some_and(|id| !id.is_empty());

    match (has_policy, settings.has_ttl()) {
        (true, true) => out.push(Violation::new(
            FieldGroup::CacheTtl,
            path,
            "cache_policy_id and min_ttl/default_ttl/max_ttl are mutually exclusive",
        )),
        (false, false) => out.push(Violation::new(
            FieldGroup::CacheTtl,
            path,
            "one of cache_policy_id or min_ttl/default_ttl/max_ttl is required",
        )),
        _ => {}
    }

    // Checked on the triple as it will be sent, with missing members defaulted
    if !has_policy && settings.has_ttl() {
        let min = settings.min_ttl.unwrap_or(DEFAULT_MIN_TTL);
        let default = settings.default_ttl.unwrap_or(DEFAULT_DEFAULT_TTL);
        let max = settings.max_ttl.unwrap_or(DEFAULT_MAX_TTL);
        if min > max {
            out.push(Violation::new(
                FieldGroup::Limits,
                format!("{path}.min_ttl"),
                format!("must not exceed max_ttl ({min} > {max})"),
            ));
        } else if default < min || default > max {
            out.push(Violation::new(
                FieldGroup::Limits,
                format!("{path}.default_ttl"),
                format!("must lie between min_ttl and max_ttl ({min} <= {default} <= {max})"),
            ));
        }
    }

    if !targets.contains(settings.target_origin_id.as_str()) {
        out.push(Violation::new(
            FieldGroup::TargetOrigin,
            format!("{path}.target_origin_id"),
            format!(
                "'{}' does not name a declared origin or origin group",
                settings.target_origin_id
            ),
        ));
    }

    if settings.function_associations.len() > MAX_FUNCTION_ASSOCIATIONS {
        out.push(Violation::new(
            FieldGroup::Limits,
            format!("{path}.function_associations"),
            format!("at most {MAX_FUNCTION_ASSOCIATIONS} are allowed"),
        ));
    }
    if settings.lambda_function_associations.len() > MAX_LAMBDA_ASSOCIATIONS {
        out.push(Violation::new(
            FieldGroup::Limits,
            format!("{path}.lambda_function_associations"),
            format!("at most {MAX_LAMBDA_ASSOCIATIONS} are allowed"),
        ));
    }

    let arns = settings
        .function_associations
        .iter()
        .map(|f| ("function_associations", f.function_arn.as_str()))
        .chain(
            settings
                .lambda_function_associations
                .iter()
                .map(|l| ("lambda_function_associations", l.lambda_arn.as_str())),
        )
        .chain(
            settings
                .realtime_log_config_arn
                .as_deref()
                .map(|arn| ("realtime_log_config_arn", arn)),
        );
    for (field, arn) in arns {
        if !ARN_RE.is_match(arn) {
            out.push(Violation::new(
                FieldGroup::Format,
                format!("{path}.{field}"),
                format!("'{arn}' is not a valid ARN"),
            ));
        }
    }
}

fn check_viewer_certificate(config: &DistributionConfig, out: &mut Vec<Violation>) {
    let cert = &config.viewer_certificate;
    let iam = cert.iam_certificate_id.as_deref().filter(|s| !s.is_empty());
    let acm = cert.acm_certificate_arn.as_deref().filter(|s| !s.is_empty());

    if iam.is_none() && acm.is_none() && !cert.cloudfront_default_certificate {
        out.push(Violation::new(
            FieldGroup::ViewerCertificate,
            "viewer_certificate",
            "one of iam_certificate_id, acm_certificate_arn or cloudfront_default_certificate is required",
        ));
        return;
    }

    if (iam.is_some() || acm.is_some()) && cert.ssl_support_method.is_none() {
        out.push(Violation::new(
            FieldGroup::ViewerCertificate,
            "viewer_certificate.ssl_support_method",
            "required with an IAM or ACM certificate",
        ));
    }

    if let Some(arn) = acm {
        if iam.is_none() && !ARN_RE.is_match(arn) {
            out.push(Violation::new(
                FieldGroup::Format,
                "viewer_certificate.acm_certificate_arn",
                format!("'{arn}' is not a valid ARN"),
            ));
        }
    }
}

fn check_geo_restriction(config: &DistributionConfig, out: &mut Vec<Violation>) {
    let geo = &config.restrictions.geo_restriction;

    if geo.restriction_type == GeoRestrictionType::None && !geo.locations.is_empty() {
        out.push(Violation::new(
            FieldGroup::Format,
            "restrictions.geo_restriction.locations",
            "must be empty when restriction_type is none",
        ));
    }

    for location in &geo.locations {
        if !COUNTRY_CODE_RE.is_match(location) {
            out.push(Violation::new(
                FieldGroup::Format,
                "restrictions.geo_restriction.locations",
                format!("'{location}' is not an ISO 3166-1 alpha-2 code"),
            ));
        }
    }
}

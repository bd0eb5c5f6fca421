//! Declarative configuration to wire record

use crate::config::{self, DistributionConfig};
use crate::error::{MapperError, Result};
use crate::record::{self as wire, Counted, DistributionRecord, Toggled};
use crate::validate::validate;

/// Build the wire record for a configuration
///
/// The configuration is validated first and every violation is reported at
/// once. Unordered collections come out in canonical order, so two inputs
/// that differ only in set element order produce identical records.
pub fn expand(config: &DistributionConfig) -> Result<DistributionRecord> {
    let violations = validate(config);
    if !violations.is_empty() {
        return Err(MapperError::Validation { violations });
    }

    let c = config.normalized();

    Ok(DistributionRecord {
        caller_reference: c.caller_reference.unwrap_or_default(),
        aliases: Counted::from_items(c.aliases),
        default_root_object: c.default_root_object.unwrap_or_default(),
        origins: c.origins.into_iter().map(expand_origin).collect(),
        origin_groups: c.origin_groups.into_iter().map(expand_origin_group).collect(),
        default_cache_behavior: expand_settings(c.default_cache_behavior),
        cache_behaviors: c
            .ordered_cache_behaviors
            .into_iter()
            .map(|b| wire::CacheBehavior {
                path_pattern: b.path_pattern,
                settings: expand_settings(b.settings),
            })
            .collect(),
        custom_error_responses: c
            .custom_error_responses
            .into_iter()
            .map(expand_error_response)
            .collect(),
        comment: c.comment.unwrap_or_default(),
        logging: expand_logging(c.logging),
        price_class: c.price_class,
        enabled: c.enabled,
        viewer_certificate: expand_viewer_certificate(c.viewer_certificate),
        restrictions: wire::Restrictions {
            geo_restriction: wire::GeoRestriction {
                restriction_type: c.restrictions.geo_restriction.restriction_type,
                locations: Counted::from_items(c.restrictions.geo_restriction.locations),
            },
        },
        web_acl_id: c.web_acl_id.unwrap_or_default(),
        http_version: c.http_version,
        is_ipv6_enabled: c.is_ipv6_enabled,
        staging: c.staging,
        continuous_deployment_policy_id: c.continuous_deployment_policy_id,
    })
}

fn expand_origin(origin: config::Origin) -> wire::Origin {
    let custom_origin_config = origin.custom_origin_config.map(|custom| wire::CustomOriginConfig {
        http_port: custom.http_port,
        https_port: custom.https_port,
        origin_protocol_policy: custom.origin_protocol_policy,
        origin_ssl_protocols: Counted::from_items(custom.origin_ssl_protocols),
        origin_keepalive_timeout: custom.origin_keepalive_timeout,
        origin_read_timeout: custom.origin_read_timeout,
    });

    // An origin with neither config is an S3 origin without an access identity
    let s3_origin_config = match (&custom_origin_config, origin.s3_origin_config) {
        (Some(_), _) => None,
        (None, s3) => Some(wire::S3OriginConfig {
            origin_access_identity: s3.map(|s| s.origin_access_identity).unwrap_or_default(),
        }),
    };

    wire::Origin {
        id: origin.origin_id,
        domain_name: origin.domain_name,
        origin_path: origin.origin_path,
        connection_attempts: origin.connection_attempts,
        connection_timeout: origin.connection_timeout,
        origin_access_control_id: origin.origin_access_control_id,
        custom_headers: origin
            .custom_headers
            .into_iter()
            .map(|h| wire::OriginCustomHeader {
                header_name: h.name,
                header_value: h.value,
            })
            .collect(),
        custom_origin_config,
        s3_origin_config,
        origin_shield: origin.origin_shield.map(|shield| wire::OriginShield {
            enabled: shield.enabled,
            origin_shield_region: shield.origin_shield_region,
        }),
    }
}

fn expand_origin_group(group: config::OriginGroup) -> wire::OriginGroup {
    wire::OriginGroup {
        id: group.origin_id,
        failover_criteria: wire::FailoverCriteria {
            status_codes: Counted::from_items(group.failover_status_codes),
        },
        members: group
            .members
            .into_iter()
            .map(|origin_id| wire::OriginGroupMember { origin_id })
            .collect(),
    }
}

fn expand_settings(s: config::CacheSettings) -> wire::CacheSettings {
    // TTLs only travel when no cache policy is referenced
    let (min_ttl, default_ttl, max_ttl) = if s.cache_policy_id.is_some() {
        (None, None, None)
    } else {
        (s.min_ttl, s.default_ttl, s.max_ttl)
    };

    wire::CacheSettings {
        target_origin_id: s.target_origin_id,
        viewer_protocol_policy: s.viewer_protocol_policy,
        allowed_methods: Counted::from_items(s.allowed_methods),
        cached_methods: Counted::from_items(s.cached_methods),
        compress: s.compress,
        cache_policy_id: s.cache_policy_id,
        min_ttl,
        default_ttl,
        max_ttl,
        origin_request_policy_id: s.origin_request_policy_id,
        response_headers_policy_id: s.response_headers_policy_id,
        field_level_encryption_id: s.field_level_encryption_id,
        realtime_log_config_arn: s.realtime_log_config_arn,
        smooth_streaming: s.smooth_streaming,
        forwarded_values: s.forwarded_values.map(|fv| wire::ForwardedValues {
            query_string: fv.query_string,
            query_string_cache_keys: Counted::from_items(fv.query_string_cache_keys),
            headers: Counted::from_items(fv.headers),
            cookies: wire::CookiePreference {
                forward: fv.cookies.forward,
                whitelisted_names: Counted::from_items(fv.cookies.whitelisted_names),
            },
        }),
        function_associations: s
            .function_associations
            .into_iter()
            .map(|f| wire::FunctionAssociation {
                event_type: f.event_type,
                function_arn: f.function_arn,
            })
            .collect(),
        lambda_function_associations: s
            .lambda_function_associations
            .into_iter()
            .map(|l| wire::LambdaFunctionAssociation {
                event_type: l.event_type,
                lambda_function_arn: l.lambda_arn,
                include_body: l.include_body,
            })
            .collect(),
        trusted_signers: Toggled::from_items(s.trusted_signers),
        trusted_key_groups: Toggled::from_items(s.trusted_key_groups),
    }
}

fn expand_error_response(r: config::CustomErrorResponse) -> wire::CustomErrorResponse {
    wire::CustomErrorResponse {
        error_code: r.error_code,
        response_code: r.response_code.map(|code| code.to_string()).unwrap_or_default(),
        response_page_path: r.response_page_path.unwrap_or_default(),
        error_caching_min_ttl: r.error_caching_min_ttl,
    }
}

fn expand_logging(logging: Option<config::LoggingConfig>) -> wire::Logging {
    match logging {
        Some(l) => wire::Logging {
            enabled: true,
            include_cookies: l.include_cookies,
            bucket: l.bucket,
            prefix: l.prefix,
        },
        None => wire::Logging::default(),
    }
}

fn expand_viewer_certificate(cert: config::ViewerCertificate) -> wire::ViewerCertificate {
    // normalized() already reduced the sources to the winning one
    wire::ViewerCertificate {
        default_certificate: cert.cloudfront_default_certificate,
        iam_certificate_id: cert.iam_certificate_id,
        acm_certificate_arn: cert.acm_certificate_arn,
        ssl_support_method: cert.ssl_support_method,
        minimum_protocol_version: cert.minimum_protocol_version,
    }
}

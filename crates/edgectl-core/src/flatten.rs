//! Wire record back to declarative configuration

use std::collections::BTreeMap;

use crate::config::{self, DistributionConfig};
use crate::record::{self as wire, DistributionRecord};

/// Rebuild the declarative view of a record
///
/// Substructures that carry no information are omitted: a disabled origin
/// shield, an S3 config without an access identity, disabled logging and
/// empty optional strings. Tags are not part of the record and come back
/// empty.
pub fn flatten(record: &DistributionRecord) -> DistributionConfig {
    DistributionConfig {
        enabled: record.enabled,
        comment: non_empty(&record.comment),
        default_root_object: non_empty(&record.default_root_object),
        http_version: record.http_version,
        is_ipv6_enabled: record.is_ipv6_enabled,
        price_class: record.price_class,
        web_acl_id: non_empty(&record.web_acl_id),
        staging: record.staging,
        continuous_deployment_policy_id: record
            .continuous_deployment_policy_id
            .as_deref()
            .and_then(non_empty),
        caller_reference: non_empty(&record.caller_reference),
        aliases: record.aliases.items().to_vec(),
        origins: record.origins.items().iter().map(flatten_origin).collect(),
        origin_groups: record
            .origin_groups
            .items()
            .iter()
            .map(flatten_origin_group)
            .collect(),
        default_cache_behavior: flatten_settings(&record.default_cache_behavior),
        ordered_cache_behaviors: record
            .cache_behaviors
            .items()
            .iter()
            .map(|b| config::CacheBehavior {
                path_pattern: b.path_pattern.clone(),
                settings: flatten_settings(&b.settings),
            })
            .collect(),
        custom_error_responses: record
            .custom_error_responses
            .items()
            .iter()
            .map(flatten_error_response)
            .collect(),
        logging: record.logging.enabled.then(|| config::LoggingConfig {
            bucket: record.logging.bucket.clone(),
            prefix: record.logging.prefix.clone(),
            include_cookies: record.logging.include_cookies,
        }),
        restrictions: config::Restrictions {
            geo_restriction: config::GeoRestriction {
                restriction_type: record.restrictions.geo_restriction.restriction_type,
                locations: record.restrictions.geo_restriction.locations.items().to_vec(),
            },
        },
        viewer_certificate: flatten_viewer_certificate(&record.viewer_certificate),
        tags: BTreeMap::new(),
    }
}

fn flatten_origin(origin: &wire::Origin) -> config::Origin {
    config::Origin {
        origin_id: origin.id.clone(),
        domain_name: origin.domain_name.clone(),
        origin_path: origin.origin_path.clone(),
        connection_attempts: origin.connection_attempts,
        connection_timeout: origin.connection_timeout,
        origin_access_control_id: origin
            .origin_access_control_id
            .as_deref()
            .and_then(non_empty),
        custom_headers: origin
            .custom_headers
            .items()
            .iter()
            .map(|h| config::CustomHeader {
                name: h.header_name.clone(),
                value: h.header_value.clone(),
            })
            .collect(),
        custom_origin_config: origin.custom_origin_config.as_ref().map(|custom| {
            config::CustomOriginConfig {
                http_port: custom.http_port,
                https_port: custom.https_port,
                origin_protocol_policy: custom.origin_protocol_policy,
                origin_ssl_protocols: custom.origin_ssl_protocols.items().to_vec(),
                origin_keepalive_timeout: custom.origin_keepalive_timeout,
                origin_read_timeout: custom.origin_read_timeout,
            }
        }),
        s3_origin_config: origin
            .s3_origin_config
            .as_ref()
            .filter(|s3| !s3.origin_access_identity.is_empty())
            .map(|s3| config::S3OriginConfig {
                origin_access_identity: s3.origin_access_identity.clone(),
            }),
        origin_shield: origin
            .origin_shield
            .as_ref()
            .filter(|shield| shield.enabled)
            .map(|shield| config::OriginShield {
                enabled: true,
                origin_shield_region: shield.origin_shield_region.as_deref().and_then(non_empty),
            }),
    }
}

fn flatten_origin_group(group: &wire::OriginGroup) -> config::OriginGroup {
    config::OriginGroup {
        origin_id: group.id.clone(),
        failover_status_codes: group.failover_criteria.status_codes.items().to_vec(),
        members: group
            .members
            .items()
            .iter()
            .map(|m| m.origin_id.clone())
            .collect(),
    }
}

fn flatten_settings(s: &wire::CacheSettings) -> config::CacheSettings {
    let cache_policy_id = s.cache_policy_id.as_deref().and_then(non_empty);
    let with_ttl = |ttl: Option<i64>| if cache_policy_id.is_some() { None } else { ttl };

    config::CacheSettings {
        target_origin_id: s.target_origin_id.clone(),
        viewer_protocol_policy: s.viewer_protocol_policy,
        allowed_methods: s.allowed_methods.items().to_vec(),
        cached_methods: s.cached_methods.items().to_vec(),
        compress: s.compress,
        min_ttl: with_ttl(s.min_ttl),
        default_ttl: with_ttl(s.default_ttl),
        max_ttl: with_ttl(s.max_ttl),
        cache_policy_id: cache_policy_id.clone(),
        origin_request_policy_id: s.origin_request_policy_id.as_deref().and_then(non_empty),
        response_headers_policy_id: s.response_headers_policy_id.as_deref().and_then(non_empty),
        field_level_encryption_id: s.field_level_encryption_id.as_deref().and_then(non_empty),
        realtime_log_config_arn: s.realtime_log_config_arn.as_deref().and_then(non_empty),
        smooth_streaming: s.smooth_streaming,
        forwarded_values: s.forwarded_values.as_ref().map(|fv| config::ForwardedValues {
            query_string: fv.query_string,
            query_string_cache_keys: fv.query_string_cache_keys.items().to_vec(),
            headers: fv.headers.items().to_vec(),
            cookies: config::CookiePreference {
                forward: fv.cookies.forward,
                whitelisted_names: fv.cookies.whitelisted_names.items().to_vec(),
            },
        }),
        function_associations: s
            .function_associations
            .items()
            .iter()
            .map(|f| config::FunctionAssociation {
                event_type: f.event_type,
                function_arn: f.function_arn.clone(),
            })
            .collect(),
        lambda_function_associations: s
            .lambda_function_associations
            .items()
            .iter()
            .map(|l| config::LambdaFunctionAssociation {
                event_type: l.event_type,
                lambda_arn: l.lambda_function_arn.clone(),
                include_body: l.include_body,
            })
            .collect(),
        trusted_signers: s.trusted_signers.items().to_vec(),
        trusted_key_groups: s.trusted_key_groups.items().to_vec(),
    }
}

fn flatten_error_response(r: &wire::CustomErrorResponse) -> config::CustomErrorResponse {
    config::CustomErrorResponse {
        error_code: r.error_code,
        response_code: r.response_code.parse().ok().filter(|code| *code != 0),
        response_page_path: non_empty(&r.response_page_path),
        error_caching_min_ttl: r.error_caching_min_ttl,
    }
}

fn flatten_viewer_certificate(cert: &wire::ViewerCertificate) -> config::ViewerCertificate {
    config::ViewerCertificate {
        iam_certificate_id: cert.iam_certificate_id.as_deref().and_then(non_empty),
        acm_certificate_arn: cert.acm_certificate_arn.as_deref().and_then(non_empty),
        cloudfront_default_certificate: cert.default_certificate,
        ssl_support_method: cert.ssl_support_method,
        minimum_protocol_version: cert.minimum_protocol_version,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

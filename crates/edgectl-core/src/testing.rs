//! Shared fixtures for unit tests

use crate::config::DistributionConfig;

pub(crate) const SAMPLE_YAML: &str = r#"
enabled: true
comment: static site with api failover
default_root_object: index.html
is_ipv6_enabled: true
price_class: PriceClass_100
aliases:
  - www.example.com
  - example.com
origins:
  - origin_id: site
    domain_name: site.s3.us-east-1.amazonaws.com
  - origin_id: api
    domain_name: api.example.com
    origin_path: /v1
    custom_headers:
      - name: X-Origin-Verify
        value: secret
      - name: X-Env
        value: prod
    custom_origin_config:
      http_port: 80
      https_port: 443
      origin_protocol_policy: https-only
      origin_ssl_protocols: [TLSv1.2, TLSv1.1]
    origin_shield:
      enabled: true
      origin_shield_region: us-east-1
origin_groups:
  - origin_id: failover
    failover_status_codes: [503, 500, 502]
    members: [api, site]
default_cache_behavior:
  target_origin_id: site
  viewer_protocol_policy: redirect-to-https
  allowed_methods: [HEAD, GET]
  cached_methods: [HEAD, GET]
  compress: true
  cache_policy_id: 658327ea-f89d-4fab-a63d-7e88639e58f6
  function_associations:
    - event_type: viewer-request
      function_arn: arn:aws:cloudfront::123456789012:function/rewrite
ordered_cache_behaviors:
  - path_pattern: /api/*
    target_origin_id: failover
    viewer_protocol_policy: https-only
    allowed_methods: [GET, HEAD, OPTIONS, PUT, POST, PATCH, DELETE]
    cached_methods: [GET, HEAD]
    default_ttl: 60
    forwarded_values:
      query_string: true
      query_string_cache_keys: [page, sort]
      headers: [Authorization, Accept]
      cookies:
        forward: whitelist
        whitelisted_names: [session, lang]
    trusted_key_groups: [kg-primary]
custom_error_responses:
  - error_code: 404
    response_code: 200
    response_page_path: /index.html
  - error_code: 503
    error_caching_min_ttl: 5
logging:
  bucket: logs.s3.amazonaws.com
  prefix: edge/
restrictions:
  geo_restriction:
    restriction_type: whitelist
    locations: [US, CA, DE]
viewer_certificate:
  cloudfront_default_certificate: true
tags:
  team: web
"#;

pub(crate) fn sample_config() -> DistributionConfig {
    DistributionConfig::from_yaml_str(SAMPLE_YAML).expect("sample config parses")
}

/// Custom origins behind a shield, edge functions and a country allow-list
pub(crate) const MEDIA_YAML: &str = r#"
enabled: true
comment: media delivery
http_version: http2and3
aliases: [media.example.com, cdn.example.com, img.example.com]
origins:
  - origin_id: packager
    domain_name: packager.internal.example.com
    connection_attempts: 2
    connection_timeout: 5
    custom_headers:
      - name: X-Flag
        value: "-1"
      - name: X-Flag-
        value: "1"
      - name: X-Shared-Secret
        value: s3cr3t
    custom_origin_config:
      http_port: 8080
      https_port: 8443
      origin_protocol_policy: match-viewer
      origin_ssl_protocols: [TLSv1.2, TLSv1.1, TLSv1]
      origin_keepalive_timeout: 10
      origin_read_timeout: 60
    origin_shield:
      enabled: true
      origin_shield_region: eu-west-1
  - origin_id: thumbnails
    domain_name: thumbs.example.com
    origin_path: /v2
    custom_headers:
      - name: X-Tier
        value: thumbs
    custom_origin_config:
      http_port: 80
      https_port: 443
      origin_protocol_policy: https-only
      origin_ssl_protocols: [TLSv1.2]
    origin_shield:
      enabled: true
      origin_shield_region: us-east-2
default_cache_behavior:
  target_origin_id: packager
  viewer_protocol_policy: https-only
  allowed_methods: [OPTIONS, HEAD, GET]
  cached_methods: [HEAD, GET]
  cache_policy_id: 4135ea2d-6df8-44a3-9df3-4b5a84be39ad
  function_associations:
    - event_type: viewer-response
      function_arn: arn:aws:cloudfront::123456789012:function/security-headers
    - event_type: viewer-request
      function_arn: arn:aws:cloudfront::123456789012:function/token-check
ordered_cache_behaviors:
  - path_pattern: /thumbs/*
    target_origin_id: thumbnails
    viewer_protocol_policy: redirect-to-https
    allowed_methods: [HEAD, GET]
    cached_methods: [HEAD, GET]
    min_ttl: 60
    max_ttl: 604800
    function_associations:
      - event_type: viewer-request
        function_arn: arn:aws:cloudfront::123456789012:function/resize-hint
restrictions:
  geo_restriction:
    restriction_type: whitelist
    locations: [NL, FR, DE, BE]
viewer_certificate:
  acm_certificate_arn: arn:aws:acm:us-east-1:123456789012:certificate/media
  ssl_support_method: sni-only
  minimum_protocol_version: TLSv1.2_2021
"#;

pub(crate) fn media_config() -> DistributionConfig {
    DistributionConfig::from_yaml_str(MEDIA_YAML).expect("media config parses")
}

//! Closed symbol sets shared by the declarative config and the wire record
//!
//! Every enum-valued field of a distribution maps to exactly one of these
//! types. The wire symbol is the serde representation, so a value that is not
//! part of the set fails to deserialize instead of being carried as a string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that is not a member of the expected symbol set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownSymbol {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            /// Every member of the set, in declaration order
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Wire symbol for this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownSymbol;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    _ => Err(UnknownSymbol {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// HTTP versions the edge accepts from viewers
    HttpVersion {
        Http1_1 => "http1.1",
        Http2 => "http2",
        Http2And3 => "http2and3",
        Http3 => "http3",
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::Http2
    }
}

wire_enum! {
    /// Edge location price tier
    PriceClass {
        All => "PriceClass_All",
        Class200 => "PriceClass_200",
        Class100 => "PriceClass_100",
    }
}

impl Default for PriceClass {
    fn default() -> Self {
        Self::All
    }
}

wire_enum! {
    ViewerProtocolPolicy {
        AllowAll => "allow-all",
        HttpsOnly => "https-only",
        RedirectToHttps => "redirect-to-https",
    }
}

wire_enum! {
    /// HTTP method accepted or cached by a cache behavior
    Method {
        Get => "GET",
        Head => "HEAD",
        Post => "POST",
        Put => "PUT",
        Patch => "PATCH",
        Options => "OPTIONS",
        Delete => "DELETE",
    }
}

wire_enum! {
    /// Which cookies are forwarded to the origin
    ItemSelection {
        None => "none",
        Whitelist => "whitelist",
        All => "all",
    }
}

wire_enum! {
    /// Point in the request lifecycle where an edge function runs
    EventType {
        ViewerRequest => "viewer-request",
        ViewerResponse => "viewer-response",
        OriginRequest => "origin-request",
        OriginResponse => "origin-response",
    }
}

wire_enum! {
    OriginProtocolPolicy {
        HttpOnly => "http-only",
        MatchViewer => "match-viewer",
        HttpsOnly => "https-only",
    }
}

wire_enum! {
    /// Protocol the edge may use when talking to a custom origin
    SslProtocol {
        SslV3 => "SSLv3",
        TlsV1 => "TLSv1",
        TlsV1_1 => "TLSv1.1",
        TlsV1_2 => "TLSv1.2",
    }
}

wire_enum! {
    GeoRestrictionType {
        Blacklist => "blacklist",
        Whitelist => "whitelist",
        None => "none",
    }
}

impl Default for GeoRestrictionType {
    fn default() -> Self {
        Self::None
    }
}

wire_enum! {
    /// Minimum TLS policy presented to viewers
    MinimumProtocolVersion {
        SslV3 => "SSLv3",
        TlsV1 => "TLSv1",
        TlsV1_2016 => "TLSv1_2016",
        TlsV1_1_2016 => "TLSv1.1_2016",
        TlsV1_2_2018 => "TLSv1.2_2018",
        TlsV1_2_2019 => "TLSv1.2_2019",
        TlsV1_2_2021 => "TLSv1.2_2021",
    }
}

impl Default for MinimumProtocolVersion {
    fn default() -> Self {
        Self::TlsV1
    }
}

wire_enum! {
    /// How the edge serves HTTPS for a custom certificate
    SslSupportMethod {
        SniOnly => "sni-only",
        Vip => "vip",
        StaticIp => "static-ip",
    }
}

wire_enum! {
    /// Deployment status reported by the control plane
    DistributionStatus {
        InProgress => "InProgress",
        Deployed => "Deployed",
    }
}

impl DistributionStatus {
    /// Whether the configuration has fully propagated
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_round_trip_through_from_str() {
        for version in MinimumProtocolVersion::ALL {
            let parsed: MinimumProtocolVersion = version.as_str().parse().unwrap();
            assert_eq!(parsed, *version);
        }
        for method in Method::ALL {
            assert_eq!(method.to_string().parse::<Method>().unwrap(), *method);
        }
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let err = "http4".parse::<HttpVersion>().unwrap_err();
        assert_eq!(err.kind, "HttpVersion");
        assert_eq!(err.to_string(), "unknown HttpVersion value 'http4'");
    }

    #[test]
    fn test_serde_uses_wire_symbols() {
        let json = serde_json::to_string(&PriceClass::Class100).unwrap();
        assert_eq!(json, "\"PriceClass_100\"");

        let parsed: ViewerProtocolPolicy = serde_json::from_str("\"redirect-to-https\"").unwrap();
        assert_eq!(parsed, ViewerProtocolPolicy::RedirectToHttps);

        assert!(serde_json::from_str::<SslProtocol>("\"TLSv1.3\"").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(HttpVersion::default(), HttpVersion::Http2);
        assert_eq!(PriceClass::default(), PriceClass::All);
        assert_eq!(MinimumProtocolVersion::default(), MinimumProtocolVersion::TlsV1);
    }
}

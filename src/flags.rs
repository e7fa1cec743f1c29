//! Capability flags, execution targets and the fetch strategy selector.
//!
//! Flags describe how a result may be consumed. A [`Target`] describes where
//! the caller runs. [`select_transport`] combines the two into the transport
//! a provider should use for a given endpoint.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Transport/consumption constraint declared by a provider or stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityFlag {
    /// Fetchable directly by a consumer that enforces CORS.
    #[serde(alias = "cors_allowed")]
    CorsAllowed,
    /// Only reachable from the network that resolved it.
    #[serde(alias = "ip_locked")]
    IpLocked,
}

impl fmt::Display for CapabilityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorsAllowed => f.write_str("cors-allowed"),
            Self::IpLocked => f.write_str("ip-locked"),
        }
    }
}

impl FromStr for CapabilityFlag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "cors-allowed" => Ok(Self::CorsAllowed),
            "ip-locked" => Ok(Self::IpLocked),
            other => Err(anyhow!("unknown capability flag '{other}'")),
        }
    }
}

/// Ordered set of capability flags.
pub type FlagSet = BTreeSet<CapabilityFlag>;

/// Build a [`FlagSet`] from a slice.
#[must_use]
pub fn flag_set(flags: &[CapabilityFlag]) -> FlagSet {
    flags.iter().copied().collect()
}

/// Environment the resolved streams will be consumed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Native application; no origin restrictions.
    #[default]
    Native,
    /// Plain web page; cross-origin requests are blocked.
    Browser,
    /// Browser extension with host permissions.
    BrowserExtension,
}

impl Target {
    /// Whether code running in this target may issue cross-origin requests.
    #[must_use]
    pub fn can_cross_origin(self) -> bool {
        !matches!(self, Self::Browser)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Browser => f.write_str("browser"),
            Self::BrowserExtension => f.write_str("browser-extension"),
        }
    }
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "browser" => Ok(Self::Browser),
            "browser-extension" | "extension" => Ok(Self::BrowserExtension),
            other => Err(anyhow!("unknown target '{other}'")),
        }
    }
}

/// Flags a result must carry and flags it must not carry to be usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    /// Every one of these must be present.
    pub required: FlagSet,
    /// None of these may be present.
    pub disallowed: FlagSet,
}

impl FeatureSet {
    /// Features implied by a target.
    ///
    /// `consistent_ip` states whether the consumer shares the resolving
    /// network; when it does not, IP-locked results are unusable.
    #[must_use]
    pub fn for_target(target: Target, consistent_ip: bool) -> Self {
        let mut features = Self::default();
        if !target.can_cross_origin() {
            features.required.insert(CapabilityFlag::CorsAllowed);
        }
        if !consistent_ip {
            features.disallowed.insert(CapabilityFlag::IpLocked);
        }
        features
    }

    /// Whether a result carrying `flags` is usable under these features.
    #[must_use]
    pub fn allows(&self, flags: &FlagSet) -> bool {
        self.required.is_subset(flags) && self.disallowed.is_disjoint(flags)
    }
}

/// The two transports a provider can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Fetch the URL as-is.
    Direct,
    /// Route the request through the configured proxy.
    Proxied,
}

/// Decide which transport a target endpoint needs.
///
/// Unflagged endpoints always go through the proxy. Flagged endpoints go
/// through the proxy only when the target cannot make cross-origin requests
/// and the endpoint is not `CORS_ALLOWED`.
#[must_use]
pub fn select_transport(flags: &FlagSet, target: Target) -> Transport {
    if flags.is_empty() {
        return Transport::Proxied;
    }
    if !target.can_cross_origin() && !flags.contains(&CapabilityFlag::CorsAllowed) {
        return Transport::Proxied;
    }
    Transport::Direct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unflagged_targets_are_proxied() {
        for target in [Target::Native, Target::Browser, Target::BrowserExtension] {
            assert_eq!(select_transport(&FlagSet::new(), target), Transport::Proxied);
        }
    }

    #[test]
    fn browser_needs_cors_for_direct() {
        let locked = flag_set(&[CapabilityFlag::IpLocked]);
        assert_eq!(select_transport(&locked, Target::Browser), Transport::Proxied);
        assert_eq!(select_transport(&locked, Target::Native), Transport::Direct);

        let cors = flag_set(&[CapabilityFlag::CorsAllowed]);
        assert_eq!(select_transport(&cors, Target::Browser), Transport::Direct);
    }

    #[test]
    fn browser_features_require_cors() {
        let features = FeatureSet::for_target(Target::Browser, true);
        assert!(!features.allows(&FlagSet::new()));
        assert!(features.allows(&flag_set(&[CapabilityFlag::CorsAllowed])));
    }

    #[test]
    fn inconsistent_ip_rejects_ip_locked() {
        let features = FeatureSet::for_target(Target::Native, false);
        assert!(features.allows(&FlagSet::new()));
        assert!(!features.allows(&flag_set(&[CapabilityFlag::IpLocked])));
        assert!(FeatureSet::for_target(Target::Native, true)
            .allows(&flag_set(&[CapabilityFlag::IpLocked])));
    }

    #[test]
    fn parse_flags_and_targets() {
        assert_eq!("CORS_ALLOWED".parse::<CapabilityFlag>().unwrap(), CapabilityFlag::CorsAllowed);
        assert_eq!("ip-locked".parse::<CapabilityFlag>().unwrap(), CapabilityFlag::IpLocked);
        assert!("teleport".parse::<CapabilityFlag>().is_err());
        assert_eq!("extension".parse::<Target>().unwrap(), Target::BrowserExtension);
    }
}

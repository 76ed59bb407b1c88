//! Identity policies - how a request maps to the key its admission is counted under.

use std::str::FromStr;
use std::sync::Arc;

use gatekeep_core::ConfigError;
use gatekeep_core::ports::{IdentityPolicy, RequestIdentity};

const UNKNOWN_PEER: &str = "unknown";

/// Identify clients by network address only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerAddressIdentity;

impl IdentityPolicy for PeerAddressIdentity {
    fn identify(&self, request: &RequestIdentity<'_>) -> String {
        request.peer_addr.unwrap_or(UNKNOWN_PEER).to_string()
    }
}

/// Prefer the authenticated principal, falling back to the network address.
///
/// Keys are prefixed so a principal can never collide with an address.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalIdentity;

impl IdentityPolicy for PrincipalIdentity {
    fn identify(&self, request: &RequestIdentity<'_>) -> String {
        match request.principal.filter(|p| !p.is_empty()) {
            Some(principal) => format!("principal:{principal}"),
            None => format!("addr:{}", request.peer_addr.unwrap_or(UNKNOWN_PEER)),
        }
    }
}

/// Selectable policy, as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityPolicyKind {
    #[default]
    Address,
    Principal,
}

impl IdentityPolicyKind {
    pub fn from_env() -> Result<Self, ConfigError> {
        crate::env::parse_env("IDENTITY_POLICY").map(Option::unwrap_or_default)
    }

    pub fn build(self) -> Arc<dyn IdentityPolicy> {
        match self {
            IdentityPolicyKind::Address => Arc::new(PeerAddressIdentity),
            IdentityPolicyKind::Principal => Arc::new(PrincipalIdentity),
        }
    }
}

impl FromStr for IdentityPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "address" | "addr" | "ip" => Ok(IdentityPolicyKind::Address),
            "principal" | "user" => Ok(IdentityPolicyKind::Principal),
            other => Err(format!("unknown identity policy: {other}")),
        }
    }
}

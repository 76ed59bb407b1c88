//! Client identity derivation.

/// Request attributes an identity can be derived from.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdentity<'a> {
    /// Network address of the peer, as reported by the transport or a trusted proxy.
    pub peer_addr: Option<&'a str>,
    /// Authenticated principal (user id, API key id), if any.
    pub principal: Option<&'a str>,
}

/// Policy mapping a request to the identity its admission is counted under.
pub trait IdentityPolicy: Send + Sync {
    fn identify(&self, request: &RequestIdentity<'_>) -> String;
}

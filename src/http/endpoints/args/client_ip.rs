//! Extractor for the client IP address

use std::{
    fmt,
    future::{ready, Ready},
    net::{IpAddr, SocketAddr},
    ops::Deref
};

use crate::{error::Error, AppSettings};
use crate::app::settings::TRUST_PROXY;
use crate::headers::HeaderName;
use crate::http::{
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Address of the connected peer, stored in the request extensions
#[derive(Debug, Clone, Copy)]
pub(crate) struct PeerAddr(pub(crate) SocketAddr);

/// IP address of the client
///
/// It's the peer address of the connection. When the `trust proxy` setting is enabled,
/// the left-most valid address of `X-Forwarded-For` is taken instead.
///
/// # Example
/// ```no_run
/// use mortar::{App, ClientIp, ok};
///
/// let mut app = App::new();
///
/// app.map_get("/ip", |ip: ClientIp| async move {
///     ok!("{ip}")
/// });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    /// Unwraps the inner [`IpAddr`]
    #[inline]
    pub fn into_inner(self) -> IpAddr {
        self.0
    }
}

impl Deref for ClientIp {
    type Target = IpAddr;

    #[inline]
    fn deref(&self) -> &IpAddr {
        &self.0
    }
}

impl fmt::Display for ClientIp {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromRequestParts for ClientIp {
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        let trust_proxy = parts.extensions
            .get::<AppSettings>()
            .is_some_and(|settings| settings.enabled(TRUST_PROXY));

        if trust_proxy {
            let forwarded = parts.headers
                .get_all(X_FORWARDED_FOR)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .find_map(|ip| ip.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return Ok(ClientIp(ip));
            }
        }

        parts.extensions
            .get::<PeerAddr>()
            .map(|peer| ClientIp(peer.0.ip()))
            .ok_or_else(|| Error::server_error("Client address is unavailable"))
    }
}

impl FromPayload for ClientIp {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Err(Error::server_error("Client address is unavailable"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}

//! Listening address of the application

use std::net::{IpAddr, SocketAddr};

const DEFAULT_PORT: u16 = 7878;

/// Socket address the server binds to
///
/// Default: `0.0.0.0:7878`, or `127.0.0.1:7878` on Windows.
/// An address that fails to parse falls back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub(super) socket: SocketAddr
}

impl Default for Connection {
    #[inline]
    fn default() -> Self {
        #[cfg(target_os = "windows")]
        let ip = [127, 0, 0, 1];
        #[cfg(not(target_os = "windows"))]
        let ip = [0, 0, 0, 0];
        Self { socket: (ip, DEFAULT_PORT).into() }
    }
}

impl From<&str> for Connection {
    #[inline]
    fn from(s: &str) -> Self {
        s.parse::<SocketAddr>()
            .map(|socket| Self { socket })
            .unwrap_or_default()
    }
}

impl From<String> for Connection {
    #[inline]
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<SocketAddr> for Connection {
    #[inline]
    fn from(socket: SocketAddr) -> Self {
        Self { socket }
    }
}

impl<I: Into<IpAddr>> From<(I, u16)> for Connection {
    #[inline]
    fn from(value: (I, u16)) -> Self {
        Self { socket: SocketAddr::from(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_socket() -> SocketAddr {
        #[cfg(target_os = "windows")]
        return SocketAddr::from(([127, 0, 0, 1], 7878));
        #[cfg(not(target_os = "windows"))]
        SocketAddr::from(([0, 0, 0, 0], 7878))
    }

    #[test]
    fn it_uses_default_socket() {
        assert_eq!(Connection::default().socket, default_socket());
    }

    #[test]
    fn it_parses_socket() {
        let connection: Connection = "127.0.0.1:5000".into();

        assert_eq!(connection.socket, SocketAddr::from(([127, 0, 0, 1], 5000)));
    }

    #[test]
    fn it_falls_back_to_default_on_garbage() {
        let connection: Connection = String::from("not an address").into();

        assert_eq!(connection.socket, default_socket());
    }

    #[test]
    fn it_creates_from_tuple() {
        let connection: Connection = ([127, 0, 0, 1], 8080).into();

        assert_eq!(connection.socket, SocketAddr::from(([127, 0, 0, 1], 8080)));
    }
}

//! Minimal URL splitter.
//!
//! Only what an outbound POST needs: scheme, host, port and path. Query strings
//! stay part of the path; user-info and fragments are not supported.

/// Supported URL schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Port used when the URL does not name one.
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    /// Whether sockets for this scheme need TLS.
    pub fn is_secure(self) -> bool {
        matches!(self, Scheme::Https)
    }
}

/// Reasons a URL was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UrlError {
    /// Scheme missing or neither `http` nor `https`.
    UnsupportedScheme,
    /// Nothing between the scheme separator and the path.
    EmptyHost,
    /// Port present but not a number in `1..=65535`.
    InvalidPort,
}

/// A URL split into the parts needed to open a socket and send a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub scheme: Scheme,
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl<'a> Url<'a> {
    /// Split `url` into scheme, host, port and path.
    ///
    /// The scheme runs up to the first `:` and is matched case-insensitively.
    /// Slashes after it are skipped, the authority runs up to the next `/`, and
    /// the rest is the path, defaulting to `/`.
    pub fn parse(url: &'a str) -> Result<Self, UrlError> {
        let (scheme, rest) = url.split_once(':').ok_or(UrlError::UnsupportedScheme)?;
        let scheme = if scheme.eq_ignore_ascii_case("http") {
            Scheme::Http
        } else if scheme.eq_ignore_ascii_case("https") {
            Scheme::Https
        } else {
            return Err(UrlError::UnsupportedScheme);
        };

        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.split_once(':') {
            Some((host, "")) => (host, scheme.default_port()),
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| UrlError::InvalidPort)?;
                if port == 0 {
                    return Err(UrlError::InvalidPort);
                }
                (host, port)
            }
            None => (authority, scheme.default_port()),
        };

        if host.is_empty() {
            return Err(UrlError::EmptyHost);
        }

        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }
}

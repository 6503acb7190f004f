use http::Uri;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid URL: {0}")]
    Invalid(#[from] http::uri::InvalidUri),

    #[error("URL has no scheme")]
    MissingScheme,

    #[error("unsupported scheme '{0}', expected https or http")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Cleartext HTTP/2 with prior knowledge.
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single endpoint a run is aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub scheme: Scheme,
    /// Host used for dialing and SNI, without IPv6 brackets.
    pub host: String,
    pub port: u16,
    /// `:authority` value, as written in the URL.
    pub authority: String,
    /// `:path` value. Never empty.
    pub path: String,
}

impl Target {
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let uri: Uri = url.parse()?;

        let scheme = match uri.scheme_str() {
            Some(s) if s.eq_ignore_ascii_case("https") => Scheme::Https,
            Some(s) if s.eq_ignore_ascii_case("http") => Scheme::Http,
            Some(other) => return Err(TargetError::UnsupportedScheme(other.to_string())),
            None => return Err(TargetError::MissingScheme),
        };

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or(TargetError::MissingHost)?;
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        let port = match uri.port() {
            Some(p) => p
                .as_str()
                .parse::<u16>()
                .map_err(|_| TargetError::InvalidPort(p.as_str().to_string()))?,
            None => scheme.default_port(),
        };

        // userinfo never goes on the wire
        let authority = uri
            .authority()
            .map(|a| a.as_str())
            .map(|a| a.rsplit('@').next().unwrap_or(a))
            .ok_or(TargetError::MissingHost)?
            .to_string();

        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Target {
            scheme,
            host,
            port,
            authority,
            path,
        })
    }

    /// `host:port` string suitable for address resolution.
    pub fn dial_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path)
    }
}

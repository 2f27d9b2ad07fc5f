//! Normalization of URLs and paths into segment keys.
//!
//! A key is an origin (scheme, hostname, port) followed by the path
//! segments, with `.` and `..` already resolved. Keys are what the host
//! registry and the segment tries are indexed by.

use std::fmt;
use url::Url;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("empty hostname in url {0}")]
    EmptyHostname(String),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("path {0} escapes the root")]
    EscapesRoot(String),
}

/// Scheme, hostname and port of a URL. The port is always filled in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: String,
    pub hostname: String,
    pub port: String,
}

impl Origin {
    pub fn default_port(scheme: &str) -> &'static str {
        if scheme == "https" { "443" } else { "80" }
    }

    pub fn has_default_port(&self) -> bool {
        self.port == Self::default_port(&self.scheme)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.hostname)?;
        if !self.has_default_port() {
            write!(f, ":{}", self.port)?;
        }
        Ok(())
    }
}

/// An origin plus its normalized path segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UrlKey {
    pub origin: Origin,
    pub segments: Vec<String>,
}

impl fmt::Display for UrlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.origin)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// The textual parts of a URL, split without any validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawUrl<'a> {
    pub scheme: &'a str,
    pub authority: &'a str,
    pub path: &'a str,
    /// Query string and fragment, including the leading `?` or `#`.
    pub suffix: &'a str,
}

impl RawUrl<'_> {
    /// Scheme and authority as written, without any path.
    pub fn server_url(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

/// Splits a URL into scheme, authority, path and suffix.
/// URLs without a scheme are taken as `http`. A scheme followed by a
/// single colon (`http:`, `http:/docs`) has an empty authority.
pub fn split_url(url: &str) -> RawUrl<'_> {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => (scheme, rest),
        _ => match url.split_once(':') {
            Some((scheme, rest))
                if is_scheme(scheme) && !rest.starts_with(|c: char| c.is_ascii_digit()) =>
            {
                return split_rest(scheme, "", rest);
            }
            _ => ("http", url),
        },
    };
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, rest) = rest.split_at(authority_end);
    split_rest(scheme, authority, rest)
}

fn is_scheme(scheme: &str) -> bool {
    scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_rest<'a>(scheme: &'a str, authority: &'a str, rest: &'a str) -> RawUrl<'a> {
    let path_end = rest.find(['?', '#']).unwrap_or(rest.len());
    let (path, suffix) = rest.split_at(path_end);

    RawUrl {
        scheme,
        authority,
        path,
        suffix,
    }
}

/// Parses the origin of a URL. The port defaults to 443 for https and to
/// 80 for every other scheme.
pub fn parse_origin(url: &str) -> Result<Origin, FormatError> {
    origin_of(url, &split_url(url))
}

fn origin_of(url: &str, raw: &RawUrl<'_>) -> Result<Origin, FormatError> {
    if raw.authority.is_empty() {
        return Err(FormatError::EmptyHostname(url.to_string()));
    }

    let parsed = Url::parse(&format!("{}://{}/", raw.scheme, raw.authority)).map_err(|e| match e {
        url::ParseError::EmptyHost => FormatError::EmptyHostname(url.to_string()),
        other => FormatError::InvalidUrl {
            url: url.to_string(),
            reason: other.to_string(),
        },
    })?;

    let hostname = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| FormatError::EmptyHostname(url.to_string()))?;

    // `Url` hides ports equal to the scheme's known default, so fall back to
    // what was written in the authority.
    let port = parsed
        .port()
        .or_else(|| explicit_port(raw.authority))
        .map(|port| port.to_string())
        .unwrap_or_else(|| Origin::default_port(parsed.scheme()).to_string());

    Ok(Origin {
        scheme: parsed.scheme().to_string(),
        hostname: hostname.to_string(),
        port,
    })
}

fn explicit_port(authority: &str) -> Option<u16> {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (_, port) = host_port.rsplit_once(':')?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse().ok()
}

/// Splits a path into segments, dropping empty ones and resolving `.` and
/// `..`. A `..` that would climb above the root is an error.
pub fn parse_path(path: &str) -> Result<Vec<String>, FormatError> {
    let mut segments: Vec<String> = Vec::new();
    for piece in path.split('/') {
        match piece {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(FormatError::EscapesRoot(path.to_string()));
                }
            }
            segment => segments.push(segment.to_string()),
        }
    }
    Ok(segments)
}

/// Parses a URL into its origin and normalized path segments.
pub fn url_to_key(url: &str) -> Result<UrlKey, FormatError> {
    let raw = split_url(url);
    Ok(UrlKey {
        origin: origin_of(url, &raw)?,
        segments: parse_path(raw.path)?,
    })
}

/// Drops trailing slashes of the path, never the ones of `scheme://`.
pub fn trim_trailing_slash(url: &str) -> &str {
    let raw = split_url(url);
    if !raw.suffix.is_empty() {
        return url;
    }
    let trimmed = raw.path.trim_end_matches('/');
    &url[..url.len() - (raw.path.len() - trimmed.len())]
}

/// Appends path segments to a base URL.
pub fn join_url<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.as_ref());
    }
    url
}

/// Drops scheme and authority from a URL, keeping path, query and fragment.
pub fn relative_url(url: &str) -> String {
    let raw = split_url(url);
    if raw.path.is_empty() {
        format!("/{}", raw.suffix)
    } else {
        format!("{}{}", raw.path, raw.suffix)
    }
}

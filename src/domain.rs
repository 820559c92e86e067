// dnslink – resolution of DNSLink records
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Domain names and lookup targets.
//!
//! A lookup target is a domain name, optionally accompanied by a path and a
//! query. Targets come from the initial input to a resolution and from the
//! values of redirect entries such as `dnslink=/dns/example.org/docs?lang=en`.

use crate::util::CanonicalStr;
use std::{
    collections::BTreeMap,
    error::Error,
    fmt::{self, Display, Formatter},
};
use url::{Host, Url};

/// The prefix of the domain name under which DNSLink TXT records are published.
pub const DNS_PREFIX: &str = "_dnslink.";

const MAX_DOMAIN_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// The parameters of a query string, each name mapped to its values in order of
/// appearance.
pub type Search = BTreeMap<String, Vec<String>>;

/// A reason why a string is not an acceptable fully qualified domain name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FqdnError {
    EmptyPart,
    TooLong,
    InvalidCharacter,
}

impl FqdnError {
    /// Returns a human-readable explanation of this reason.
    pub fn description(&self) -> &'static str {
        match self {
            Self::EmptyPart => "A FQDN may not contain empty parts.",
            Self::TooLong => {
                "A FQDN may be max 253 characters which each subdomain not exceeding 63 characters."
            }
            Self::InvalidCharacter => "A FQDN may not contain whitespace or invalid IDNA labels.",
        }
    }
}

impl CanonicalStr for FqdnError {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::EmptyPart => "EMPTY_PART",
            Self::TooLong => "TOO_LONG",
            Self::InvalidCharacter => "INVALID_CHARACTER",
        }
    }
}

impl Display for FqdnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPart => write!(f, "empty label in domain name"),
            Self::TooLong => write!(f, "domain name or label too long"),
            Self::InvalidCharacter => write!(f, "invalid character in domain name"),
        }
    }
}

impl Error for FqdnError {}

/// Checks that the given domain, given without trailing dot and without
/// `_dnslink.` prefix, is a well-formed fully qualified domain name.
///
/// The length limit leaves room for adding the prefix again.
pub fn validate_fqdn(domain: &str) -> Result<(), FqdnError> {
    if domain.len() > MAX_DOMAIN_LENGTH - DNS_PREFIX.len() {
        return Err(FqdnError::TooLong);
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(FqdnError::EmptyPart);
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(FqdnError::TooLong);
        }
    }

    Ok(())
}

/// The path and query carried by a lookup target.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathSegment {
    pub pathname: Option<String>,
    pub search: Option<Search>,
}

/// A domain to look up, with the path and query that accompanied it.
///
/// The domain of a successfully parsed target always carries the `_dnslink.`
/// prefix.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DomainTarget {
    pub domain: String,
    pub pathname: Option<String>,
    pub search: Option<Search>,
}

impl DomainTarget {
    /// Returns the domain without the `_dnslink.` prefix.
    pub fn bare_domain(&self) -> &str {
        self.domain.strip_prefix(DNS_PREFIX).unwrap_or(&self.domain)
    }

    /// Returns whether the domain carries the `_dnslink.` prefix.
    pub fn has_prefix(&self) -> bool {
        self.domain.starts_with(DNS_PREFIX)
    }

    /// Returns the path and query of this target, if it has any.
    pub fn path_segment(&self) -> Option<PathSegment> {
        if self.pathname.is_none() && self.search.is_none() {
            return None;
        }
        Some(PathSegment {
            pathname: self.pathname.clone(),
            search: self.search.clone(),
        })
    }
}

impl Display for DomainTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.domain)?;
        if let Some(pathname) = &self.pathname {
            write!(f, "{pathname}")?;
        }
        if let Some(search) = &self.search {
            let mut sep = '?';
            for (name, values) in search {
                for value in values {
                    write!(f, "{sep}{name}={value}")?;
                    sep = '&';
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParseTargetErrorKind {
    /// The domain carries the `_dnslink.` prefix more than once.
    RecursivePrefix,
    InvalidDomain(FqdnError),
}

/// An error that occurs when parsing a lookup target.
///
/// The error carries the target as far as it could be parsed, for use in
/// diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseTargetError {
    pub kind: ParseTargetErrorKind,
    pub target: DomainTarget,
}

impl Display for ParseTargetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseTargetErrorKind::RecursivePrefix => {
                write!(f, "recursive _dnslink. prefix in domain {}", self.target.domain)
            }
            ParseTargetErrorKind::InvalidDomain(reason) => {
                write!(f, "invalid domain {}: {reason}", self.target.domain)
            }
        }
    }
}

impl Error for ParseTargetError {}

/// Parses a hostname or a URL-like redirect value into a lookup target.
///
/// Accepted shapes are `example.org`, `example.org.`, `_dnslink.example.org`,
/// `//example.org/path`, and `example.org/path?name=value`. Userinfo and port
/// are ignored. The domain is converted to IDNA A-label form, and the returned
/// target’s domain has the `_dnslink.` prefix (added exactly once).
pub fn parse_target(input: &str) -> Result<DomainTarget, ParseTargetError> {
    let input = input.trim();
    let input = input.strip_prefix("//").unwrap_or(input);

    let url = Url::parse(&format!("https://{input}")).map_err(|e| {
        let reason = match e {
            url::ParseError::EmptyHost => FqdnError::EmptyPart,
            _ => FqdnError::InvalidCharacter,
        };
        let host = input.split(['/', '?', '#']).next().unwrap_or(input);
        ParseTargetError {
            kind: ParseTargetErrorKind::InvalidDomain(reason),
            target: DomainTarget {
                domain: host.into(),
                pathname: None,
                search: None,
            },
        }
    })?;

    let pathname = match url.path() {
        "" | "/" => None,
        p => Some(p.to_owned()),
    };
    let search = parse_search(&url);

    let fail = |kind, domain: &str| ParseTargetError {
        kind,
        target: DomainTarget {
            domain: domain.into(),
            pathname: pathname.clone(),
            search: search.clone(),
        },
    };
    let invalid = |reason, domain: &str| fail(ParseTargetErrorKind::InvalidDomain(reason), domain);

    let host = match url.host() {
        Some(Host::Domain(host)) => host,
        Some(host) => return Err(invalid(FqdnError::InvalidCharacter, &host.to_string())),
        None => return Err(invalid(FqdnError::EmptyPart, "")),
    };

    let host = host.strip_suffix('.').unwrap_or(host);

    let domain = host.strip_prefix(DNS_PREFIX).unwrap_or(host);

    if domain.starts_with(DNS_PREFIX) {
        return Err(fail(ParseTargetErrorKind::RecursivePrefix, domain));
    }

    validate_fqdn(domain).map_err(|reason| invalid(reason, domain))?;

    Ok(DomainTarget {
        domain: format!("{DNS_PREFIX}{domain}"),
        pathname,
        search,
    })
}

fn parse_search(url: &Url) -> Option<Search> {
    let mut search = Search::new();

    for (name, value) in url.query_pairs() {
        search.entry(name.into_owned()).or_default().push(value.into_owned());
    }

    if search.is_empty() {
        None
    } else {
        Some(search)
    }
}

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

//! Resolution log.
//!
//! Every decision taken during a resolution, and every TXT entry that does not
//! make it into the result, is recorded as a [`LogEntry`].

use crate::{
    domain::{DomainTarget, FqdnError, PathSegment},
    entry::EntryError,
    util::CanonicalStr,
};
use std::fmt::{self, Display, Formatter};

/// The code identifying the kind of a log entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LogCode {
    Resolve,
    Redirect,
    ConflictEntry,
    InvalidEntry,
    EndlessRedirect,
    InvalidRedirect,
    TooManyRedirects,
    UnusedEntry,
    RecursiveDnsLinkPrefix,
    Fallback,
}

impl LogCode {
    /// Returns a human-readable explanation of this code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Resolve => "This domain name was used to resolve the DNSLink entries.",
            Self::Redirect => "Redirecting away from this domain name.",
            Self::ConflictEntry => {
                "Multiple entries for a key were found, only the first value after sorting is primary."
            }
            Self::InvalidEntry => "Entry misformatted, cant be used.",
            Self::EndlessRedirect => "Circular reference of redirects detected.",
            Self::InvalidRedirect => "Redirect to an invalid domain name.",
            Self::TooManyRedirects => "Too many redirects, resolution aborted.",
            Self::UnusedEntry => "Entry not used because a redirect takes precedence.",
            Self::RecursiveDnsLinkPrefix => "A domain name may carry the _dnslink. prefix only once.",
            Self::Fallback => "Falling back to domain without _dnslink prefix.",
        }
    }
}

impl CanonicalStr for LogCode {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Resolve => "RESOLVE",
            Self::Redirect => "REDIRECT",
            Self::ConflictEntry => "CONFLICT_ENTRY",
            Self::InvalidEntry => "INVALID_ENTRY",
            Self::EndlessRedirect => "ENDLESS_REDIRECT",
            Self::InvalidRedirect => "INVALID_REDIRECT",
            Self::TooManyRedirects => "TOO_MANY_REDIRECTS",
            Self::UnusedEntry => "UNUSED_ENTRY",
            Self::RecursiveDnsLinkPrefix => "RECURSIVE_DNSLINK_PREFIX",
            Self::Fallback => "FALLBACK",
        }
    }
}

impl Display for LogCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

/// An entry in the resolution log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogEntry {
    /// The final links were resolved at this target.
    Resolve(DomainTarget),
    /// Resolution continued from this target to the target of a redirect.
    Redirect(DomainTarget),
    /// An entry whose key has more than one entry, and which is not the
    /// primary value, or which duplicates another entry.
    ConflictEntry { entry: String },
    /// A TXT record starting with `dnslink=` that is not a valid entry.
    InvalidEntry { entry: String, reason: EntryError },
    /// A redirect to a target that was already visited.
    EndlessRedirect(DomainTarget),
    /// A redirect to a malformed domain.
    InvalidRedirect { target: DomainTarget, reason: FqdnError },
    /// A redirect that exceeds the maximum number of redirects.
    TooManyRedirects(DomainTarget),
    /// An entry made moot by a redirect found alongside it.
    UnusedEntry { entry: String },
    /// A redirect to a domain that carries the `_dnslink.` prefix twice.
    RecursiveDnsLinkPrefix(DomainTarget),
    /// The prefixed domain yielded no entries, the bare domain was queried.
    Fallback { domain: String },
}

impl LogEntry {
    pub fn code(&self) -> LogCode {
        match self {
            Self::Resolve(_) => LogCode::Resolve,
            Self::Redirect(_) => LogCode::Redirect,
            Self::ConflictEntry { .. } => LogCode::ConflictEntry,
            Self::InvalidEntry { .. } => LogCode::InvalidEntry,
            Self::EndlessRedirect(_) => LogCode::EndlessRedirect,
            Self::InvalidRedirect { .. } => LogCode::InvalidRedirect,
            Self::TooManyRedirects(_) => LogCode::TooManyRedirects,
            Self::UnusedEntry { .. } => LogCode::UnusedEntry,
            Self::RecursiveDnsLinkPrefix(_) => LogCode::RecursiveDnsLinkPrefix,
            Self::Fallback { .. } => LogCode::Fallback,
        }
    }

    /// Returns the lookup target this entry concerns, if any.
    pub fn target(&self) -> Option<&DomainTarget> {
        match self {
            Self::Resolve(t)
            | Self::Redirect(t)
            | Self::EndlessRedirect(t)
            | Self::TooManyRedirects(t)
            | Self::RecursiveDnsLinkPrefix(t)
            | Self::InvalidRedirect { target: t, .. } => Some(t),
            _ => None,
        }
    }

    /// Returns the literal TXT record data this entry concerns, if any.
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::ConflictEntry { entry }
            | Self::InvalidEntry { entry, .. }
            | Self::UnusedEntry { entry } => Some(entry.as_str()),
            _ => None,
        }
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code())?;
        match self {
            Self::Fallback { domain } => write!(f, " domain={domain}"),
            Self::InvalidEntry { entry, reason } => {
                write!(f, " entry={entry} ({})", reason.canonical_str())
            }
            Self::InvalidRedirect { target, reason } => {
                write!(f, " domain={target} ({})", reason.canonical_str())
            }
            _ => {
                if let Some(target) = self.target() {
                    write!(f, " domain={target}")?;
                }
                if let Some(entry) = self.entry() {
                    write!(f, " entry={entry}")?;
                }
                Ok(())
            }
        }
    }
}

/// Collects the paths and queries of the targets passed through during a
/// resolution, innermost (most recent) first.
pub fn derive_path(log: &[LogEntry]) -> Vec<PathSegment> {
    log.iter()
        .rev()
        .filter_map(|entry| match entry {
            LogEntry::Resolve(t) | LogEntry::Redirect(t) => t.path_segment(),
            _ => None,
        })
        .collect()
}

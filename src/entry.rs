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

//! DNSLink TXT entries.

use crate::util::{self, CanonicalStr};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// The marker that TXT record data must start with to be a DNSLink entry.
pub const TXT_PREFIX: &str = "dnslink=";

/// A reason why a DNSLink entry is invalid.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntryError {
    WrongStart,
    KeyMissing,
    NoValue,
    InvalidCharacter,
    InvalidEncoding,
}

impl EntryError {
    /// Returns a human-readable explanation of this reason.
    pub fn description(&self) -> &'static str {
        match self {
            Self::WrongStart => "A DNSLink entry needs to start with a /.",
            Self::KeyMissing => "A DNSLink entry needs to have a key, like: dnslink=/key/value.",
            Self::NoValue => "A DNSLink entry needs to have a value, like: dnslink=/key/value.",
            Self::InvalidCharacter => "A DNSLink entry may only contain ascii characters.",
            Self::InvalidEncoding => "A DNSLink entry value may only contain valid percent-encoding.",
        }
    }
}

impl CanonicalStr for EntryError {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::WrongStart => "WRONG_START",
            Self::KeyMissing => "KEY_MISSING",
            Self::NoValue => "NO_VALUE",
            Self::InvalidCharacter => "INVALID_CHARACTER",
            Self::InvalidEncoding => "INVALID_ENCODING",
        }
    }
}

impl Display for EntryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongStart => write!(f, "entry does not start with /"),
            Self::KeyMissing => write!(f, "entry key missing"),
            Self::NoValue => write!(f, "entry value missing"),
            Self::InvalidCharacter => write!(f, "non-printable or non-ASCII character in entry"),
            Self::InvalidEncoding => write!(f, "invalid percent-encoding in entry value"),
        }
    }
}

impl Error for EntryError {}

/// A syntactically valid DNSLink entry `dnslink=/key/value`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    /// Validates TXT record data as a DNSLink entry.
    ///
    /// The leading `dnslink=` marker is stripped if present. In strict mode,
    /// the entry must consist of printable ASCII characters only, and
    /// percent-escapes in the value must be well-formed; the value is
    /// nevertheless returned as given, not decoded.
    pub fn validate(text: &str, strict: bool) -> Result<Self, EntryError> {
        let s = text.strip_prefix(TXT_PREFIX).unwrap_or(text).trim();

        let s = s.strip_prefix('/').ok_or(EntryError::WrongStart)?;

        if strict && !s.chars().all(util::is_printable_ascii) {
            return Err(EntryError::InvalidCharacter);
        }

        let mut parts = s.splitn(2, '/');

        let key = parts
            .next()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(EntryError::KeyMissing)?;

        let value = parts
            .next()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(EntryError::NoValue)?;

        if strict && util::percent_decode(value).is_none() {
            return Err(EntryError::InvalidEncoding);
        }

        Ok(Self {
            key: key.into(),
            value: value.into(),
        })
    }
}

impl FromStr for Entry {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s, true)
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{TXT_PREFIX}/{}/{}", self.key, self.value)
    }
}

/// A valid DNSLink entry together with the TXT record it was found in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedEntry {
    pub key: String,
    pub value: String,
    /// The literal TXT record data.
    pub source: String,
    pub ttl: u32,
}

impl ParsedEntry {
    pub fn new(entry: Entry, source: impl Into<String>, ttl: u32) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
            source: source.into(),
            ttl,
        }
    }
}

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

#[cfg(feature = "hickory-resolver")]
mod hickory_resolver;

use std::{future::Future, io};

/// A TXT record as returned by a lookup.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TxtEntry {
    /// The record data, with multiple character strings joined.
    pub text: String,
    pub ttl: u32,
}

impl TxtEntry {
    pub fn new(text: impl Into<String>, ttl: u32) -> Self {
        Self {
            text: text.into(),
            ttl,
        }
    }
}

/// A trait for looking up DNS TXT records that may contain DNSLink entries.
///
/// The error type used here is `std::io::Error`. The following error kinds on
/// the query result are recognised and receive special treatment.
///
/// * `ErrorKind::NotFound` on the query: NXDOMAIN or no TXT records, treated
///   as an empty answer
/// * `ErrorKind::TimedOut` on the query: timeout
///
/// All other errors on the query abort the resolution. The inner, per-record
/// `std::io::Error` can be used to signal errors (parsing, encoding) with
/// individual TXT records; such records are skipped.
///
/// A query is cancelled by dropping its future.
pub trait LookupTxt: Send + Sync {
    /// The answer consisting of TXT records found.
    type Answer: IntoIterator<Item = io::Result<TxtEntry>>;
    /// The future resolving to the query’s answer.
    type Query<'a>: Future<Output = io::Result<Self::Answer>> + Send + 'a
    where
        Self: 'a;

    /// Looks up the domain’s TXT records in DNS.
    ///
    /// The domain will be passed to this trait as an absolute domain name in
    /// A-label (ASCII) format, with trailing dot (eg
    /// `_dnslink.example.com.`).
    fn lookup_txt(&self, domain: &str) -> Self::Query<'_>;
}

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

//! A library implementing resolution of *DNSLink* records.
//!
//! DNSLink publishes links to content in DNS TXT records of the form
//! `dnslink=/key/value`, under the domain name `_dnslink.<domain>`. An entry
//! with key `dns` redirects resolution to another domain.
//!
//! This library looks up the TXT records of a domain, validates the DNSLink
//! entries found, follows redirects (detecting cycles and bounding the number
//! of redirects), and returns the links found at the final domain together
//! with a log that explains every decision taken.
//!
//! # Usage
//!
//! The functions [`resolve`] and [`resolve_with_cancellation`] provide the
//! entry points. They take an implementation of
//! [`LookupTxt`][crate::resolver::LookupTxt], which performs the actual DNS
//! queries, and a [`Config`].
//!
//! The building blocks of a resolution are available in modules `domain`
//! (lookup targets), `entry` (entry validation), `links` (aggregation of
//! entries), and `log` (the resolution log).
//!
//! # Cargo features
//!
//! The feature **`hickory-resolver`** makes an implementation of
//! [`LookupTxt`][crate::resolver::LookupTxt] available for the Hickory DNS
//! resolver.

pub mod domain;
pub mod entry;
pub mod links;
pub mod log;
pub mod resolver;
mod util;

pub use crate::{
    domain::{DomainTarget, FqdnError, ParseTargetError, PathSegment, DNS_PREFIX},
    entry::{Entry, EntryError, TXT_PREFIX},
    links::{Link, LinkSet, NormalizedLink},
    log::{LogCode, LogEntry},
    resolver::{
        resolve, resolve_with_cancellation, Config, LookupTxt, ResolutionResult, ResolveError,
        TxtEntry, MAX_REDIRECTS, REDIRECT_KEY,
    },
    util::{percent_decode, CanonicalStr},
};

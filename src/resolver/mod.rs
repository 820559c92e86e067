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

//! Resolver and supporting types.

mod lookup;
mod query;

pub use lookup::{LookupTxt, TxtEntry};

use crate::{
    domain::{self, DomainTarget, ParseTargetError, ParseTargetErrorKind, PathSegment},
    entry::{Entry, ParsedEntry, TXT_PREFIX},
    links::{self, Aggregate, LinkSet, NormalizedLink},
    log::{self, LogEntry},
};
use std::{
    collections::HashSet,
    error::Error,
    fmt::{self, Display, Formatter},
    io,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// The key of entries that redirect resolution to another domain, as in
/// `dnslink=/dns/example.org`.
pub const REDIRECT_KEY: &str = "dns";

/// The default maximum number of redirects followed.
pub const MAX_REDIRECTS: usize = 32;

/// Configuration for a resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Whether to follow redirect entries. When this flag is not set, the
    /// entries found at the first domain are the result, and redirect entries
    /// are returned as ordinary links under key `dns`.
    pub recursive: bool,

    /// The maximum number of redirects followed. A redirect beyond this limit
    /// terminates resolution with an empty result.
    pub max_redirects: usize,

    /// The maximum duration of a single TXT record lookup. When this duration
    /// is exceeded resolution fails.
    pub lookup_timeout: Duration,

    /// When this flag is set, entries containing characters other than
    /// printable ASCII, or ill-formed percent-escapes in the value, are
    /// invalid.
    pub strict_entries: bool,

    /// When this flag is set, the domain without `_dnslink.` prefix is queried
    /// concurrently with the prefixed domain, instead of only after the
    /// prefixed domain turned out to have no entries.
    pub parallel_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recursive: true,
            max_redirects: MAX_REDIRECTS,
            lookup_timeout: Duration::from_secs(10),
            strict_entries: true,
            parallel_fallback: false,
        }
    }
}

/// An error that makes a resolution fail as a whole.
#[derive(Debug)]
pub enum ResolveError {
    /// The input domain is not acceptable.
    InvalidDomain(ParseTargetError),
    /// A TXT record lookup failed for a reason other than non-existence.
    Lookup(io::Error),
    LookupTimeout,
    Cancelled,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain(error) => write!(f, "invalid input domain: {error}"),
            Self::Lookup(error) => write!(f, "TXT record lookup failed: {error}"),
            Self::LookupTimeout => write!(f, "TXT record lookup timed out"),
            Self::Cancelled => write!(f, "resolution cancelled"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDomain(error) => Some(error),
            Self::Lookup(error) => Some(error),
            Self::LookupTimeout | Self::Cancelled => None,
        }
    }
}

/// The result of a resolution.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolutionResult {
    /// The links found at the final domain.
    pub links: LinkSet,
    /// The paths and queries of the targets passed through, innermost first.
    pub path: Vec<PathSegment>,
    /// A record of the decisions taken and entries not used.
    pub log: Vec<LogEntry>,
}

impl ResolutionResult {
    /// Returns the links in normalised `/key/value` form, sorted by key and
    /// then by value.
    pub fn txt_entries(&self) -> Vec<NormalizedLink> {
        let mut keys: Vec<_> = self.links.iter().collect();
        keys.sort_by_key(|&(key, _)| key);

        keys.into_iter()
            .flat_map(|(key, links)| {
                links.iter().map(move |link| NormalizedLink {
                    value: format!("/{key}/{}", link.value),
                    ttl: link.ttl,
                })
            })
            .collect()
    }
}

/// Resolves the DNSLink entries of a domain.
///
/// # Errors
///
/// Fails if the input domain is malformed, before any lookup is made, or if a
/// lookup fails for a reason other than non-existence of the domain. All other
/// problems are recorded in the result’s log.
///
/// # Examples
///
/// ```
/// # use std::{future::Future, io::{self, ErrorKind}, pin::Pin};
/// # struct MockLookupTxt;
/// # impl dnslink::resolver::LookupTxt for MockLookupTxt {
/// #     type Answer = Vec<io::Result<dnslink::resolver::TxtEntry>>;
/// #     type Query<'a> = Pin<Box<dyn Future<Output = io::Result<Self::Answer>> + Send + 'a>>;
/// #
/// #     fn lookup_txt(&self, domain: &str) -> Self::Query<'_> {
/// #         let domain = domain.to_owned();
/// #         Box::pin(async move {
/// #             match domain.as_str() {
/// #                 "_dnslink.dnslink.dev." => Ok(vec![Ok(dnslink::resolver::TxtEntry::new(
/// #                     "dnslink=/ipfs/QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF",
/// #                     3600,
/// #                 ))]),
/// #                 _ => Err(ErrorKind::NotFound.into()),
/// #             }
/// #         })
/// #     }
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use dnslink::*;
///
/// // Note: Enable Cargo feature `hickory-resolver` to make an implementation
/// // of trait `LookupTxt` available for Hickory DNS’s `TokioAsyncResolver`.
/// let resolver;  // = TokioAsyncResolver::tokio(...);
/// # resolver = MockLookupTxt;
///
/// let config = Config::default();
///
/// let result = resolve(&resolver, "dnslink.dev", &config).await?;
///
/// assert_eq!(
///     result.links.get("ipfs"),
///     Some("QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF")
/// );
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
pub async fn resolve<T>(
    resolver: &T,
    domain: &str,
    config: &Config,
) -> Result<ResolutionResult, ResolveError>
where
    T: LookupTxt + ?Sized,
{
    let cancel = CancellationToken::new();
    resolve_with_cancellation(resolver, domain, config, &cancel).await
}

/// Resolves the DNSLink entries of a domain, until done or until the given
/// token is cancelled.
///
/// The token is checked before every lookup, and an in-flight lookup is
/// abandoned as soon as the token is cancelled.
pub async fn resolve_with_cancellation<T>(
    resolver: &T,
    domain: &str,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<ResolutionResult, ResolveError>
where
    T: LookupTxt + ?Sized,
{
    let target = domain::parse_target(domain).map_err(ResolveError::InvalidDomain)?;

    trace!(domain = %target.domain, "starting DNSLink resolution");

    let resolution = Resolution {
        resolver,
        config,
        cancel,
        log: vec![],
    };

    resolution.run(target).await
}

struct Resolution<'a, T: ?Sized> {
    resolver: &'a T,
    config: &'a Config,
    cancel: &'a CancellationToken,
    log: Vec<LogEntry>,
}

impl<'a, T> Resolution<'a, T>
where
    T: LookupTxt + ?Sized,
{
    async fn run(mut self, mut target: DomainTarget) -> Result<ResolutionResult, ResolveError> {
        // Domains redirected away from, in order to detect cycles.
        let mut chain = HashSet::new();

        loop {
            if self.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let entries = self.look_up_entries(&target).await?;

            let Aggregate {
                mut links,
                entries,
                conflicts,
            } = links::aggregate(entries);

            self.log.extend(conflicts);

            if !self.config.recursive {
                return Ok(self.resolved(target, links));
            }

            let next = match links.get(REDIRECT_KEY) {
                Some(value) => domain::parse_target(value),
                None => return Ok(self.resolved(target, links)),
            };

            let next = match next {
                Ok(next) => next,
                Err(e) => {
                    debug!(domain = %target.domain, "ignoring invalid redirect: {e}");
                    self.log.push(invalid_redirect(e));
                    links.remove(REDIRECT_KEY);
                    return Ok(self.resolved(target, links));
                }
            };

            // Redirects take precedence over all other entries. Non-primary
            // values were already logged as conflicts.
            for entry in entries {
                let primary = links.get(&entry.key) == Some(entry.value.as_str());
                if entry.key != REDIRECT_KEY && primary {
                    self.log.push(LogEntry::UnusedEntry { entry: entry.source });
                }
            }

            chain.insert(target.domain.clone());

            if chain.contains(&next.domain) {
                debug!(domain = %next.domain, "endless redirect detected");
                self.log.push(LogEntry::Resolve(target));
                self.log.push(LogEntry::EndlessRedirect(next));
                return Ok(self.failed());
            }

            if chain.len() > self.config.max_redirects {
                debug!(domain = %next.domain, "too many redirects");
                self.log.push(LogEntry::Resolve(target));
                self.log.push(LogEntry::TooManyRedirects(next));
                return Ok(self.failed());
            }

            debug!(from = %target.domain, to = %next.domain, "following redirect");

            self.log.push(LogEntry::Redirect(target));

            target = next;
        }
    }

    // Looks up and validates the entries of the target’s domain, falling back
    // to the domain without prefix if there are none.
    async fn look_up_entries(
        &mut self,
        target: &DomainTarget,
    ) -> Result<Vec<ParsedEntry>, ResolveError> {
        let (resolver, config, cancel) = (self.resolver, self.config, self.cancel);

        let domain = target.domain.as_str();
        let bare_domain = target.bare_domain();

        debug_assert!(target.has_prefix());

        if !config.parallel_fallback {
            let txts = query::look_up_records(resolver, domain, config, cancel).await?;

            let entries = self.validate_entries(txts);
            if !entries.is_empty() {
                return Ok(entries);
            }

            self.record_fallback(bare_domain);

            let txts = query::look_up_records(resolver, bare_domain, config, cancel).await?;

            return Ok(self.validate_entries(txts));
        }

        let primary = query::look_up_records(resolver, domain, config, cancel);
        let fallback = query::look_up_records(resolver, bare_domain, config, cancel);

        tokio::pin!(primary, fallback);

        let mut fallback_result = None;

        // Polling the fallback first ensures both queries are issued.
        let primary_result = loop {
            tokio::select! {
                biased;
                result = &mut fallback, if fallback_result.is_none() => {
                    fallback_result = Some(result);
                }
                result = &mut primary => break result,
            }
        };

        let entries = self.validate_entries(primary_result?);
        if !entries.is_empty() {
            return Ok(entries);
        }

        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        self.record_fallback(bare_domain);

        let txts = match fallback_result {
            Some(result) => result?,
            None => fallback.await?,
        };

        Ok(self.validate_entries(txts))
    }

    fn record_fallback(&mut self, bare_domain: &str) {
        debug!(domain = %bare_domain, "no entries found, falling back to domain without prefix");
        self.log.push(LogEntry::Fallback {
            domain: bare_domain.into(),
        });
    }

    fn validate_entries(&mut self, txts: Vec<TxtEntry>) -> Vec<ParsedEntry> {
        let mut entries = vec![];

        for txt in txts {
            if !txt.text.starts_with(TXT_PREFIX) {
                continue;
            }

            match Entry::validate(&txt.text, self.config.strict_entries) {
                Ok(entry) => {
                    entries.push(ParsedEntry::new(entry, txt.text, txt.ttl));
                }
                Err(reason) => {
                    trace!(entry = %txt.text, "invalid entry: {reason}");
                    self.log.push(LogEntry::InvalidEntry {
                        entry: txt.text,
                        reason,
                    });
                }
            }
        }

        entries
    }

    fn resolved(mut self, target: DomainTarget, links: LinkSet) -> ResolutionResult {
        trace!(domain = %target.domain, "resolved {} keys", links.len());

        self.log.push(LogEntry::Resolve(target));

        let path = log::derive_path(&self.log);

        ResolutionResult {
            links,
            path,
            log: self.log,
        }
    }

    fn failed(self) -> ResolutionResult {
        ResolutionResult {
            links: LinkSet::new(),
            path: vec![],
            log: self.log,
        }
    }
}

fn invalid_redirect(error: ParseTargetError) -> LogEntry {
    match error.kind {
        ParseTargetErrorKind::RecursivePrefix => LogEntry::RecursiveDnsLinkPrefix(error.target),
        ParseTargetErrorKind::InvalidDomain(reason) => LogEntry::InvalidRedirect {
            target: error.target,
            reason,
        },
    }
}

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

use crate::resolver::{Config, LookupTxt, ResolveError, TxtEntry};
use std::io::ErrorKind;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Looks up the TXT records of a domain.
///
/// A non-existent domain yields an empty answer. The query is abandoned when
/// the lookup timeout elapses or when the cancellation token is triggered; if
/// the token is already triggered, no query is issued.
pub async fn look_up_records<T: LookupTxt + ?Sized>(
    resolver: &T,
    domain: &str,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<Vec<TxtEntry>, ResolveError> {
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }

    // Note the trailing dot: only absolute queries.
    let dname = format!("{domain}.");

    trace!(domain = %dname, "querying TXT records");

    let query = time::timeout(config.lookup_timeout, resolver.lookup_txt(&dname));

    let answer = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
        answer = query => match answer {
            Ok(answer) => answer,
            Err(_) => return Err(ResolveError::LookupTimeout),
        },
    };

    let txts = match answer {
        Ok(txts) => txts,
        Err(e) => {
            return match e.kind() {
                ErrorKind::NotFound => {
                    trace!(domain = %dname, "domain does not exist");
                    Ok(vec![])
                }
                ErrorKind::TimedOut => Err(ResolveError::LookupTimeout),
                _ => Err(ResolveError::Lookup(e)),
            };
        }
    };

    let mut result = vec![];

    for txt in txts {
        match txt {
            Ok(txt) => result.push(txt),
            Err(e) => trace!(domain = %dname, "skipping unusable TXT record: {e}"),
        }
    }

    Ok(result)
}

pub mod common;

use common::{MockLookup, Zone};
use dnslink::{
    domain::{parse_target, ParseTargetErrorKind},
    resolve, resolve_with_cancellation, Config, EntryError, FqdnError, Link, LogCode, LogEntry,
    NormalizedLink, ResolveError, TxtEntry,
};
use std::{io::ErrorKind, time::Duration};
use tokio::time;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn resolve_single_entry() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new().with(
        "_dnslink.dnslink.dev",
        "dnslink=/ipfs/QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF",
    );

    let result = resolve(&zone, "dnslink.dev", &Config::default()).await.unwrap();

    assert_eq!(
        result.links.get("ipfs"),
        Some("QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF")
    );
    assert_eq!(
        result.links.get_all("ipfs"),
        Some(
            &[Link {
                value: "QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF".into(),
                ttl: 3600,
            }][..]
        )
    );
    assert_eq!(result.log, [LogEntry::Resolve(parse_target("dnslink.dev").unwrap())]);
    assert!(result.path.is_empty());
    assert_eq!(zone.queries(), ["_dnslink.dnslink.dev."]);
}

#[tokio::test]
async fn resolve_no_records() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new();

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert!(result.links.is_empty());
    assert!(result
        .log
        .iter()
        .all(|e| matches!(e.code(), LogCode::Resolve | LogCode::Fallback)));
    assert_eq!(zone.queries(), ["_dnslink.example.org.", "example.org."]);
}

#[tokio::test]
async fn resolve_fallback_to_bare_domain() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new()
        .with("example.org", "v=spf1 -all")
        .with("example.org", "dnslink=/testkey/ABCD");

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert_eq!(result.links.get("testkey"), Some("ABCD"));
    assert_eq!(
        result.log,
        [
            LogEntry::Fallback { domain: "example.org".into() },
            LogEntry::Resolve(parse_target("example.org").unwrap()),
        ]
    );
}

#[tokio::test]
async fn resolve_no_fallback_when_prefixed_has_entries() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new()
        .with("_dnslink.example.org", "dnslink=/ipfs/abc")
        .with("example.org", "dnslink=/ipfs/def");

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert_eq!(result.links.get("ipfs"), Some("abc"));
    assert_eq!(zone.queries(), ["_dnslink.example.org."]);
}

#[tokio::test]
async fn resolve_invalid_entry() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new()
        .with("_dnslink.example.org", "dnslink=ipfs/QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF")
        .with("_dnslink.example.org", "dnslink=/ipns/example.net");

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert_eq!(result.links.keys().collect::<Vec<_>>(), ["ipns"]);
    assert_eq!(
        result.log,
        [
            LogEntry::InvalidEntry {
                entry: "dnslink=ipfs/QmXNosdfz3WQUHncsYBTw7diwYzCibVhrJmEhNNaMPQBQF".into(),
                reason: EntryError::WrongStart,
            },
            LogEntry::Resolve(parse_target("example.org").unwrap()),
        ]
    );
}

#[tokio::test]
async fn resolve_only_invalid_entries_falls_back() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new().with("_dnslink.example.org", "dnslink=/ipfs");

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert!(result.links.is_empty());
    assert_eq!(
        result.log.iter().map(|e| e.code()).collect::<Vec<_>>(),
        [LogCode::InvalidEntry, LogCode::Fallback, LogCode::Resolve]
    );
}

#[tokio::test]
async fn resolve_conflicting_entries() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new()
        .with("_dnslink.example.org", "dnslink=/k/b")
        .with("_dnslink.example.org", "dnslink=/k/a");

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert_eq!(result.links.get("k"), Some("a"));

    let conflicts: Vec<_> = result
        .log
        .iter()
        .filter(|e| e.code() == LogCode::ConflictEntry)
        .collect();

    assert_eq!(
        conflicts,
        [&LogEntry::ConflictEntry { entry: "dnslink=/k/b".into() }]
    );
}

#[tokio::test]
async fn resolve_txt_entries_sorted() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new()
        .with_ttl("_dnslink.example.org", "dnslink=/ipns/z.example", 60)
        .with_ttl("_dnslink.example.org", "dnslink=/ipfs/b", 120)
        .with_ttl("_dnslink.example.org", "dnslink=/ipfs/a", 30);

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert_eq!(result.links.keys().collect::<Vec<_>>(), ["ipns", "ipfs"]);
    assert_eq!(
        result.txt_entries(),
        [
            NormalizedLink { value: "/ipfs/a".into(), ttl: 30 },
            NormalizedLink { value: "/ipfs/b".into(), ttl: 120 },
            NormalizedLink { value: "/ipns/z.example".into(), ttl: 60 },
        ]
    );
}

#[tokio::test]
async fn resolve_lenient_entries() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new().with("_dnslink.example.org", "dnslink=/name/Zürich");

    let result = resolve(&zone, "example.org", &Config::default()).await.unwrap();

    assert!(result.links.is_empty());
    assert!(matches!(
        &result.log[0],
        LogEntry::InvalidEntry { reason: EntryError::InvalidCharacter, .. }
    ));

    let config = Config {
        strict_entries: false,
        ..Default::default()
    };

    let result = resolve(&zone, "example.org", &config).await.unwrap();

    assert_eq!(result.links.get("name"), Some("Zürich"));
}

#[tokio::test]
async fn resolve_invalid_input_domain() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new();

    let e = resolve(&zone, "example..org", &Config::default()).await.unwrap_err();
    assert!(matches!(
        e,
        ResolveError::InvalidDomain(e)
            if e.kind == ParseTargetErrorKind::InvalidDomain(FqdnError::EmptyPart)
    ));

    let long = format!("{}.org", "x".repeat(64));
    let e = resolve(&zone, &long, &Config::default()).await.unwrap_err();
    assert!(matches!(
        e,
        ResolveError::InvalidDomain(e)
            if e.kind == ParseTargetErrorKind::InvalidDomain(FqdnError::TooLong)
    ));

    let e = resolve(&zone, "_dnslink._dnslink.example.org", &Config::default())
        .await
        .unwrap_err();
    assert!(matches!(
        e,
        ResolveError::InvalidDomain(e) if e.kind == ParseTargetErrorKind::RecursivePrefix
    ));

    assert!(zone.queries().is_empty());
}

#[tokio::test]
async fn resolve_lookup_failure() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = MockLookup::new(|name| {
        Box::pin(async move {
            match name {
                "_dnslink.example.org." => Err(ErrorKind::NotFound.into()),
                _ => Err(ErrorKind::ConnectionRefused.into()),
            }
        })
    });

    let e = resolve(&resolver, "example.org", &Config::default()).await.unwrap_err();

    assert!(matches!(e, ResolveError::Lookup(e) if e.kind() == ErrorKind::ConnectionRefused));
}

#[tokio::test]
async fn resolve_skips_unusable_records() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = MockLookup::new(|name| {
        Box::pin(async move {
            match name {
                "_dnslink.example.org." => Ok(vec![
                    Err(ErrorKind::InvalidData.into()),
                    Ok(TxtEntry::new("dnslink=/ipfs/abc", 300)),
                ]),
                _ => Err(ErrorKind::NotFound.into()),
            }
        })
    });

    let result = resolve(&resolver, "example.org", &Config::default()).await.unwrap();

    assert_eq!(result.links.get("ipfs"), Some("abc"));
}

#[tokio::test]
async fn resolve_cancelled_before_start() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new().with("_dnslink.example.org", "dnslink=/ipfs/abc");
    let cancel = CancellationToken::new();

    cancel.cancel();

    let e = resolve_with_cancellation(&zone, "example.org", &Config::default(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(e, ResolveError::Cancelled));
    assert!(zone.queries().is_empty());
}

#[tokio::test]
async fn resolve_parallel_fallback() {
    let _ = tracing_subscriber::fmt::try_init();

    let config = Config {
        parallel_fallback: true,
        ..Default::default()
    };

    let zone = Zone::new()
        .with("_dnslink.example.org", "dnslink=/ipfs/abc")
        .with("example.org", "dnslink=/ipfs/def");

    let result = resolve(&zone, "example.org", &config).await.unwrap();

    assert_eq!(result.links.get("ipfs"), Some("abc"));
    let mut queries = zone.queries();
    queries.sort();
    assert_eq!(queries, ["_dnslink.example.org.", "example.org."]);
    assert_eq!(result.log, [LogEntry::Resolve(parse_target("example.org").unwrap())]);

    let zone = Zone::new().with("example.org", "dnslink=/ipfs/def");

    let result = resolve(&zone, "example.org", &config).await.unwrap();

    assert_eq!(result.links.get("ipfs"), Some("def"));
    assert_eq!(
        result.log.iter().map(|e| e.code()).collect::<Vec<_>>(),
        [LogCode::Fallback, LogCode::Resolve]
    );
}

#[tokio::test(start_paused = true)]
async fn resolve_parallel_fallback_cancelled() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = MockLookup::new(|name| {
        Box::pin(async move {
            match name {
                "_dnslink.example.org." => {
                    time::sleep(Duration::from_secs(5)).await;
                    Ok(vec![])
                }
                _ => {
                    time::sleep(Duration::from_secs(8)).await;
                    Ok(vec![Ok(TxtEntry::new("dnslink=/ipfs/abc", 60))])
                }
            }
        })
    });

    let config = Config {
        parallel_fallback: true,
        ..Default::default()
    };
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let e = resolve_with_cancellation(&resolver, "example.org", &config, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(e, ResolveError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn resolve_lookup_timeout() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = MockLookup::new(|_| {
        Box::pin(async move {
            time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        })
    });

    let config = Config {
        lookup_timeout: Duration::from_secs(2),
        ..Default::default()
    };

    let e = resolve(&resolver, "example.org", &config).await.unwrap_err();

    assert!(matches!(e, ResolveError::LookupTimeout));
}

#[tokio::test]
async fn resolve_concurrently() {
    let _ = tracing_subscriber::fmt::try_init();

    let zone = Zone::new()
        .with("_dnslink.a.example", "dnslink=/ipfs/a")
        .with("_dnslink.b.example", "dnslink=/ipfs/b");
    let config = Config::default();

    let (a, b) = tokio::join!(
        resolve(&zone, "a.example", &config),
        resolve(&zone, "b.example", &config),
    );

    assert_eq!(a.unwrap().links.get("ipfs"), Some("a"));
    assert_eq!(b.unwrap().links.get("ipfs"), Some("b"));
}

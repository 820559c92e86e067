use dnslink::{resolve_with_cancellation, Config};
use hickory_resolver::TokioAsyncResolver;
use std::{env, process};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "dnslink".into());

    let mut debug = false;
    let mut key = None;
    let mut domains = vec![];

    for arg in args {
        if arg == "--debug" || arg == "-d" {
            debug = true;
        } else if let Some(k) = arg.strip_prefix("--key=") {
            key = Some(k.to_owned());
        } else {
            domains.push(arg);
        }
    }

    if domains.is_empty() {
        eprintln!("usage: {program} [--debug] [--key=<key>] <hostname>...");
        process::exit(1);
    }

    let resolver = TokioAsyncResolver::tokio(Default::default(), Default::default());
    let config = Config::default();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let show_domain = domains.len() > 1;

    let handles: Vec<_> = domains
        .into_iter()
        .map(|domain| {
            let resolver = resolver.clone();
            let config = config.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move {
                let result = resolve_with_cancellation(&resolver, &domain, &config, &cancel).await;
                (domain, result)
            })
        })
        .collect();

    let mut failed = false;

    for handle in handles {
        let (domain, result) = match handle.await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("resolution task failed: {e}");
                failed = true;
                continue;
            }
        };

        let prefix = if show_domain { format!("{domain}: ") } else { String::new() };

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                eprintln!("{domain}: {e}");
                failed = true;
                continue;
            }
        };

        for (k, links) in result.links.iter() {
            match &key {
                Some(key) if key != k => {}
                Some(_) => {
                    for link in links {
                        println!("{prefix}{}", link.value);
                    }
                }
                None => {
                    for link in links {
                        println!("{prefix}/{k}/{}", link.value);
                    }
                }
            }
        }

        if debug {
            for entry in &result.log {
                eprintln!("{prefix}{entry}");
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

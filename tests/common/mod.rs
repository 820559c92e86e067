use dnslink::resolver::{LookupTxt, TxtEntry};
use std::{
    collections::HashMap,
    future::Future,
    io::{self, ErrorKind},
    pin::Pin,
    sync::{Arc, Mutex},
};

pub type LookupOutput = Vec<io::Result<TxtEntry>>;
pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = io::Result<LookupOutput>> + Send + 'a>>;

#[derive(Clone)]
pub struct MockLookup(Arc<dyn Fn(&str) -> LookupFuture<'_> + Send + Sync>);

impl MockLookup {
    pub fn new(f: impl Fn(&str) -> LookupFuture<'_> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl LookupTxt for MockLookup {
    type Answer = LookupOutput;
    type Query<'a> = Pin<Box<dyn Future<Output = io::Result<Self::Answer>> + Send + 'a>>;

    fn lookup_txt(&self, domain: &str) -> Self::Query<'_> {
        let domain = domain.to_owned();

        Box::pin(async move { self.0(&domain).await })
    }
}

/// A lookup serving fixed zone data, recording the queries made.
#[derive(Clone, Default)]
pub struct Zone {
    records: HashMap<String, Vec<TxtEntry>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl Zone {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a TXT record with TTL 3600 for the given name, given without
    /// trailing dot.
    pub fn with(mut self, name: &str, text: &str) -> Self {
        self.records
            .entry(format!("{name}."))
            .or_default()
            .push(TxtEntry::new(text, 3600));
        self
    }

    pub fn with_ttl(mut self, name: &str, text: &str, ttl: u32) -> Self {
        self.records
            .entry(format!("{name}."))
            .or_default()
            .push(TxtEntry::new(text, ttl));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl LookupTxt for Zone {
    type Answer = LookupOutput;
    type Query<'a> = Pin<Box<dyn Future<Output = io::Result<Self::Answer>> + Send + 'a>>;

    fn lookup_txt(&self, domain: &str) -> Self::Query<'_> {
        self.queries.lock().unwrap().push(domain.to_owned());

        let result = match self.records.get(domain) {
            Some(txts) => Ok(txts.iter().cloned().map(Ok).collect()),
            None => Err(ErrorKind::NotFound.into()),
        };

        Box::pin(async move { result })
    }
}

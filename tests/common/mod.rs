//! In-test fake providers and transports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use reelsource::{
    Embed, EmbedResult, FetchError, FetchRequest, FetchResponse, Fetcher, Fetchers, FlagSet, MediaKind,
    Pipeline, PipelineSettings, Provider, ProviderError, ProviderMeta, Registry, RunContext, RunEvent,
    Source, SourceResult, Stream,
};

/// What a fake provider does when run.
#[derive(Clone)]
pub enum Behavior {
    Respond(SourceResult),
    NotFound,
    Fault(&'static str),
    Panic,
    /// Sleep far beyond any test deadline.
    Hang,
    /// Sleep, then respond.
    Slow(Duration, SourceResult),
}

impl Behavior {
    pub fn streams(streams: Vec<Stream>) -> Self {
        Self::Respond(SourceResult::streams(streams))
    }

    async fn run(&self) -> Result<SourceResult, ProviderError> {
        match self {
            Self::Respond(result) => Ok(result.clone()),
            Self::NotFound => Err(ProviderError::not_found("nothing here")),
            Self::Fault(msg) => Err(anyhow::anyhow!("{msg}").into()),
            Self::Panic => panic!("provider blew up"),
            Self::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(SourceResult::default())
            }
            Self::Slow(delay, result) => {
                tokio::time::sleep(*delay).await;
                Ok(result.clone())
            }
        }
    }
}

pub struct FakeSource {
    meta: ProviderMeta,
    behavior: Behavior,
    kinds: Option<Vec<MediaKind>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(id: &str, rank: i32, behavior: Behavior) -> Arc<Self> {
        Self::with_meta(ProviderMeta::new(id, id, rank), behavior)
    }

    pub fn with_meta(meta: ProviderMeta, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            meta,
            behavior,
            kinds: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn movies_only(id: &str, rank: i32, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            meta: ProviderMeta::new(id, id, rank),
            behavior,
            kinds: Some(vec![MediaKind::Movie]),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for FakeSource {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }
}

#[async_trait]
impl Source for FakeSource {
    fn supports(&self, kind: MediaKind) -> bool {
        self.kinds.as_ref().is_none_or(|k| k.contains(&kind))
    }

    async fn resolve_movie(&self, ctx: &RunContext) -> Result<SourceResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.progress(10);
        self.behavior.run().await
    }

    async fn resolve_episode(&self, ctx: &RunContext) -> Result<SourceResult, ProviderError> {
        self.resolve_movie(ctx).await
    }
}

pub struct FakeEmbed {
    meta: ProviderMeta,
    behavior: Behavior,
    locations: Mutex<Vec<String>>,
}

impl FakeEmbed {
    pub fn new(id: &str, rank: i32, behavior: Behavior) -> Arc<Self> {
        Self::with_meta(ProviderMeta::new(id, id, rank), behavior)
    }

    pub fn with_meta(meta: ProviderMeta, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            meta,
            behavior,
            locations: Mutex::new(Vec::new()),
        })
    }

    /// Locations this embed was asked to resolve.
    pub fn locations(&self) -> Vec<String> {
        self.locations.lock().unwrap().clone()
    }
}

impl Provider for FakeEmbed {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }
}

#[async_trait]
impl Embed for FakeEmbed {
    async fn resolve(&self, ctx: &RunContext) -> Result<EmbedResult, ProviderError> {
        self.locations
            .lock()
            .unwrap()
            .push(ctx.location().unwrap_or_default().to_string());
        let result = self.behavior.run().await?;
        Ok(EmbedResult {
            streams: result.streams,
        })
    }
}

/// Transport that refuses every request.
pub struct Offline;

#[async_trait]
impl Fetcher for Offline {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Transport {
            url: request.url,
            reason: "offline".into(),
        })
    }
}

/// Transport answering every request with a fixed body, recording URLs
/// and headers.
pub struct Canned {
    body: String,
    pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl Canned {
    pub fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Fetcher for Canned {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.full_url()?.to_string();
        self.requests.lock().unwrap().push((url.clone(), request.headers.clone()));
        Ok(FetchResponse {
            status: 200,
            final_url: url,
            headers: HashMap::new(),
            body: self.body.clone(),
        })
    }
}

pub fn hls(id: &str) -> Stream {
    Stream::hls(id, format!("https://cdn.test/{id}.m3u8"))
}

pub fn offline() -> Fetchers {
    Fetchers::direct_only(Arc::new(Offline))
}

/// Settings with short deadlines and no subtitle lookup.
pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        attempt_timeout: Duration::from_millis(200),
        cancel_grace: Duration::from_millis(20),
        ..PipelineSettings::default()
    }
}

pub fn registry(sources: &[Arc<dyn Source>], embeds: &[Arc<dyn Embed>]) -> Arc<Registry> {
    let mut builder = Registry::builder();
    for source in sources {
        builder.register_source(Arc::clone(source)).unwrap();
    }
    for embed in embeds {
        builder.register_embed(Arc::clone(embed)).unwrap();
    }
    Arc::new(builder.build())
}

pub fn pipeline(sources: &[Arc<dyn Source>], embeds: &[Arc<dyn Embed>]) -> Pipeline {
    Pipeline::new(registry(sources, embeds), offline(), fast_settings())
}

/// Event callback that stores everything it sees.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<RunEvent>>>);

impl EventLog {
    pub fn callback(&self) -> impl Fn(RunEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.0);
        move |event| events.lock().unwrap().push(event)
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.0.lock().unwrap().clone()
    }
}

pub fn flags(flags: &[reelsource::CapabilityFlag]) -> FlagSet {
    reelsource::flags::flag_set(flags)
}

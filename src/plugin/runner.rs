//! Runs external plugin binaries as [`Source`]s and [`Embed`]s.

use std::process::Stdio;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::config::PluginConfig;
use crate::error::ProviderError;
use crate::media::{MediaDescriptor, MediaKind};
use crate::provider::{Embed, Provider, ProviderMeta, RunContext, Source};
use crate::stream::{EmbedResult, SourceResult};

/// JSON sent to the plugin on stdin.
#[derive(Serialize)]
struct PluginInput<'a> {
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<&'a MediaDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

/// Keys that mark a stdout object as a result rather than stray output.
const RESULT_KEYS: [&str; 3] = ["streams", "stream", "embeds"];

#[derive(Deserialize)]
struct PluginErrorBody {
    kind: PluginErrorKind,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum PluginErrorKind {
    NotFound,
    Timeout,
    Fault,
    #[serde(other)]
    Other,
}

/// Decode plugin stdout into a result or the error it reports.
///
/// Anything that is neither an `{"error": ..}` object nor an object carrying
/// one of [`RESULT_KEYS`] is a fault.
fn parse_reply(id: &str, stdout: &str) -> Result<SourceResult, ProviderError> {
    let preview = || -> String { stdout.trim().chars().take(200).collect() };

    let value: serde_json::Value = serde_json::from_str(stdout)
        .with_context(|| format!("plugin '{id}' returned invalid JSON: {}", preview()))?;
    let Some(object) = value.as_object() else {
        return Err(anyhow!("plugin '{id}' returned a non-object reply: {}", preview()).into());
    };

    if let Some(error) = object.get("error") {
        let error = PluginErrorBody::deserialize(error)
            .with_context(|| format!("plugin '{id}' returned a malformed error: {}", preview()))?;
        return Err(match error.kind {
            PluginErrorKind::NotFound => ProviderError::not_found(error.message),
            PluginErrorKind::Timeout => ProviderError::timeout(error.message),
            PluginErrorKind::Fault | PluginErrorKind::Other => {
                anyhow!("plugin '{id}': {}", error.message).into()
            }
        });
    }

    if !RESULT_KEYS.iter().any(|key| object.contains_key(*key)) {
        return Err(anyhow!("plugin '{id}' reply has no streams or embeds: {}", preview()).into());
    }

    SourceResult::deserialize(value)
        .with_context(|| format!("plugin '{id}' returned an invalid result: {}", preview()))
        .map_err(Into::into)
}

/// A configured plugin binary.
///
/// The child is killed if the attempt is dropped (deadline or
/// cancellation), so a hung plugin never outlives its attempt.
struct PluginProcess {
    config: PluginConfig,
    meta: ProviderMeta,
}

impl PluginProcess {
    fn new(config: PluginConfig) -> Self {
        let meta = config.meta();
        Self { config, meta }
    }

    async fn invoke(&self, input: &PluginInput<'_>) -> Result<SourceResult, ProviderError> {
        let id = &self.config.id;
        let binary = &self.config.binary;
        if !binary.exists() {
            return Err(anyhow!("plugin '{id}' binary not found at {}", binary.display()).into());
        }

        let payload = serde_json::to_vec(input).context("failed to encode plugin input")?;
        debug!(plugin = %id, op = input.op, "invoking plugin");

        let mut child = Command::new(binary)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn plugin '{id}'"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .with_context(|| format!("failed to write to plugin '{id}' stdin"))?;
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("plugin '{id}' failed"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("plugin '{id}' exited with {}: {}", output.status, stderr.trim()).into());
        }

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| format!("plugin '{id}' output is not valid UTF-8"))?;

        parse_reply(id, &stdout)
    }
}

/// External binary acting as a source.
pub struct PluginSource(PluginProcess);

impl PluginSource {
    #[must_use]
    pub fn new(config: PluginConfig) -> Self {
        Self(PluginProcess::new(config))
    }

    async fn run(&self, op: &str, ctx: &RunContext) -> Result<SourceResult, ProviderError> {
        let input = PluginInput {
            op,
            media: ctx.media(),
            location: None,
        };
        self.0.invoke(&input).await
    }
}

impl Provider for PluginSource {
    fn meta(&self) -> &ProviderMeta {
        &self.0.meta
    }
}

#[async_trait]
impl Source for PluginSource {
    fn supports(&self, kind: MediaKind) -> bool {
        self.0.config.kinds.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }

    async fn resolve_movie(&self, ctx: &RunContext) -> Result<SourceResult, ProviderError> {
        self.run("movie", ctx).await
    }

    async fn resolve_episode(&self, ctx: &RunContext) -> Result<SourceResult, ProviderError> {
        self.run("episode", ctx).await
    }
}

/// External binary acting as an embed.
pub struct PluginEmbed(PluginProcess);

impl PluginEmbed {
    #[must_use]
    pub fn new(config: PluginConfig) -> Self {
        Self(PluginProcess::new(config))
    }
}

impl Provider for PluginEmbed {
    fn meta(&self) -> &ProviderMeta {
        &self.0.meta
    }
}

#[async_trait]
impl Embed for PluginEmbed {
    async fn resolve(&self, ctx: &RunContext) -> Result<EmbedResult, ProviderError> {
        let input = PluginInput {
            op: "embed",
            media: ctx.media(),
            location: ctx.location(),
        };
        let result = self.0.invoke(&input).await?;
        Ok(EmbedResult {
            streams: result.streams,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::error::FailureKind;
    use crate::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, Fetchers};

    struct Offline;

    #[async_trait]
    impl Fetcher for Offline {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
            Err(FetchError::InvalidUrl(request.url))
        }
    }

    fn shell_plugin(id: &str, script: &str) -> PluginConfig {
        PluginConfig {
            id: id.to_string(),
            name: None,
            rank: 10,
            disabled: false,
            flags: Default::default(),
            binary: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_secs: None,
            kinds: None,
        }
    }

    fn movie_ctx() -> RunContext {
        let media = MediaDescriptor::movie("Heat", 1995, "949");
        RunContext::for_source(Arc::new(media), Fetchers::direct_only(Arc::new(Offline)))
    }

    #[test]
    fn supports_follows_declared_kinds() {
        let mut config = shell_plugin("p", "true");
        assert!(PluginSource::new(config.clone()).supports(MediaKind::Episode));
        config.kinds = Some(vec![MediaKind::Movie]);
        let source = PluginSource::new(config);
        assert!(source.supports(MediaKind::Movie));
        assert!(!source.supports(MediaKind::Episode));
    }

    #[test]
    fn input_serialization() {
        let media = MediaDescriptor::movie("Heat", 1995, "949");
        let json = serde_json::to_value(PluginInput {
            op: "movie",
            media: Some(&media),
            location: None,
        })
        .unwrap();
        assert_eq!(json["op"], "movie");
        assert_eq!(json["media"]["type"], "movie");
        assert!(json.get("location").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn source_reads_streams_from_stdout() {
        let script = r#"cat >/dev/null; echo '{"streams":[{"type":"hls","id":"a","playlist":"https://cdn.test/a.m3u8"}]}'"#;
        let source = PluginSource::new(shell_plugin("sh-source", script));
        let result = source.resolve_movie(&movie_ctx()).await.unwrap();
        assert_eq!(result.streams.len(), 1);
        assert_eq!(result.streams[0].id(), "a");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn plugin_error_kinds_are_mapped() {
        let script = r#"cat >/dev/null; echo '{"error":{"kind":"not_found","message":"no such title"}}'"#;
        let source = PluginSource::new(shell_plugin("sh-missing", script));
        let err = source.resolve_movie(&movie_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert!(err.to_string().contains("no such title"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unrecognized_error_kind_is_fault_with_message() {
        let script = r#"cat >/dev/null; echo '{"error":{"kind":"crashed","message":"segfault in decryptor"}}'"#;
        let source = PluginSource::new(shell_plugin("sh-crashed", script));
        let err = source.resolve_movie(&movie_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Fault);
        assert!(err.to_string().contains("segfault in decryptor"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unrelated_object_is_fault() {
        let source = PluginSource::new(shell_plugin("sh-status", r#"cat >/dev/null; echo '{"status":"ok"}'"#));
        let err = source.resolve_movie(&movie_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Fault);
    }

    #[test]
    fn reply_parsing() {
        let empty = parse_reply("p", r#"{"streams": []}"#).unwrap();
        assert!(empty.is_empty());

        let result = parse_reply("p", r#"{"embeds": [{"embedId": "upcloud", "url": "https://u.test/e/1"}]}"#).unwrap();
        assert_eq!(result.embeds[0].embed_id, "upcloud");

        assert_eq!(
            parse_reply("p", r#"{"error": {"kind": "timeout"}}"#).unwrap_err().kind(),
            FailureKind::Timeout
        );
        assert_eq!(parse_reply("p", r#"{"error": "boom"}"#).unwrap_err().kind(), FailureKind::Fault);
        assert_eq!(parse_reply("p", "[]").unwrap_err().kind(), FailureKind::Fault);
        assert_eq!(parse_reply("p", "{}").unwrap_err().kind(), FailureKind::Fault);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_fault() {
        let source = PluginSource::new(shell_plugin("sh-crash", "cat >/dev/null; echo boom >&2; exit 3"));
        let err = source.resolve_movie(&movie_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Fault);
        assert!(err.to_string().contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn malformed_output_is_fault() {
        let source = PluginSource::new(shell_plugin("sh-garbage", "cat >/dev/null; echo '<html>'"));
        let err = source.resolve_movie(&movie_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Fault);
    }

    #[tokio::test]
    async fn missing_binary_is_fault() {
        let mut config = shell_plugin("ghost", "");
        config.binary = PathBuf::from("/nonexistent/reelsource-plugin");
        let err = PluginSource::new(config).resolve_movie(&movie_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Fault);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn embed_receives_location() {
        // Echo the location back as the playlist URL.
        let script = r#"loc=$(sed -n 's/.*"location":"\([^"]*\)".*/\1/p'); printf '{"streams":[{"type":"hls","id":"e","playlist":"%s"}]}' "$loc""#;
        let embed = PluginEmbed::new(shell_plugin("sh-embed", script));
        let ctx = RunContext::for_embed("https://embed.test/v/1", Fetchers::direct_only(Arc::new(Offline)));
        let result = embed.resolve(&ctx).await.unwrap();
        match &result.streams[0] {
            crate::stream::Stream::Hls(hls) => assert_eq!(hls.playlist, "https://embed.test/v/1"),
            other => panic!("unexpected stream {other:?}"),
        }
    }
}

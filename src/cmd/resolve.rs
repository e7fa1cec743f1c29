use anyhow::Result;

use reelsource::{ResolutionError, ResolveMode, ResolveOptions, ResolvedMedia};

use super::output::{print_failure, print_progress, print_resolved};
use super::{ctrl_c_token, MediaArgs, Paths};

pub async fn cmd_resolve(
    paths: &Paths,
    media: &MediaArgs,
    collect_all: bool,
    json: bool,
    timeout: Option<u64>,
) -> Result<()> {
    let mut config = paths.load_config()?;
    if let Some(secs) = timeout {
        config.attempt_timeout_secs = secs;
    }
    if collect_all {
        config.mode = ResolveMode::CollectAll;
    }

    let providers = paths.providers(&config)?;
    let media = media.descriptor()?;
    let options = options(config.mode, json);

    report(providers.resolve(&media, &options).await, json)
}

pub async fn cmd_source(paths: &Paths, id: &str, media: &MediaArgs, json: bool) -> Result<()> {
    let config = paths.load_config()?;
    let providers = paths.providers(&config)?;
    let media = media.descriptor()?;
    let options = options(config.mode, json);

    report(providers.run_source(id, &media, &options).await, json)
}

pub async fn cmd_embed(paths: &Paths, id: &str, location: &str, json: bool) -> Result<()> {
    let config = paths.load_config()?;
    let providers = paths.providers(&config)?;
    let options = options(config.mode, json);

    report(providers.run_embed(id, location, &options).await, json)
}

fn options(mode: ResolveMode, json: bool) -> ResolveOptions {
    let options = ResolveOptions::default()
        .mode(mode)
        .with_cancellation(ctrl_c_token());
    if json {
        options
    } else {
        options.on_progress(print_progress)
    }
}

fn report(result: Result<ResolvedMedia, ResolutionError>, json: bool) -> Result<()> {
    match result {
        Ok(resolved) => print_resolved(&resolved, json),
        Err(err) => {
            print_failure(&err);
            Err(err.into())
        }
    }
}

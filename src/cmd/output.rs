use anyhow::Result;

use reelsource::{ResolutionError, ResolvedMedia, RunEvent, Stream, UpdateStatus};

/// Progress lines on stderr.
pub fn print_progress(event: RunEvent) {
    match event {
        RunEvent::Init { source_ids } => eprintln!("trying {} source(s): {}", source_ids.len(), source_ids.join(", ")),
        RunEvent::Start { id } => eprintln!("  {id} ..."),
        RunEvent::Update {
            id, status, reason, ..
        } => match status {
            UpdateStatus::Pending => {}
            UpdateStatus::Success => eprintln!("  {id} ok"),
            UpdateStatus::NotFound | UpdateStatus::Failure => {
                eprintln!("  {id} {}", reason.as_deref().unwrap_or("failed"));
            }
        },
        RunEvent::DiscoverEmbeds { source_id, embeds } => {
            let ids: Vec<&str> = embeds.iter().map(|e| e.embed_id.as_str()).collect();
            eprintln!("  {source_id} -> embeds: {}", ids.join(", "));
        }
    }
}

pub fn print_resolved(resolved: &ResolvedMedia, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resolved)?);
        return Ok(());
    }

    match &resolved.embed_id {
        Some(embed) => println!("Resolved via {} (embed {embed})", resolved.origin_provider_id),
        None => println!("Resolved via {}", resolved.origin_provider_id),
    }
    for stream in &resolved.streams {
        match stream {
            Stream::Hls(hls) => println!("  hls   {:<16} {}", hls.id, hls.playlist),
            Stream::File(file) => {
                for (quality, f) in &file.qualities {
                    println!("  file  {:<16} {:>7} {}", file.id, quality.to_string(), f.url);
                }
            }
        }
        if !stream.captions().is_empty() {
            let langs: Vec<&str> = stream.captions().iter().map(|c| c.language.as_str()).collect();
            println!("        captions: {}", langs.join(", "));
        }
    }
    Ok(())
}

/// Error summary plus the per-provider failure log on stderr.
pub fn print_failure(err: &ResolutionError) {
    eprintln!("error: {err}");
    if let ResolutionError::AllProvidersFailed { failures } = err {
        for failure in failures {
            eprintln!("  {failure}");
            for embed in &failure.embeds {
                eprintln!("    {} ({}): {}", embed.embed_id, embed.kind, embed.reason);
            }
        }
    }
}

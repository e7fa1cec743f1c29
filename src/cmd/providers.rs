use anyhow::Result;
use serde::Serialize;

use reelsource::registry::ListOptions;
use reelsource::{Provider, ProviderKind, ProviderMeta};

use super::Paths;

#[derive(Serialize)]
struct Listing<'a> {
    kind: ProviderKind,
    #[serde(flatten)]
    meta: &'a ProviderMeta,
}

pub fn cmd_providers(paths: &Paths, json: bool) -> Result<()> {
    let config = paths.load_config()?;
    let providers = paths.providers(&config)?;
    let registry = providers.registry();
    let all = ListOptions {
        include_disabled: true,
    };

    let sources = registry.sources(all);
    let embeds = registry.embeds(all);
    let listing: Vec<Listing<'_>> = sources
        .iter()
        .map(|s| Listing {
            kind: ProviderKind::Source,
            meta: s.meta(),
        })
        .chain(embeds.iter().map(|e| Listing {
            kind: ProviderKind::Embed,
            meta: e.meta(),
        }))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.is_empty() {
        println!("no providers registered");
        return Ok(());
    }

    for entry in &listing {
        let flags: Vec<String> = entry.meta.flags.iter().map(ToString::to_string).collect();
        println!(
            "{:<7} {:<20} rank {:>4}  {}{}",
            entry.kind.to_string(),
            entry.meta.id,
            entry.meta.rank,
            if flags.is_empty() { "-".to_string() } else { flags.join(",") },
            if entry.meta.disabled { "  (disabled)" } else { "" },
        );
    }
    Ok(())
}

#![forbid(unsafe_code)]

//! Cache warmer that refreshes every channel referenced by a list. Acts like a
//! nightly cron job so API readers rarely hit a stale entry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use listtube::{
    cache::ChannelCache,
    config::{DEFAULT_CONFIG_PATH, load_runtime_config_from},
    logging,
    service::Services,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Warm the ListTube channel video cache.")]
struct RoutineArgs {
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,

    #[arg(
        long = "force",
        help = "Refetch every channel even when its cache entry is still fresh"
    )]
    force: bool,

    #[arg(
        value_name = "CHANNEL_ID",
        help = "Channels to warm (defaults to every channel in any list)"
    )]
    channels: Vec<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct WarmSummary {
    channels: usize,
    empty: usize,
    records: usize,
}

fn main() -> Result<()> {
    let args = RoutineArgs::parse();
    let cfg = load_runtime_config_from(&args.config)?;
    logging::init(&cfg.log_filter);

    let services = Services::from_config(&cfg).context("initializing feed services")?;
    let channels = if args.channels.is_empty() {
        services
            .lists
            .all_channel_ids()
            .context("listing channels referenced by lists")?
    } else {
        args.channels
    };

    if channels.is_empty() {
        println!("No channels referenced by any list.");
        return Ok(());
    }

    println!("Found {} channel(s) to warm.", channels.len());
    let summary = warm(&services.cache, &channels, args.force);
    println!();
    println!(
        "Warmed {} channel(s), {} record(s) total, {} without videos.",
        summary.channels, summary.records, summary.empty
    );

    Ok(())
}

/// Visits channels one at a time. Failures are absorbed by the cache, so a
/// bad channel only shows up as an empty count.
fn warm(cache: &ChannelCache, channels: &[String], force: bool) -> WarmSummary {
    let mut summary = WarmSummary::default();
    for (index, channel_id) in channels.iter().enumerate() {
        let videos = if force {
            cache.refresh(channel_id)
        } else {
            cache.get_videos(channel_id)
        };
        info!(
            "[{}/{}] {}: {} record(s)",
            index + 1,
            channels.len(),
            channel_id,
            videos.len()
        );
        summary.channels += 1;
        summary.records += videos.len();
        if videos.is_empty() {
            summary.empty += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use listtube::{
        cache::{DEFAULT_FRESHNESS_WINDOW, MemoryCacheStore},
        clock::SystemClock,
        fetcher::{FetchLimits, VideoFetcher},
        youtube::YouTubeClient,
    };
    use std::{sync::Arc, time::Duration};

    #[test]
    fn routine_args_default_config() {
        let args = RoutineArgs::try_parse_from(["routine_update"]).unwrap();
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!args.force);
        assert!(args.channels.is_empty());
    }

    #[test]
    fn routine_args_take_channels_and_flags() {
        let args = RoutineArgs::try_parse_from([
            "routine_update",
            "--config",
            "/srv/listtube-env",
            "--force",
            "UC1",
            "UC2",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("/srv/listtube-env"));
        assert!(args.force);
        assert_eq!(args.channels, ["UC1", "UC2"]);
    }

    #[test]
    fn unreachable_api_counts_channels_as_empty() {
        let source = Arc::new(YouTubeClient::new(
            "http://127.0.0.1:9",
            "k",
            Duration::from_secs(1),
        ));
        let clock = Arc::new(SystemClock);
        let cache = ChannelCache::new(
            Arc::new(MemoryCacheStore::new()),
            VideoFetcher::new(source, clock.clone(), FetchLimits::default()),
            clock,
            DEFAULT_FRESHNESS_WINDOW,
        );

        let channels = vec!["UC1".to_string(), "UC2".to_string()];
        let summary = warm(&cache, &channels, true);
        assert_eq!(
            summary,
            WarmSummary {
                channels: 2,
                empty: 2,
                records: 0,
            }
        );
    }
}

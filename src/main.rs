//! IPTV Player - command line front end
//! Loads M3U playlists into the channel catalog and plays channels

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use iptv_player::catalog::{Catalog, CatalogStore};
use iptv_player::config::AppConfig;
use iptv_player::m3u_parser::{generate_m3u, load_playlist};
use iptv_player::models::{Channel, ChannelId, Playlist};
use iptv_player::Result;

#[derive(Parser)]
#[command(name = "iptv_player", version, about = "IPTV playlist manager and player")]
struct Cli {
    /// Catalog file (defaults to the config directory)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download or read a playlist and replace the catalog with its channels
    Load {
        /// URL or file path (defaults to the last loaded playlist)
        source: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// List channels
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        favorites: bool,
    },
    /// List categories
    Categories,
    /// Toggle a channel's favorite flag
    Favorite { id: u64 },
    /// Show recently played channels
    History {
        #[arg(long)]
        clear: bool,
    },
    /// List saved playlist sources
    Playlists {
        /// Forget a playlist source by url
        #[arg(long)]
        remove: Option<String>,
    },
    /// Write the catalog as M3U
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change settings
    Config {
        /// Stream proxy prefix ("" to clear)
        #[arg(long)]
        proxy: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        retry_delay_ms: Option<u64>,
        /// 0 = retry forever
        #[arg(long)]
        retry_max_attempts: Option<u32>,
        #[arg(long)]
        history_retention_days: Option<u32>,
    },
    /// Play a channel (needs the internal-player feature)
    Play {
        id: u64,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load();
    let mut catalog = Catalog::open(cli.catalog.unwrap_or_else(Catalog::default_path))?;

    if let Some(cutoff) = config.history_cutoff() {
        let removed = catalog.delete_history_older_than(cutoff)?;
        if removed > 0 {
            info!("Dropped {} old history entries", removed);
        }
    }

    match cli.command {
        Command::Load { source, name } => {
            let source = source.unwrap_or_else(|| config.playlist_url.clone());
            if source.is_empty() {
                println!("No playlist given and none loaded before");
                return Ok(());
            }

            let mut playlist = Playlist::from_source(&source);
            if let Some(name) = name {
                playlist = playlist.with_name(&name);
            }

            let channels = load_playlist(&playlist, &config.user_agent)?;
            let stored = catalog.replace_all(channels)?;
            catalog.add_playlist(playlist)?;

            config.playlist_url = source;
            config.save()?;
            println!("Loaded {} channels", stored.len());
        }
        Command::List { category, favorites } => {
            let channels = if favorites {
                catalog.get_favorites()
            } else if let Some(category) = category {
                catalog.get_by_category(&category)
            } else {
                catalog.get_all()
            };
            for channel in &channels {
                print_channel(channel);
            }
        }
        Command::Categories => {
            for category in catalog.get_categories() {
                let count = catalog.get_by_category(&category).len();
                println!("{} ({})", category, count);
            }
        }
        Command::Favorite { id } => {
            let id = ChannelId(id);
            let is_favorite = catalog.toggle_favorite(id)?;
            println!(
                "{} channel {}",
                if is_favorite { "Added to favorites:" } else { "Removed from favorites:" },
                id
            );
        }
        Command::History { clear } => {
            if clear {
                catalog.clear_history()?;
                println!("History cleared");
            } else {
                for entry in catalog.recent_history() {
                    println!(
                        "{}  {} [{}] {}s",
                        entry.played_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                        entry.channel_name,
                        entry.channel_id,
                        entry.duration
                    );
                }
            }
        }
        Command::Playlists { remove } => {
            if let Some(url) = remove {
                if catalog.remove_playlist(&url)? {
                    println!("Removed {}", url);
                } else {
                    println!("No playlist with url {}", url);
                }
            } else {
                for playlist in catalog.playlists() {
                    println!(
                        "{}  {} ({}) updated {}",
                        if playlist.is_local { "file" } else { "url " },
                        playlist.name,
                        playlist.url,
                        playlist.last_updated.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Command::Export { output } => {
            let content = generate_m3u(&catalog.get_all());
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Exported to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
        Command::Config {
            proxy,
            user_agent,
            retry_delay_ms,
            retry_max_attempts,
            history_retention_days,
        } => {
            let mut changed = false;
            if let Some(proxy) = proxy {
                config.proxy_url = proxy;
                changed = true;
            }
            if let Some(user_agent) = user_agent {
                config.user_agent = user_agent;
                changed = true;
            }
            if let Some(delay) = retry_delay_ms {
                config.retry_delay_ms = delay;
                changed = true;
            }
            if let Some(max) = retry_max_attempts {
                config.retry_max_attempts = max;
                changed = true;
            }
            if let Some(days) = history_retention_days {
                config.history_retention_days = days;
                changed = true;
            }
            if changed {
                config.save()?;
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Play { id, seconds } => {
            let id = ChannelId(id);
            let channel = catalog
                .get(id)
                .ok_or(iptv_player::Error::ChannelNotFound(id))?;
            play(&config, &mut catalog, &channel, seconds)?;
        }
    }

    Ok(())
}

fn print_channel(channel: &Channel) {
    println!(
        "{:>5} {} {} [{}] {}",
        channel.id,
        if channel.is_favorite { "*" } else { " " },
        channel.name,
        channel.category,
        channel.url
    );
}

#[cfg(feature = "internal-player")]
fn play(config: &AppConfig, catalog: &mut Catalog, channel: &Channel, seconds: u64) -> Result<()> {
    use std::time::{Duration, Instant};

    use iptv_player::models::PlaybackHistoryEntry;
    use iptv_player::player::{FfmpegEngine, PlaybackListener, PlaybackSession, PlayerState, SystemScheduler};

    struct ConsoleListener;

    impl PlaybackListener for ConsoleListener {
        fn on_state_changed(&mut self, is_playing: bool) {
            println!("{}", if is_playing { "Playing" } else { "Not playing" });
        }
        fn on_buffering(&mut self, is_buffering: bool) {
            if is_buffering {
                println!("Buffering...");
            }
        }
        fn on_error(&mut self, message: &str) {
            println!("Error: {}", message);
        }
    }

    let mut history = PlaybackHistoryEntry::new(channel);
    catalog.insert_history(history.clone())?;
    catalog.mark_played(channel.id, history.played_at)?;

    let mut session = PlaybackSession::new(FfmpegEngine::new(&config.user_agent), SystemScheduler::new())
        .with_retry_policy(config.retry_policy());
    session.set_listener(Box::new(ConsoleListener));
    session.set_volume(config.volume);
    session.start(channel, config.proxy_prefix());

    let started = Instant::now();
    let limit = Duration::from_secs(seconds);
    while started.elapsed() < limit && *session.state() != PlayerState::Stopped {
        session.tick();
        std::thread::sleep(Duration::from_millis(50));
    }
    session.stop();

    history.duration = started.elapsed().as_secs();
    catalog.insert_history(history)?;
    Ok(())
}

#[cfg(not(feature = "internal-player"))]
fn play(_config: &AppConfig, _catalog: &mut Catalog, channel: &Channel, _seconds: u64) -> Result<()> {
    println!(
        "Cannot play '{}': internal player not enabled. Build with --features internal-player",
        channel.name
    );
    Ok(())
}

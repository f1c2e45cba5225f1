// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_SEED_BOTS: usize = 3;
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bots created at startup.
    pub seed_bots: usize,
    /// Base seed for per-bot timer generators. Random when unset.
    pub rng_seed: Option<u64>,
    /// Directory of static files served for unmatched paths.
    pub static_dir: Option<PathBuf>,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            seed_bots: DEFAULT_SEED_BOTS,
            rng_seed: None,
            static_dir: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 5001)
    /// - `BOT_SEED_COUNT` - bots created at startup (default: 3)
    /// - `BOT_RNG_SEED` - fixed base seed for timer draws
    /// - `STATIC_DIR` - directory served as a static fallback
    /// - `EVENT_BUFFER` - event channel capacity (default: 256)
    ///
    /// CLI flags `--port`, `--seed-bots` and `--rng-seed` take precedence
    /// over their environment variables.
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let seed_bots = Self::parse_cli_value(args, "--seed-bots")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("BOT_SEED_COUNT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.seed_bots);

        let rng_seed = Self::parse_cli_value(args, "--rng-seed")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("BOT_RNG_SEED").and_then(|v| v.parse().ok()));

        let static_dir = env("STATIC_DIR").map(PathBuf::from);

        let event_buffer = env("EVENT_BUFFER")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.event_buffer);

        Config {
            port,
            seed_bots,
            rng_seed,
            static_dir,
            event_buffer,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

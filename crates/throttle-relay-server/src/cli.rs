//! Command-line flags and configuration loading.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use throttle_relay_core::{Config, Direction};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "throttle-relay.toml";

const DIRECTION_HELP: &str = "Throttle direction: cs | sc | both | none
  * cs: throttle client to server data path
  * sc: throttle server to client data path
  * both: throttle both directions (default)
  * none: do not throttle";

#[derive(Parser, Debug)]
#[command(name = "throttle-relay")]
#[command(version, about = "TCP relay that throttles traffic to simulate slow links")]
pub struct Cli {
    /// Number of bytes per TCP write once throttled
    #[arg(short = 's', long = "size", value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Delay after each throttled write, in milliseconds
    #[arg(short = 'd', long = "delay", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Address to accept clients on (host:port)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Upstream address to relay to (host:port)
    #[arg(short = 'u', long)]
    pub upstream: Option<String>,

    /// Throttle direction: cs, sc, both or none
    #[arg(short = 'r', long, long_help = DIRECTION_HELP)]
    pub direction: Option<Direction>,

    /// TOML configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seconds to wait for running sessions on shutdown
    #[arg(long = "drain-timeout", value_name = "SECS")]
    pub drain_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the config file (if any) and apply flag overrides on top.
    ///
    /// Returns the config and the file it came from.
    pub fn load_config(&self) -> Result<(Config, Option<PathBuf>)> {
        let (mut config, source) = match &self.config {
            Some(path) => (read_config(path)?, Some(path.clone())),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                (read_config(&path)?, Some(path))
            }
            None => (Config::default(), None),
        };

        self.apply(&mut config);
        Ok((config, source))
    }

    /// Overwrite config values with the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(chunk_size) = self.chunk_size {
            config.relay.chunk_size = chunk_size;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.relay.delay_ms = delay_ms;
        }
        if let Some(listen) = &self.listen {
            config.relay.listen = listen.clone();
        }
        if let Some(upstream) = &self.upstream {
            config.relay.upstream = upstream.clone();
        }
        if let Some(direction) = self.direction {
            config.relay.direction = direction;
        }
        if let Some(secs) = self.drain_timeout_secs {
            config.relay.drain_timeout_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("throttle-relay").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&[
            "-s",
            "10",
            "-d",
            "50",
            "-l",
            "127.0.0.1:9000",
            "-u",
            "127.0.0.1:8080",
            "-r",
            "cs",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.relay.chunk_size, 10);
        assert_eq!(config.relay.delay_ms, 50);
        assert_eq!(config.relay.listen, "127.0.0.1:9000");
        assert_eq!(config.relay.upstream, "127.0.0.1:8080");
        assert_eq!(config.relay.direction, Direction::ClientToServer);
        assert!(config.relay.validate().is_ok());
    }

    #[test]
    fn test_long_flags() {
        let cli = parse(&[
            "--size",
            "3",
            "--delay",
            "0",
            "--listen",
            ":9000",
            "--upstream",
            "example.com:80",
            "--direction",
            "none",
            "--drain-timeout",
            "7",
            "--log-level",
            "debug",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.relay.chunk_size, 3);
        assert_eq!(config.relay.direction, Direction::None);
        assert_eq!(config.relay.drain_timeout_secs, 7);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = parse(&[]);
        let mut config = Config::default();
        config.relay.chunk_size = 42;
        cli.apply(&mut config);

        assert_eq!(config.relay.chunk_size, 42);
        assert_eq!(config.relay.direction, Direction::Both);
        assert!(config.relay.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_values() {
        for args in [["-r", "sideways"], ["-d", "-1"], ["-s", "abc"]] {
            let result = Cli::try_parse_from(std::iter::once("throttle-relay").chain(args));
            assert!(result.is_err(), "accepted {:?}", args);
        }
    }

    #[test]
    fn test_zero_size_fails_validation() {
        let cli = parse(&["-s", "0", "-l", "127.0.0.1:0", "-u", "127.0.0.1:1"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(config.relay.validate().is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let path = std::env::temp_dir().join(format!(
            "throttle-relay-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            concat!(
                "[relay]\n",
                "listen = \"127.0.0.1:1\"\n",
                "upstream = \"127.0.0.1:2\"\n",
                "chunk_size = 8\n",
                "delay_ms = 30\n",
            ),
        )
        .unwrap();

        let cli = parse(&["-c", path.to_str().unwrap(), "-d", "5"]);
        let (config, source) = cli.load_config().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(source.as_deref(), Some(path.as_path()));
        assert_eq!(config.relay.chunk_size, 8);
        assert_eq!(config.relay.delay_ms, 5);
        assert_eq!(config.relay.listen, "127.0.0.1:1");
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = parse(&["-c", "/nonexistent/throttle-relay.toml"]);
        assert!(cli.load_config().is_err());
    }
}

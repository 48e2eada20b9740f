use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tiercache::{DataSource, KvClient, ReadOptions, TierConfig, TieredCache, presets};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "tiercache-cli")]
#[command(about = "tiercache CLI - drive a memory → remote → origin cache", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Skip these 1-based levels on reads (repeatable)
    #[arg(long = "skip-level")]
    skip_levels: Vec<usize>,

    /// Abort reads on the first layer error instead of falling back
    #[arg(long)]
    fail_fast: bool,

    /// Command to execute (if not in interactive mode)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

/// Simulated origin: numeric keys exist, everything else is absent
fn demo_origin() -> DataSource<String, String> {
    DataSource::new("origin", |keys: Vec<String>| async move {
        tokio::time::sleep(Duration::from_millis(10 * keys.len() as u64)).await;
        Ok(keys
            .into_iter()
            .filter(|key| key.parse::<u64>().is_ok())
            .map(|key| {
                let value = format!("User-{}", key);
                (key, value)
            })
            .collect::<HashMap<_, _>>())
    })
}

#[cfg(feature = "redis")]
async fn remote_client(config: &TierConfig) -> Result<Option<Arc<dyn KvClient>>> {
    if !config.remote.enabled {
        return Ok(None);
    }
    let client = tiercache::RedisClient::connect(&config.remote.url)
        .await
        .with_context(|| format!("connecting to {}", config.remote.url))?;
    Ok(Some(Arc::new(client)))
}

#[cfg(not(feature = "redis"))]
async fn remote_client(config: &TierConfig) -> Result<Option<Arc<dyn KvClient>>> {
    if config.remote.enabled {
        warn!("remote layer enabled but this build has no redis support; skipping it");
    }
    Ok(None)
}

struct Shell {
    cache: TieredCache<String, String>,
    skip_levels: Vec<usize>,
    fail_fast: bool,
}

impl Shell {
    fn read_options(&self) -> ReadOptions {
        let mut options = ReadOptions::new();
        if !self.skip_levels.is_empty() {
            options = options.skip_levels(self.skip_levels.clone());
        }
        if self.fail_fast {
            options = options.fail_fast();
        }
        options
    }

    async fn execute_command(&self, command: &str, args: &[String]) -> Result<String> {
        let start = Instant::now();

        let response = match command.to_uppercase().as_str() {
            "GET" => self.cmd_get(args).await?,
            "MGET" => self.cmd_mget(args).await?,
            "SET" => self.cmd_set(args).await?,
            "DEL" | "DELETE" => self.cmd_del(args).await?,
            "LAYERS" => self.cmd_layers(),
            "METRICS" => tiercache::metrics::encode_metrics()
                .map_err(|e| anyhow::anyhow!("encoding metrics: {}", e))?,
            "HELP" => help_text(),
            _ => return Err(anyhow::anyhow!("Unknown command: {}", command)),
        };

        let elapsed = start.elapsed();
        Ok(format!(
            "{}\n{}",
            response,
            format!("({:.2?})", elapsed).dimmed()
        ))
    }

    async fn cmd_get(&self, args: &[String]) -> Result<String> {
        let [key] = args else {
            return Err(anyhow::anyhow!("Usage: GET key"));
        };

        match self.cache.get_with(key, &self.read_options()).await? {
            Some(value) => Ok(format!("\"{}\"", value)),
            None => Ok("(nil)".yellow().to_string()),
        }
    }

    async fn cmd_mget(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: MGET key [key ...]"));
        }

        let found = self.cache.batch_get_with(args, &self.read_options()).await?;
        let ordered: serde_json::Map<String, serde_json::Value> = args
            .iter()
            .map(|key| {
                let value = found
                    .get(key)
                    .map_or(serde_json::Value::Null, |v| serde_json::Value::from(v.as_str()));
                (key.clone(), value)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&ordered)?)
    }

    async fn cmd_set(&self, args: &[String]) -> Result<String> {
        let [key, value] = args else {
            return Err(anyhow::anyhow!("Usage: SET key value"));
        };

        self.cache.set(key.clone(), value.clone()).await?;
        Ok("OK".green().to_string())
    }

    async fn cmd_del(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: DEL key [key ...]"));
        }

        self.cache.batch_delete(args).await?;
        Ok("OK".green().to_string())
    }

    fn cmd_layers(&self) -> String {
        self.cache
            .layer_names()
            .iter()
            .enumerate()
            .map(|(index, name)| format!("L{} {}", index + 1, name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn help_text() -> String {
    [
        "GET key               resolve one key through the layers",
        "MGET key [key ...]    resolve several keys",
        "SET key value         write to every layer",
        "DEL key [key ...]     delete from every layer",
        "LAYERS                list layers in level order",
        "METRICS               dump Prometheus metrics",
        "QUIT                  leave the shell",
    ]
    .join("\n")
}

/// Load the config file, or defaults with plain log output for interactive use
fn load_config(path: Option<&Path>) -> Result<TierConfig> {
    match path {
        Some(path) => TierConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => {
            let mut config = TierConfig::default();
            config.logging.format = "plain".to_string();
            Ok(config)
        }
    }
}

/// ANSI colors would end up escaped inside JSON log lines
fn use_colors(config: &TierConfig) -> bool {
    config.logging.format != "json"
}

fn init_logging(config: &TierConfig) {
    if !use_colors(config) {
        colored::control::set_override(false);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(filter)
        .with_target(false);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    init_logging(&config);

    let remote = remote_client(&config).await?;
    let shell = Shell {
        cache: presets::from_config(&config, remote, demo_origin()),
        skip_levels: args.skip_levels,
        fail_fast: args.fail_fast,
    };

    if !args.command.is_empty() {
        // Command mode: execute single command and exit
        let cmd = &args.command[0];
        let cmd_args = &args.command[1..];

        match shell.execute_command(cmd, cmd_args).await {
            Ok(output) => {
                info!("{}", output);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        }
    } else {
        run_interactive(shell).await
    }
}

async fn run_interactive(shell: Shell) -> Result<()> {
    info!(
        "{}",
        format!("tiercache CLI v{}", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    info!("Layers: {}", shell.cache.layer_names().join(" → "));
    info!("Type {} for available commands\n", "HELP".bold());

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(&format!("{}> ", "tiercache".green())) {
            Ok(line) => {
                let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
                let Some((cmd, args)) = parts.split_first() else {
                    continue;
                };

                rl.add_history_entry(&line)?;

                if cmd.eq_ignore_ascii_case("QUIT") || cmd.eq_ignore_ascii_case("EXIT") {
                    info!("Goodbye!");
                    break;
                }

                match shell.execute_command(cmd, args).await {
                    Ok(output) => info!("{}", output),
                    Err(e) => error!(error = %e, "{}", format!("Error: {}", e).red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                info!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

mod airing;
mod schedule;
mod search;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

use tvcue_core::config;
use tvcue_core::tracing_ext::init_tracing;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Opt {
    /// Path to a configuration file in a YAML format.
    ///
    /// The TVCUE_CONFIG environment variable is used if this option is not
    /// specified.  Built-in defaults are used if neither is specified.
    #[arg(short, long, env = "TVCUE_CONFIG")]
    config: Option<PathBuf>,

    /// Logging format.
    #[arg(long, env = "TVCUE_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search shows for each line read from STDIN.
    ///
    /// Lines typed in quick succession are debounced; only the line the input
    /// settled on is searched.
    Search,

    /// Print the schedule of a day grouped by airtime.
    Schedule {
        /// Date in YYYY-MM-DD.  Today if not specified.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// ISO 3166-1 alpha-2 country code overriding `schedule.country`.
        #[arg(long, value_parser = parse_country)]
        country: Option<String>,
    },

    /// Print the number of tracked shows airing on a day.
    Airing {
        /// Date in YYYY-MM-DD.  Today if not specified.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Path to a tracked registry file overriding `registry.path`.
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

fn parse_country(value: &str) -> Result<String, String> {
    if config::is_country_code(value) {
        Ok(value.to_string())
    } else {
        Err(format!("{value} is not an ISO 3166-1 alpha-2 code"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    init_tracing(match opt.log_format {
        LogFormat::Text => "text",
        LogFormat::Json => "json",
    });

    let config = match opt.config {
        Some(ref path) => config::load(path),
        None => Arc::new(config::Config::default()),
    };

    match opt.command {
        Command::Search => search::main(config).await,
        Command::Schedule { date, country } => schedule::main(config, date, country).await,
        Command::Airing { date, registry } => airing::main(config, date, registry).await,
    }
}

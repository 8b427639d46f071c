use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use race_analytics::compare::{Comparator, ComparisonResult, EntitySummary};
use race_analytics::config::{AppConfig, SourceKind};
use race_analytics::models::{ComparisonMode, EntityId, EntityKind};
use race_analytics::parse_duration;

#[derive(Parser)]
#[command(name = "race-analytics")]
#[command(about = "Motorsport results aggregation and multi-entity comparison")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Read entities from this directory instead of the configured source
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Fetch entities from this results API instead of the configured source
    #[arg(long, conflicts_with = "data_dir")]
    base_url: Option<String>,

    /// Per-entity fetch timeout in whole seconds (e.g., "30s", "2m")
    #[arg(long)]
    timeout: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show derived statistics for one driver or team
    Stats {
        /// Entity kind: driver or team
        #[arg(long, default_value = "driver")]
        kind: EntityKind,

        /// Entity id
        #[arg(long)]
        id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Compare 2 to 5 drivers or teams
    Compare {
        /// Entity kind: driver or team
        #[arg(long, default_value = "driver")]
        kind: EntityKind,

        /// Entity ids (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        /// Comparison mode: all, common-championships, common-races, same-team
        #[arg(long, default_value = "all")]
        mode: ComparisonMode,

        /// Only show result rows from this year
        #[arg(long)]
        year: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            (!cli.json_logs)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .with(cli.json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .init();

    tracing::info!("Starting race-analytics v{}", env!("CARGO_PKG_VERSION"));

    let source = config
        .source
        .build()
        .context("Failed to build data source")?;
    let comparator = Comparator::with_config(source, config.comparator());

    match cli.command {
        Commands::Stats { kind, id, format } => {
            let summary = comparator.entity_stats(kind, &EntityId::from(id)).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Csv => bail!("CSV output is only available for comparisons"),
                OutputFormat::Table => print_stats(&summary),
            }
        }

        Commands::Compare {
            kind,
            ids,
            mode,
            year,
            format,
        } => {
            let ids: Vec<EntityId> = ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(EntityId::from)
                .collect();

            let result = comparator.run(kind, &ids, mode).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Csv => print!("{}", result.to_csv(year.as_deref())?),
                OutputFormat::Table => print_comparison(&result, year.as_deref()),
            }
        }
    }

    Ok(())
}

/// Load the config file if present, then apply command-line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = &cli.data_dir {
        config.source.kind = SourceKind::Dir;
        config.source.data_dir = Some(dir.clone());
    }
    if let Some(url) = &cli.base_url {
        config.source.kind = SourceKind::Http;
        config.source.base_url = Some(url.clone());
    }
    if let Some(timeout) = &cli.timeout {
        let duration = parse_duration(timeout)
            .with_context(|| format!("Invalid --timeout: {}", timeout))?;
        config.source.set_timeout(duration)?;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_stats(summary: &EntitySummary) {
    let stats = &summary.stats;

    println!("\n=== {} ({}) ===", summary.name, summary.kind);
    if let Some(nationality) = &summary.nationality {
        println!("Nationality:      {}", nationality);
    }
    if !stats.has_results() {
        println!("No results recorded.");
        return;
    }

    let span = match (&stats.first_year, &stats.last_year) {
        (Some(first), Some(last)) if first != last => format!("{}-{}", first, last),
        (Some(year), _) | (_, Some(year)) => year.clone(),
        _ => "-".to_string(),
    };
    println!("Seasons:          {}", span);
    println!("Races:            {}", stats.races);
    println!("Wins:             {} ({:.1}%)", stats.wins, stats.win_rate);
    println!("Podiums (P2-P3):  {} ({:.1}%)", stats.podiums, stats.podium_rate);
    println!("Top 5 / Top 10:   {} / {}", stats.top5, stats.top10);
    println!("Finished:         {} ({:.1}%)", stats.finished_races, stats.finish_rate);
    println!(
        "DNF / DNS / DSQ:  {} / {} / {} ({:.1}% DNF)",
        stats.dnf, stats.dns, stats.dsq, stats.dnf_rate
    );
    println!("Poles:            {}", stats.poles);
    println!("Fastest laps:     {}", stats.fastest_laps);
    println!("Points:           {}", stats.total_points);
    println!("Avg finish:       {:.2}", stats.avg_position);
    if stats.qualifying_sessions > 0 {
        println!("Avg qualifying:   {:.2}", stats.avg_qualifying);
        println!("Quali vs race:    {:+.2}", stats.qualifying_vs_race_delta);
    }
    println!(
        "Championships:    {}",
        stats.championships.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    if !stats.teams.is_empty() {
        println!(
            "Teams:            {}",
            stats.teams.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    if !stats.seasons.is_empty() {
        println!(
            "\n{:<8} {:>6} {:>6} {:>8} {:>6} {:>8}",
            "Year", "Races", "Wins", "Podiums", "DNF", "Points"
        );
        for (year, season) in stats.seasons.iter().rev() {
            println!(
                "{:<8} {:>6} {:>6} {:>8} {:>6} {:>8}",
                year, season.races, season.wins, season.podiums, season.dnf, season.points
            );
        }
    }
}

fn print_comparison(result: &ComparisonResult, year: Option<&str>) {
    println!("\n=== Comparison ({}) ===", result.mode);
    println!(
        "{:<24} {:>6} {:>6} {:>8} {:>6} {:>8} {:>9}",
        "", "Races", "Wins", "Podiums", "DNF", "Points", "Avg pos"
    );
    for entity in &result.entities {
        let stats = &entity.stats;
        println!(
            "{:<24} {:>6} {:>6} {:>8} {:>6} {:>8} {:>9.2}",
            entity.name,
            stats.races,
            stats.wins,
            stats.podiums,
            stats.dnf,
            stats.total_points,
            stats.avg_position
        );
    }

    if !result.summary.common_championships.is_empty() {
        println!(
            "\nCommon championships: {}",
            result
                .summary
                .common_championships
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if let Some(hint) = result.empty_hint() {
        println!("\n{}", hint);
        return;
    }

    println!("\n=== Battle ({} races) ===", result.battle.common_races);
    for entity in &result.entities {
        println!(
            "{:<24} {:>4} ahead ({:.1}%)",
            entity.name,
            result.battle.finishes_ahead(&entity.id),
            result.battle.win_share(&entity.id)
        );
    }
    for pair in &result.battle.head_to_head {
        let name = |id: &EntityId| {
            result
                .entity(id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        println!(
            "  {} vs {}: {}-{} ({} contested)",
            name(&pair.first),
            name(&pair.second),
            pair.first_ahead,
            pair.second_ahead,
            pair.contested
        );
    }

    let rows = match year {
        Some(year) => result.rows_for_year(year),
        None => result.rows.iter().collect(),
    };
    println!("\n=== Results ({} rows) ===", rows.len());
    for row in rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| {
                let race = cell.race_label();
                let quali = cell.qualifying_label();
                match (race.is_empty(), quali.is_empty()) {
                    (true, _) => "-".to_string(),
                    (false, true) => race,
                    (false, false) => format!("{} (Q{})", race, quali),
                }
            })
            .collect();
        println!(
            "{} {:<16} {:<24} {}",
            row.instance.year,
            row.instance.championship,
            row.instance.event,
            cells.join(" | ")
        );
    }
}

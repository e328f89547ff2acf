#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the aviation occurrence dashboard.
//!
//! Every data command fetches the full record set from the API, applies
//! the `--filter` assignments and prints the same aggregations the
//! dashboard views show. `serve` starts the development API server.

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use dataplane_analytics::{
    Aggregation, by_month, by_year, fatalities_by_year, segment_by_year, time_series,
};
use dataplane_analytics_models::{Bucket, Measure, TimeGranularity, TimeSeries};
use dataplane_client::ApiClient;
use dataplane_dashboard::{Dashboard, DashboardConfig, SessionStore, export::export_file_name};
use dataplane_filter::{FilterKey, FilterState, FilterValue};
use dataplane_occurrence_models::{RecordField, state_name};
use dataplane_server::{ServerSettings, run_server};
use dataplane_server_models::PredictionRequest;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Explore Brazilian aviation occurrences.
#[derive(Parser)]
#[command(name = "dataplane")]
#[command(about = "Explore Brazilian aviation occurrences")]
struct Cli {
    /// Dashboard TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Filter assignment `key=value[,value...]`, e.g. `state=SP,RJ`.
    /// May be repeated.
    #[arg(long = "filter", global = true, value_parser = parse_filter)]
    filters: Vec<(FilterKey, FilterValue)>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Headline numbers for the filtered records.
    Summary,

    /// Top-N breakdown of one field.
    Aggregate {
        /// Field to group by (name or source column).
        #[arg(long, value_parser = parse_field)]
        by: RecordField,

        /// Number of buckets before folding into "Other".
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Sum fatalities instead of counting occurrences.
        #[arg(long)]
        fatalities: bool,

        /// Leave out records with no value instead of grouping them.
        #[arg(long)]
        skip_missing: bool,
    },

    /// Per-year (or per-month) series.
    Timeline {
        /// Bucket by year-month instead of year.
        #[arg(long)]
        monthly: bool,

        /// Sum fatalities instead of counting occurrences.
        #[arg(long)]
        fatalities: bool,

        /// Split each year by the top values of this field.
        #[arg(long, value_parser = parse_field)]
        segment_by: Option<RecordField>,

        /// Number of series when segmenting.
        #[arg(long, default_value_t = 6)]
        top: usize,
    },

    /// State choropleth counts and colors.
    Map,

    /// Write the filtered records as CSV.
    Export {
        /// Output file (default: `aviation-occurrences-<date>.csv`).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Selectable filter options.
    Options {
        /// Only list options of this filter key.
        #[arg(long, value_parser = parse_key)]
        key: Option<FilterKey>,
    },

    /// Request a damage-level prediction.
    Predict {
        /// Operation type.
        #[arg(long)]
        operation_type: String,

        /// Contributing factor area.
        #[arg(long)]
        factor_area: String,

        /// Vehicle type.
        #[arg(long)]
        vehicle_type: String,

        /// Two-letter state code.
        #[arg(long)]
        state: String,

        /// Aircraft manufacture year.
        #[arg(long)]
        manufacture_year: u32,

        /// Fatality count.
        #[arg(long, default_value_t = 0)]
        fatalities: u32,
    },

    /// Values accepted by each prediction input.
    FormOptions,

    /// Check API connectivity and credentials.
    Health,

    /// Run the development API server.
    Serve,
}

fn parse_filter(s: &str) -> Result<(FilterKey, FilterValue), String> {
    FilterState::parse_assignment(s).map_err(|e| e.to_string())
}

fn parse_key(s: &str) -> Result<FilterKey, String> {
    FilterKey::parse(s).map_err(|e| e.to_string())
}

fn parse_field(s: &str) -> Result<RecordField, String> {
    RecordField::parse_any(s).ok_or_else(|| format!("Unknown field '{s}'"))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Serve) {
        // The server uses actix-web's runtime, so it runs on its own
        // system in a blocking task.
        tokio::task::spawn_blocking(|| {
            actix_web::rt::System::new().block_on(run_server(ServerSettings::from_env()))
        })
        .await??;
        return Ok(());
    }

    let config = DashboardConfig::load(cli.config.as_deref())?;
    let client = ApiClient::new(config.api.clone())?;
    // One-shot commands read the saved session but must not overwrite it
    // with their own filters.
    let session = Arc::new(SessionStore::read_only(&config.session));
    let mut dashboard = Dashboard::with_session(Arc::new(client), config, session);

    let mut filters = FilterState::new();
    for (key, value) in cli.filters {
        filters.insert(key, value);
    }

    match cli.command {
        Commands::Summary => {
            load(&mut dashboard, filters).await?;
            cmd_summary(&dashboard);
        }
        Commands::Aggregate {
            by,
            top,
            fatalities,
            skip_missing,
        } => {
            load(&mut dashboard, filters).await?;
            let aggregation = if fatalities {
                Aggregation::sum_fatalities(by, top)
            } else {
                Aggregation::count(by, top)
            };
            let aggregation = if skip_missing {
                aggregation.skip_missing()
            } else {
                aggregation
            };
            let result = aggregation.run(dashboard.filtered_records());
            if result.is_empty() {
                println!("{}: no data", by.label());
            } else {
                print_buckets(by.label(), &result.buckets);
            }
        }
        Commands::Timeline {
            monthly,
            fatalities,
            segment_by,
            top,
        } => {
            load(&mut dashboard, filters).await?;
            cmd_timeline(&dashboard, monthly, fatalities, segment_by, top);
        }
        Commands::Map => {
            load(&mut dashboard, filters).await?;
            cmd_map(&dashboard);
        }
        Commands::Export { out } => {
            load(&mut dashboard, filters).await?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(export_file_name(chrono::Local::now().date_naive()))
            });
            let file = std::fs::File::create(&path)?;
            let rows = dashboard.export_csv(file)?;
            println!("Wrote {rows} occurrences to {}", path.display());
        }
        Commands::Options { key } => {
            dashboard.replace_filters(filters);
            if !dashboard.load_filter_options().await {
                return Err(notification_error(&mut dashboard).into());
            }
            cmd_options(&dashboard, key);
        }
        Commands::Predict {
            operation_type,
            factor_area,
            vehicle_type,
            state,
            manufacture_year,
            fatalities,
        } => {
            let request = PredictionRequest {
                operation_type,
                factor_area,
                vehicle_type,
                state,
                manufacture_year,
                fatalities,
            };
            let response = dashboard.predict(&request).await?;
            println!("Prediction: {}", response.prediction);
            println!("Confidence: {:.1}%", response.clamped_confidence() * 100.0);
        }
        Commands::FormOptions => {
            for (input, values) in dashboard.form_options().await? {
                println!("{input}:");
                for value in values {
                    println!("  {value}");
                }
            }
        }
        Commands::Health => {
            let status = dashboard.check_auth().await;
            println!("API: {}", dashboard.config().api.base_url);
            println!("Status: {status}");
        }
        Commands::Serve => {}
    }

    Ok(())
}

/// Fetches every record and applies `filters`. A failed fetch is an error
/// here, since there is nothing earlier to fall back to.
async fn load(
    dashboard: &mut Dashboard,
    filters: FilterState,
) -> Result<(), Box<dyn std::error::Error>> {
    dashboard.load_occurrences().await;
    if dashboard.error().is_some() {
        return Err(notification_error(dashboard).into());
    }
    log::debug!("Applying {} filters", filters.active_count());
    dashboard.replace_filters(filters);
    Ok(())
}

fn notification_error(dashboard: &mut Dashboard) -> String {
    dashboard
        .take_notifications()
        .pop()
        .map_or_else(|| "Request failed".to_string(), |n| n.message)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn cmd_summary(dashboard: &Dashboard) {
    let view = dashboard.view();
    let summary = &view.charts.summary;

    println!("=== Occurrence Summary ===");
    println!();
    println!(
        "Records:    {} shown / {} fetched / {} on server",
        view.table.filtered, view.table.fetched, view.table.server_total
    );
    println!("Filters:    {} active", view.active_filters);
    println!("Fatalities: {}", summary.fatalities);
    println!("Countries:  {}", summary.countries);
    println!(
        "Latest:     {}",
        summary.latest_date.as_deref().unwrap_or("-")
    );
    println!();
    print_buckets("Severity", &summary.by_severity);
    println!();
    print_buckets("Operation phase", &summary.by_phase);
}

fn cmd_timeline(
    dashboard: &Dashboard,
    monthly: bool,
    fatalities: bool,
    segment_by: Option<RecordField>,
    top: usize,
) {
    let records = dashboard.filtered_records();

    if let Some(field) = segment_by {
        let measure = if fatalities {
            Measure::Fatalities
        } else {
            Measure::Count
        };
        let segmented = segment_by_year(records.iter().copied(), field, top, measure);
        print!("{:<8}", "YEAR");
        for series in &segmented.series {
            print!(" {:>14}", truncate(&series.label, 14));
        }
        println!();
        for (i, period) in segmented.periods.iter().enumerate() {
            print!("{period:<8}");
            for series in &segmented.series {
                print!(" {:>14}", series.values[i]);
            }
            println!();
        }
        report_skipped(segmented.skipped);
        return;
    }

    let series = match (monthly, fatalities) {
        (false, false) => by_year(records.iter().copied()),
        (true, false) => by_month(records.iter().copied()),
        (false, true) => fatalities_by_year(records.iter().copied()),
        (true, true) => time_series(
            records.iter().copied(),
            TimeGranularity::Monthly,
            Measure::Fatalities,
        ),
    };
    print_series(&series);
}

fn cmd_map(dashboard: &Dashboard) {
    let map = &dashboard.view().map;
    println!(
        "{:<4} {:<22} {:>8} {:<8} {:<8}",
        "UF", "STATE", "COUNT", "CLASS", "COLOR"
    );
    println!("{}", "-".repeat(56));
    for region in &map.regions {
        let marker = if map.selected_states.contains(&region.region) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<4} {:<22} {:>8} {:<8} {:<8}{marker}",
            region.region,
            truncate(state_name(&region.region).unwrap_or("-"), 22),
            region.count,
            region.color.to_string(),
            region.color.token(),
        );
    }
    println!();
    println!("{} markers on the map", map.markers.len());
}

fn cmd_options(dashboard: &Dashboard, key: Option<FilterKey>) {
    let keys = key.map_or_else(|| FilterKey::all().to_vec(), |k| vec![k]);
    for key in keys {
        if !dashboard.is_filter_enabled(key) {
            println!("{key}: (select a state first)");
            continue;
        }
        let options = dashboard.options_for(key);
        println!("{key} ({}):", options.len());
        for option in options {
            println!("  {option}");
        }
    }
}

fn print_buckets(title: &str, buckets: &[Bucket]) {
    println!("{:<40} {:>10}", title.to_uppercase(), "VALUE");
    println!("{}", "-".repeat(51));
    for bucket in buckets {
        println!("{:<40} {:>10}", truncate(&bucket.label, 40), bucket.value);
    }
    println!(
        "{:<40} {:>10}",
        "TOTAL",
        buckets.iter().map(|b| b.value).sum::<u64>()
    );
}

fn print_series(series: &TimeSeries) {
    println!(
        "{:<8} {:>10}",
        series.granularity.to_string().to_uppercase(),
        series.measure.to_string().to_uppercase()
    );
    println!("{}", "-".repeat(19));
    for point in &series.points {
        println!("{:<8} {:>10}", point.period, point.value);
    }
    report_skipped(series.skipped);
}

fn report_skipped(skipped: u64) {
    if skipped > 0 {
        println!("({skipped} records without a valid date left out)");
    }
}

/// Shortens `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeated_filters_are_collected() {
        let cli = Cli::try_parse_from([
            "dataplane",
            "summary",
            "--filter",
            "state=SP,RJ",
            "--filter",
            "classification=ACIDENTE",
        ])
        .unwrap();
        assert_eq!(cli.filters.len(), 2);
        assert_eq!(cli.filters[0].0, FilterKey::State);
        assert_eq!(cli.filters[1].1, FilterValue::from("ACIDENTE"));
    }

    #[test]
    fn unknown_filter_key_is_rejected() {
        assert!(Cli::try_parse_from(["dataplane", "map", "--filter", "colour=red"]).is_err());
    }

    #[test]
    fn aggregate_accepts_column_names() {
        let cli = Cli::try_parse_from([
            "dataplane",
            "aggregate",
            "--by",
            "ocorrencia_classificacao",
            "--top",
            "3",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Aggregate {
                by: RecordField::Classification,
                top: 3,
                ..
            }
        ));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("SANTOS", 10), "SANTOS");
        assert_eq!(truncate("BELO HORIZONTE", 5), "BELO…");
    }
}

use std::io::Write;

use clap::{arg, Command};
use colored::Colorize;
use serde::Deserialize;
use serde::Serialize;

use crate::api::ApiClient;
use crate::error::{ApiError, ApiErrorKind};
use crate::holdings::validate_new;

mod analytics;
mod api;
mod catalog;
mod chart;
mod correlation;
mod dictionary;
mod error;
mod holdings;
mod model;
mod recommend;
mod summary;
mod tui;

#[derive(Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub default_period: String,
    pub catalog_page_size: usize,
    pub catalog_max_records: usize,
    pub catalog_page_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api/v1".to_string(),
            default_period: "1y".to_string(),
            catalog_page_size: 50,
            catalog_max_records: 2000,
            catalog_page_delay_ms: 300,
        }
    }
}

fn cli() -> Command {
    Command::new("etfolio")
        .about("An ETF portfolio tracker")
        .subcommand(Command::new("config").about("Print the path to the config file"))
        .subcommand(Command::new("tui").about("Open the interactive dashboard (default)"))
        .subcommand(Command::new("holdings").about("List your registered ETFs"))
        .subcommand(
            Command::new("add")
                .about("Register an ETF in your holdings")
                .arg(arg!(<TICKER> "Ticker symbol, e.g. SPY or 360750.KS"))
                .arg(arg!(<NAME> "Display name")),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove an ETF from your holdings")
                .arg(arg!(<TICKER> "Ticker symbol"))
                .arg(arg!(-y --yes "Skip the confirmation prompt").required(false)),
        )
        .subcommand(Command::new("summary").about("Show the portfolio summary"))
        .subcommand(
            Command::new("analytics")
                .about("Show performance metrics for one ETF")
                .arg(arg!(<TICKER> "Ticker symbol"))
                .arg(arg!(--period <PERIOD> "Analysis period, e.g. 6mo, 1y, 5y").required(false)),
        )
        .subcommand(
            Command::new("recommend")
                .about("Show ETF recommendations by strategy")
                .arg(arg!(--category <CATEGORY> "Catalog category to draw from").required(false))
                .arg(arg!(--period <PERIOD> "Analysis period").required(false))
                .arg(arg!(--limit <LIMIT> "Results per strategy").required(false)),
        )
        .subcommand(
            Command::new("correlation")
                .about("Show correlation analysis of your holdings")
                .arg(arg!(--period <PERIOD> "Analysis period").required(false)),
        )
        .subcommand(
            Command::new("dict")
                .about("Browse the investing dictionary")
                .arg(arg!([QUERY] "Search query").required(false))
                .arg(arg!(--category <CATEGORY> "List one category").required(false)),
        )
        .subcommand(Command::new("status").about("Show server database status"))
}

fn confirm(prompt: &str) -> eyre::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn run_add(api: &ApiClient, ticker: &str, name: &str) -> eyre::Result<()> {
    let new = validate_new(ticker, name)?;
    match api.add_etf(&new).await {
        Ok(etf) => println!("{} {} ({})", "Added".green().bold(), etf.name, etf.ticker),
        Err(e) if e.kind() == Some(ApiErrorKind::AlreadyRegistered) => {
            println!("{} is already in your holdings.", ticker.yellow());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn run_remove(api: &ApiClient, ticker: &str, skip_confirm: bool) -> eyre::Result<()> {
    if !skip_confirm && !confirm(&format!("Delete {ticker} from your holdings?"))? {
        println!("Aborted.");
        return Ok(());
    }
    match api.delete_etf(ticker).await {
        Ok(()) => println!("{} {}", "Removed".green().bold(), ticker),
        // Removal failures are deliberately terse.
        Err(_) => println!("{}", "Failed to delete ETF.".red()),
    }
    Ok(())
}

async fn run_analytics(api: &ApiClient, ticker: &str, period: &str) -> eyre::Result<()> {
    let a = api.analytics(ticker, period).await?;
    analytics::print(&a, period);
    Ok(())
}

async fn run_correlation(api: &ApiClient, period: &str) -> eyre::Result<()> {
    match api.correlation(period).await {
        Ok(report) => correlation::print(report),
        Err(e) => {
            if let ApiError::Api { kind, detail, .. } = &e {
                if *kind == ApiErrorKind::NotEnoughHoldings {
                    println!("{}", detail.yellow());
                    println!("{}", correlation::ADD_HOLDINGS_HINT);
                    return Ok(());
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

async fn run_dict(api: &ApiClient, query: Option<&str>, category: Option<&str>) -> eyre::Result<()> {
    match (query, category) {
        (Some(q), _) => {
            let results = api.search_terms(q).await?;
            println!(
                "\"{}\" matched {} terms",
                results.query.bold(),
                results.total
            );
            dictionary::print(&results.results);
        }
        (None, Some(c)) => {
            let payload = api.category_terms(c).await?;
            println!("{} ({} terms)", payload.category.bold(), payload.total);
            let terms: Vec<_> = payload.terms.into_values().collect();
            dictionary::print(&terms);
        }
        (None, None) => {
            let all = api.all_terms().await?;
            for (category, terms) in &all.terms {
                println!("\n{}", category.bold().underline());
                let terms: Vec<_> = terms.values().cloned().collect();
                dictionary::print(&terms);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    env_logger::init();

    let cfg: Config = confy::load("etfolio", "config")?;
    let api = ApiClient::new(&cfg.api_base_url)?;

    let matches = cli().get_matches();
    let period = |m: &clap::ArgMatches| -> String {
        m.try_get_one::<String>("period")
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_else(|| cfg.default_period.clone())
    };

    match matches.subcommand() {
        Some(("config", _)) => {
            println!(
                "Your config file is located here: \n{}",
                confy::get_configuration_file_path("etfolio", "config")?.display()
            );
        }
        Some(("holdings", _)) => {
            let holdings = api.holdings().await?;
            if holdings.is_empty() {
                println!("{}", holdings::EMPTY_MESSAGE);
            } else {
                holdings::print(&holdings);
            }
        }
        Some(("add", m)) => {
            let ticker = m.get_one::<String>("TICKER").map(String::as_str).unwrap_or_default();
            let name = m.get_one::<String>("NAME").map(String::as_str).unwrap_or_default();
            run_add(&api, ticker, name).await?;
        }
        Some(("remove", m)) => {
            let ticker = m.get_one::<String>("TICKER").map(String::as_str).unwrap_or_default();
            run_remove(&api, ticker, m.get_flag("yes")).await?;
        }
        Some(("summary", _)) => {
            let summary = api.portfolio_summary().await?;
            println!(
                "As of {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M")
            );
            summary::print(&summary);
        }
        Some(("analytics", m)) => {
            let ticker = m.get_one::<String>("TICKER").map(String::as_str).unwrap_or_default();
            run_analytics(&api, ticker, &period(m)).await?;
        }
        Some(("recommend", m)) => {
            let category = m
                .get_one::<String>("category")
                .map(String::as_str)
                .unwrap_or("all");
            let limit = m
                .get_one::<String>("limit")
                .and_then(|l| l.parse().ok())
                .unwrap_or(5);
            let recs = api.recommendations(category, &period(m), limit).await?;
            recommend::print(&recs);
        }
        Some(("correlation", m)) => {
            run_correlation(&api, &period(m)).await?;
        }
        Some(("dict", m)) => {
            run_dict(
                &api,
                m.get_one::<String>("QUERY").map(String::as_str),
                m.get_one::<String>("category").map(String::as_str),
            )
            .await?;
        }
        Some(("status", _)) => {
            let info = api.db_info().await?;
            println!("database:    {}", info.database_type);
            println!("environment: {}", info.environment);
            println!("status:      {}", info.status);
            println!("connection:  {}", info.connection_url);
        }
        // No subcommand opens the dashboard.
        _ => tui::run_tui(api, &cfg).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_add_with_positional_args() {
        let matches = cli().get_matches_from(vec!["etfolio", "add", "SPY", "SPDR S&P 500"]);
        let (name, m) = matches.subcommand().unwrap();
        assert_eq!(name, "add");
        assert_eq!(m.get_one::<String>("TICKER").unwrap(), "SPY");
    }

    #[test]
    fn cli_remove_accepts_yes_flag() {
        let matches = cli().get_matches_from(vec!["etfolio", "remove", "SPY", "-y"]);
        let (name, m) = matches.subcommand().unwrap();
        assert_eq!(name, "remove");
        assert!(m.get_flag("yes"));
    }

    #[test]
    fn cli_defaults_to_the_dashboard() {
        let matches = cli().get_matches_from(vec!["etfolio"]);
        assert!(matches.subcommand_name().is_none());
    }

    #[test]
    fn default_config_points_at_localhost() {
        let cfg = Config::default();
        assert!(cfg.api_base_url.starts_with("http://127.0.0.1"));
        assert_eq!(cfg.default_period, "1y");
        assert!(cfg.catalog_page_size > 0);
    }
}

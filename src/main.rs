use clap::Parser;

mod app;
mod area;
mod cli;
mod config;
mod geo;
mod notify;
mod report;
mod routing;
mod semantic;
mod storage;
mod web;

use crate::geo::GeoPoint;
use crate::report::Report;

fn default_data_dir() -> String {
    std::env::var("RTRIAGE_BASE_PATH").unwrap_or_else(|_| {
        homedir::my_home()
            .ok()
            .flatten()
            .map(|home| home.join(".rtriage").to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string())
    })
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    let config = config::Config::load_with(&data_dir);
    let storage = storage::BackendLocal::new(&data_dir)?;
    let app_mgr = app::App::new(&config, storage);

    match args.command {
        cli::Command::Daemon {} => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info".into()),
                )
                .init();

            web::start_daemon(app_mgr, config.listen.clone());
            Ok(())
        }

        cli::Command::Search { query } => {
            let outcome = app_mgr.search(&query)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }

        cli::Command::Route { lng, lat, id } => {
            let report = Report {
                id: id.unwrap_or_default(),
                location: GeoPoint::new(lng, lat),
                ..Default::default()
            };

            let (report, decision) = app_mgr.route_report(report)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "report": report,
                    "decision": decision,
                }))?
            );
            Ok(())
        }

        cli::Command::Areas { active } => {
            let areas = app_mgr.areas(active)?;
            println!("{}", serde_json::to_string_pretty(&areas)?);
            Ok(())
        }
    }
}

//! `condo dashboard` and `condo refresh`: the delinquency table.

use anyhow::Result;
use clap::Args;
use condo_core::TrafficLight;

use crate::client::{ApiClient, ConnectionArgs};
use crate::render::{render_delinquency, DelinquencyReport, DelinquencyRow};

/// Arguments shared by `dashboard` and `refresh`.
#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Only show houses with this light (VERDE, AMARILLO, ROJO).
    #[arg(long)]
    pub light: Option<TrafficLight>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

fn filter_rows(rows: Vec<DelinquencyRow>, light: Option<TrafficLight>) -> Vec<DelinquencyRow> {
    match light {
        Some(l) => rows
            .into_iter()
            .filter(|r| r.light.eq_ignore_ascii_case(l.as_str()))
            .collect(),
        None => rows,
    }
}

fn print_report(report: DelinquencyReport, light: Option<TrafficLight>) {
    if report.status != "success" {
        eprintln!("{}", report.message);
    }
    print!("{}", render_delinquency(&filter_rows(report.results, light)));
}

/// Print the persisted snapshot.
pub async fn run_dashboard(args: &DashboardArgs) -> Result<u8> {
    let client = ApiClient::from_args(&args.connection)?;
    client.require_token()?;
    let report: DelinquencyReport = client.get("/admin/semaforo").await?;
    print_report(report, args.light);
    Ok(0)
}

/// Recompute the snapshot, then print it.
pub async fn run_refresh(args: &DashboardArgs) -> Result<u8> {
    let client = ApiClient::from_args(&args.connection)?;
    client.require_token()?;
    let report: DelinquencyReport = client
        .post("/admin/actualizar_semaforo", &serde_json::json!({}))
        .await?;
    tracing::info!(message = %report.message, "delinquency refreshed");
    print_report(report, args.light);
    Ok(0)
}

//! `status`: one refresh, rendered through the three projections.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tabled::Tabled;

use ebloc_core::{
    AccountSummary, Endpoint, MeterReading, PortalConfig, ReceiptsView, RefreshCoordinator,
    Snapshot, account_summary, meter_reading, receipts,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, paint_flag, paint_unknown};

// ── Report ──────────────────────────────────────────────────────────

/// Everything `status` and `watch` print for one snapshot.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub profile: String,
    pub fetched_at: DateTime<Utc>,
    pub account: AccountSummary,
    pub meter: MeterReading,
    pub receipts: ReceiptsView,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<Endpoint>,
}

impl StatusReport {
    pub fn from_snapshot(profile: &str, snapshot: &Snapshot) -> Self {
        Self {
            profile: profile.into(),
            fetched_at: snapshot.fetched_at,
            account: account_summary(snapshot),
            meter: meter_reading(snapshot),
            receipts: receipts(snapshot),
            unavailable: snapshot.failed.clone(),
        }
    }
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ReceiptRow {
    #[tabled(rename = "#")]
    key: String,
    #[tabled(rename = "Receipt")]
    number: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

fn row(field: &'static str, value: &str, color: bool) -> FieldRow {
    FieldRow {
        field,
        value: paint_unknown(value, color),
    }
}

fn detail(report: &StatusReport, color: bool) -> String {
    let a = &report.account;
    let account = vec![
        row("Client code", &a.client_code, color),
        row("Apartment", &a.apartment, color),
        row("Occupants", &a.occupants, color),
        row("Balance due", &a.balance, color),
        row("Payment deadline", &a.payment_deadline, color),
        FieldRow {
            field: "Meters submitted",
            value: paint_flag(&a.meters_submitted, color),
        },
        row("Reading opens", &a.reading_start, color),
        row("Reading closes", &a.reading_end, color),
        row("Oldest debt month", &a.oldest_debt_month, color),
        row("Displayed month", &a.displayed_month, color),
        row("Debt level", &a.debt_level, color),
    ];
    let meter = vec![
        row("Old index", &report.meter.old_index, color),
        row("New index", &report.meter.new_index, color),
    ];

    let mut sections = vec![
        format!("Account\n{}", output::render_table(&account)),
        format!("Meter\n{}", output::render_table(&meter)),
    ];

    if report.receipts.receipts.is_empty() {
        sections.push("Receipts: none".into());
    } else {
        let rows: Vec<ReceiptRow> = report
            .receipts
            .receipts
            .iter()
            .map(|r| ReceiptRow {
                key: r.key.clone(),
                number: r.number.clone(),
                date: r.date.clone(),
                amount: r.amount.clone(),
            })
            .collect();
        sections.push(format!(
            "Receipts ({})\n{}",
            report.receipts.count,
            output::render_table(&rows)
        ));
    }

    sections.push(format!(
        "Updated {}",
        report
            .fetched_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    ));
    sections.join("\n\n")
}

/// Headline values only: client code, old meter index, receipt count.
fn plain(report: &StatusReport) -> String {
    format!(
        "{}\n{}\n{}",
        report.account.state(),
        report.meter.state(),
        report.receipts.state()
    )
}

pub fn render(report: &StatusReport, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    output::render_single(&global.output, report, |r| detail(r, color), plain)
}

/// Tell the user which sections are empty because their request failed.
pub fn warn_unavailable(snapshot: &Snapshot, global: &GlobalOpts) {
    if global.quiet || snapshot.is_complete() {
        return;
    }
    let names: Vec<String> = snapshot.failed.iter().map(ToString::to_string).collect();
    eprintln!("warning: no data from {} (see -v for details)", names.join(", "));
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: PortalConfig, profile: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = RefreshCoordinator::new(config);

    let bar = output::spinner(global, "Refreshing from e-bloc.ro...");
    let result = coordinator.refresh().await;
    bar.finish_and_clear();
    coordinator.shutdown().await;

    let snapshot = result.map_err(|e| CliError::from_core(e, profile))?;
    warn_unavailable(&snapshot, global);

    let report = StatusReport::from_snapshot(profile, &snapshot);
    let out = render(&report, global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebloc_core::{HomeRecord, ReceiptRecord};

    fn snapshot() -> Snapshot {
        let mut snap = Snapshot::empty();
        snap.home.insert(
            "1".into(),
            HomeRecord {
                cod_client: Some("A-17".into()),
                datorie: Some("12345".into()),
                contoare_citite: Some("1".into()),
                ..HomeRecord::default()
            },
        );
        snap.receipts.insert(
            "1".into(),
            ReceiptRecord {
                numar: Some("501".into()),
                data: Some("2024-11-03".into()),
                suma: Some("25000".into()),
            },
        );
        snap.failed.push(Endpoint::MeterIndex);
        snap
    }

    #[test]
    fn table_lists_all_sections() {
        let report = StatusReport::from_snapshot("flat", &snapshot());
        let out = detail(&report, false);
        assert!(out.contains("A-17"));
        assert!(out.contains("123.45 RON"));
        assert!(out.contains("Receipts (1)"));
        assert!(out.contains("250.00 RON"));
        assert!(out.contains(ebloc_core::UNKNOWN));
    }

    #[test]
    fn plain_prints_headline_values() {
        let report = StatusReport::from_snapshot("flat", &snapshot());
        assert_eq!(plain(&report), format!("A-17\n{}\n1", ebloc_core::UNKNOWN));
    }

    #[test]
    fn json_reports_unavailable_endpoints() {
        let report = StatusReport::from_snapshot("flat", &snapshot());
        let value = serde_json::to_value(&report).expect("serializable");
        assert_eq!(value["unavailable"][0], "meter-index");
        assert_eq!(value["account"]["balance"], "123.45 RON");
        assert_eq!(value["receipts"]["count"], 1);
    }
}

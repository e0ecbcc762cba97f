// ── Value projections ──
//
// Pure functions turning a snapshot into display values. Every field
// falls back to the portal's own "unknown" wording rather than being
// left empty, so consumers can render results without null checks.

use serde::Serialize;

use crate::snapshot::Snapshot;

/// Placeholder for any value the portal did not provide.
pub const UNKNOWN: &str = "Necunoscut";

/// Home-info entry describing the apartment.
///
/// The portal keys its rows from `"1"` and always sends an object. A list
/// body is keyed by position from `"0"` (see `parse_records`), so its first
/// row is not this entry and the summary reads as unknown. That shape is
/// not one the portal produces for a single apartment, and guessing an
/// offset would silently show the wrong row.
pub const HOME_ENTRY_KEY: &str = "1";

/// Meter-index entry holding the tracked meter. Same keying as
/// [`HOME_ENTRY_KEY`].
pub const METER_ENTRY_KEY: &str = "2";

const CURRENCY: &str = "RON";
const VOLUME_UNIT: &str = "mc";

// ── Formatting ───────────────────────────────────────────────────────

/// Format an amount in bani as `"<lei>.<bani> RON"`.
pub fn format_money(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{sign}{}.{:02} {CURRENCY}", abs / 100, abs % 100)
}

/// Format a raw amount field; anything that is not an integer is unknown.
pub fn format_money_field(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .map_or_else(|| UNKNOWN.to_owned(), format_money)
}

/// Convert a raw reading (thousandths of a cubic metre) to whole cubic
/// metres, rounding down.
pub fn parse_meter_index(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    Some((value / 1000.0).floor() as i64)
}

/// Format a raw reading as `"<n> mc"`, or [`UNKNOWN`].
pub fn format_meter_index(raw: Option<&str>) -> String {
    raw.and_then(parse_meter_index)
        .map_or_else(|| UNKNOWN.to_owned(), |n| format!("{n} {VOLUME_UNIT}"))
}

fn or_unknown(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| UNKNOWN.to_owned())
}

// ── Account summary ──────────────────────────────────────────────────

/// Apartment account overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub client_code: String,
    pub apartment: String,
    pub occupants: String,
    pub balance: String,
    pub payment_deadline: String,
    pub meters_submitted: String,
    pub reading_start: String,
    pub reading_end: String,
    pub oldest_debt_month: String,
    pub displayed_month: String,
    pub debt_level: String,
}

impl AccountSummary {
    /// Headline value: the client code.
    pub fn state(&self) -> &str {
        &self.client_code
    }
}

pub fn account_summary(snapshot: &Snapshot) -> AccountSummary {
    let home = snapshot.home.get(HOME_ENTRY_KEY).cloned().unwrap_or_default();

    let balance = match home.datorie.as_deref() {
        Some(UNKNOWN) | None => UNKNOWN.to_owned(),
        raw => format_money_field(raw),
    };
    let meters_submitted = if home.contoare_citite.as_deref() == Some("1") {
        "Da"
    } else {
        "Nu"
    };

    AccountSummary {
        client_code: or_unknown(home.cod_client.as_ref()),
        apartment: or_unknown(home.ap.as_ref()),
        occupants: or_unknown(home.nr_pers_afisat.as_ref()),
        balance,
        payment_deadline: or_unknown(home.ultima_zi_plata.as_ref()),
        meters_submitted: meters_submitted.to_owned(),
        reading_start: or_unknown(home.citire_contoare_start.as_ref()),
        reading_end: or_unknown(home.citire_contoare_end.as_ref()),
        oldest_debt_month: or_unknown(home.luna_veche.as_ref()),
        displayed_month: or_unknown(home.luna_afisata.as_ref()),
        debt_level: or_unknown(home.nivel_restanta.as_ref()),
    }
}

// ── Meter reading ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeterReading {
    pub old_index: String,
    pub new_index: String,
}

impl MeterReading {
    /// Headline value: the previous reading.
    pub fn state(&self) -> &str {
        &self.old_index
    }
}

pub fn meter_reading(snapshot: &Snapshot) -> MeterReading {
    let entry = snapshot.index.get(METER_ENTRY_KEY);
    MeterReading {
        old_index: format_meter_index(entry.and_then(|m| m.index_vechi.as_deref())),
        new_index: format_meter_index(entry.and_then(|m| m.index_nou.as_deref())),
    }
}

// ── Receipts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    /// Source index of the receipt in the portal response.
    pub key: String,
    pub number: String,
    pub date: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptsView {
    pub count: usize,
    pub receipts: Vec<ReceiptLine>,
}

impl ReceiptsView {
    /// Headline value: how many receipts the portal lists.
    pub fn state(&self) -> usize {
        self.count
    }
}

/// Receipts in response order. A receipt without an amount counts as a
/// zero payment.
pub fn receipts(snapshot: &Snapshot) -> ReceiptsView {
    let receipts: Vec<ReceiptLine> = snapshot
        .receipts
        .iter()
        .map(|(key, receipt)| ReceiptLine {
            key: key.clone(),
            number: or_unknown(receipt.numar.as_ref()),
            date: or_unknown(receipt.data.as_ref()),
            amount: format_money_field(Some(receipt.suma.as_deref().unwrap_or("0"))),
        })
        .collect();
    ReceiptsView {
        count: receipts.len(),
        receipts,
    }
}

//! Response types as the client reads them, and their plain-text tables.

use std::fmt::Write;

use serde::Deserialize;

/// `POST /login` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub rol: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    pub nombre: String,
    pub email: String,
    pub celular: String,
}

/// One delinquency row, as listed by `/admin/semaforo` and embedded in
/// statements.
#[derive(Debug, Deserialize)]
pub struct DelinquencyRow {
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    pub nombre_condomino: String,
    pub email: String,
    pub celular: String,
    #[serde(rename = "SALDO")]
    pub balance: f64,
    #[serde(rename = "ESTADO_SEMAFORO")]
    pub light: String,
    #[serde(rename = "DIAS_ATRASO")]
    pub days_overdue: i64,
    #[serde(rename = "CUOTAS_PENDIENTES")]
    pub pending_fees: u32,
}

#[derive(Debug, Deserialize)]
pub struct MovementRow {
    #[serde(rename = "ID_MOVIMIENTO")]
    pub id: String,
    #[serde(rename = "MES_PERIODO")]
    pub period: Option<String>,
    #[serde(rename = "TIPO_MOVIMIENTO")]
    pub kind: String,
    #[serde(rename = "CONCEPTO")]
    pub concept: Option<String>,
    #[serde(rename = "MONTO")]
    pub amount: f64,
    #[serde(rename = "FECHA_VENCIMIENTO")]
    pub due_date: Option<String>,
    #[serde(rename = "FECHA_REGISTRO")]
    pub recorded_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Statement {
    pub condomino: Contact,
    pub semaforo_actual: DelinquencyRow,
    pub movimientos: Vec<MovementRow>,
    pub saldo_pendiente: f64,
}

#[derive(Debug, Deserialize)]
pub struct DelinquencyReport {
    pub status: String,
    pub message: String,
    pub results: Vec<DelinquencyRow>,
}

/// Left-aligned columns sized to their widest cell.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<w$}", c.as_ref(), w = *w))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Only the date part of an RFC 3339 timestamp.
fn day(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(|v| v.split('T').next().unwrap_or(v).to_string())
        .unwrap_or_default()
}

pub fn render_delinquency(rows: &[DelinquencyRow]) -> String {
    if rows.is_empty() {
        return "No houses in the delinquency snapshot.\n".to_string();
    }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.house.to_string(),
                r.nombre_condomino.clone(),
                r.light.clone(),
                money(r.balance),
                r.days_overdue.to_string(),
                r.pending_fees.to_string(),
                r.celular.clone(),
                r.email.clone(),
            ]
        })
        .collect();
    table(
        &["CASA", "NOMBRE", "SEMAFORO", "SALDO", "DIAS", "CUOTAS", "CELULAR", "EMAIL"],
        &cells,
    )
}

pub fn render_statement(statement: &Statement) -> String {
    let c = &statement.condomino;
    let s = &statement.semaforo_actual;
    let mut out = String::new();
    let _ = writeln!(out, "Casa {}: {}", c.house, c.nombre);
    let _ = writeln!(out, "Email: {}  Celular: {}", c.email, c.celular);
    let _ = writeln!(
        out,
        "Semaforo: {}  Dias de atraso: {}  Cuotas pendientes: {}",
        s.light, s.days_overdue, s.pending_fees
    );
    let _ = writeln!(out, "Saldo pendiente: {}", money(statement.saldo_pendiente));
    out.push('\n');

    if statement.movimientos.is_empty() {
        out.push_str("No movements.\n");
        return out;
    }
    let rows: Vec<Vec<String>> = statement
        .movimientos
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.period.clone().unwrap_or_default(),
                m.kind.clone(),
                m.concept.clone().unwrap_or_default(),
                money(m.amount),
                day(&m.due_date),
                day(&m.recorded_at),
            ]
        })
        .collect();
    out.push_str(&table(
        &["ID", "PERIODO", "TIPO", "CONCEPTO", "MONTO", "VENCE", "REGISTRO"],
        &rows,
    ));
    out
}

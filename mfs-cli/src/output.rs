use anyhow::{Context, Result};
use clap::ValueEnum;
use mfs_core::TransactionRecord;
use mfs_ingest::ParsedStatement;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One object per file: records, headers and diagnostics
    Json,
    /// Canonical columns, records of every file concatenated
    Csv,
    /// Aligned plain-text table for a terminal
    Table,
}

/// A successfully parsed file, as rendered
pub struct FileReport {
    pub file: String,
    pub statement: ParsedStatement,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    statement: &'a ParsedStatement,
}

const CSV_COLUMNS: [&str; 15] = [
    "id",
    "sourceFileId",
    "fileName",
    "rowIndex",
    "transactionId",
    "timestamp",
    "transactionType",
    "statementAccount",
    "counterpartyAccount",
    "channel",
    "reference",
    "direction",
    "amount",
    "balanceAfter",
    "status",
];

pub fn render(reports: &[FileReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(reports),
        OutputFormat::Csv => render_csv(reports),
        OutputFormat::Table => Ok(render_table(reports)),
    }
}

fn render_json(reports: &[FileReport]) -> Result<String> {
    let out: Vec<JsonReport<'_>> = reports
        .iter()
        .map(|r| JsonReport {
            file: &r.file,
            statement: &r.statement,
        })
        .collect();
    let mut s = serde_json::to_string_pretty(&out).context("serialize json")?;
    s.push('\n');
    Ok(s)
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_row(r: &TransactionRecord) -> [String; 15] {
    [
        r.id.clone(),
        r.source_file_id.clone(),
        r.file_name.clone(),
        r.row_index.to_string(),
        r.transaction_id.clone(),
        r.timestamp.as_ref().map(|t| t.to_string()).unwrap_or_default(),
        opt(&r.transaction_type),
        opt(&r.statement_account),
        opt(&r.counterparty_account),
        opt(&r.channel),
        opt(&r.reference),
        r.direction.as_ref().map(|d| d.to_string()).unwrap_or_default(),
        num(r.amount),
        num(r.balance_after),
        opt(&r.status),
    ]
}

fn render_csv(reports: &[FileReport]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS).context("write csv header")?;
    for record in reports.iter().flat_map(|r| &r.statement.records) {
        writer.write_record(csv_row(record)).context("write csv row")?;
    }
    let bytes = writer.into_inner().context("flush csv")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

fn render_table(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let st = &report.statement;
        let d = &st.diagnostics;
        out.push_str(&format!(
            "== {} [{}] header row {} | {} records, {} excluded\n",
            report.file,
            st.format,
            d.header_row + 1,
            st.records.len(),
            d.excluded_rows
        ));
        let debits = st.records.iter().filter(|r| r.is_debit()).count();
        let credits = st.records.iter().filter(|r| r.is_credit()).count();
        let net: f64 = st.records.iter().filter_map(|r| r.signed_amount()).sum();
        out.push_str(&format!("   {debits} debit, {credits} credit, net {net:.2}\n"));
        for w in &d.warnings {
            out.push_str(&format!("   ! {w}\n"));
        }

        let header = ["ROW", "TXN ID", "TIMESTAMP", "DIR", "AMOUNT", "BALANCE", "TYPE", "STATUS"];
        let rows: Vec<[String; 8]> = st
            .records
            .iter()
            .map(|r| {
                [
                    r.row_index.to_string(),
                    r.transaction_id.clone(),
                    r.timestamp.as_ref().map(|t| t.to_string()).unwrap_or_default(),
                    r.direction.as_ref().map(|d| d.to_string()).unwrap_or_default(),
                    r.amount.map(|a| format!("{a:.2}")).unwrap_or_default(),
                    r.balance_after.map(|b| format!("{b:.2}")).unwrap_or_default(),
                    opt(&r.transaction_type),
                    opt(&r.status),
                ]
            })
            .collect();

        let mut widths = header.map(|h| h.chars().count());
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: Vec<&str>| {
            let padded: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect();
            format!("{}\n", padded.join("  ").trim_end())
        };
        out.push_str(&line(header.to_vec()));
        for row in &rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfs_core::{Direction, Timestamp};
    use mfs_ingest::ParseDiagnostics;

    fn report() -> FileReport {
        let record = TransactionRecord {
            id: "f-2-abc".to_string(),
            source_file_id: "f".to_string(),
            file_name: "s.csv".to_string(),
            row_index: 2,
            transaction_id: "TXN123".to_string(),
            transaction_type: Some("Send Money".to_string()),
            statement_account: None,
            counterparty_account: None,
            channel: None,
            reference: Some("a,b".to_string()),
            status: Some("Completed".to_string()),
            timestamp: Some(Timestamp::Raw("yesterday".to_string())),
            direction: Some(Direction::Debit),
            amount: Some(500.0),
            balance_after: None,
        };
        FileReport {
            file: "s.csv".to_string(),
            statement: ParsedStatement {
                records: vec![record],
                headers: vec!["TXN ID".to_string()],
                identified_headers: None,
                diagnostics: ParseDiagnostics {
                    data_rows: 1,
                    ..ParseDiagnostics::default()
                },
                format: "mfs-statement".to_string(),
            },
        }
    }

    #[test]
    fn test_csv_has_fixed_columns() {
        let out = render(&[report()], OutputFormat::Csv).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(CSV_COLUMNS.join(",").as_str()));
        let row = lines.next().unwrap();
        assert!(row.starts_with("f-2-abc,f,s.csv,2,TXN123,yesterday,Send Money,,,,\"a,b\",DEBIT,500,,Completed"), "{row}");
    }

    #[test]
    fn test_json_flattens_statement() {
        let out = render(&[report()], OutputFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v[0]["file"], "s.csv");
        assert_eq!(v[0]["format"], "mfs-statement");
        assert_eq!(v[0]["records"][0]["transactionId"], "TXN123");
        assert_eq!(v[0]["diagnostics"]["dataRows"], 1);
    }

    #[test]
    fn test_table_aligns_columns() {
        let out = render(&[report()], OutputFormat::Table).unwrap();
        assert!(out.starts_with("== s.csv [mfs-statement] header row 1 | 1 records, 0 excluded"));
        assert!(out.contains("TXN123"));
        assert!(out.contains("500.00"));
        assert!(out.contains("1 debit, 0 credit, net -500.00"), "{out}");
    }
}

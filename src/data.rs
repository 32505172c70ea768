//! Transaction records and CSV loading using Polars

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RfmError;

/// A single sale attributed (or not) to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub occurred_on: NaiveDate,
    /// Non-negative sale value
    pub amount: f64,
    pub customer_id: Option<String>,
}

impl TransactionRecord {
    pub fn new(
        transaction_id: impl Into<String>,
        occurred_on: NaiveDate,
        amount: f64,
        customer_id: Option<&str>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            occurred_on,
            amount,
            customer_id: customer_id.map(str::to_string),
        }
    }
}

/// Unparsed row as delivered by the loader: every cell is text.
#[derive(Debug, Clone, Default)]
pub struct RawTransaction {
    pub id: String,
    pub date: String,
    pub amount: String,
    pub customer_identifier: Option<String>,
}

impl RawTransaction {
    /// Parse into a typed record, rejecting bad dates and negative or non-numeric amounts.
    pub fn parse(&self) -> crate::Result<TransactionRecord> {
        let occurred_on = parse_date(&self.date).ok_or_else(|| RfmError::InvalidDate {
            transaction_id: self.id.clone(),
            value: self.date.clone(),
        })?;

        let amount = self
            .amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .ok_or_else(|| RfmError::InvalidAmount {
                transaction_id: self.id.clone(),
                value: self.amount.clone(),
            })?;

        let customer_id = self
            .customer_identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(TransactionRecord {
            transaction_id: self.id.trim().to_string(),
            occurred_on,
            amount,
            customer_id,
        })
    }
}

/// Parse a calendar date, dropping any time-of-day component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Load a transaction CSV and parse every row.
///
/// # Arguments
/// * `file_path` - CSV with `id`, `date`, `amount` and either `customer_identifier`
///   or the `cpf`/`cnpj` pair
///
/// # Returns
/// * Parsed records in file order; the first bad row aborts the load
pub fn load_transactions(file_path: impl AsRef<Path>) -> crate::Result<Vec<TransactionRecord>> {
    let rows = read_raw_transactions(file_path.as_ref())?;
    debug!(rows = rows.len(), "read transaction rows");
    rows.iter().map(RawTransaction::parse).collect()
}

/// Read the CSV with every column as text so identifiers keep leading zeros.
fn read_raw_transactions(file_path: &Path) -> crate::Result<Vec<RawTransaction>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;

    let ids = required_text_column(&df, "id")?;
    let dates = required_text_column(&df, "date")?;
    let amounts = required_text_column(&df, "amount")?;
    let identifiers = customer_identifiers(&df)?;

    let rows = (0..df.height())
        .map(|i| RawTransaction {
            id: ids[i].clone().unwrap_or_default(),
            date: dates[i].clone().unwrap_or_default(),
            amount: amounts[i].clone().unwrap_or_default(),
            customer_identifier: identifiers[i].clone(),
        })
        .collect();

    Ok(rows)
}

/// Resolve the customer identifier column, coalescing `cpf` and `cnpj` when
/// no unified `customer_identifier` column exists.
fn customer_identifiers(df: &DataFrame) -> crate::Result<Vec<Option<String>>> {
    if let Some(unified) = text_column(df, "customer_identifier")? {
        return Ok(unified);
    }

    let cpf = text_column(df, "cpf")?;
    let cnpj = text_column(df, "cnpj")?;
    match (cpf, cnpj) {
        (None, None) => Err(RfmError::MissingColumn("customer_identifier".to_string())),
        (Some(only), None) | (None, Some(only)) => Ok(only),
        (Some(cpf), Some(cnpj)) => Ok(cpf
            .into_iter()
            .zip(cnpj)
            .map(|(person, company)| non_blank(person).or_else(|| non_blank(company)))
            .collect()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required_text_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    text_column(df, name)?.ok_or_else(|| RfmError::MissingColumn(name.to_string()))
}

fn text_column(df: &DataFrame, name: &str) -> crate::Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn raw(id: &str, date: &str, amount: &str, customer: Option<&str>) -> RawTransaction {
        RawTransaction {
            id: id.to_string(),
            date: date.to_string(),
            amount: amount.to_string(),
            customer_identifier: customer.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15"), Some(expected));
        assert_eq!(parse_date("2024-03-15T23:59:10"), Some(expected));
        assert_eq!(parse_date("2024-03-15 08:00:00.250"), Some(expected));
        assert_eq!(parse_date("2024-03-15T10:00:00+02:00"), Some(expected));
        assert_eq!(parse_date("15/03/2024"), None);
    }

    #[test]
    fn test_parse_raw_transaction() {
        let record = raw("7", "2024-01-02", " 120.50 ", Some(" 123.456.789-00 "))
            .parse()
            .unwrap();

        assert_eq!(record.transaction_id, "7");
        assert_eq!(record.amount, 120.5);
        assert_eq!(record.customer_id.as_deref(), Some("123.456.789-00"));
    }

    #[test]
    fn test_blank_identifier_is_null() {
        let record = raw("1", "2024-01-02", "10", Some("   ")).parse().unwrap();
        assert_eq!(record.customer_id, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_date = raw("1", "yesterday", "10", Some("a")).parse();
        assert!(matches!(bad_date, Err(RfmError::InvalidDate { .. })));

        let negative = raw("2", "2024-01-02", "-5", Some("a")).parse();
        assert!(matches!(negative, Err(RfmError::InvalidAmount { .. })));

        let text = raw("3", "2024-01-02", "ten", Some("a")).parse();
        assert!(matches!(text, Err(RfmError::InvalidAmount { .. })));
    }

    #[test]
    fn test_load_transactions() {
        let file = create_test_csv(
            "id,date,amount,customer_identifier\n\
             1,2024-01-01,100.0,C042\n\
             2,2024-01-05,50.5,C042\n\
             3,2024-01-10,20.0,\n\
             4,2024-01-11T09:30:00,75.0,C077\n",
        );

        let records = load_transactions(file.path()).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].customer_id.as_deref(), Some("C042"));
        assert_eq!(records[2].customer_id, None);
        assert_eq!(
            records[3].occurred_on,
            NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()
        );
    }

    #[test]
    fn test_load_coalesces_cpf_and_cnpj() {
        let file = create_test_csv(
            "id,date,amount,cpf,cnpj\n\
             1,2024-01-01,10,111,\n\
             2,2024-01-02,20,,22.333/0001-44\n\
             3,2024-01-03,30,,\n",
        );

        let records = load_transactions(file.path()).unwrap();

        assert_eq!(records[0].customer_id.as_deref(), Some("111"));
        assert_eq!(records[1].customer_id.as_deref(), Some("22.333/0001-44"));
        assert_eq!(records[2].customer_id, None);
    }

    #[test]
    fn test_load_missing_column() {
        let file = create_test_csv("id,date,value,customer_identifier\n1,2024-01-01,10,a\n");

        let result = load_transactions(file.path());
        assert!(matches!(result, Err(RfmError::MissingColumn(name)) if name == "amount"));
    }
}

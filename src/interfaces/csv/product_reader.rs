use crate::domain::product::Product;
use crate::error::{Result, ServiceError};
use serde::Deserialize;
use std::io::Read;

/// One catalogue row as written, before any field is interpreted.
#[derive(Debug, Deserialize)]
struct CatalogueRow {
    id: String,
    name: String,
    stock_quantity: String,
    min_stock_level: String,
    /// Missing or blank means active.
    #[serde(default)]
    is_active: Option<String>,
}

impl CatalogueRow {
    fn into_product(self, line: u64) -> Result<Product> {
        if self.id.is_empty() {
            return Err(row_error(line, "id", "must not be empty"));
        }
        if self.name.is_empty() {
            return Err(row_error(line, "name", "must not be empty"));
        }
        Ok(Product {
            stock_quantity: units(line, "stock_quantity", &self.stock_quantity)?,
            min_stock_level: units(line, "min_stock_level", &self.min_stock_level)?,
            is_active: active_flag(line, self.is_active.as_deref())?,
            id: self.id.into(),
            name: self.name,
        })
    }
}

fn row_error(line: u64, field: &str, problem: impl std::fmt::Display) -> ServiceError {
    ServiceError::validation(format!("line {line}: {field} {problem}"))
}

fn units(line: u64, field: &str, raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| row_error(line, field, format!("must be a whole number of units, got {raw:?}")))
}

fn active_flag(line: u64, raw: Option<&str>) -> Result<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("true") | Some("1") | Some("yes") => Ok(true),
        Some("false") | Some("0") | Some("no") => Ok(false),
        Some(other) => Err(row_error(
            line,
            "is_active",
            format!("must be true or false, got {other:?}"),
        )),
    }
}

/// Reads catalogue products from a CSV source with the header
/// `id,name,stock_quantity,min_stock_level,is_active`.
///
/// Each row is checked on its own; a bad row yields an error naming its line
/// and field without ending the stream.
pub struct ProductReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ProductReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn products(mut self) -> impl Iterator<Item = Result<Product>> {
        let headers = self.reader.headers().cloned();
        self.reader.into_records().map(move |record| -> Result<Product> {
            let headers = headers
                .as_ref()
                .map_err(|e| ServiceError::validation(format!("unreadable catalogue header: {e}")))?;
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let row: CatalogueRow = record.deserialize(Some(headers))?;
            row.into_product(line)
        })
    }
}

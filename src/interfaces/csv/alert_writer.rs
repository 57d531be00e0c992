use crate::domain::alert::RestockAlert;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AlertRow<'a> {
    id: String,
    product_id: &'a str,
    product_name: &'a str,
    current_stock: u32,
    min_stock_level: u32,
    status: &'static str,
    created_at: String,
    acknowledged_by: Option<&'a str>,
    completed_by: Option<&'a str>,
    restocked_quantity: Option<u32>,
}

impl<'a> From<&'a RestockAlert> for AlertRow<'a> {
    fn from(alert: &'a RestockAlert) -> Self {
        Self {
            id: alert.id.to_string(),
            product_id: alert.product_id.as_str(),
            product_name: &alert.product_name,
            current_stock: alert.current_stock_at_creation,
            min_stock_level: alert.min_stock_level,
            status: alert.status.as_str(),
            created_at: alert.created_at.to_rfc3339(),
            acknowledged_by: alert.acknowledged_by.as_ref().map(|a| a.as_str()),
            completed_by: alert.completed_by.as_ref().map(|a| a.as_str()),
            restocked_quantity: alert.restocked_quantity,
        }
    }
}

/// Writes restock alerts as CSV, one row per alert.
pub struct AlertWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AlertWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_alerts<'a>(
        &mut self,
        alerts: impl IntoIterator<Item = &'a RestockAlert>,
    ) -> Result<()> {
        for alert in alerts {
            self.writer.serialize(AlertRow::from(alert))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

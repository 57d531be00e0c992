pub mod alert_writer;
pub mod product_reader;

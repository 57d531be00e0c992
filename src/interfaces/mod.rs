//! Boundaries to the outside world: gateway callbacks, alert actions and
//! CSV import/export.

pub mod alert_action;
pub mod callback;
pub mod csv;
pub mod webhook;

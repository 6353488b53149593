//! Domain records exchanged between the handlers, services and the log store.

pub mod audit_log;
pub mod backup;
pub mod change_event;
pub mod report;
pub mod user;

//! API middleware. Only the audit logger runs today.

pub mod audit;

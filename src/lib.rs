pub mod api;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod humanize;
pub mod observability;
pub mod records;
pub mod retry;

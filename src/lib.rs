//! devwatch: a dashboard for a fleet of monitored devices.
//!
//! Polls the monitoring server's REST API and presents devices, their
//! resource usage and power events as a server-rendered web dashboard
//! (`devwatch serve`) or as terminal tables and reports.

pub mod api;
pub mod cli;
pub mod config;
pub mod format;
pub mod logging;
pub mod model;
pub mod pages;
pub mod poll;
pub mod report;
pub mod view;
pub mod web;

/*!
# BRZ Delivery Report

A small reporting service for campaign delivery data, built in Rust.

## Overview

Delivery rows (site, zone, date, impressions, clicks, viewable impressions)
are read from a spreadsheet export. A report URL carries two short tokens,
`site` and `veiculo` (channel). Each token is the truncated HMAC-SHA256 of a
plaintext identity under a server-side secret, so links can be handed out
without any user accounts or stored credentials: the server recomputes the
tokens of every site and channel present in the current data and looks for
the one that matches.

A third identity, the agency sentinel from the configuration, unlocks the
full unscoped report when its token is passed as `site`.

## Request flow

1. Load a fresh snapshot of the delivery and campaign sheets
2. Resolve the `site` and `veiculo` tokens (or the agency token)
3. Deny unless both tokens resolve or the agency token was given
4. Filter rows to the scope and date range
5. Aggregate metrics, the daily impressions series and the summary table

## Modules

- **token**: Token computation and validation
- **config**: Secrets file and environment overrides
- **record**: Typed delivery and campaign rows
- **source**: Sheet sources and dataset snapshots
- **access**: Authorization decisions
- **report**: Metrics, daily series and summary table
- **downloader**: Summary table export (CSV, XLSX)
- **app**: HTTP routes (feature `web`)

## REST API Endpoints

- `/api/report?site=&veiculo=&start=&end=` - Report as JSON
- `/api/report.csv`, `/api/report.xlsx` - Summary table download
- `/health` - Liveness check
*/

pub mod access;
pub mod config;
pub mod downloader;
pub mod error;
pub mod record;
pub mod report;
pub mod source;
pub mod token;

#[cfg(feature = "web")]
pub mod app;

pub use access::{AccessDecision, authorize};
pub use config::Config;
pub use error::{ReportError, Result};
pub use report::{Report, build_report};
pub use source::{CsvDirSource, Dataset, SheetSource};
pub use token::{TokenValidator, compute_token, validate_token};

//! Filter previewer
//!
//! Loads one image, renders it through every filter of the built-in catalog
//! and lets the user pick, download or forget the result.
//!
//! # Architecture
//! - `image_io`: decoding uploads and encoding PNG output
//! - `store`: the persisted last-upload slot
//! - `gallery`: one filtered preview per catalog entry
//! - `controller`: the session state machine and its error policy
//! - `cli`: command line and interactive session front ends
//! - `config`: TOML configuration in the platform config directory

#[macro_use]
extern crate derivative;

pub mod cli;
pub mod config;
pub mod controller;
pub mod gallery;
pub mod image_io;
pub mod store;

/// Initializes the logger.
///
/// Sets up a custom logger format with timestamp, log level, file name, line number,
/// and log message. Uses local time format for timestamps.
pub fn init_logger() {
    use std::io::Write;

    env_logger::builder()
        .filter_module("sqlx", log::LevelFilter::Warn)
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}

#![allow(dead_code)]

mod cli;
mod application;
mod domain;
mod data;
mod grammar;
mod infra;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::domain::error::{exit_code_for, exit_status_byte};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("luinet=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::from(exit_status_byte(exit_code_for(&err)))
        }
    }
}

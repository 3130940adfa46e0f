#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod core;
mod prelude;
mod quantity;
mod scenario;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, plan, simulate},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Plan(args) => plan(&args)?,
        Command::Simulate(args) => simulate(&args)?,
    }

    info!("done!");
    Ok(())
}

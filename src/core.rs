pub mod action;
pub mod battery;
pub mod optimizer;
pub mod schedule;
pub mod segment;
pub mod simulator;
pub mod trace;

#[cfg(test)]
pub mod fixtures;

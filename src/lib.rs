pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod grid;
pub mod output;
pub mod state;

#[cfg(test)]
mod tests;

//! Configuration loading for the upload queue and its admission filter

pub mod filter_config;

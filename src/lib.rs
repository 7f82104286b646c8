pub mod analyzer;
pub mod apify;
pub mod commands;
pub mod config;
pub mod datetime_utils;
pub mod error_utils;
pub mod filename_utils;
pub mod normalize;
pub mod output;
pub mod runner;
pub mod storage;

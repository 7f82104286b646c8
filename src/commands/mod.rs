pub mod analyze;
pub mod scrape;

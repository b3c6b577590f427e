pub mod admin;
pub mod api;
pub mod app_config;
pub mod book;
pub mod catalog_data_source;
pub mod detail;
pub mod notifications;
pub mod search;
pub mod summary;
pub mod telemetry;

#[cfg(test)]
mod test_support;

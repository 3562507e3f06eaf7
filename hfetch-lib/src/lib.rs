pub mod auth;
pub mod builds;
pub mod checksum;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod release_version;
pub mod service;

#[cfg(test)]
pub mod test_helpers;

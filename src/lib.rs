// Library for tests to access modules

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod monitor;
pub mod sampler;
pub mod series;
pub mod speedtest_repo;
pub mod sysinfo_repo;
pub mod version;

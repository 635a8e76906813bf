//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::dataset::{CsvFileSource, DatasetStore};
use crate::query::QueryEngine;
use crate::query::filter::GroupPolicy;

pub const DEFAULT_DATA_FILE: &str = "data/Gesamtdatensatz.csv";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Where the observation CSV lives.
#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// CSV file with the pedestrian counts
    #[arg(long, env = "PEDESTRIAN_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,
}

impl DataArgs {
    /// Loads the dataset; a missing or broken file yields an empty store.
    pub fn load_store(&self) -> DatasetStore {
        DatasetStore::load(&CsvFileSource::new(&self.data_file))
    }
}

/// Settings for the HTTP server.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Address to listen on
    #[arg(long, env = "PEDESTRIAN_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,

    /// Reject unknown `group` values instead of treating them as "both"
    #[arg(long, env = "PEDESTRIAN_STRICT_GROUP", default_value_t = false)]
    pub strict_group: bool,
}

impl ServeArgs {
    pub fn group_policy(&self) -> GroupPolicy {
        if self.strict_group {
            GroupPolicy::Strict
        } else {
            GroupPolicy::Lenient
        }
    }

    pub fn build_engine(&self) -> QueryEngine {
        QueryEngine::new(self.data.load_store().handle()).with_group_policy(self.group_policy())
    }
}

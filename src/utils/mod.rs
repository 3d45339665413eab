pub mod config;
pub mod homsearch_toml;
pub mod logger;

pub use config::*;
pub use homsearch_toml::{
    HomsearchToml, apply_file_to_opts, load_homsearch_toml, parse_homsearch_toml,
};
pub use logger::setup_logging;

//! Configuration and settings for claude-stats.

mod settings;

pub use settings::{
    default_data_dir,
    parse_date_arg,
    resolve_data_dirs,
    CostMode,
    CONFIG_DIR_ENV,
    DEFAULT_REFRESH_INTERVAL,
    DEFAULT_TOKEN_LIMIT,
};

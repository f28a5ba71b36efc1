mod load;
mod profile;
pub mod shared;

pub use load::{Config, LoadConfigError, load_config, load_config_from};
pub use profile::Profile;

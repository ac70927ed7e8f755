//! Ambient helpers shared by the service and server crates.

pub mod types;
pub mod env;

pub mod utils {
    pub mod logging;
}

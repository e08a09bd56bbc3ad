pub mod config_manager;
pub mod contract;
pub mod error;
pub mod flow;
pub mod interaction;
pub mod logging;
pub mod traits;
pub mod types;

pub use config_manager::*;
pub use contract::*;
pub use error::*;
pub use flow::*;
pub use interaction::*;
pub use logging::init_tracing;
pub use traits::*;
pub use types::*;

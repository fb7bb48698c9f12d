pub mod config;
pub mod models;
pub mod paths;
pub mod protocol;
pub mod traits;

pub use config::*;
pub use models::*;
pub use paths::*;
pub use protocol::*;
pub use traits::*;

pub mod batch;
pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod signal;

pub use batch::*;
pub use error::*;
pub use metrics::*;
pub use signal::*;

//! meansq: a TCP service that keeps the set of distinct integers submitted by
//! its clients and answers every submission with the mean of squares of that
//! set, dumping the set to binary snapshot files on a fixed schedule.

pub mod aggregate;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod snapshot;
pub mod stream;
pub mod transport;

pub use crate::aggregate::Aggregate;
pub use crate::error::Error;
pub use crate::shutdown::StopSignal;
pub use crate::transport::Transport;

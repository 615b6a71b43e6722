pub mod dispatch;
pub mod echo_engine;
pub mod port;
pub mod stats;

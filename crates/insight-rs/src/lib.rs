//! Insight SDK.
//!
//! One dependency for embedding the workflow engine: the config model,
//! protocol types, engine and HTTP server are re-exported under short names.

pub use insight_rs_config as config;
pub use insight_rs_core as core;
pub use insight_rs_protocol as protocol;
pub use insight_rs_server as server;

/// Install `env_logger` honouring `RUST_LOG`, when built with `logging`.
///
/// Without the feature this does nothing, so demos can call it unconditionally.
/// A second call is ignored.
#[inline]
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::Builder::from_default_env()
            .format_timestamp_millis()
            .try_init();
    }
}

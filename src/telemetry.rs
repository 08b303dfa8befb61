//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,generation=debug,grading=debug,tower_http=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets used across the crate: `leetgen`, `generation`, `grading`, `storage`, `batch`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,leetgen=debug,generation=debug,grading=debug,storage=info,batch=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The batch binary prints its reply on stdout, so logs always go to stderr.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            builder.json().with_writer(std::io::stderr).init();
        }
        _ => {
            builder.with_writer(std::io::stderr).init();
        }
    }
}

//! Tracing subscriber setup shared by the binaries

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

pub const DEFAULT_FILTER: &str = "pricer=info,tower_http=info,warn";
pub const VERBOSE_FILTER: &str = "pricer=debug,tower_http=debug,warn";

/// Install the global subscriber. `RUST_LOG` wins over both built-in filters.
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }));

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

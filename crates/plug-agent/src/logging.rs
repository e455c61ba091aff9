use infrastructure::config::log_level_directive;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const FALLBACK_DIRECTIVE: &str = "info";

/// Filter directive for a configured level name; unknown names fall back to `info`.
/// The second value is false when the fallback was used.
pub fn directive_for(log_level: &str) -> (&'static str, bool) {
    match log_level_directive(log_level) {
        Some(directive) => (directive, true),
        None => (FALLBACK_DIRECTIVE, false),
    }
}

/// `RUST_LOG` wins over the configured level when set
pub fn build_filter(rust_log: Option<&str>, log_level: &str) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(directive_for(log_level).0),
    }
}

/// Install the global subscriber. Returns false when `log_level` was not recognised.
pub fn init(log_level: &str) -> bool {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::registry()
        .with(build_filter(rust_log.as_deref(), log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    directive_for(log_level).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_levels() {
        assert_eq!(directive_for("VERBOSE"), ("trace", true));
        assert_eq!(directive_for("debug"), ("debug", true));
        assert_eq!(directive_for("LOG"), ("info", true));
        assert_eq!(directive_for("FATAL"), ("error", true));
    }

    #[test]
    fn test_unknown_level_falls_back() {
        assert_eq!(directive_for("LOUD"), (FALLBACK_DIRECTIVE, false));
        assert_eq!(directive_for(""), (FALLBACK_DIRECTIVE, false));
    }

    #[test]
    fn test_rust_log_overrides_config() {
        let filter = build_filter(Some("application=trace"), "ERROR");
        assert_eq!(filter.to_string(), "application=trace");

        let filter = build_filter(None, "WARN");
        assert_eq!(filter.to_string(), "warn");

        let filter = build_filter(Some("  "), "DEBUG");
        assert_eq!(filter.to_string(), "debug");
    }
}

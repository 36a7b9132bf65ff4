use tracing_subscriber::{EnvFilter, prelude::*};

const CRATE_TARGETS: [&str; 4] = ["server", "services", "db", "utils"];

/// Builds the filter directive used by the binary: `warn` for dependencies,
/// `level` for the workspace crates.
pub fn filter_directive(level: &str) -> String {
    let mut directive = String::from("warn");
    for target in CRATE_TARGETS {
        directive.push(',');
        directive.push_str(target);
        directive.push('=');
        directive.push_str(level);
    }
    directive.push_str(",tower_http=");
    directive.push_str(level);
    directive
}

/// Installs the global tracing subscriber. `RUST_LOG` selects the level for the
/// workspace crates; `LOG_FORMAT=json` switches to JSON lines.
pub fn init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(filter_directive(&log_level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive("info")));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry();
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_filter(filter))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_filter(filter))
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_workspace_crates() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("server=debug"));
        assert!(directive.contains("db=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}

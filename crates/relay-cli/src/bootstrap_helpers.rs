use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const QUIET_DEPENDENCY_DIRECTIVES: &[&str] = &["hyper=warn", "reqwest=warn", "h2=warn"];

/// Installs the compact stderr subscriber. `RUST_LOG` overrides the `info`
/// default; HTTP stack crates stay at `warn` unless named explicitly.
pub(crate) fn init_tracing() {
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let explicit = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    for raw in QUIET_DEPENDENCY_DIRECTIVES {
        let target = raw.split('=').next().unwrap_or_default();
        if explicit.contains(target) {
            continue;
        }
        if let Ok(directive) = raw.parse::<Directive>() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

use std::env;

use octofhir_tester::ServerBuilder;
use octofhir_tester::config::loader::{DEFAULT_CONFIG_FILE, load_config};

const CONFIG_ENV: &str = "OCTOFHIR_TESTER_CONFIG";

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From OCTOFHIR_TESTER_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (octofhir-tester.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable ({CONFIG_ENV})"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    octofhir_tester::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    octofhir_tester::observability::apply_logging_level(&cfg.logging.level);

    if cfg.ui.debug {
        tracing::warn!(
            "ui.debug is enabled: page templates are reloaded on every request; do not use in production"
        );
    }

    tracing::info!(
        fhir.base_url = %cfg.client.base_url,
        encoding = ?cfg.client.encoding,
        auth = ?cfg.client.auth,
        "Downstream FHIR server"
    );

    let server = match ServerBuilder::new().with_config(cfg).build() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Startup error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}

fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default)
}

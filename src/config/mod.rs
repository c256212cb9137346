// Configuration module entry point
// Layers defaults, an optional TOML file, FSROUTER_* variables and CLI flags

mod cli;
mod state;
mod types;

pub use cli::Cli;
pub use state::AppState;
pub use types::Config;

use std::path::PathBuf;

/// File read when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "fsrouter";

/// Environment variable prefix (`FSROUTER_PORT`, `FSROUTER_ROUTES_PATH`, ...).
const ENV_PREFIX: &str = "FSROUTER";

impl Config {
    /// Resolve settings; later sources win: defaults, file, environment, CLI.
    pub fn load(cli: &Cli) -> Result<Self, config::ConfigError> {
        Self::load_with_env(cli, None)
    }

    /// Like [`Config::load`], reading `FSROUTER_*` variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        cli: &Cli,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let file = match &cli.config {
            Some(path) => config::File::from(path.as_path()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("routes_path", path_value(defaults.routes_path))?
            .set_default("plugins_path", path_value(defaults.plugins_path))?
            .set_default("cache_middleware", defaults.cache_middleware)?
            .set_default("not_found_route", defaults.not_found_route)?
            .set_default("error_route", defaults.error_route)?
            .set_default("max_body_size", defaults.max_body_size)?
            .set_default("log_level", defaults.log_level)?
            .set_default("access_log", defaults.access_log)?
            .set_default("access_log_format", defaults.access_log_format)?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .set_override_option("host", cli.host.clone())?
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("routes_path", cli.routes_path.clone().map(path_value))?
            .set_override_option("plugins_path", cli.plugins_path.clone().map(path_value))?
            .set_override_option("cache_middleware", cli.cache_middleware)?
            .set_override_option("not_found_route", cli.not_found_route.clone())?
            .set_override_option("error_route", cli.error_route.clone())?
            .build()?;

        settings.try_deserialize()
    }
}

fn path_value(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

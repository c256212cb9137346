// Command-line overrides

use clap::Parser;
use std::path::PathBuf;

/// Serve a directory tree as a website.
#[derive(Debug, Default, Parser)]
#[command(name = "fsrouter", version, about)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Root of the routes tree
    #[arg(long, visible_alias = "rp")]
    pub routes_path: Option<PathBuf>,

    /// Plugins folder
    #[arg(long, visible_alias = "pp")]
    pub plugins_path: Option<PathBuf>,

    /// Load middleware once instead of on every request
    #[arg(
        long,
        visible_alias = "cm",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub cache_middleware: Option<bool>,

    /// Template rendered when no route matches
    #[arg(long, visible_alias = "nf")]
    pub not_found_route: Option<String>,

    /// Template rendered when a request fails
    #[arg(long, visible_alias = "er")]
    pub error_route: Option<String>,

    /// Configuration file (default: ./fsrouter.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_alias_flags() {
        let cli = Cli::parse_from([
            "fsrouter", "-p", "8080", "--rp", "site/routes", "--pp", "site/plugins", "--cm",
            "--nf", "missing.ejs", "--er", "oops.ejs",
        ]);
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.routes_path, Some(PathBuf::from("site/routes")));
        assert_eq!(cli.plugins_path, Some(PathBuf::from("site/plugins")));
        assert_eq!(cli.cache_middleware, Some(true));
        assert_eq!(cli.not_found_route.as_deref(), Some("missing.ejs"));
        assert_eq!(cli.error_route.as_deref(), Some("oops.ejs"));
    }

    #[test]
    fn test_long_flags_with_equals() {
        let cli = Cli::parse_from([
            "fsrouter",
            "--port=4000",
            "--routes-path=pages",
            "--cache-middleware=false",
        ]);
        assert_eq!(cli.port, Some(4000));
        assert_eq!(cli.routes_path, Some(PathBuf::from("pages")));
        assert_eq!(cli.cache_middleware, Some(false));
    }

    #[test]
    fn test_nothing_set() {
        let cli = Cli::parse_from(["fsrouter"]);
        assert!(cli.port.is_none());
        assert!(cli.cache_middleware.is_none());
        assert!(cli.config.is_none());
    }
}

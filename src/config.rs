use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub translate: String,
    pub execute: String,
    pub feedback: String,
    pub schema: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>, // Bearer token issued by the auth service
    pub timeout_secs: u64,
    pub endpoints: EndpointConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the translation service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Bearer token attached to every request
    #[arg(long)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut config_builder =
            Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/malay2sql/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // MALAY2SQL__API__BASE_URL, MALAY2SQL__API__TOKEN, ...
        config_builder = config_builder.add_source(
            Environment::with_prefix("MALAY2SQL")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(base_url) = &args.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(token) = &args.token {
            config.api.token = Some(token.clone());
        }
        if let Some(timeout_secs) = args.timeout_secs {
            config.api.timeout_secs = timeout_secs;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                token: None,
                timeout_secs: 60,
                endpoints: EndpointConfig {
                    translate: "/translate".to_string(),
                    execute: "/execute".to_string(),
                    feedback: "/feedback".to_string(),
                    schema: "/schema/initialize".to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[api]
base_url = "http://backend:9000/malay2sql"

[api.endpoints]
schema = "/initialize"
"#
        )
        .unwrap();

        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::new(&args).unwrap();

        assert_eq!(config.api.base_url, "http://backend:9000/malay2sql");
        assert_eq!(config.api.endpoints.schema, "/initialize");
        assert_eq!(config.api.endpoints.translate, "/translate");
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn cli_args_win_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://from-file\"\ntimeout_secs = 5").unwrap();

        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            base_url: Some("http://from-cli".to_string()),
            token: Some("secret".to_string()),
            timeout_secs: None,
            log_json: false,
        };
        let config = AppConfig::new(&args).unwrap();

        assert_eq!(config.api.base_url, "http://from-cli");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 5);
    }

    #[test]
    fn environment_sits_between_file_and_cli() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\ntoken = \"from-file\"").unwrap();

        // SAFETY: every env access in these tests goes through std, which serialises them.
        unsafe { std::env::set_var("MALAY2SQL__API__TOKEN", "from-env") };

        let from_env = AppConfig::new(&CliArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        });
        let from_cli = AppConfig::new(&CliArgs {
            config: Some(file.path().to_path_buf()),
            token: Some("from-cli".to_string()),
            ..Default::default()
        });

        unsafe { std::env::remove_var("MALAY2SQL__API__TOKEN") };

        assert_eq!(from_env.unwrap().api.token.as_deref(), Some("from-env"));
        assert_eq!(from_cli.unwrap().api.token.as_deref(), Some("from-cli"));
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Prefix shared by every environment variable the server reads.
pub const ENV_PREFIX: &str = "DRS_";

/// Centralized application configuration.
///
/// Resolved once at startup, lowest precedence first:
/// built-in defaults, YAML file, `DRS_*` environment variables, CLI flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Mount point of the DRS routes, e.g. `/ga4gh/drs/v1`.
    pub api_route: String,
    /// Base of the `self_uri` returned for every object.
    pub drs_path: String,
    pub database_url: String,
    /// Storage-internal S3 endpoint used for signing.
    pub s3_url: String,
    /// Public endpoint substituted into presigned URLs.
    pub s3_public_url: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub presign_expiry_secs: u64,
    pub topic_name: String,
    pub cors_allowed_origins: Vec<String>,
    pub cors_allow_credentials: bool,
    pub cors_allowed_methods: Vec<String>,
    pub cors_allowed_headers: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            log_level: "info".into(),
            api_route: "/ga4gh/drs/v1".into(),
            drs_path: "drs://localhost:8080/".into(),
            database_url: "sqlite://./data/drs.db".into(),
            s3_url: "http://s3-localstack:4566".into(),
            s3_public_url: "http://localhost:4566".into(),
            s3_bucket: "test".into(),
            s3_region: "us-east-1".into(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            presign_expiry_secs: 86_400,
            topic_name: "download_request".into(),
            cors_allowed_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_allowed_methods: Vec::new(),
            cors_allowed_headers: Vec::new(),
        }
    }
}

/// Command-line configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "GA4GH DRS metadata server")]
pub struct Args {
    /// YAML configuration file (overrides DRS_CONFIG_YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (overrides DRS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DRS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides DRS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Log level used when RUST_LOG is unset (overrides DRS_LOG_LEVEL)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database schema and exit
    Migrate,
    /// Insert object records from a directory or a JSON manifest
    Populate(PopulateArgs),
    /// Delete object records
    Cleanup {
        /// Only delete records whose identifier starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct PopulateArgs {
    /// Directory whose regular files become one record each
    #[arg(long, conflicts_with = "manifest", required_unless_present = "manifest")]
    pub dir: Option<PathBuf>,

    /// JSON manifest holding an array of object records
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Prefix prepended to the file name to form the object-store key
    #[arg(long, default_value = "")]
    pub key_prefix: String,

    /// Also upload each file to the configured bucket
    #[arg(long, requires = "dir", conflicts_with = "manifest")]
    pub upload: bool,
}

impl AppConfig {
    /// Parse YAML file + environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        let args = Args::parse();

        let yaml_path = args
            .config
            .clone()
            .or_else(|| env::var("DRS_CONFIG_YAML").ok().map(PathBuf::from));

        let mut cfg = match yaml_path {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| env::var(key).ok())?;
        cfg.apply_args(&args);

        Ok((cfg, args.command.unwrap_or(Command::Serve)))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file `{}`", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config file `{}`", path.display()))
    }

    /// Missing keys keep their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlay `DRS_*` variables. Lists are comma-separated.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("HOST") {
            self.host = v;
        }
        if let Some(v) = var("PORT") {
            self.port = v
                .parse::<u16>()
                .with_context(|| format!("parsing DRS_PORT value `{}`", v))?;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = var("API_ROUTE") {
            self.api_route = v;
        }
        if let Some(v) = var("DRS_PATH") {
            self.drs_path = v;
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = var("S3_URL") {
            self.s3_url = v;
        }
        if let Some(v) = var("S3_PUBLIC_URL") {
            self.s3_public_url = v;
        }
        if let Some(v) = var("S3_BUCKET") {
            self.s3_bucket = v;
        }
        if let Some(v) = var("S3_REGION") {
            self.s3_region = v;
        }
        if let Some(v) = var("S3_ACCESS_KEY_ID") {
            self.s3_access_key_id = Some(v);
        }
        if let Some(v) = var("S3_SECRET_ACCESS_KEY") {
            self.s3_secret_access_key = Some(v);
        }
        if let Some(v) = var("PRESIGN_EXPIRY_SECS") {
            self.presign_expiry_secs = v
                .parse::<u64>()
                .with_context(|| format!("parsing DRS_PRESIGN_EXPIRY_SECS value `{}`", v))?;
        }
        if let Some(v) = var("TOPIC_NAME") {
            self.topic_name = v;
        }
        if let Some(v) = var("CORS_ALLOWED_ORIGINS") {
            self.cors_allowed_origins = split_list(&v);
        }
        if let Some(v) = var("CORS_ALLOW_CREDENTIALS") {
            self.cors_allow_credentials = parse_bool(&v);
        }
        if let Some(v) = var("CORS_ALLOWED_METHODS") {
            self.cors_allowed_methods = split_list(&v);
        }
        if let Some(v) = var("CORS_ALLOWED_HEADERS") {
            self.cors_allowed_headers = split_list(&v);
        }

        Ok(())
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(url) = &args.database_url {
            self.database_url = url.clone();
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }

    /// Copy safe to log: the secret key is masked.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.s3_secret_access_key.is_some() {
            cfg.s3_secret_access_key = Some("***".into());
        }
        cfg
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn yaml_overrides_only_given_keys() {
        let cfg = AppConfig::from_yaml_str(
            "port: 9000\napi_route: /drs\ncors_allowed_origins:\n  - https://a.example\n",
        )
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.api_route, "/drs");
        assert_eq!(cfg.cors_allowed_origins, vec!["https://a.example"]);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.presign_expiry_secs, 86_400);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml_str("  \n").unwrap(), AppConfig::default());
    }

    #[test]
    fn env_takes_precedence_over_yaml() {
        let mut cfg = AppConfig::from_yaml_str("port: 9000\ns3_bucket: from-yaml\n").unwrap();
        cfg.apply_env(lookup(&[
            ("DRS_PORT", "7000"),
            ("DRS_CORS_ALLOWED_METHODS", "GET, OPTIONS,"),
            ("DRS_CORS_ALLOW_CREDENTIALS", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.s3_bucket, "from-yaml");
        assert_eq!(cfg.cors_allowed_methods, vec!["GET", "OPTIONS"]);
        assert!(cfg.cors_allow_credentials);
    }

    #[test]
    fn invalid_port_in_env_is_an_error() {
        let mut cfg = AppConfig::default();
        let err = cfg.apply_env(lookup(&[("DRS_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("DRS_PORT"));
    }

    #[test]
    fn cli_flags_win() {
        let args = Args::parse_from([
            "drs-server",
            "--port",
            "1234",
            "--database-url",
            "sqlite::memory:",
            "migrate",
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(lookup(&[("DRS_PORT", "7000")])).unwrap();
        cfg.apply_args(&args);

        assert_eq!(cfg.port, 1234);
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(args.command, Some(Command::Migrate));
    }

    #[test]
    fn populate_requires_a_source() {
        assert!(Args::try_parse_from(["drs-server", "populate"]).is_err());
        assert!(
            Args::try_parse_from(["drs-server", "populate", "--manifest", "m.json", "--upload"])
                .is_err()
        );

        let args = Args::try_parse_from(["drs-server", "populate", "--dir", "files", "--upload"])
            .unwrap();
        match args.command {
            Some(Command::Populate(p)) => {
                assert_eq!(p.dir, Some(PathBuf::from("files")));
                assert!(p.upload);
                assert_eq!(p.key_prefix, "");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn redacted_masks_secret() {
        let cfg = AppConfig {
            s3_secret_access_key: Some("hunter2".into()),
            ..AppConfig::default()
        };
        let shown = format!("{:?}", cfg.redacted());
        assert!(!shown.contains("hunter2"));
    }
}

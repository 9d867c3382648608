use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
        short,
        long,
        env,
        default_value_t = RustEnv::Development,
        value_parser = clap::builder::PossibleValuesParser::new([
            "DEVELOPMENT", "PRODUCTION", "STAGING",
            "development", "production", "staging"
        ])
            .map(|s| s.parse::<RustEnv>().unwrap_or(RustEnv::Production)),
    )]
    pub runtime_env: RustEnv,

    /// Secret used to sign and verify bearer tokens (HS256).
    #[arg(long, env)]
    jwt_key: Option<String>,

    /// Lifetime in seconds of tokens issued by the development login.
    #[arg(long, env, default_value_t = 60 * 60 * 24 * 14)]
    pub jwt_lifetime_secs: u64,

    /// Seconds of silence on an event stream before a heartbeat is written.
    #[arg(long, env, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub sse_heartbeat_secs: u64,

    /// Events each broker's ingress queue holds before publishers wait.
    #[arg(long, env, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub broker_ingress_capacity: u64,

    /// Events buffered per subscriber before the broker's dispatch loop waits on it.
    #[arg(long, env, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub subscriber_buffer: u64,

    /// Background jobs queued before new submissions are dropped.
    #[arg(long, env, default_value_t = 256, value_parser = clap::value_parser!(u64).range(1..))]
    pub fanout_queue_capacity: u64,

    /// Background jobs running at the same time.
    #[arg(long, env, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
    pub fanout_concurrency: u64,

    /// Seconds to wait for background jobs when shutting down.
    #[arg(long, env, default_value_t = 10)]
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn set_jwt_key(mut self, jwt_key: String) -> Self {
        self.jwt_key = Some(jwt_key);
        self
    }

    pub fn jwt_key(&self) -> Option<&str> {
        self.jwt_key.as_deref()
    }

    pub fn jwt_lifetime(&self) -> Duration {
        Duration::from_secs(self.jwt_lifetime_secs)
    }

    pub fn sse_heartbeat(&self) -> Duration {
        Duration::from_secs(self.sse_heartbeat_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_development(&self) -> bool {
        self.runtime_env() == RustEnv::Development
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

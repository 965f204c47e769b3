//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Plotserve command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "PLOTSERVE_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8000, env = "PLOTSERVE_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "PLOTSERVE_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/plotserve/certs/cert.pem",
        env = "PLOTSERVE_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/plotserve/certs/key.pem",
        env = "PLOTSERVE_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "PLOTSERVE_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Maximum number of datasets kept in the cache
    #[arg(long, default_value_t = 20, env = "PLOTSERVE_CACHE_CAPACITY")]
    pub cache_capacity: usize,
    /// Smallest dataset size a request may ask for
    #[arg(long, default_value_t = 100, env = "PLOTSERVE_MIN_DATASET_SIZE")]
    pub min_dataset_size: u64,
    /// Largest dataset size a request may ask for
    #[arg(long, default_value_t = 10_000_000, env = "PLOTSERVE_MAX_DATASET_SIZE")]
    pub max_dataset_size: u64,
    /// Generation seed used when a request does not supply one
    #[arg(long, default_value_t = 42, env = "PLOTSERVE_DEFAULT_SEED")]
    pub default_seed: u64,
    /// Ceiling on the adaptive point budget regardless of zoom
    #[arg(long, default_value_t = 50_000, env = "PLOTSERVE_MAX_ADAPTIVE_POINTS")]
    pub max_adaptive_points: u64,
    /// Cap on the zoom multiplier applied to the base point budget
    #[arg(long, default_value_t = 100.0, env = "PLOTSERVE_ZOOM_CAP_MULTIPLIER")]
    pub zoom_cap_multiplier: f64,
    /// Fraction of the viewport width added on each side when filtering
    #[arg(long, default_value_t = 0.2, env = "PLOTSERVE_VIEWPORT_BUFFER_RATIO")]
    pub viewport_buffer_ratio: f64,
    /// Reject requests whose estimated generation cost exceeds this limit
    #[arg(long, default_value_t = 50_000_000, env = "PLOTSERVE_GENERATION_COST_LIMIT")]
    pub generation_cost_limit: u64,
    /// Whether to use Rayon for execution of CPU-bound tasks.
    #[arg(long, default_value_t = false, env = "PLOTSERVE_USE_RAYON")]
    pub use_rayon: bool,
    /// Maximum number of CPU-bound tasks crunching concurrently
    #[arg(long, env = "PLOTSERVE_THREAD_LIMIT")]
    pub thread_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
pub(crate) fn test_args() -> CommandLineArgs {
    CommandLineArgs::parse_from(["plotserve"])
}

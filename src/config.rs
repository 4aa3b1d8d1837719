use clap::Parser;

pub const DEFAULT_SCAN_COUNT: usize = 10;

/// Engine settings. Every option can also be provided through the environment, which is the usual
/// way to tweak an engine embedded in a test suite.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "mockdis", about = "In-process emulation of a key-value data store")]
pub struct Config {
    /// Password clients must send with AUTH before running other commands.
    #[arg(long, env = "MOCKDIS_REQUIREPASS")]
    pub requirepass: Option<String>,

    /// Evict expired keys in the background instead of only when they are accessed.
    #[arg(
        long,
        env = "MOCKDIS_ACTIVE_EXPIRE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub active_expire: bool,

    /// Number of elements SCAN-like commands return when COUNT is omitted.
    #[arg(long, env = "MOCKDIS_SCAN_COUNT", default_value_t = DEFAULT_SCAN_COUNT)]
    pub scan_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requirepass: None,
            active_expire: true,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}

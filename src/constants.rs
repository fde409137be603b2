/// Constants module to avoid magic numbers in the codebase

// Cache Sizing
pub const DEFAULT_ANALYSIS_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_SUGGESTION_CACHE_CAPACITY: usize = 50;
pub const DEFAULT_THROTTLE_WINDOW_MS: u64 = 75;

// Suggestion Thresholds
pub const DEFAULT_COMPLEXITY_MEDIUM: u32 = 6;
pub const DEFAULT_COMPLEXITY_HIGH: u32 = 11;
pub const DEFAULT_MAX_PARAMETERS: usize = 6;
pub const DEFAULT_MAX_FUNCTION_LINES: u32 = 50;
pub const DEFAULT_MAX_CLASS_LINES: u32 = 300;

// Suggestion Priorities (lower = more urgent)
pub const PRIORITY_COMPLEXITY_HIGH: u8 = 1;
pub const PRIORITY_COMPLEXITY_MEDIUM: u8 = 2;
pub const PRIORITY_PARAMETERS: u8 = 3;
pub const PRIORITY_LENGTH: u8 = 3;
pub const PRIORITY_DOCUMENTATION: u8 = 4;
pub const PRIORITY_PERFORMANCE: u8 = 5;

// External Analyzer
pub const DEFAULT_ANALYZER_COMMAND: &str = "codepulse-analyzer";
pub const ANALYZER_TIMEOUT_SECS: u64 = 30;

// Configuration
pub const CONFIG_ENV_PREFIX: &str = "CODEPULSE_";
pub const LOCAL_CONFIG_PATH: &str = ".codepulse/config.toml";

// Watcher
pub const WATCH_POLL_INTERVAL_MS: u64 = 250;

// Files handed to the analyzer
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "pyi", "rs", "js", "jsx", "ts", "tsx", "go", "java", "c", "cpp", "h", "hpp", "rb",
];

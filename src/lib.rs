// Card Forge - Core Library
// Synthetic card-number engine plus the history store used by the CLI, TUI and API server

pub mod error;
pub mod digits;
pub mod checksum;       // Luhn check digit
pub mod template;       // BIN templates with wildcards
pub mod record;         // number|month|year|code records
pub mod synth;          // Template Synthesizer
pub mod pattern;        // Pattern Extractor
pub mod extrapolate;    // Extrapolator
pub mod brand;
pub mod config;
pub mod db;             // Generation history (SQLite)

// Re-export commonly used types
pub use error::{CardError, CardResult};
pub use digits::{DigitSource, FixedDigits, RandomDigits, WILDCARD};
pub use checksum::{compute_check_digit, is_valid, repair};
pub use template::{CardTemplate, Slot, DEFAULT_CARD_LEN};
pub use record::{format_batch, generate_expiry, generate_security_code, write_csv, CardRecord};
pub use synth::{generate_records, synthesize, synthesize_number, GenerateRequest};
pub use pattern::{extract_pattern, extract_record_pattern, SimilarityPattern};
pub use extrapolate::{extrapolate, prefix_patterns, MaskRange, DEFAULT_EXTRAPOLATIONS};
pub use brand::{classify, CardBrand};
pub use config::AppConfig;
pub use db::{
    HistoryEntry, NewHistoryEntry, HistoryStore, HistorySort, HistoryStats,
    setup_database, open_database, sort_entries, favorites, history_stats,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

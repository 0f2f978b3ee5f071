use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "card-forge")]
#[command(version)]
#[command(about = "Synthetic card-number toolkit: generate, compare and extrapolate test numbers", long_about = None)]
pub struct Args {
    /// History database path (overrides CARD_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Generate checksum-valid cards from a BIN template
    ///
    /// Wildcards (x) and padding are filled with random digits; the last digit is
    /// always the Luhn check digit.
    ///
    /// Example: card-forge generate 456331xx -m 04 -y 2029 -n 20
    Generate {
        /// BIN template, 6-16 characters of 0-9 or x
        #[arg(value_name = "BIN")]
        bin: String,

        /// Expiry month (random when omitted or invalid)
        #[arg(short, long)]
        month: Option<String>,

        /// Expiry year (random future year when omitted or past)
        #[arg(short, long)]
        year: Option<String>,

        /// Fixed security code (random per card when omitted)
        #[arg(short = 'c', long = "code")]
        security_code: Option<String>,

        /// Number of cards (default: CARD_QUANTITY)
        #[arg(short = 'n', long)]
        quantity: Option<usize>,

        /// Total card length, 13-19 (default: CARD_TARGET_LENGTH)
        #[arg(short, long)]
        length: Option<usize>,

        /// Also write the batch as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Don't record the request in history
        #[arg(long)]
        no_save: bool,
    },

    /// Mask the digits two cards don't share
    ///
    /// Example: card-forge similarity "4915110191768499|04|27|123" "4915110176928790|05|28|456"
    Similarity {
        #[arg(value_name = "CARD1")]
        first: String,

        #[arg(value_name = "CARD2")]
        second: String,
    },

    /// Randomise a card's middle digits and re-solve the check digit
    ///
    /// Example: card-forge extrapolate "4833160095772767|04|20|858" --start 6 --end 12
    Extrapolate {
        /// Seed card as number|month|year|code
        #[arg(value_name = "CARD")]
        card: String,

        /// Number of variants
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// First masked position
        #[arg(long, default_value = "6")]
        start: usize,

        /// Position after the last masked one
        #[arg(long, default_value = "12")]
        end: usize,

        /// Print the prefix-template ladder instead of variants
        #[arg(long)]
        patterns: bool,
    },

    /// Luhn-check numbers and show the repaired form of invalid ones
    Check {
        #[arg(value_name = "NUMBER", required = true)]
        numbers: Vec<String>,
    },

    /// Classify a BIN by brand
    Brand {
        #[arg(value_name = "BIN")]
        bin: String,
    },

    /// Inspect and edit the generation history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Browse history in the terminal UI
    Ui,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved requests
    List {
        /// date-desc, date-asc, bin-asc, bin-desc or quantity-desc
        #[arg(short, long, default_value = "date-desc")]
        sort: String,

        /// Only favourites
        #[arg(short, long)]
        favorites: bool,
    },

    /// Toggle the favourite flag of an entry
    Favorite {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete one entry
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete every entry
    Clear,

    /// Totals across saved requests
    Stats,
}

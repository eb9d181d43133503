use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "grubcount")]
#[command(version)]
#[command(about = "Grub counter for Tales of Monkey Island 3")]
pub struct Cli {
    /// Log every scan candidate and cache decision
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow the running game and mirror the count into a text file
    Watch(WatchArgs),

    /// Print the current count once and exit
    Once {
        /// Process image name
        #[arg(long)]
        process: Option<String>,
    },

    /// Read the count from save files
    Save {
        /// A specific .save file instead of a directory listing
        file: Option<PathBuf>,

        /// Directory to scan for .save files
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
pub struct WatchArgs {
    /// Output file for the count
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output template; `{count}` is replaced by the value
    #[arg(short, long, value_name = "TEMPLATE")]
    pub format: Option<String>,

    /// Do not write the output file
    #[arg(long)]
    pub no_write: bool,

    /// Process image name
    #[arg(long, env = "GRUBCOUNT_PROCESS")]
    pub process: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "N")]
    pub interval_ms: Option<u64>,
}

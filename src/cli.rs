use clap::Parser;
use std::path::PathBuf;

use upload_queue::utils::version;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Files to upload, as `name` or `name=size` pairs (size in bytes)
    pub files: Vec<String>,

    /// Path to the app config holding the exclusion rules
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Milliseconds between simulated progress chunks
    #[arg(long, default_value_t = 200)]
    pub chunk_delay_ms: u64,
}

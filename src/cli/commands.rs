use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "track-tagger")]
#[command(version = "1.0")]
#[command(about = "Convert downloaded audio to WAV and tag filenames with musical key and tempo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Preview actions without changing any files
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Write per-file outcomes to this CSV file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Worker threads for conversion and analysis (0 = all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

#[derive(Args, Clone, Debug)]
pub struct OracleArgs {
    /// Titles per oracle request
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Model name sent to the oracle
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Oracle requests in flight at once
    #[arg(long)]
    pub parallel_batches: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert downloads to WAV, then clean the downloads folder
    Convert {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory holding downloaded audio
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Directory receiving converted WAV files
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Tag converted tracks with key and BPM from the oracle
    Tag {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        oracle: OracleArgs,

        /// Directory holding tracks to tag
        #[arg(short = 'i', long)]
        dir: Option<PathBuf>,
    },

    /// Tag converted tracks with a locally estimated key
    Keys {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory holding tracks to tag
        #[arg(short = 'i', long)]
        dir: Option<PathBuf>,
    },

    /// Convert downloads, then tag them through the oracle
    Run {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        oracle: OracleArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_tag_flags() {
        let cli = Cli::parse_from(["track-tagger", "tag", "--dry-run", "-b", "5", "-i", "music"]);
        match cli.command {
            Commands::Tag { common, oracle, dir } => {
                assert!(common.dry_run);
                assert_eq!(oracle.batch_size, Some(5));
                assert_eq!(dir, Some(PathBuf::from("music")));
            }
            _ => panic!("expected tag subcommand"),
        }
    }
}

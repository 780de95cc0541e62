use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use truthforge_core::ingest::Granularity;
use truthforge_extensions::gemini::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};

pub const DEFAULT_STORE_PATH: &str = "data/vector_store.json";

/// TruthForge: verify claims against a local rule base.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path of the vector store snapshot.
    #[arg(long, global = true, env = "TRUTHFORGE_STORE", default_value = DEFAULT_STORE_PATH)]
    pub store: PathBuf,

    /// Embed locally with a hashing embedder instead of calling Gemini.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the Gemini API base URL (e.g. for a proxy).
    #[arg(long, global = true, env = "GEMINI_BASE_URL")]
    pub base_url: Option<String>,

    /// Model used by `verify` and `fix`.
    #[arg(long, global = true, env = "TRUTHFORGE_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Model used to embed passages and queries.
    #[arg(long, global = true, env = "TRUTHFORGE_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a sector-labeled rule file and add its passages to the store.
    Ingest(IngestArgs),
    /// Find the stored passages most similar to a query.
    Search(SearchArgs),
    /// Ask the language model to verify an answer against retrieved rules.
    Verify(VerifyArgs),
    /// Ask the language model to rewrite an answer so it complies with retrieved rules.
    Fix(VerifyArgs),
    /// List the models available to the configured API key.
    Models,
    /// Show what the store contains.
    Stats,
}

// --- Argument Structs for each Subcommand ---

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GranularityArg {
    /// One passage per sector block.
    #[default]
    Block,
    /// One passage per blank-line separated paragraph.
    Paragraph,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Block => Granularity::Block,
            GranularityArg::Paragraph => Granularity::Paragraph,
        }
    }
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Rule file with `[SECTOR: <label>]` headers.
    #[arg(required = true)]
    pub path: PathBuf,

    #[arg(long, short, value_enum, default_value_t = GranularityArg::Block)]
    pub granularity: GranularityArg,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// The search query.
    #[arg(required = true)]
    pub query: String,

    /// Number of results to return.
    #[arg(long, short, default_value = "3")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// The claim or question the answer responds to.
    #[arg(long, alias = "spec")]
    pub claim: String,

    /// The proposed answer.
    #[arg(long)]
    pub answer: String,

    /// Additional constraints supplied by the user.
    #[arg(long, default_value = "")]
    pub rules: String,

    /// Number of passages to retrieve (defaults to 3 for verify, 2 for fix).
    #[arg(long, short)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("truthforge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ingest_with_granularity() {
        let cli = parse(&["ingest", "rules.txt", "--granularity", "paragraph", "--store", "kb.json"]);
        assert_eq!(cli.store, PathBuf::from("kb.json"));
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.path, PathBuf::from("rules.txt"));
                assert_eq!(Granularity::from(args.granularity), Granularity::Paragraph);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn search_limit_defaults_to_three() {
        match parse(&["search", "torque limits"]).command {
            Commands::Search(args) => {
                assert_eq!(args.query, "torque limits");
                assert_eq!(args.limit, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn verify_accepts_spec_alias_and_global_flags_after_subcommand() {
        let cli = parse(&["verify", "--spec", "Is 60 Nm ok?", "--answer", "Yes", "--offline", "-vv"]);
        assert!(cli.offline);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.claim, "Is 60 Nm ok?");
                assert_eq!(args.rules, "");
                assert_eq!(args.limit, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn verify_requires_an_answer() {
        let result = Cli::try_parse_from(["truthforge", "verify", "--claim", "x"]);
        assert!(result.is_err());
    }
}

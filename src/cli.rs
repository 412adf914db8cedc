use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DirArgs {
    /// Directory of documents to search.
    /// Defaults to the current directory.
    #[clap(short, long)]
    pub dir: Option<PathBuf>,
}

impl DirArgs {
    pub fn resolve(&self) -> std::io::Result<PathBuf> {
        match &self.dir {
            Some(dir) => std::fs::canonicalize(dir),
            None => std::env::current_dir(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search documents by meaning
    Search {
        /// Free-text query
        query: String,

        #[clap(flatten)]
        dir_args: DirArgs,

        /// Maximum number of results (overrides config)
        #[clap(
            short = 'n',
            long,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        limit: Option<usize>,

        /// Print results as json
        #[clap(long, default_value = "false")]
        json: bool,
    },
    /// Build or refresh the embedding cache without searching
    Index {
        #[clap(flatten)]
        dir_args: DirArgs,
    },
    /// Delete the embedding cache of a directory
    Clear {
        #[clap(flatten)]
        dir_args: DirArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let args = Args::parse_from(["docseek", "search", "hello world", "-d", "/tmp", "-n", "3"]);
        match args.command {
            Command::Search {
                query,
                dir_args,
                limit,
                json,
            } => {
                assert_eq!(query, "hello world");
                assert_eq!(dir_args.dir, Some(PathBuf::from("/tmp")));
                assert_eq!(limit, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let result = Args::try_parse_from(["docseek", "search", "hello", "--limit", "0"]);
        assert!(result.is_err());

        let args = Args::try_parse_from(["docseek", "search", "hello", "--limit", "1"]).unwrap();
        assert!(matches!(args.command, Command::Search { limit: Some(1), .. }));
    }

    #[test]
    fn test_dir_defaults_to_current_directory() {
        let args = Args::parse_from(["docseek", "index"]);
        let Command::Index { dir_args } = args.command else {
            panic!("expected index command");
        };
        assert_eq!(dir_args.resolve().unwrap(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_missing_dir_fails_to_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let args = DirArgs {
            dir: Some(dir.path().join("missing")),
        };
        assert!(args.resolve().is_err());
    }
}

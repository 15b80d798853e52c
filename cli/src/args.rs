use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Answer questions, write quizzes and assignments from local course materials
#[derive(Parser, Debug)]
#[command(name = "ragedu")]
#[command(version)]
#[command(about = "Question answering, quizzes and assignments grounded in course materials", long_about = None)]
pub struct Args {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the response as JSON instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the vector index from every .pdf/.docx in the data directory
    Ingest {
        /// Source directory (overrides paths.data_dir)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Index directory (overrides paths.index_dir)
        #[arg(long)]
        index: Option<PathBuf>,
    },

    /// Answer a question from the course materials
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,
        /// Number of passages to retrieve
        #[arg(long)]
        k: Option<usize>,
        #[command(flatten)]
        common: QueryArgs,
    },

    /// Generate self-assessment questions on a topic
    Quiz {
        #[arg(long)]
        topic: String,
        /// Number of questions to request
        #[arg(long)]
        num: Option<usize>,
        #[command(flatten)]
        common: QueryArgs,
    },

    /// Generate an assignment on a topic
    Task {
        #[arg(long)]
        topic: String,
        #[command(flatten)]
        common: QueryArgs,
    },

    /// Check the index and the configured backends
    Health {
        /// Index directory (overrides paths.index_dir)
        #[arg(long)]
        index: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Index directory (overrides paths.index_dir)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// JSON file with prior turns: [{"role": "user"|"assistant", "text": "..."}]
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ask_with_global_flags() {
        let args = Args::try_parse_from(["ragedu", "ask", "What is ML?", "--k", "3", "--json"])
            .expect("parse");
        assert!(args.json);
        match args.command {
            Commands::Ask { question, k, .. } => {
                assert_eq!(question, "What is ML?");
                assert_eq!(k, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn quiz_requires_topic() {
        assert!(Args::try_parse_from(["ragedu", "quiz"]).is_err());
        let args = Args::try_parse_from(["ragedu", "--config", "r.toml", "quiz", "--topic", "regression", "--num", "4"])
            .expect("parse");
        assert_eq!(args.config, Some(PathBuf::from("r.toml")));
        assert!(matches!(args.command, Commands::Quiz { num: Some(4), .. }));
    }
}

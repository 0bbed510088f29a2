// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and their flags:
//
//   prepare    corpus → vocabulary, embeddings, padded datasets
//   relevance  TF-IDF passage relevance for one corpus file
//   select     model outputs → re-ranked answers and eval files
//
// Each Args struct converts into an application config, so the
// application layer never sees clap types.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::{
    prepare_use_case::{PrepareConfig, QUESTION_TYPES},
    relevance_use_case::RelevanceConfig,
    select_use_case::{EvalSplit, SelectConfig},
};
use crate::data::relevance::RelevanceMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build vocabulary, embeddings and padded datasets
    Prepare(PrepareArgs),

    /// Score passage relevance for one JSON-lines file
    Relevance(RelevanceArgs),

    /// Re-rank passages from model outputs and write eval files
    Select(SelectArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory holding train/, dev/ and test/ JSON-lines files
    #[arg(long, default_value = "datasets/msmarco")]
    pub data_dir: String,

    /// Directory holding glove.6B.<emb_size>d.txt
    #[arg(long, default_value = "datasets/glove")]
    pub glove_dir: String,

    /// Which question-type files to load
    #[arg(long, default_value = "description", value_parser = QUESTION_TYPES)]
    pub question_type: String,

    /// GloVe vector size
    #[arg(long, default_value_t = 100)]
    pub emb_size: usize,

    /// Where to write the prepared artifacts
    #[arg(long, default_value = "prepared")]
    pub out_dir: String,

    /// Use a single unknown class instead of the four smart classes
    #[arg(long)]
    pub no_smart_unk: bool,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Also write the concatenated-passage datasets
    #[arg(long)]
    pub concatenated: bool,

    /// Keep only dev queries answerable from their selected passages
    #[arg(long)]
    pub answerable_only: bool,

    /// Seed for batch sampling and unknown-class vectors
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Fails on a zero batch size or unknown question type.
impl TryFrom<PrepareArgs> for PrepareConfig {
    type Error = anyhow::Error;

    fn try_from(a: PrepareArgs) -> Result<Self> {
        let cfg = PrepareConfig {
            data_dir:      a.data_dir,
            glove_dir:     a.glove_dir,
            question_type: a.question_type,
            emb_size:      a.emb_size,
            out_dir:       a.out_dir,
            smart_unk:     !a.no_smart_unk,
            batch_size:    a.batch_size,
            concatenated:  a.concatenated,
            answerable_only: a.answerable_only,
            seed:          a.seed,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct RelevanceArgs {
    /// MS-MARCO JSON-lines file to score
    #[arg(long)]
    pub input: String,

    /// Output JSON-lines file
    #[arg(long, default_value = "relevance.jsonl")]
    pub output: String,

    /// binary (stop words, sum-normalised) or softmax (raw counts)
    #[arg(long, default_value = "binary")]
    pub mode: RelevanceMode,
}

impl From<RelevanceArgs> for RelevanceConfig {
    fn from(a: RelevanceArgs) -> Self {
        RelevanceConfig { input: a.input, output: a.output, mode: a.mode }
    }
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Output directory of a previous `prepare` run
    #[arg(long, default_value = "prepared")]
    pub artifacts_dir: String,

    /// JSON lines of {query_id, passages: [{start, end}]}
    #[arg(long)]
    pub model_outputs: String,

    /// dev, test or concat
    #[arg(long, default_value = "dev")]
    pub split: EvalSplit,

    /// Where references/ and candidates/ are written
    #[arg(long, default_value = "eval")]
    pub eval_dir: String,

    /// Used in the candidate file name
    #[arg(long, default_value = "baseline")]
    pub model_name: String,

    /// Also write one demo answer file per query under <demo_dir>/<model_name>
    #[arg(long)]
    pub demo_dir: Option<String>,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Model outputs are raw logits; apply softmax before selection
    #[arg(long)]
    pub logits: bool,
}

impl TryFrom<SelectArgs> for SelectConfig {
    type Error = anyhow::Error;

    fn try_from(a: SelectArgs) -> Result<Self> {
        let cfg = SelectConfig {
            artifacts_dir: a.artifacts_dir,
            model_outputs: a.model_outputs,
            split:         a.split,
            eval_dir:      a.eval_dir,
            model_name:    a.model_name,
            demo_dir:      a.demo_dir,
            batch_size:    a.batch_size,
            logits:        a.logits,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_prepare_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "msmarco-prep", "prepare", "--question-type", "numeric", "--no-smart-unk", "--batch-size", "8",
        ]).unwrap();
        let Commands::Prepare(args) = cli.command else { panic!("expected prepare") };
        let cfg = PrepareConfig::try_from(args).unwrap();
        assert_eq!(cfg.question_type, "numeric");
        assert!(!cfg.smart_unk);
        assert_eq!(cfg.batch_size, 8);
        assert!(!cfg.answerable_only);
    }

    #[test]
    fn test_answerable_only_flag_maps_to_config() {
        let cli = Cli::try_parse_from(["msmarco-prep", "prepare", "--answerable-only"]).unwrap();
        let Commands::Prepare(args) = cli.command else { panic!("expected prepare") };
        assert!(PrepareConfig::try_from(args).unwrap().answerable_only);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cli = Cli::try_parse_from(["msmarco-prep", "prepare", "--batch-size", "0"]).unwrap();
        let Commands::Prepare(args) = cli.command else { panic!("expected prepare") };
        assert!(PrepareConfig::try_from(args).is_err());
    }

    #[test]
    fn test_unknown_question_type_fails_to_parse() {
        assert!(Cli::try_parse_from(["msmarco-prep", "prepare", "--question-type", "weather"]).is_err());
    }

    #[test]
    fn test_select_parses_split_and_demo_dir() {
        let cli = Cli::try_parse_from([
            "msmarco-prep", "select", "--model-outputs", "out.jsonl", "--split", "test", "--demo-dir", "demo",
        ]).unwrap();
        let Commands::Select(args) = cli.command else { panic!("expected select") };
        let cfg = SelectConfig::try_from(args).unwrap();
        assert_eq!(cfg.split, EvalSplit::Test);
        assert_eq!(cfg.demo_dir.as_deref(), Some("demo"));
        assert!(!cfg.logits);
    }

    #[test]
    fn test_logits_flag_maps_to_config() {
        let cli = Cli::try_parse_from([
            "msmarco-prep", "select", "--model-outputs", "out.jsonl", "--logits",
        ]).unwrap();
        let Commands::Select(args) = cli.command else { panic!("expected select") };
        assert!(SelectConfig::try_from(args).unwrap().logits);
    }

    #[test]
    fn test_relevance_mode_parses() {
        let cli = Cli::try_parse_from([
            "msmarco-prep", "relevance", "--input", "dev.json", "--mode", "softmax",
        ]).unwrap();
        let Commands::Relevance(args) = cli.command else { panic!("expected relevance") };
        assert_eq!(RelevanceConfig::from(args).mode, RelevanceMode::Softmax);
    }
}

// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands the resulting config to a use case in Layer 2.
//
// Three commands are supported:
//   1. `prepare`   — build vocabulary, embeddings, padded datasets
//   2. `relevance` — score passage relevance for one file
//   3. `select`    — re-rank passages from model outputs

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, RelevanceArgs, SelectArgs};

#[derive(Parser, Debug)]
#[command(
    name = "msmarco-prep",
    version = "0.1.0",
    about = "Prepare MS-MARCO data for span models and re-rank their answers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; no computation here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)   => run_prepare(args),
            Commands::Relevance(args) => run_relevance(args),
            Commands::Select(args)    => run_select(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let summary = PrepareUseCase::new(args.try_into()?).execute()?;

    println!(
        "Prepared {} train / {} dev examples, {} dev / {} test queries.",
        summary.train_examples, summary.dev_examples, summary.dev_queries, summary.test_queries
    );
    println!(
        "Vocabulary {} + {} unknown classes; max context {}, max question {}; {:.2}% unknown.",
        summary.layout.vocab_size,
        summary.layout.num_classes,
        summary.max_context_len,
        summary.max_question_len,
        summary.unknowns.unknown_fraction() * 100.0
    );
    Ok(())
}

fn run_relevance(args: RelevanceArgs) -> Result<()> {
    use crate::application::relevance_use_case::RelevanceUseCase;

    let output = args.output.clone();
    let count  = RelevanceUseCase::new(args.into()).execute()?;
    println!("Scored {count} queries into '{output}'.");
    Ok(())
}

fn run_select(args: SelectArgs) -> Result<()> {
    use crate::application::select_use_case::SelectUseCase;

    let report = SelectUseCase::new(args.try_into()?).execute()?;

    println!(
        "Answered {} queries ({} without model output).",
        report.queries, report.missing_outputs
    );
    println!("References: {}", report.files.references.display());
    println!("Candidates: {}", report.files.candidates.display());
    if report.demo_files > 0 {
        println!("Demo files: {}", report.demo_files);
    }
    Ok(())
}

// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses the command line
// with clap, builds the matching use case and prints whatever
// the user asked to see. No workflow logic lives here.
//
// Subcommands:
//   train              — trainer wrapper (+ perturb training)
//   evaluate           — evaluator wrapper on the test shard
//   functional-test    — end-to-end pipeline run
//   score              — accuracy metrics for decoded programs
//   stats              — per-example CSV from scored results
//   rule-distribution  — grammar rule usage of a dataset
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, io};

use crate::domain::traits::CommandRunner;
use crate::infra::process::SystemRunner;
use commands::{
    Commands, EvaluateArgs, FunctionalTestArgs, RuleDistributionArgs, ScoreArgs, StatsArgs, TrainArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "luinet",
    version,
    about = "Train, evaluate and score LUINet semantic parsers on top of Tensor2Tensor."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case of the chosen subcommand.
    pub fn run(self) -> Result<()> {
        let runner = SystemRunner;
        match self.command {
            Commands::Train(args)            => run_train(args, &runner),
            Commands::Evaluate(args)         => run_evaluate(args, &runner),
            Commands::FunctionalTest(args)   => run_functional_test(args, &runner),
            Commands::Score(args)            => run_score(args),
            Commands::Stats(args)            => run_stats(args),
            Commands::RuleDistribution(args) => run_rule_distribution(args),
        }
    }
}

fn run_train(args: TrainArgs, runner: &dyn CommandRunner) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    TrainUseCase::new(args.into()).execute(runner)?;
    tracing::info!("Training complete");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs, runner: &dyn CommandRunner) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    EvalUseCase::new(args.into()).execute(runner)
}

fn run_functional_test(args: FunctionalTestArgs, runner: &dyn CommandRunner) -> Result<()> {
    use crate::application::functional_test_use_case::{
        FunctionalTestConfig, FunctionalTestUseCase, Programs,
    };

    let config = FunctionalTestConfig::load(args.config.as_deref())?;
    let luinet = std::env::current_exe()
        .context("Cannot locate the luinet executable")?
        .display()
        .to_string();
    let use_case = FunctionalTestUseCase::new(
        config,
        Programs { luinet, datagen: args.datagen, decoder: args.decoder },
    );

    if args.dry_run {
        for step in use_case.plan() {
            println!("# {}\n{}", step.label, step.invocation);
        }
        return Ok(());
    }
    use_case.execute(runner)?;
    println!("Functional test passed.");
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    use crate::application::score_use_case::ScoreUseCase;
    use crate::infra::metrics::format_metrics;

    let metrics = ScoreUseCase::new(args.into()).execute()?;
    print!("{}", format_metrics(&metrics));
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    use crate::application::stats_use_case::StatsUseCase;
    use crate::grammar::program::ProgramGrammar;

    let kind    = args.grammar_type.parse()?;
    let grammar = ProgramGrammar::load(&args.grammar, kind)?;
    let use_case = StatsUseCase::new(grammar, args.device);
    let stdout  = io::stdout().lock();

    match &args.input {
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("Cannot open '{}'", path.display()))?;
            use_case.execute(io::BufReader::new(file), stdout)?;
        }
        None => {
            use_case.execute(io::stdin().lock(), stdout)?;
        }
    }
    Ok(())
}

fn run_rule_distribution(args: RuleDistributionArgs) -> Result<()> {
    use crate::application::rule_distribution_use_case::RuleDistributionUseCase;

    let counts = RuleDistributionUseCase::new(args.model_dir, args.dataset).execute()?;
    for c in counts {
        println!("{}\t{}\t{}", c.rule_id, c.count, c.rule);
    }
    Ok(())
}

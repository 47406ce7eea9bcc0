use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use literal_patcher::{
    builtin, count_matches, discover_rule_files, load_from_path, read_source, PatchReport,
    Patcher, RuleOutcome, RuleSet, RuleStatus, WorkspaceGuard,
};
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "literal-patcher")]
#[command(about = "Literal find-and-replace patching for source files", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a rule set to a file
    Apply {
        /// File to patch (defaults to the rule set's meta.target)
        target: Option<PathBuf>,

        #[command(flatten)]
        source: RuleSource,

        /// Write the result here instead of overwriting the target
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Project root; target and output must stay inside it
        #[arg(long)]
        root: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Fail without writing if any rule matches nothing
        #[arg(long)]
        strict: bool,
    },

    /// Report how often each rule matches, without writing
    Check {
        /// File to check (defaults to the rule set's meta.target)
        target: Option<PathBuf>,

        #[command(flatten)]
        source: RuleSource,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List bundled rule sets and rule files in a directory
    List {
        /// Directory of *.toml rule sets
        #[arg(long, env = "LITERAL_PATCHER_RULES_DIR")]
        rules_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct RuleSource {
    /// Rule set TOML file
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Name of a bundled rule set (see `list`)
    #[arg(short, long)]
    builtin: Option<String>,
}

impl RuleSource {
    fn load(&self) -> Result<RuleSet> {
        match (&self.rules, &self.builtin) {
            (Some(path), _) => Ok(load_from_path(path)?),
            (None, Some(name)) => Ok(builtin::load(name)?),
            (None, None) => anyhow::bail!("either --rules or --builtin is required"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            target,
            source,
            output,
            root,
            dry_run,
            diff,
            strict,
        } => cmd_apply(target, &source, output, root, dry_run, diff, strict),

        Commands::Check {
            target,
            source,
            json,
        } => cmd_check(target, &source, json),

        Commands::List { rules_dir } => cmd_list(rules_dir),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "literal_patcher=debug"
    } else {
        "literal_patcher=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

/// Explicit target first, then the rule set's `meta.target`.
fn resolve_target(target: Option<PathBuf>, rule_set: &RuleSet) -> Result<PathBuf> {
    if let Some(path) = target {
        return Ok(path);
    }

    if let Some(path) = rule_set.meta.target.as_deref() {
        return Ok(PathBuf::from(path));
    }

    anyhow::bail!(
        "No target file for rule set '{}'.\n  Pass a TARGET argument or set meta.target in the rule set.",
        rule_set.name()
    )
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
    if !modified.ends_with('\n') {
        println!();
    }
}

fn print_outcome(outcome: &RuleOutcome, dry_run: bool) {
    match outcome.status {
        RuleStatus::Replaced { occurrences } => {
            let verb = if dry_run { "Would replace" } else { "Replaced" };
            println!(
                "{} {}: {} {} occurrence(s)",
                "✓".green(),
                outcome.rule_id,
                verb,
                occurrences
            );
        }
        RuleStatus::AlreadyApplied => {
            println!("{} {}: Already applied", "⊙".yellow(), outcome.rule_id);
        }
        RuleStatus::NoMatch => {
            println!(
                "{} {}: {}",
                "⊘".cyan(),
                outcome.rule_id,
                "No match, left unchanged".yellow()
            );
            if let Some(hint) = &outcome.near_miss {
                println!(
                    "  Closest line {} ({:.0}% similar): {}",
                    hint.line,
                    hint.similarity * 100.0,
                    hint.text.trim().dimmed()
                );
            }
        }
    }
}

fn print_summary(outcomes: &[RuleOutcome]) {
    let replaced = outcomes
        .iter()
        .filter(|o| matches!(o.status, RuleStatus::Replaced { .. }))
        .count();
    let already = outcomes
        .iter()
        .filter(|o| o.status == RuleStatus::AlreadyApplied)
        .count();
    let unmatched = outcomes.iter().filter(|o| o.is_unmatched()).count();

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} replaced", format!("{}", replaced).green());
    println!("  {} already applied", format!("{}", already).yellow());
    println!("  {} unmatched", format!("{}", unmatched).cyan());
}

fn cmd_apply(
    target: Option<PathBuf>,
    source: &RuleSource,
    output: Option<PathBuf>,
    root: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    strict: bool,
) -> Result<()> {
    let rule_set = source.load()?;
    let target = resolve_target(target, &rule_set)?;

    println!("Rule set: {}", rule_set.name());
    if let Some(description) = &rule_set.meta.description {
        println!("{}", description.dimmed());
    }

    let mut patcher = Patcher::new(&target, rule_set.rules.clone())
        .dry_run(dry_run)
        .strict(strict);
    if let Some(output) = &output {
        patcher = patcher.output(output);
    }
    if let Some(root) = &root {
        let guard = WorkspaceGuard::new(root)
            .with_context(|| format!("invalid --root {}", root.display()))?;
        patcher = patcher.guard(guard);
    }

    let report: PatchReport = patcher.run()?;

    println!("Target: {}", report.input.display());
    if report.output != report.input {
        println!("Output: {}", report.output.display());
    }
    println!();

    if dry_run {
        println!("{}", "  [DRY RUN - nothing will be written]".cyan());
    }

    for outcome in &report.outcomes {
        print_outcome(outcome, dry_run);
    }

    if show_diff && report.changed {
        display_diff(&report.output, &report.before, &report.after);
    }

    print_summary(&report.outcomes);

    if report.written {
        println!("Wrote {}", report.output.display());
    } else if !report.changed {
        println!("{}", "No changes".dimmed());
    }

    Ok(())
}

fn cmd_check(target: Option<PathBuf>, source: &RuleSource, json: bool) -> Result<()> {
    let rule_set = source.load()?;
    let target = resolve_target(target, &rule_set)?;

    let text = read_source(&target)?;
    let outcomes = count_matches(&text, &rule_set.rules);

    if json {
        let report = serde_json::json!({
            "rule_set": rule_set.name(),
            "target": target,
            "outcomes": outcomes,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "Checking rules...".bold());
        println!("Rule set: {}", rule_set.name());
        println!("Target: {}", target.display());
        println!();

        for outcome in &outcomes {
            print_outcome(outcome, true);
        }

        print_summary(&outcomes);
    }

    if outcomes.iter().any(RuleOutcome::is_unmatched) {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(rules_dir: Option<PathBuf>) -> Result<()> {
    println!("{}", "Bundled rule sets:".bold());
    for name in builtin::names() {
        let rule_set = builtin::load(name)?;
        println!(
            "  - {} ({} rules){}",
            name,
            rule_set.rules.len(),
            rule_set
                .meta
                .description
                .as_deref()
                .map(|d| format!(": {}", d.dimmed()))
                .unwrap_or_default()
        );
    }

    let Some(dir) = rules_dir else {
        return Ok(());
    };

    println!();
    println!("{}", format!("Rule sets in {}:", dir.display()).bold());

    let files = discover_rule_files(&dir)?;
    if files.is_empty() {
        println!("{}", "  No .toml rule sets found".yellow());
    }

    for file in files {
        match load_from_path(&file) {
            Ok(rule_set) => println!(
                "  {} {} ({}, {} rules)",
                "✓".green(),
                file.display(),
                rule_set.name(),
                rule_set.rules.len()
            ),
            Err(e) => println!("  {} {}: {}", "✗".red(), file.display(), e),
        }
    }

    Ok(())
}

//! # gchatlog CLI
//!
//! Command-line front end for the gchatlog library. All file handling lives
//! here: opening the archive, loading or creating the alias file and
//! writing the output directory.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::process;
use std::time::Instant;

use chrono::Local;
use clap::Parser as ClapParser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gchatlog::cli::Args;
use gchatlog::core::output::DirectorySink;
use gchatlog::pipeline::PipelineOutput;
use gchatlog::{AliasMap, GchatError, Pipeline};

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins when set
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn load_aliases(path: &Path) -> Result<Option<AliasMap>, GchatError> {
    if !path.is_file() {
        return Ok(None);
    }
    AliasMap::load(path).map(Some)
}

fn run() -> Result<(), GchatError> {
    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();
    init_tracing(args.verbose);

    let alias_path = args.alias_path();
    let config = args.pipeline_config();

    println!("💬 gchatlog v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Archive: {}", args.mbox.display());
    println!("💾 Output:  {}", args.output.display());
    println!("🏷️  Aliases: {}", alias_path.display());
    println!("📄 Records: {}", args.format);
    if args.no_wrap {
        println!("↩️  Wrap:    off (line breaks preserved)");
    }
    println!();

    let existing_aliases = load_aliases(&alias_path)?;
    let created_aliases = existing_aliases.is_none();
    let aliases = existing_aliases.unwrap_or_default();

    println!("⏳ Reading archive...");
    let parse_start = Instant::now();
    let reader = BufReader::new(File::open(&args.mbox)?);
    let pipeline = Pipeline::new(config, aliases, Local);
    let output = pipeline.run(reader)?;
    let report = &output.diagnostics.extract;
    println!(
        "   {} records, {} chat messages in {} conversations ({:.2}s)",
        report.records_seen,
        report.messages,
        output.conversations,
        parse_start.elapsed().as_secs_f64()
    );

    if args.analyze {
        print_analysis(&output);
    }

    println!("💾 Writing output...");
    let mut sink = DirectorySink::new(&args.output);
    sink.prepare()?;
    output.write_to(&mut sink)?;

    if created_aliases {
        write_alias_template(&alias_path, &output)?;
    }

    println!();
    println!("✅ Done! Output saved to {}", args.output.display());

    println!();
    println!("📊 Summary:");
    println!("   Records:       {}", report.records_seen);
    println!("   Not chat:      {}", report.non_chat);
    println!("   Dropped:       {}", report.dropped.len());
    println!("   Messages:      {}", report.messages);
    println!("   Conversations: {}", output.conversations);
    println!("   People:        {}", output.transcripts.len());
    match &output.diagnostics.operator {
        Some(op) => println!("   Operator:      {}", op),
        None => println!("   Operator:      unresolved (set operator_self in the alias file)"),
    }
    if !output.diagnostics.flagged.is_empty() {
        println!(
            "   ⚠️  {} conversations rendered best effort (run with -v for details)",
            output.diagnostics.flagged.len()
        );
    }

    println!();
    println!("⚡ Total time: {:.2}s", total_start.elapsed().as_secs_f64());

    if created_aliases {
        println!(
            "
🏷️  An alias file has been created at '{}'.

Aliases replace addresses in transcripts with names, e.g. 'Alice' instead
of 'alice.liddell@example.com'. Write a name after each address you want
renamed, save, then run gchatlog again.",
            alias_path.display()
        );
    }

    Ok(())
}

fn print_analysis(output: &PipelineOutput) {
    let rule = "*".repeat(79);
    println!("{rule}");
    for anomaly in &output.diagnostics.anomalies {
        println!("{anomaly}");
    }
    println!(
        "Out-of-order timestamps: {}",
        output.diagnostics.anomalies.len()
    );
    for dropped in &output.diagnostics.extract.dropped {
        println!("- Dropped {dropped}");
    }
    println!("{rule}");
}

fn write_alias_template(path: &Path, output: &PipelineOutput) -> Result<(), GchatError> {
    let operator = output.diagnostics.operator.as_deref().or_else(|| {
        output
            .diagnostics
            .inference
            .as_ref()
            .and_then(|i| i.candidate.as_deref())
    });
    let template = AliasMap::template(output.addresses.iter().map(String::as_str), operator);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, template)?;
    Ok(())
}

use anyhow::Result;
use clap::Parser;
use std::path::Path;

// Import from lineatex-core
use lineatex_core::{ParsingConfig, PipelineStages, ReportOutput, ReportProcessor};

#[derive(Parser)]
#[command(name = "lineatex")]
#[command(about = "Converts genealogy report text dumps into cross-linked LaTeX")]
struct Args {
    /// Path to the text dump to process
    #[arg(short, long)]
    input: String,

    /// Output .tex file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// Path for the skipped/degraded entry log
    #[arg(long, default_value = "skipped_entries.log")]
    diagnostics_log: String,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Dump all intermediate pipeline stage outputs to a directory
    /// Captures: normalized text, tagged lines, persons, blocks, and final LaTeX
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output (default: test_outputs/stages)
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🦀 Lineatex Genealogy Converter");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    // Check if input file exists
    if !Path::new(&args.input).exists() {
        println!("⚠️  Input file not found at: {}", args.input);
        println!("   Please check the file path.");
        return Ok(());
    }

    // Load config using the fallback pattern
    let config = ParsingConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    let processor = ReportProcessor::new(config);

    // Text dumps from PDF extraction are not always valid UTF-8
    let bytes = std::fs::read(&args.input)?;
    let text = String::from_utf8_lossy(&bytes);

    println!("📄 Processing: {}", args.input);

    // Stage dump mode: capture and save all intermediates
    if args.dump_stages {
        println!("\n🔬 Pipeline stage dump mode");
        match processor.process_capture_stages(&text) {
            Ok((_, stages)) => {
                save_stages(&stages, &args.input, &args.stages_dir)?;
                println!("\n✅ All stages dumped to: {}", args.stages_dir);
            }
            Err(e) => {
                eprintln!("❌ Stage dump failed: {e}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    match processor.process_profiled(&text, args.profile) {
        Ok(output) => {
            println!("✅ Successfully processed report");
            println!("📊 Output metrics:");
            println!("   - Persons: {}", output.counts.persons);
            println!("   - Generations: {}", output.counts.generations);
            println!("   - Marriages: {}", output.counts.marriages);
            println!(
                "   - Children: {} ({} linked)",
                output.counts.children, output.counts.linked_children
            );

            let output_path = args.output.clone().unwrap_or_else(|| {
                let input_name = Path::new(&args.input)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("output");
                format!("{input_name}_entries.tex")
            });
            save_output(&output, &output_path, &args.diagnostics_log)?;
        }
        Err(e) => {
            eprintln!("❌ Processing failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --config <path>           Load custom config file");
    println!("  --input <path>            Text dump to process");
    println!("  --output <path>           Output .tex path (auto-generated if not specified)");
    println!("  --diagnostics-log <path>  Where to write the skipped-entry log");
    println!("  --profile                 Print per-step timings");
    println!("  --dump-stages             Save every intermediate pipeline stage");

    println!("\n📁 Config file sections (YAML):");
    println!("  classifier  - line patterns and thresholds");
    println!("  linker      - honorific strip list, generation adjacency");
    println!("  emitter     - escaping and URL wrapping");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i report.txt");
    println!("  cargo run -- -i report.txt -o /path/to/entries.tex");
    println!("  cargo run -- -i report.txt -c config.yaml --profile");
}

fn save_output(output: &ReportOutput, output_path: &str, diagnostics_log: &str) -> Result<()> {
    std::fs::write(output_path, &output.latex)?;
    println!("💾 LaTeX saved to: {}", output_path);

    if output.diagnostics.is_empty() {
        println!("📋 No skipped or degraded entries");
    } else {
        let report = output.diagnostics.render_report(&output.input_hash);
        std::fs::write(diagnostics_log, report)?;
        println!(
            "⚠️  {} skipped/degraded entries logged to: {}",
            output.diagnostics.len(),
            diagnostics_log
        );
    }

    Ok(())
}

fn save_stages(stages: &PipelineStages, input: &str, output_dir: &str) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    // Stage 1: normalized input text
    let text_path = format!("{}/stage1_normalized.txt", output_dir);
    fs::write(&text_path, &stages.normalized_text)?;
    println!("  💾 {}", text_path);

    // Stage 2: tagged lines
    let tags_path = format!("{}/stage2_tagged_lines.json", output_dir);
    let tags_json = serde_json::to_string_pretty(&stages.tagged_lines)?;
    fs::write(&tags_path, &tags_json)?;
    println!("  💾 {} ({} lines)", tags_path, stages.tagged_lines.len());

    // Stage 3: parsed persons
    let persons_path = format!("{}/stage3_persons.json", output_dir);
    let persons_json = serde_json::to_string_pretty(&stages.persons)?;
    fs::write(&persons_path, &persons_json)?;
    println!("  💾 {} ({} persons)", persons_path, stages.persons.len());

    // Stage 4: block stream
    let blocks_path = format!("{}/stage4_blocks.json", output_dir);
    let blocks_json = serde_json::to_string_pretty(&stages.blocks)?;
    fs::write(&blocks_path, &blocks_json)?;
    println!("  💾 {} ({} blocks)", blocks_path, stages.blocks.len());

    // Stage 5: final LaTeX
    let latex_path = format!("{}/stage5_output.tex", output_dir);
    fs::write(&latex_path, &stages.latex)?;
    println!("  💾 {}", latex_path);

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input": input,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "normalized_bytes": stages.normalized_text.len(),
            "tagged_lines": stages.tagged_lines.len(),
            "persons": stages.persons.len(),
            "blocks": stages.blocks.len(),
            "latex_bytes": stages.latex.len(),
        }
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}

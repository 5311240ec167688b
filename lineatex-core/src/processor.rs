use crate::config::ParsingConfig;
use crate::diagnostics::{calculate_input_hash, DiagnosticLog};
use crate::emitter::{render_document, LatexBlock, LatexEmitter};
use crate::parser::EntryParser;
use crate::types::Person;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

/// Replace the typographic characters PDF text extraction produces with
/// their plain equivalents so the classification regexes see one spelling.
pub fn normalize_text(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "--")
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputCounts {
    pub persons: usize,
    pub generations: usize,
    pub marriages: usize,
    pub children: usize,
    pub linked_children: usize,
    pub diagnostics: usize,
}

/// Everything one run produces: the rendered document, the block stream it
/// was rendered from, and the operator-facing side channels.
#[derive(Debug)]
pub struct ReportOutput {
    pub latex: String,
    pub blocks: Vec<LatexBlock>,
    pub diagnostics: DiagnosticLog,
    pub input_hash: String,
    pub counts: OutputCounts,
}

/// Intermediate pipeline state captured for debugging dumps
#[derive(Debug, Serialize)]
pub struct PipelineStages {
    pub normalized_text: String,
    pub tagged_lines: Vec<TaggedLine>,
    pub persons: Vec<Person>,
    pub blocks: Vec<LatexBlock>,
    pub latex: String,
}

#[derive(Debug, Serialize)]
pub struct TaggedLine {
    pub line: usize,
    pub tag: String,
    pub text: String,
}

// ===== PROFILING =====

/// Wall-clock timing per pipeline step, printed at the end of a run
pub struct StepProfiler {
    enabled: bool,
    steps: Vec<(String, f64)>,
    current: Option<(String, Instant)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            steps: Vec::new(),
            current: None,
        }
    }

    pub fn start(&mut self, name: &str) {
        if !self.enabled {
            return;
        }
        self.finish_current();
        self.current = Some((name.to_string(), Instant::now()));
    }

    fn finish_current(&mut self) {
        if let Some((name, started)) = self.current.take() {
            self.steps.push((name, started.elapsed().as_secs_f64()));
        }
    }

    pub fn finish(&mut self) {
        if !self.enabled {
            return;
        }
        self.finish_current();
        let total: f64 = self.steps.iter().map(|(_, s)| s).sum();
        println!("⏱️  Step timings:");
        for (name, seconds) in &self.steps {
            println!("   {name}: {:.3}s", seconds);
        }
        println!("   total: {total:.3}s");
    }
}

// ===== PIPELINE =====

/// Two-pass pipeline over one text dump: parse every entry into the
/// registry, freeze it, then link and emit against the complete registry.
pub struct ReportProcessor {
    config: ParsingConfig,
}

impl ReportProcessor {
    pub fn new(config: ParsingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    pub fn process_text(&self, text: &str) -> Result<ReportOutput> {
        self.process_profiled(text, false)
    }

    pub fn process_profiled(&self, text: &str, profile: bool) -> Result<ReportOutput> {
        let mut profiler = StepProfiler::new(profile);
        let input_hash = calculate_input_hash(text);

        profiler.start("normalize");
        let normalized = self.normalized(text);

        profiler.start("parse");
        let parser = EntryParser::new(&self.config)?;
        let mut diagnostics = DiagnosticLog::new();
        let registry = parser.parse(&normalized, &mut diagnostics).freeze();
        println!(
            "📄 Parsed {} entries ({} diagnostics)",
            registry.len(),
            diagnostics.len()
        );

        profiler.start("link+emit");
        let emitter = LatexEmitter::new(&registry, &self.config)?;
        let blocks = emitter.emit();
        let latex = render_document(&blocks);

        let counts = count_output(&registry.iter().cloned().collect::<Vec<_>>(), &blocks, &diagnostics);
        println!(
            "✅ Emitted {} blocks: {} persons, {} marriages, {} children ({} linked)",
            blocks.len(),
            counts.persons,
            counts.marriages,
            counts.children,
            counts.linked_children
        );

        profiler.finish();
        Ok(ReportOutput {
            latex,
            blocks,
            diagnostics,
            input_hash,
            counts,
        })
    }

    /// Same pipeline, additionally capturing every intermediate stage
    pub fn process_capture_stages(&self, text: &str) -> Result<(ReportOutput, PipelineStages)> {
        let input_hash = calculate_input_hash(text);
        let normalized = self.normalized(text);

        let parser = EntryParser::new(&self.config)?;
        let tagged_lines: Vec<TaggedLine> = parser
            .classify_lines(&normalized)
            .into_iter()
            .zip(normalized.lines())
            .map(|((line, tag), text)| TaggedLine {
                line,
                tag: tag.name().to_string(),
                text: text.to_string(),
            })
            .collect();

        let mut diagnostics = DiagnosticLog::new();
        let registry = parser.parse(&normalized, &mut diagnostics).freeze();
        let persons: Vec<Person> = registry.iter().cloned().collect();

        let emitter = LatexEmitter::new(&registry, &self.config)?;
        let blocks = emitter.emit();
        let latex = render_document(&blocks);

        let counts = count_output(&persons, &blocks, &diagnostics);
        let output = ReportOutput {
            latex: latex.clone(),
            blocks: blocks.clone(),
            diagnostics,
            input_hash,
            counts,
        };
        let stages = PipelineStages {
            normalized_text: normalized,
            tagged_lines,
            persons,
            blocks,
            latex,
        };
        Ok((output, stages))
    }

    fn normalized(&self, text: &str) -> String {
        if self.config.normalize_input {
            normalize_text(text)
        } else {
            text.to_string()
        }
    }
}

fn count_output(persons: &[Person], blocks: &[LatexBlock], diagnostics: &DiagnosticLog) -> OutputCounts {
    let generations: HashSet<&str> = persons
        .iter()
        .filter_map(|p| p.generation.as_ref())
        .map(|g| g.label.as_str())
        .collect();
    OutputCounts {
        persons: persons.len(),
        generations: generations.len(),
        marriages: persons.iter().map(|p| p.marriages.len()).sum(),
        children: persons
            .iter()
            .flat_map(|p| &p.marriages)
            .map(|m| m.children.len())
            .sum(),
        linked_children: blocks
            .iter()
            .filter(|b| matches!(b, LatexBlock::ChildLinked { .. }))
            .count(),
        diagnostics: diagnostics.len(),
    }
}

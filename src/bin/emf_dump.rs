use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{Level, LevelFilter};
use serde::Serialize;
use simplelog::{Config, WriteLogger};

use emfplus::err::DecodeError;
use emfplus::record_types::EMFPLUS_HEADER;
use emfplus::settings::DEFAULT_MAX_EMBEDDING_DEPTH;
use emfplus::{
    CheckSettings, EmfPlusHeader, ExpectedRecord, LogicalRecord, MatchState, RecordOrigin,
    RecordType, StreamItem, collect_stream, parse_expectations, verify_bytes,
};

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq)]
enum EmfOutputFormat {
    Text,
    Jsonl,
}

struct EmfDump {
    settings: CheckSettings,
    inputs: Vec<PathBuf>,
    output_format: EmfOutputFormat,
    expected: Option<Vec<ExpectedRecord>>,
    num_threads: usize,
    verbosity_level: Option<Level>,
}

/// What processing one input produced.
struct FileReport {
    output: String,
    discrepancies: usize,
}

#[derive(Serialize)]
struct RecordLine<'a> {
    file: &'a str,
    depth: usize,
    origin: RecordOrigin,
    record_type: RecordType,
    flags: u16,
    offset: usize,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    emfplus_header: Option<EmfPlusHeader>,
}

#[derive(Serialize)]
struct ProblemLine<'a> {
    file: &'a str,
    depth: usize,
    record_offset: usize,
    problem: &'a DecodeError,
}

#[derive(Serialize)]
struct VerifyLine<'a> {
    file: &'a str,
    verify: &'a MatchState,
}

impl EmfDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let inputs: Vec<PathBuf> = matches
            .get_many::<PathBuf>("INPUT")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        let output_format = match matches.get_one::<String>("output-format").map(String::as_str) {
            Some("jsonl") => EmfOutputFormat::Jsonl,
            _ => EmfOutputFormat::Text,
        };

        let expected = match matches.get_one::<PathBuf>("expect") {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read `{}`", path.display()))?;
                let expected = parse_expectations(&text)
                    .with_context(|| format!("invalid expectation file `{}`", path.display()))?;
                Some(expected)
            }
            None => None,
        };

        let num_threads = matches.get_one::<usize>("num-threads").copied().unwrap_or(0);
        let num_threads = match (cfg!(feature = "multithreading"), num_threads) {
            (true, number) => number,
            (false, 0 | 1) => 1,
            (false, _) => {
                eprintln!(
                    "turned on threads, but emf_dump was compiled without `multithreading` feature! processing files one by one"
                );
                1
            }
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        let max_depth = matches
            .get_one::<usize>("max-depth")
            .copied()
            .unwrap_or(DEFAULT_MAX_EMBEDDING_DEPTH);

        Ok(EmfDump {
            settings: CheckSettings::new()
                .descend_embedded(!matches.get_flag("no-descend"))
                .max_embedding_depth(max_depth)
                .validate_header(!matches.get_flag("no-header-check")),
            inputs,
            output_format,
            expected,
            num_threads,
            verbosity_level,
        })
    }

    /// Main entry point for `EmfDump`. Returns the total number of discrepancies.
    pub fn run(&self) -> Result<usize> {
        self.try_to_initialize_logging();

        if self.inputs.is_empty() {
            bail!("no input files");
        }

        let reports = self.process_all()?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut discrepancies = 0;

        for report in reports {
            out.write_all(report.output.as_bytes())?;
            discrepancies += report.discrepancies;
        }
        out.flush()?;

        Ok(discrepancies)
    }

    #[cfg(feature = "multithreading")]
    fn process_all(&self) -> Result<Vec<FileReport>> {
        use rayon::prelude::*;

        if self.inputs.len() == 1 || self.num_threads == 1 {
            return self.inputs.iter().map(|p| self.process(p)).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
            .context("failed to create thread pool")?;

        // `collect` keeps the input order.
        pool.install(|| self.inputs.par_iter().map(|p| self.process(p)).collect())
    }

    #[cfg(not(feature = "multithreading"))]
    fn process_all(&self) -> Result<Vec<FileReport>> {
        self.inputs.iter().map(|p| self.process(p)).collect()
    }

    fn process(&self, path: &Path) -> Result<FileReport> {
        let data =
            fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
        let name = path.display().to_string();
        let settings = self.settings.clone().description(name.as_str());

        let mut output = String::new();
        for item in collect_stream(&data, &settings) {
            match self.output_format {
                EmfOutputFormat::Text => write_text_item(&mut output, &item)?,
                EmfOutputFormat::Jsonl => write_jsonl_item(&mut output, &name, &item)?,
            }
        }

        let mut discrepancies = 0;
        if let Some(expected) = &self.expected {
            let state = verify_bytes(&data, expected, &settings);
            discrepancies = state.discrepancies.len();

            match self.output_format {
                EmfOutputFormat::Text => {
                    writeln!(
                        output,
                        "{}: {} records, {} discrepancies",
                        name, state.position, discrepancies
                    )?;
                    for d in &state.discrepancies {
                        writeln!(output, "  {}", d)?;
                    }
                }
                EmfOutputFormat::Jsonl => {
                    let line = serde_json::to_string(&VerifyLine {
                        file: &name,
                        verify: &state,
                    })?;
                    writeln!(output, "{}", line)?;
                }
            }
        }

        Ok(FileReport {
            output,
            discrepancies,
        })
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = WriteLogger::init(level.to_level_filter(), Config::default(), io::stderr())
            {
                eprintln!("Failed to initialize logging: {}", e);
            }
        } else {
            log::set_max_level(LevelFilter::Off);
        }
    }
}

/// The typed view of an `EMFPLUS_HEADER` record. Malformed headers are already reported as
/// decode problems of their own, so they are dumped like any other record.
fn emfplus_header(record: &LogicalRecord<'_>) -> Option<EmfPlusHeader> {
    if record.origin != RecordOrigin::EmfPlus || record.record_type != EMFPLUS_HEADER {
        return None;
    }
    EmfPlusHeader::from_data(record.flags, record.data).ok()
}

fn write_text_item(out: &mut String, item: &StreamItem<'_>) -> Result<()> {
    match item {
        StreamItem::Record(r) => {
            let indent = "  ".repeat(r.depth);
            match r.origin {
                RecordOrigin::Emf => writeln!(
                    out,
                    "{}{:08x} {} ({} bytes)",
                    indent,
                    r.offset,
                    r.record_type(),
                    r.data.len()
                )?,
                RecordOrigin::EmfPlus => {
                    write!(
                        out,
                        "{}{:08x}   {} flags=0x{:04x} ({} bytes)",
                        indent,
                        r.offset,
                        r.record_type(),
                        r.flags,
                        r.data.len()
                    )?;
                    if let Some(header) = emfplus_header(r) {
                        write!(
                            out,
                            " version=0x{:08x} dual={} dpi={}x{}",
                            header.version,
                            header.is_dual(),
                            header.logical_dpi_x,
                            header.logical_dpi_y
                        )?;
                    }
                    writeln!(out)?;
                }
            }
        }
        StreamItem::Problem(p) => writeln!(
            out,
            "{}! {} (record at offset {})",
            "  ".repeat(p.depth),
            p.error,
            p.record_offset
        )?,
        StreamItem::EnterEmbedded { depth, object_id } => writeln!(
            out,
            "{}>> embedded metafile (object {})",
            "  ".repeat(depth.saturating_sub(1)),
            object_id
        )?,
        StreamItem::LeaveEmbedded { depth } => {
            writeln!(out, "{}<<", "  ".repeat(depth.saturating_sub(1)))?
        }
    }
    Ok(())
}

fn write_jsonl_item(out: &mut String, file: &str, item: &StreamItem<'_>) -> Result<()> {
    let line = match item {
        StreamItem::Record(r) => serde_json::to_string(&RecordLine {
            file,
            depth: r.depth,
            origin: r.origin,
            record_type: r.record_type(),
            flags: r.flags,
            offset: r.offset,
            size: r.data.len(),
            emfplus_header: emfplus_header(r),
        })?,
        StreamItem::Problem(p) => serde_json::to_string(&ProblemLine {
            file,
            depth: p.depth,
            record_offset: p.record_offset,
            problem: &p.error,
        })?,
        StreamItem::EnterEmbedded { .. } | StreamItem::LeaveEmbedded { .. } => return Ok(()),
    };
    writeln!(out, "{}", line)?;
    Ok(())
}

fn main() {
    let matches = Command::new("EMF Dump")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Omer B. <omerbenamram@gmail.com>")
        .about("Utility to dump and verify the record stream of EMF / EMF+ metafiles")
        .arg(
            Arg::new("INPUT")
                .required(true)
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "jsonl"])
                .default_value("text")
                .help("Sets the output format")
                .long_help(
                    "Sets the output format:
    \"text\"  - one line per record, indented by embedding depth.
    \"jsonl\" - one JSON object per record or decode problem.",
                ),
        )
        .arg(
            Arg::new("expect")
                .short('e')
                .long("expect")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Verifies every input against the expected record types listed in this file. \
                       Exits with code 1 if any input does not match."),
        )
        .arg(
            Arg::new("no-descend")
                .long("no-descend")
                .action(ArgAction::SetTrue)
                .help("When set, metafiles embedded as EMF+ images are not decoded."),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_parser(clap::value_parser!(usize))
                .help("Sets how deep embedded metafiles are decoded, defaults to 64."),
        )
        .arg(
            Arg::new("no-header-check")
                .long("no-header-check")
                .action(ArgAction::SetTrue)
                .help("When set, EMR_HEADER signature and counts are not validated."),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .default_value("0")
                .value_parser(clap::value_parser!(usize))
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
        .get_matches();

    let app = match EmfDump::from_cli_matches(&matches) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{:?}", e);
            exit(2)
        }
    };

    match app.run() {
        Ok(0) => {}
        Ok(_) => exit(1),
        Err(e) => {
            eprintln!("{:?}", e);
            exit(2)
        }
    }
}

use crate::config::load_config;
use crate::ir::{JobDescriptor, non_empty};
use crate::layout_dump::write_layout_dump;
use crate::render::{
    SldRenderer, Variant, compose_svg, to_data_url, write_output_png, write_output_svg,
};
use crate::symbols::SymbolLibrary;
use crate::validation::validate_job;
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sldr", version, about = "Single line diagram generator for solar PV jobs")]
pub struct Args {
    /// Job descriptor JSON (one job or an array of jobs), or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Directory of component symbol SVGs
    #[arg(long = "symbols")]
    pub symbols: Option<PathBuf>,

    /// Diagram variant
    #[arg(long = "variant", value_enum, default_value = "standard")]
    pub variant: VariantArg,

    /// Emit a base64 data URL instead of raw SVG
    #[arg(long = "dataUrl")]
    pub data_url: bool,

    /// Write the computed zones, positions and wires as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Print the validation report instead of rendering
    #[arg(long = "validate")]
    pub validate: bool,

    /// Log stage details to stderr
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum VariantArg {
    Standard,
    Compliance,
}

impl From<VariantArg> for Variant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Standard => Variant::Standard,
            VariantArg::Compliance => Variant::Compliance,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let jobs = parse_jobs(&input)?;
    if jobs.is_empty() {
        return Err(anyhow::anyhow!("No jobs found in input"));
    }

    if args.validate {
        let mut failed = 0;
        for job in &jobs {
            let report = validate_job(job);
            if let Some(job_number) = non_empty(&job.job_number) {
                println!("# {job_number}");
            }
            print!("{}", report.to_text());
            if !report.is_valid {
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(anyhow::anyhow!("{failed} job(s) failed validation"));
        }
        return Ok(());
    }

    let symbols = match &args.symbols {
        Some(dir) => {
            let library = SymbolLibrary::from_dir(dir);
            library.preload()?;
            library
        }
        None => SymbolLibrary::empty(),
    };
    let renderer = SldRenderer::new(config);
    let variant = Variant::from(args.variant);

    let outputs: Vec<Option<PathBuf>> = if jobs.len() == 1 {
        vec![args.output.clone()]
    } else {
        resolve_multi_outputs(args.output.as_deref(), args.output_format, &jobs)?
            .into_iter()
            .map(Some)
            .collect()
    };

    for (idx, (job, output)) in jobs.iter().zip(outputs).enumerate() {
        let plan = renderer.plan(job)?;
        if let Some(dump) = &args.dump_layout {
            let path = indexed_path(dump, idx, jobs.len());
            write_layout_dump(&path, &plan.layout, &plan.wires)?;
        }
        let svg = compose_svg(job, &plan, &symbols, renderer.config(), variant);
        match args.output_format {
            OutputFormat::Svg if args.data_url => {
                write_output_svg(&to_data_url(&svg), output.as_deref())?;
            }
            OutputFormat::Svg => {
                write_output_svg(&svg, output.as_deref())?;
            }
            OutputFormat::Png => {
                let output = ensure_output(&output, "png")?;
                let config = renderer.config();
                write_output_png(&svg, &output, &config.render, &config.theme)?;
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Accepts a single job object or an array of them.
fn parse_jobs(input: &str) -> Result<Vec<JobDescriptor>> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    let jobs = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<JobDescriptor>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(jobs)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

/// `base` for a single job, `stem-N.ext` beside it for batches.
fn indexed_path(base: &Path, idx: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("layout");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}-{}.{}", stem, idx + 1, ext))
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    jobs: &[JobDescriptor],
) -> Result<Vec<PathBuf>> {
    let ext = match format {
        OutputFormat::Svg => "svg",
        OutputFormat::Png => "png",
    };
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for multiple jobs"))?;
    if base.is_dir() {
        let outputs = jobs
            .iter()
            .enumerate()
            .map(|(idx, job)| {
                let name = non_empty(&job.job_number)
                    .map(|number| number.replace(['/', '\\'], "-"))
                    .unwrap_or_else(|| format!("diagram-{}", idx + 1));
                base.join(format!("{name}.{ext}"))
            })
            .collect();
        return Ok(outputs);
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("diagram");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    let mut outputs = Vec::new();
    for idx in 0..jobs.len() {
        outputs.push(parent.join(format!("{}-{}.{}", stem, idx + 1, ext)));
    }
    Ok(outputs)
}

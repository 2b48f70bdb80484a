use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tomlsite::plugins::{self, Mode};
use tomlsite::registry::common_root;
use tomlsite::{config, output};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let revision = env!("TOMLSITE_REVISION");
    if revision.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{} ({revision})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "tomlsite")]
#[command(about = "Static HTML builder for TOML template trees")]
#[command(long_about = "\
Static HTML builder for TOML template trees

Every .toml file below the input directories is a document. Its [doc] table
is rendered to HTML: table keys become elements, string values become text.
An index.toml supplies its [base] table as defaults to every document in its
directory and below, and documents are linked to each other with generated
navigation.

Site structure:

  site/
  ├── tomlsite.toml          # Build settings (optional)
  ├── index.toml             # Root index → index.html
  ├── about.toml             # Page → about.html
  ├── style.css              # Asset, copied as-is
  └── guide/
      ├── index.toml         # Section index → guide/index.html
      └── install.toml       # Page → guide/install.html

Run 'tomlsite gen-config' to generate a documented tomlsite.toml.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build {
        /// Input directories
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short, default_value = "output")]
        output: PathBuf,

        /// Also write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run every phase without writing output
    Check {
        /// Input directories
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },
    /// Print a stock tomlsite.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            paths,
            output: out_dir,
            report,
        } => {
            let run = run_site(&paths, &out_dir, Mode::Build)?;
            if let Some(report_path) = report {
                let json = serde_json::to_string_pretty(&run)?;
                std::fs::write(&report_path, json)?;
            }
            output::print_run_output(&run);
            finish(&run)?;
        }
        Command::Check { paths } => {
            // Nothing is written, so any output path will do.
            let run = run_site(&paths, Path::new("output"), Mode::Check)?;
            output::print_run_output(&run);
            finish(&run)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the site config from the common root of `paths` and run the pipeline.
fn run_site(
    paths: &[PathBuf],
    output: &Path,
    mode: Mode,
) -> Result<tomlsite::pipeline::RunReport, Box<dyn std::error::Error>> {
    let absolute = paths
        .iter()
        .map(std::path::absolute)
        .collect::<Result<Vec<_>, _>>()?;
    let root = common_root(&absolute).ok_or("input paths share no common directory")?;
    let site_config = config::load_config(&root)?;
    let mut pipeline = plugins::pipeline(site_config, mode);
    Ok(pipeline.run(&absolute, output)?)
}

fn finish(run: &tomlsite::pipeline::RunReport) -> Result<(), Box<dyn std::error::Error>> {
    if run.is_success() {
        return Ok(());
    }
    let failed = run.failed_documents().count();
    Err(format!(
        "{failed} document(s) failed, {} phase(s) aborted",
        run.failures.len()
    )
    .into())
}

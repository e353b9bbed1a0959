use clap::{Parser, Subcommand};
use notebook_site::builder::{self, BuildMode, BuildOptions};
use notebook_site::bundle::FsBundleStore;
use notebook_site::descriptor::{DESCRIPTOR_FILE, SiteTree};
use notebook_site::paths::PathResolver;
use notebook_site::{config, manifest, output, render};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notebook-site")]
#[command(about = "Static site builder for handwritten notebooks")]
#[command(long_about = "\
Static site builder for handwritten notebooks

A JSON manifest describes the folder hierarchy; every document names a bundle
of rendered page images. The builder stages every page under a filesystem-safe
path and renders a browsable site around them.

Inputs:

  manifest.json                    # Hierarchy of folders and documents
  config.toml                      # Site config (optional, next to the manifest)
  bundles/
  ├── 1a2b3c/                      # Bundle directory named by identifier
  │   ├── 1.svg                    # Pages, numbered from 1
  │   ├── 2.svg
  │   └── thumbnail.png            # Optional cover (defaults to page 1)
  └── 4d5e6f.zip                   # Or the same layout as a zip archive

Manifest shape:

  {
    \"logo\": \"7a8b9c\",
    \"documents\": { \"Home\": \"1a2b3c\" },
    \"folders\": {
      \"Posts\": { \"documents\": { \"Boxes + Arrows\": \"4d5e6f\" } }
    }
  }

Run 'notebook-site gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Manifest describing the hierarchy
    #[arg(long, default_value = "manifest.json", global = true)]
    manifest: PathBuf,

    /// Directory holding one bundle per identifier
    #[arg(long, default_value = "bundles", global = true)]
    bundles: PathBuf,

    /// Output directory
    #[arg(long, default_value = "site", global = true)]
    output: PathBuf,

    /// Directory containing config.toml (defaults to the manifest's directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress (same as RUST_LOG=info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every bundle, stage pages and render the site
    Build {
        /// Skip documents whose bundle cannot be resolved instead of failing
        #[arg(long)]
        best_effort: bool,

        /// Staging workers (capped at the number of cores)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Re-render HTML from an existing site.json
    Render,
    /// Validate the manifest and show the path every node would get
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Command::Build { best_effort, jobs } => {
            let site_config = config::load_config(&config_dir(&cli))?;
            let tree = manifest::load(&cli.manifest)?;
            let store = FsBundleStore::new(&cli.bundles);
            let resolver = PathResolver::from_config(&site_config);

            let mut options = BuildOptions::from_config(&site_config);
            if *best_effort {
                options.mode = BuildMode::BestEffort;
            }
            if let Some(jobs) = *jobs {
                let processing = config::ProcessingConfig {
                    max_processes: Some(jobs.max(1)),
                };
                options.threads = config::effective_threads(&processing);
            }

            println!("{}", output::format_build_banner(tree.documents().len()));
            let report =
                builder::build_with_options(&tree, &store, &resolver, &cli.output, &options)?;
            output::print_build_output(&report);

            println!("{}", output::format_render_banner(&cli.output));
            render::render_site(&report.site, &cli.output, &site_config)?;

            println!("==> Build complete: {}", cli.output.display());
            println!("Digest: {}", builder::digest_output(&cli.output)?);
        }
        Command::Render => {
            let site_config = config::load_config(&config_dir(&cli))?;
            let json = std::fs::read_to_string(cli.output.join(DESCRIPTOR_FILE))?;
            let site = SiteTree::from_json(&json)?;
            println!("{}", output::format_render_banner(&cli.output));
            let summary = render::render_site(&site, &cli.output, &site_config)?;
            println!(
                "Rendered {} galleries, {} documents, {} page views",
                summary.galleries, summary.documents, summary.viewers
            );
        }
        Command::Check => {
            let site_config = config::load_config(&config_dir(&cli))?;
            println!("==> Checking {}", cli.manifest.display());
            let tree = manifest::load(&cli.manifest)?;
            let paths = PathResolver::from_config(&site_config).assign(&tree)?;
            output::print_check_output(&tree, &paths);
            println!("==> Manifest is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `--config` if given, else the directory holding the manifest.
fn config_dir(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(|| {
        cli.manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tagstep_catalog::{FsCatalog, ImageCatalog, RegistryHosts};
use tagstep_config::{JobDef, JobSpec};
use tagstep_graph::StepGraph;
use tagstep_step::{OutputImageTagStep, ParameterError, Step, StepLink};

/// tagstep - converge image stream tags from job definitions
#[derive(Parser)]
#[command(name = "tagstep")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the catalog directory (default: catalog root of the job, then ~/.tagstep/catalog)
  #[arg(long, global = true)]
  catalog_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the steps of a job
  Run {
    /// Path to the job file (JSON)
    job_file: PathBuf,

    /// Print the objects that would be created instead of creating them
    #[arg(long)]
    dry_run: bool,

    /// Override the job namespace
    #[arg(long)]
    namespace: Option<String>,
  },

  /// Print the order the steps of a job run in
  Graph {
    /// Path to the job file (JSON)
    job_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      job_file,
      dry_run,
      namespace,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_job(job_file, cli.catalog_dir, namespace, dry_run))?;
    }
    Some(Commands::Graph { job_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(print_graph(job_file, cli.catalog_dir))?;
    }
    None => {
      println!("tagstep - use --help to see available commands");
    }
  }

  Ok(())
}

async fn load_job(job_file: &Path) -> Result<JobDef> {
  let content = tokio::fs::read_to_string(job_file)
    .await
    .with_context(|| format!("failed to read job file: {}", job_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse job file: {}", job_file.display()))
}

fn open_catalog(job: &JobDef, catalog_dir: Option<PathBuf>) -> Result<Arc<dyn ImageCatalog>> {
  let root = match catalog_dir.or_else(|| job.catalog.root.clone()) {
    Some(root) => root,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".tagstep")
      .join("catalog"),
  };

  info!(root = %root.display(), "using filesystem catalog");
  let catalog = FsCatalog::new(root).with_registry_hosts(RegistryHosts {
    internal: job.catalog.registry_host.clone(),
    public: job.catalog.public_registry_host.clone(),
  });
  Ok(Arc::new(catalog))
}

fn build_steps(job: &JobDef, catalog: Arc<dyn ImageCatalog>) -> Vec<Box<dyn Step>> {
  let job_spec = Arc::new(JobSpec::new(job.namespace.clone()));
  job
    .output_image_tags
    .iter()
    .map(|config| {
      Box::new(OutputImageTagStep::new(
        config.clone(),
        Arc::clone(&catalog),
        Arc::clone(&job_spec),
      )) as Box<dyn Step>
    })
    .collect()
}

/// Links produced outside this job: pipeline images no other step here
/// creates, and the release images.
fn external_links(steps: &[Box<dyn Step>]) -> Vec<StepLink> {
  let mut links: Vec<StepLink> = Vec::new();
  for (i, step) in steps.iter().enumerate() {
    let created_by_others: HashSet<StepLink> = steps
      .iter()
      .enumerate()
      .filter(|&(j, _)| j != i)
      .flat_map(|(_, other)| other.creates())
      .collect();
    links.extend(
      step
        .requires()
        .into_iter()
        .filter(|link| matches!(link, StepLink::InternalImage(_) | StepLink::ReleaseImages))
        .filter(|link| !created_by_others.contains(link)),
    );
  }
  links.sort();
  links.dedup();
  links
}

async fn run_job(
  job_file: PathBuf,
  catalog_dir: Option<PathBuf>,
  namespace: Option<String>,
  dry_run: bool,
) -> Result<()> {
  let mut job = load_job(&job_file).await?;
  if let Some(namespace) = namespace {
    job.namespace = namespace;
  }
  info!(namespace = %job.namespace, steps = job.output_image_tags.len(), "loaded job");

  let catalog = open_catalog(&job, catalog_dir)?;
  let steps = build_steps(&job, catalog);
  let graph =
    StepGraph::new(&steps, &external_links(&steps)).context("failed to build step graph")?;

  let cancel = CancellationToken::new();
  let signal_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling");
      signal_cancel.cancel();
    }
  });

  for &i in graph.order() {
    let step = &steps[i];

    if !dry_run {
      let done = step
        .done(&cancel)
        .await
        .with_context(|| format!("step {} ({}) failed", step.name(), step.description()))?;
      if done {
        info!(step = %step.name(), "already done, skipping");
        continue;
      }
    }

    info!(step = %step.name(), "{}", step.description());
    step
      .run(dry_run, &cancel)
      .await
      .with_context(|| format!("step {} ({}) failed", step.name(), step.description()))?;
  }

  if dry_run {
    return Ok(());
  }

  for step in &steps {
    let (Some(parameters), _) = step.provides() else {
      continue;
    };
    for (name, parameter) in parameters {
      match parameter.resolve_with_cancel(&cancel).await {
        Ok(value) => println!("{}={}", name, value),
        Err(ParameterError::Cancelled) => {
          anyhow::bail!("cancelled while resolving parameter {}", name)
        }
        Err(e) => {
          warn!(step = %step.name(), parameter = %name, error = %e, "could not resolve parameter");
        }
      }
    }
  }

  Ok(())
}

async fn print_graph(job_file: PathBuf, catalog_dir: Option<PathBuf>) -> Result<()> {
  let job = load_job(&job_file).await?;
  let catalog = open_catalog(&job, catalog_dir)?;
  let steps = build_steps(&job, catalog);
  let graph =
    StepGraph::new(&steps, &external_links(&steps)).context("failed to build step graph")?;

  for &i in graph.order() {
    let step = &steps[i];
    println!("{}\t{}", step.name(), step.description());
    for upstream in graph.upstream(&step.name()) {
      println!("  after {}", upstream);
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tagstep_catalog::InMemoryCatalog;
  use tagstep_config::{ImageStreamTagReference, OutputImageTagStepConfiguration};

  fn create_job(outputs: &[(&str, &str)]) -> JobDef {
    let mut job: JobDef = serde_json::from_str(r#"{"namespace": "ci"}"#).unwrap();
    job.output_image_tags = outputs
      .iter()
      .map(|(from, as_name)| OutputImageTagStepConfiguration {
        from: (*from).into(),
        to: ImageStreamTagReference {
          namespace: String::new(),
          name: "stable".to_string(),
          tag: as_name.to_string(),
          as_name: as_name.to_string(),
        },
      })
      .collect();
    job
  }

  #[test]
  fn test_pipeline_image_republished_under_same_name_is_external() {
    let job = create_job(&[("bin", "bin")]);
    let steps = build_steps(&job, Arc::new(InMemoryCatalog::new()));

    let links = external_links(&steps);
    assert!(links.contains(&StepLink::internal_image("bin")));

    let graph = StepGraph::new(&steps, &links).unwrap();
    assert_eq!(graph.ordered_names(), vec!["bin"]);
  }

  #[test]
  fn test_image_created_by_another_step_is_not_external() {
    let job = create_job(&[("app", "tests"), ("tests", "release")]);
    let steps = build_steps(&job, Arc::new(InMemoryCatalog::new()));

    let links = external_links(&steps);
    assert!(links.contains(&StepLink::internal_image("app")));
    assert!(!links.contains(&StepLink::internal_image("tests")));

    let graph = StepGraph::new(&steps, &links).unwrap();
    assert_eq!(graph.ordered_names(), vec!["tests", "release"]);
  }
}

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow, bail};
use barcode_workflow::{
    config::Config,
    ingest::RawFile,
    label::LabelFields,
    progress::{self, NullReporter, ProgressReporter},
    remote::{GenerationOptions, GenerationService, http::HttpClient},
    results::ResultView,
    template,
    workflow::{Mode, Workflow, WorkflowState},
};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools as _;
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "Generate IMEI barcode labels from spreadsheets")]
struct Opts {
    #[clap(short, long, env = "BARCODE_WORKFLOW_CONFIG")]
    config: Option<PathBuf>,
    /// Override the service endpoint from the config file.
    #[clap(long)]
    endpoint: Option<url::Url>,
    /// Hide progress output.
    #[clap(short, long)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the generation service is reachable.
    Health,
    /// Decode a spreadsheet and show the rows that would be labelled.
    Preview { file: PathBuf },
    /// Generate labels for a spreadsheet.
    Generate(GenerateArgs),
    /// List files in the service archive.
    Files,
    /// Show archive statistics.
    Stats,
    /// Download a label or PDF sheet.
    Download {
        id: String,
        /// The identifier names a PDF sheet.
        #[clap(long)]
        archive: bool,
        #[clap(short, long)]
        out: PathBuf,
    },
    /// Write a sample spreadsheet.
    Template { path: PathBuf },
}

#[derive(Args)]
struct GenerateArgs {
    file: PathBuf,
    /// Upload the file without decoding it locally.
    #[clap(long)]
    direct: bool,
    /// Record ids to generate, e.g. `1,3,4`. Defaults to every record.
    #[clap(long, value_delimiter = ',', conflicts_with = "direct")]
    select: Vec<usize>,
    /// Skip the PDF sheet.
    #[clap(long)]
    no_pdf: bool,
    #[clap(long)]
    cols: Option<u32>,
    #[clap(long)]
    rows: Option<u32>,
    /// Do not derive the second IMEI on the service.
    #[clap(long)]
    no_auto_imei: bool,
    /// Download the generated files into this directory.
    #[clap(short, long)]
    out: Option<PathBuf>,
}

impl GenerateArgs {
    fn options(&self, defaults: GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            produce_archive: defaults.produce_archive && !self.no_pdf,
            grid_cols: self.cols.unwrap_or(defaults.grid_cols),
            grid_rows: self.rows.unwrap_or(defaults.grid_rows),
            derive_secondary: defaults.derive_secondary && !self.no_auto_imei,
        }
        .clamped()
    }
}

async fn load_config(opts: &Opts) -> anyhow::Result<Config> {
    let mut config = match &opts.config {
        Some(path) => Config::load(path)
            .await
            .with_context(|| format!("load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(endpoint) = &opts.endpoint {
        config.endpoint = endpoint.clone();
    }
    config.validate().map_err(|msg| anyhow!("{msg}"))?;
    Ok(config)
}

fn print_records(workflow: &Workflow<HttpClient>) {
    let Some(records) = workflow.records() else {
        return;
    };
    println!("columns: {}", records.mapping().names().iter().join(", "));
    for record in records {
        let label = LabelFields::from_record(record);
        println!(
            "{:>4}  {:<16} {:<10} {:<16} {}",
            record.id,
            label.imei.as_deref().unwrap_or("-"),
            label.model,
            label.color,
            label.box_id.as_deref().unwrap_or("-"),
        );
    }
}

fn print_results(view: &ResultView) {
    for artifact in &view.artifacts {
        println!("{:>4}  {}", artifact.position, artifact.id);
    }
    if let Some(archive) = &view.archive {
        println!(" pdf  {}", archive.id);
    }
}

async fn save(path: &Path, body: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), size = body.len(), "saved");
    Ok(())
}

async fn download_all(client: &HttpClient, view: &ResultView, dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create {}", dir.display()))?;
    for artifact in &view.artifacts {
        let body = client.download_artifact(&artifact.id).await?;
        save(&dir.join(artifact.file_name()), &body).await?;
    }
    if let Some(archive) = &view.archive {
        let body = client.download_archive(&archive.id).await?;
        save(&dir.join(archive.file_name()), &body).await?;
    }
    Ok(())
}

fn reporter(quiet: bool) -> Arc<dyn ProgressReporter> {
    if quiet {
        Arc::new(NullReporter)
    } else {
        progress::create_reporter()
    }
}

async fn preview(
    client: HttpClient,
    defaults: GenerationOptions,
    file: &Path,
    reporter: Arc<dyn ProgressReporter>,
) -> anyhow::Result<()> {
    let mut workflow = Workflow::new(client, defaults);
    let display = tokio::spawn(progress::drive(reporter.clone(), workflow.subscribe()));
    workflow
        .ingest(RawFile::from_path(file).await?, Mode::Preview)
        .await?;
    let outcome = match workflow.state() {
        WorkflowState::Failed(reason) => {
            reporter.log_warn(&format!("{} could not be previewed", file.display()));
            Err(anyhow!("{reason}"))
        }
        _ => {
            print_records(&workflow);
            Ok(())
        }
    };
    drop(workflow);
    display.await.ok();
    reporter.finish();
    outcome
}

async fn generate(
    client: HttpClient,
    defaults: GenerationOptions,
    args: GenerateArgs,
    reporter: Arc<dyn ProgressReporter>,
) -> anyhow::Result<()> {
    let options = args.options(defaults);
    let mut workflow = Workflow::new(client, options);
    let display = tokio::spawn(progress::drive(reporter.clone(), workflow.subscribe()));

    let file = RawFile::from_path(&args.file).await?;
    let mode = if args.direct { Mode::Direct } else { Mode::Preview };
    workflow.ingest(file, mode).await?;
    if mode == Mode::Preview && workflow.records().is_some() {
        if args.select.is_empty() {
            workflow.select_all()?;
        } else {
            workflow.select(args.select.iter().copied())?;
        }
        workflow.generate().await?;
    }

    let outcome = match workflow.state() {
        WorkflowState::Completed(result) => {
            let view = ResultView::from(result);
            print_results(&view);
            match &args.out {
                Some(dir) => download_all(workflow.service(), &view, dir)
                    .await
                    .map(|()| reporter.log_info(&format!("saved to {}", dir.display()))),
                None => Ok(()),
            }
        }
        WorkflowState::Failed(reason) => {
            reporter.log_warn("select a new file to start over");
            Err(anyhow!("{reason}"))
        }
        state => Err(anyhow!("workflow stopped in state {}", state.name())),
    };
    drop(workflow);
    display.await.ok();
    reporter.finish();
    outcome
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = load_config(&opts).await?;
    let client = HttpClient::new(config.endpoint.clone(), config.timeout())?;
    match opts.command {
        Command::Health => {
            let reachability = client.health().await;
            if !reachability.is_reachable() {
                bail!("{} is unreachable: {reachability:?}", client.base());
            }
            println!("{} is reachable", client.base());
        }
        Command::Preview { file } => {
            preview(client, config.defaults, &file, reporter(opts.quiet)).await?
        }
        Command::Generate(args) => {
            generate(client, config.defaults, args, reporter(opts.quiet)).await?
        }
        Command::Files => {
            for file in client.list_files().await? {
                println!("{:?}\t{}\t{}", file.kind, file.size, file.name);
            }
        }
        Command::Stats => {
            let stats = client.archive_stats().await?;
            println!("files:    {}", stats.total_files);
            println!("png:      {}", stats.png_files);
            println!("pdf:      {}", stats.pdf_files);
            println!("size:     {} bytes", stats.total_size);
            println!("sessions: {}", stats.sessions);
        }
        Command::Download { id, archive, out } => {
            let body = if archive {
                client.download_archive(&id).await?
            } else {
                client.download_artifact(&id).await?
            };
            save(&out, &body).await?;
        }
        Command::Template { path } => template::write_sample(&path).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = run(opts).await {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}

//! Taxifare - pipeline step CLI
//!
//! The `taxifare` command runs the taxifare pipeline steps outside the
//! pipeline runtime and triggers or schedules pipeline runs.
//!
//! ## Commands
//!
//! - `select-trial`: best parameters among tuning trials
//! - `arbitrate`: champion/challenger decision on one metric
//! - `upload-best-model` / `lookup-model`: registry steps on local backends
//! - `tuning-results`, `custom-job-results`, `batch-predict`, `extract-table`:
//!   job steps replayed against a local job table
//! - `trigger`, `trigger-from-payload`, `handle-event`, `on-training-complete`,
//!   `schedule`: pipeline runs
//! - `upload-pipeline`: publish a compiled pipeline template

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

use taxifare_core::metrics::METRICS;
use taxifare_core::trigger::trigger_parameters;
use taxifare_core::worker_pool::{training_args, with_args, WorkerPoolSpec};
use taxifare_core::{
    arbitrate, convert_payload, extract_table_to_gcs, get_custom_job_results,
    get_hyperparameter_tuning_results, handle_table_change, lookup_model, model_batch_predict,
    on_training_complete, schedule_pipeline, select_best, single_goal, trigger_pipeline,
    trigger_pipeline_from_payload, upload_best_model, upload_pipeline_template,
    wait_for_pipeline, BatchPredictRequest, MetricGoal, MetricSpec, ModelEvaluation, Parameters,
    PipelineKind, Settings, TableReference, Trial, TriggerConfig, UploadBestModelRequest,
};
use taxifare_state::{
    FsArtifactStore, FsJobService, FsModelRegistry, HttpPipelineService, HttpTemplateRegistry,
    JobService, PipelineApiConfig, PipelineJobRequest, PipelineService, ScheduleRequest,
    TemplateRegistry,
};

#[derive(Parser)]
#[command(name = "taxifare")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Taxifare MLOps pipeline steps", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Local backends for the registry steps.
#[derive(Args, Debug, Clone)]
struct LocalBackend {
    /// Directory standing in for the `gs://` buckets
    #[arg(long, env = "TAXIFARE_ARTIFACT_ROOT", default_value = ".taxifare/artifacts")]
    artifact_root: PathBuf,

    /// JSON document holding the model registry
    #[arg(long, env = "TAXIFARE_REGISTRY", default_value = ".taxifare/registry.json")]
    registry: PathBuf,

    /// JSON document holding the custom, tuning and batch job table
    #[arg(long, env = "TAXIFARE_JOBS", default_value = ".taxifare/jobs.json")]
    jobs: PathBuf,

    #[arg(long, env = "VERTEX_PROJECT_ID")]
    project: String,

    #[arg(long, env = "VERTEX_LOCATION")]
    location: String,
}

/// Credentials for the pipeline REST API.
#[derive(Args, Debug, Clone)]
struct ApiArgs {
    /// OAuth bearer token
    #[arg(long, env = "VERTEX_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Override the regional API endpoint
    #[arg(long, env = "VERTEX_API_ENDPOINT")]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parameters of the best trial
    SelectTrial {
        /// JSON array of trials (`parameters`, `final_metric_value`)
        #[arg(long)]
        trials: PathBuf,

        /// Optimization goal
        #[arg(long, conflicts_with = "study", required_unless_present = "study")]
        goal: Option<MetricGoal>,

        /// JSON array of study metric specs
        #[arg(long)]
        study: Option<PathBuf>,
    },

    /// Decide whether a challenger replaces the champion
    Arbitrate {
        /// Challenger metrics JSON
        #[arg(long)]
        challenger: PathBuf,

        /// Champion metrics JSON (omit when no model is registered)
        #[arg(long)]
        champion: Option<PathBuf>,

        #[arg(long, default_value = "rootMeanSquaredError")]
        metric: String,

        #[arg(long)]
        lower_is_better: bool,
    },

    /// Print the training container arguments
    TrainingArgs {
        #[arg(long)]
        train_data: String,
        #[arg(long)]
        valid_data: String,
        #[arg(long)]
        test_data: String,
        #[arg(long)]
        hypertune: bool,
    },

    /// Append arguments and env vars to worker pool specs
    WorkerPoolSpec {
        /// JSON array of worker pool specs
        #[arg(long)]
        specs: PathBuf,

        /// JSON object of training arguments
        #[arg(long)]
        args: Option<PathBuf>,

        /// JSON object of hyperparameters
        #[arg(long)]
        hyperparams: Option<PathBuf>,

        /// Environment variable as KEY=VALUE (repeatable)
        #[arg(long = "env", value_parser = parse_key_val)]
        env: Vec<(String, String)>,
    },

    /// Upload a challenger, promoting it if it beats the champion
    UploadBestModel {
        #[command(flatten)]
        backend: LocalBackend,

        #[arg(long, default_value = "taxi-traffic-model")]
        model_name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Challenger model artifacts
        #[arg(long)]
        artifact_uri: String,
        #[arg(long, default_value = "us-docker.pkg.dev/vertex-ai/prediction/tf2-cpu.2-11:latest")]
        serving_container_image: String,
        /// Challenger metrics JSON
        #[arg(long)]
        metrics_uri: String,
        #[arg(long, default_value = "rootMeanSquaredError")]
        eval_metric: String,
        #[arg(long)]
        lower_is_better: bool,
        #[arg(long, default_value = "")]
        pipeline_job_id: String,
        #[arg(long)]
        test_data_uri: String,
        #[arg(long, default_value = "Imported evaluation")]
        evaluation_name: String,
    },

    /// Find the model registered under a display name
    LookupModel {
        #[command(flatten)]
        backend: LocalBackend,

        #[arg(long, default_value = "taxi-traffic-model")]
        model_name: String,

        #[arg(long)]
        fail_on_model_not_found: bool,
    },

    /// Print the best parameters of a finished tuning job
    TuningResults {
        #[command(flatten)]
        backend: LocalBackend,

        /// `gcp_resources` document naming the tuning job
        #[arg(long)]
        gcp_resources: PathBuf,

        /// JSON array of study metric specs
        #[arg(long)]
        study: PathBuf,
    },

    /// Collect the model and metrics of a finished custom job
    CustomJobResults {
        #[command(flatten)]
        backend: LocalBackend,

        /// `gcp_resources` document naming the custom job
        #[arg(long)]
        gcp_resources: PathBuf,
        #[arg(long)]
        model_uri: String,
        #[arg(long)]
        metrics_uri: String,
    },

    /// Run a batch prediction job to completion
    BatchPredict {
        #[command(flatten)]
        backend: LocalBackend,

        /// Batch prediction request JSON
        #[arg(long)]
        request: PathBuf,

        #[arg(long, default_value = "60")]
        poll_interval_secs: u64,
    },

    /// Export a warehouse table to object storage
    ExtractTable {
        #[command(flatten)]
        backend: LocalBackend,

        /// Table metadata JSON (`projectId`, `datasetId`, `tableId`)
        #[arg(long)]
        table: PathBuf,
        #[arg(long)]
        destination_uri: String,
        #[arg(long, env = "BQ_LOCATION", default_value = "US")]
        table_location: String,
    },

    /// Trigger a pipeline run from a compiled template
    Trigger {
        #[command(flatten)]
        api: ApiArgs,

        #[arg(long)]
        template_path: String,
        #[arg(long)]
        display_name: String,
        #[arg(long = "type")]
        kind: PipelineKind,

        /// Return once the run is submitted instead of waiting for it
        #[arg(long)]
        no_wait: bool,

        #[arg(long, default_value = "30")]
        poll_interval_secs: u64,
    },

    /// Trigger an end-to-end test run from a payload file
    TriggerFromPayload {
        #[command(flatten)]
        api: ApiArgs,

        /// Payload JSON (`attributes`, `data`)
        #[arg(long)]
        payload: PathBuf,
        #[arg(long = "type")]
        kind: PipelineKind,
    },

    /// Handle a table-change audit event
    HandleEvent {
        #[command(flatten)]
        api: ApiArgs,

        /// Audit log event JSON
        #[arg(long)]
        event: PathBuf,

        /// Trigger configuration JSON
        #[arg(long, env = "PIPELINE_CONFIG", hide_env_values = true)]
        config: String,
    },

    /// Submit the prediction pipeline after a training run completes
    OnTrainingComplete {
        #[command(flatten)]
        api: ApiArgs,

        /// Trigger configuration JSON
        #[arg(long, env = "PIPELINE_CONFIG", hide_env_values = true)]
        config: String,
    },

    /// Run a pipeline on a cron schedule
    Schedule {
        #[command(flatten)]
        api: ApiArgs,

        #[arg(long = "pipeline-type")]
        kind: PipelineKind,
        #[arg(long)]
        template_path: String,
        #[arg(long)]
        pipeline_root: Option<String>,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        schedule_name: String,
        #[arg(long)]
        cron: String,
        #[arg(long, default_value = "1")]
        max_concurrent_run_count: u32,
        #[arg(long)]
        max_run_count: Option<u32>,
    },

    /// Upload a compiled pipeline template to the template registry
    UploadPipeline {
        /// Compiled template file
        #[arg(long)]
        template: PathBuf,

        /// Tag for the uploaded version (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Template registry host
        #[arg(long, env = "KFP_TEMPLATE_AR")]
        host: String,

        /// OAuth bearer token
        #[arg(long, env = "VERTEX_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    taxifare_core::telemetry::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::SelectTrial {
            trials,
            goal,
            study,
        } => cmd_select_trial(&trials, goal, study.as_deref()),
        Commands::Arbitrate {
            challenger,
            champion,
            metric,
            lower_is_better,
        } => cmd_arbitrate(&challenger, champion.as_deref(), &metric, lower_is_better),
        Commands::TrainingArgs {
            train_data,
            valid_data,
            test_data,
            hypertune,
        } => print_json(&training_args(&train_data, &valid_data, &test_data, hypertune)),
        Commands::WorkerPoolSpec {
            specs,
            args,
            hyperparams,
            env,
        } => cmd_worker_pool_spec(&specs, args.as_deref(), hyperparams.as_deref(), env),
        Commands::UploadBestModel {
            backend,
            model_name,
            description,
            artifact_uri,
            serving_container_image,
            metrics_uri,
            eval_metric,
            lower_is_better,
            pipeline_job_id,
            test_data_uri,
            evaluation_name,
        } => {
            let request = UploadBestModelRequest {
                model_name,
                model_description: description,
                artifact_uri,
                serving_container_image,
                metrics_uri,
                eval_metric,
                eval_lower_is_better: lower_is_better,
                pipeline_job_id,
                test_data_uri,
                evaluation_name,
                location: backend.location.clone(),
            };
            cmd_upload_best_model(&backend, &request).await
        }
        Commands::LookupModel {
            backend,
            model_name,
            fail_on_model_not_found,
        } => cmd_lookup_model(&backend, &model_name, fail_on_model_not_found).await,
        Commands::TuningResults {
            backend,
            gcp_resources,
            study,
        } => cmd_tuning_results(&open_jobs(&backend), &gcp_resources, &study).await,
        Commands::CustomJobResults {
            backend,
            gcp_resources,
            model_uri,
            metrics_uri,
        } => {
            let (store, _) = open_backend(&backend)?;
            cmd_custom_job_results(
                &open_jobs(&backend),
                &store,
                &gcp_resources,
                &model_uri,
                &metrics_uri,
            )
            .await
        }
        Commands::BatchPredict {
            backend,
            request,
            poll_interval_secs,
        } => {
            let (store, _) = open_backend(&backend)?;
            let poll_interval = Duration::from_secs(poll_interval_secs);
            cmd_batch_predict(&open_jobs(&backend), &store, &request, poll_interval).await
        }
        Commands::ExtractTable {
            backend,
            table,
            destination_uri,
            table_location,
        } => {
            let jobs = open_jobs(&backend);
            cmd_extract_table(&jobs, &table, &destination_uri, &table_location).await
        }
        Commands::Trigger {
            api,
            template_path,
            display_name,
            kind,
            no_wait,
            poll_interval_secs,
        } => {
            let settings = Settings::from_env()?;
            let service = pipeline_service(&api, &settings.project, &settings.location)?;
            let wait = (!no_wait).then(|| Duration::from_secs(poll_interval_secs));
            cmd_trigger(&service, &settings, &template_path, &display_name, kind, wait).await
        }
        Commands::TriggerFromPayload { api, payload, kind } => {
            let settings = Settings::from_env()?;
            let service = pipeline_service(&api, &settings.project, &settings.location)?;
            cmd_trigger_from_payload(&service, &settings, &payload, kind).await
        }
        Commands::HandleEvent { api, event, config } => {
            let config = TriggerConfig::from_json(&config).context("Invalid PIPELINE_CONFIG")?;
            let service = pipeline_service(&api, &config.project, &config.location)?;
            cmd_handle_event(&service, &event, &config).await
        }
        Commands::OnTrainingComplete { api, config } => {
            let config = TriggerConfig::from_json(&config).context("Invalid PIPELINE_CONFIG")?;
            let service = pipeline_service(&api, &config.project, &config.location)?;
            cmd_on_training_complete(&service, &config).await
        }
        Commands::Schedule {
            api,
            kind,
            template_path,
            pipeline_root,
            display_name,
            schedule_name,
            cron,
            max_concurrent_run_count,
            max_run_count,
        } => {
            let settings = Settings::from_env()?;
            let service = pipeline_service(&api, &settings.project, &settings.location)?;
            let pipeline_root = pipeline_root.unwrap_or_else(|| settings.pipeline_root.clone());
            let request = ScheduleRequest {
                display_name: schedule_name,
                cron,
                max_concurrent_run_count,
                max_run_count,
                pipeline_job: PipelineJobRequest {
                    parameter_values: trigger_parameters(&settings, &display_name, kind),
                    display_name,
                    template_uri: template_path,
                    pipeline_root,
                    enable_caching: false,
                    service_account: settings.service_account.clone(),
                },
            };
            cmd_schedule(&service, &request).await
        }
        Commands::UploadPipeline {
            template,
            tags,
            host,
            access_token,
        } => {
            let registry = HttpTemplateRegistry::new(&host, &access_token)
                .context("Failed to build template registry client")?;
            cmd_upload_pipeline(&registry, &template, &tags).await
        }
    };

    METRICS.flush();
    result
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn pipeline_service(api: &ApiArgs, project: &str, location: &str) -> Result<HttpPipelineService> {
    HttpPipelineService::new(PipelineApiConfig {
        project: project.to_string(),
        location: location.to_string(),
        access_token: api.access_token.clone(),
        endpoint: api.endpoint.clone(),
    })
    .context("Failed to build pipeline API client")
}

fn open_backend(backend: &LocalBackend) -> Result<(FsArtifactStore, FsModelRegistry)> {
    let store = FsArtifactStore::new(&backend.artifact_root)
        .with_context(|| format!("Failed to open artifact root {:?}", backend.artifact_root))?;
    let registry = FsModelRegistry::new(&backend.registry, &backend.project, &backend.location);
    Ok((store, registry))
}

fn open_jobs(backend: &LocalBackend) -> FsJobService {
    FsJobService::new(&backend.jobs, &backend.project, &backend.location)
}

// ---------------------------------------------------------------------------
// Decision commands
// ---------------------------------------------------------------------------

fn best_parameters(
    trials: &[Trial],
    goal: Option<MetricGoal>,
    study: Option<&Path>,
) -> Result<Parameters> {
    let best = match (goal, study) {
        (_, Some(path)) => {
            let specs: Vec<MetricSpec> = read_json_file(path)?;
            let goal = single_goal(&specs)?;
            info!("study goal: {}", goal);
            select_best(trials, goal)?
        }
        (Some(goal), None) => select_best(trials, goal)?,
        (None, None) => anyhow::bail!("either --goal or --study is required"),
    };
    Ok(best)
}

fn cmd_select_trial(trials: &Path, goal: Option<MetricGoal>, study: Option<&Path>) -> Result<()> {
    let trials: Vec<Trial> = read_json_file(trials)?;
    METRICS.add_trials_scanned(trials.len() as u64);
    let best = best_parameters(&trials, goal, study)?;
    print_json(&best)
}

fn read_evaluation(path: &Path) -> Result<ModelEvaluation> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read metrics {:?}", path))?;
    Ok(ModelEvaluation::from_json_slice(&bytes)?.with_resource_name(path.display().to_string()))
}

fn cmd_arbitrate(
    challenger: &Path,
    champion: Option<&Path>,
    metric: &str,
    lower_is_better: bool,
) -> Result<()> {
    let _span = taxifare_core::obs::PipelineSpan::enter("arbitrate", metric);
    let challenger = read_evaluation(challenger)?;
    let champion = champion.map(read_evaluation).transpose()?;
    let result = arbitrate(&challenger, champion.as_ref(), metric, lower_is_better)?;
    taxifare_core::obs::emit_arbitration("local", metric, &result);
    print_json(&result)
}

fn cmd_worker_pool_spec(
    specs: &Path,
    args: Option<&Path>,
    hyperparams: Option<&Path>,
    env: Vec<(String, String)>,
) -> Result<()> {
    let specs: Vec<WorkerPoolSpec> = read_json_file(specs)?;
    let args: Parameters = args.map(read_json_file).transpose()?.unwrap_or_default();
    let hyperparams: Parameters = hyperparams
        .map(read_json_file)
        .transpose()?
        .unwrap_or_default();
    let env: BTreeMap<String, String> = env.into_iter().collect();
    print_json(&with_args(specs, &args, &hyperparams, &env))
}

// ---------------------------------------------------------------------------
// Registry commands
// ---------------------------------------------------------------------------

async fn cmd_upload_best_model(
    backend: &LocalBackend,
    request: &UploadBestModelRequest,
) -> Result<()> {
    let (store, registry) = open_backend(backend)?;
    let outcome = upload_best_model(&registry, &store, request)
        .await
        .context("upload-best-model failed")?;
    println!("Uploaded {}", outcome.model.versioned_resource_name());
    println!("  winner:  {:?}", outcome.arbitration.winner);
    println!("  default: {}", outcome.model.is_default_version);
    println!("  uri:     {}", outcome.model_uri);
    Ok(())
}

async fn cmd_lookup_model(
    backend: &LocalBackend,
    model_name: &str,
    fail_on_model_not_found: bool,
) -> Result<()> {
    let (store, registry) = open_backend(backend)?;
    let outcome = lookup_model(&registry, &store, model_name, fail_on_model_not_found)
        .await
        .context("lookup-model failed")?;
    print_json(&outcome)
}

// ---------------------------------------------------------------------------
// Job commands
// ---------------------------------------------------------------------------

fn read_text_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

async fn cmd_tuning_results(
    jobs: &dyn JobService,
    gcp_resources: &Path,
    study: &Path,
) -> Result<()> {
    let specs: Vec<MetricSpec> = read_json_file(study)?;
    let resource = read_text_file(gcp_resources)?;
    let best = get_hyperparameter_tuning_results(jobs, &resource, &specs)
        .await
        .context("tuning-results failed")?;
    print_json(&best)
}

async fn cmd_custom_job_results(
    jobs: &dyn JobService,
    store: &FsArtifactStore,
    gcp_resources: &Path,
    model_uri: &str,
    metrics_uri: &str,
) -> Result<()> {
    let resource = read_text_file(gcp_resources)?;
    let evaluation = get_custom_job_results(jobs, store, &resource, model_uri, metrics_uri)
        .await
        .context("custom-job-results failed")?;
    print_json(&evaluation)
}

async fn cmd_batch_predict(
    jobs: &dyn JobService,
    store: &FsArtifactStore,
    request: &Path,
    poll_interval: Duration,
) -> Result<()> {
    let request: BatchPredictRequest = read_json_file(request)?;
    let name = model_batch_predict(jobs, store, &request, poll_interval)
        .await
        .context("batch-predict failed")?;
    println!("Batch prediction {} succeeded", name);
    Ok(())
}

async fn cmd_extract_table(
    jobs: &dyn JobService,
    table: &Path,
    destination_uri: &str,
    location: &str,
) -> Result<()> {
    let metadata: serde_json::Value = read_json_file(table)?;
    let table = TableReference::from_metadata(&metadata)?;
    let name = extract_table_to_gcs(jobs, &table, destination_uri, Some(location))
        .await
        .context("extract-table failed")?;
    println!("Extracted {} to {} ({})", table.full_table_id(), destination_uri, name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

/// Submit a run, then wait for it unless `wait` is `None`.
async fn cmd_trigger(
    service: &dyn PipelineService,
    settings: &Settings,
    template_path: &str,
    display_name: &str,
    kind: PipelineKind,
    wait: Option<Duration>,
) -> Result<()> {
    let handle = trigger_pipeline(service, settings, template_path, display_name, kind, false)
        .await
        .context("Failed to submit pipeline")?;
    println!("Submitted {} ({})", handle.name, handle.display_name);

    if let Some(poll_interval) = wait {
        let state = wait_for_pipeline(service, &handle.name, poll_interval)
            .await
            .context("Pipeline run did not succeed")?;
        println!("Run {} finished: {:?}", handle.name, state);
    }
    Ok(())
}

/// A payload asking for caching fails at backends that cannot honour it.
async fn cmd_trigger_from_payload(
    service: &dyn PipelineService,
    settings: &Settings,
    payload: &Path,
    kind: PipelineKind,
) -> Result<()> {
    let raw: serde_json::Value = read_json_file(payload)?;
    let payload = convert_payload(&raw)?;
    let enable_caching = payload.enable_caching.unwrap_or(false);
    let handle = trigger_pipeline_from_payload(service, settings, &payload, kind, enable_caching)
        .await
        .context("Failed to submit pipeline")?;
    println!("Submitted {} ({})", handle.name, handle.display_name);
    Ok(())
}

async fn cmd_handle_event(
    service: &dyn PipelineService,
    event: &Path,
    config: &TriggerConfig,
) -> Result<()> {
    let event: serde_json::Value = read_json_file(event)?;
    match handle_table_change(&event, config, service).await? {
        Some(handle) => println!("Submitted {} ({})", handle.name, handle.display_name),
        None => println!("No rows inserted; nothing submitted"),
    }
    Ok(())
}

async fn cmd_on_training_complete(
    service: &dyn PipelineService,
    config: &TriggerConfig,
) -> Result<()> {
    let handle = on_training_complete(config, service)
        .await
        .context("Failed to submit prediction pipeline")?;
    println!("Submitted {} ({})", handle.name, handle.display_name);
    Ok(())
}

async fn cmd_schedule(service: &dyn PipelineService, request: &ScheduleRequest) -> Result<()> {
    let handle = schedule_pipeline(service, request)
        .await
        .context("Failed to create schedule")?;
    println!("Schedule created: {} ({})", handle.name, handle.cron);
    Ok(())
}

async fn cmd_upload_pipeline(
    registry: &dyn TemplateRegistry,
    template: &Path,
    tags: &[String],
) -> Result<()> {
    let version = upload_pipeline_template(registry, template, tags)
        .await
        .context("Failed to upload pipeline template")?;
    print_json(&version)
}

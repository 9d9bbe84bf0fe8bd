use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mat2npy::{cli, cohort, config, logging, pipeline, report, store, tasks, util};

fn main() -> Result<()> {
    let cli_opts = cli::parse();
    logging::init_logging(cli_opts.json_logs);

    let loaded = config::load_config(cli_opts.config_path.as_deref())?;
    let mut cfg = loaded.config;
    util::apply_cli_overrides(&mut cfg, &cli_opts);
    cfg.validate()?;

    util::ensure_scratch_dir(&cfg.scratch_dir)?;

    let workers = cfg.worker_count();
    info!(
        "starting run_id={} config_hash={} source={} dest={} target_frames={} workers={}",
        cfg.run_id,
        loaded.config_hash,
        cfg.source_root.display(),
        cfg.remote_dest,
        cfg.target_frames,
        workers
    );

    let eligible = cohort::load_eligible(
        &cfg.metadata_path,
        &cfg.id_column,
        &cfg.qc_column,
        cfg.qc_fail_value,
    )
    .with_context(|| format!("loading cohort from {}", cfg.metadata_path.display()))?;

    let items = tasks::enumerate(
        &cfg.source_root,
        &cfg.subfolders,
        &eligible,
        &cfg.archive_extension,
    );
    if items.is_empty() {
        warn!("no archives matched the eligible cohort");
    }

    let remote: Arc<dyn store::RemoteStore> = Arc::from(store::build_store(&cfg.store));
    let ctx = Arc::new(pipeline::PipelineContext::new(
        pipeline::ItemSettings::from_config(&cfg),
        remote.clone(),
    ));

    let outcomes = pipeline::run_batch(items, workers, ctx);

    let log_name = cfg.log_file_name();
    let settings = report::LogSettings {
        scratch_dir: &cfg.scratch_dir,
        log_name: &log_name,
        format: cfg.log_format,
        remote_dest: &cfg.remote_dest,
    };
    let summary = report::finalize(&outcomes, &settings, remote.as_ref())
        .context("writing outcome log")?;

    for (reason, count) in &summary.reasons {
        info!("skip reason {reason}: {count}");
    }
    info!(
        "run finished: {} ok, {} skipped of {}; arrays and {} in {}",
        summary.ok, summary.skipped, summary.total, summary.log_name, cfg.remote_dest
    );
    if let Some(path) = &summary.local_copy {
        warn!("outcome log left at {}", path.display());
    }
    Ok(())
}

//! Command handlers: merge CLI overrides into the config, connect, run, render.
use std::fmt::Write as _;
use std::io::Write as _;

use querymix_core::config::{self, AppConfig};
use querymix_core::error::CliError;
use querymix_core::workload::{
    format_text, run_workload, BatchPlan, Classifier, RunOptions, RunReport,
};

use crate::commands::cli::{ReportFormat, RunArgs};

pub fn apply_run_overrides(cfg: &mut AppConfig, run_args: &RunArgs) -> Result<(), CliError> {
    if let Some(workers) = run_args.workers {
        cfg.workload.workers = workers;
    }
    if let Some(secs) = run_args.duration_secs {
        cfg.workload.duration_secs = secs;
    }
    config::validate(cfg)?;
    Ok(())
}

pub fn banner(cfg: &AppConfig) -> String {
    format!(
        "querymix v{}\nStarting load with {} workers for {}s against {} ({}.{})",
        env!("CARGO_PKG_VERSION"),
        cfg.workload.workers,
        cfg.workload.duration_secs,
        cfg.engine.endpoint,
        cfg.workload.keyspace.bucket,
        cfg.workload.keyspace.scope,
    )
}

#[tracing::instrument(name = "cli.run", skip_all)]
pub async fn run_command(mut cfg: AppConfig, run_args: RunArgs) -> Result<i32, CliError> {
    apply_run_overrides(&mut cfg, &run_args)?;
    let interactive = !run_args.quiet && run_args.format == ReportFormat::Text;
    if interactive {
        eprintln!("{}", banner(&cfg));
    }

    let engine = querymix_plugins::factory::connect(&cfg.engine)
        .await
        .map_err(|e| CliError::Engine(format!("{e:#}")))?;
    tracing::info!(
        engine = engine.name(),
        endpoint = %cfg.engine.endpoint,
        "engine ready"
    );

    let plan = BatchPlan::from_config(&cfg.workload);
    let classifier = Classifier::from_config(&cfg.classifier);
    let mut opts = RunOptions::from_config(&cfg.workload);
    opts.progress = interactive;

    let report = run_workload(engine, plan, classifier, &opts).await?;
    write_report(&report, run_args.format)?;
    Ok(exit_code_for_report(&report))
}

/// 0 for a clean run, 50 when workers were lost to panics. The report is
/// printed either way.
pub fn exit_code_for_report(report: &RunReport) -> i32 {
    if report.lost_workers > 0 {
        tracing::warn!(lost_workers = report.lost_workers, "run finished with lost workers");
        return 50;
    }
    0
}

fn write_report(report: &RunReport, format: ReportFormat) -> Result<(), CliError> {
    let rendered = match format {
        ReportFormat::Text => format_text(report),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).map_err(|e| CliError::Anyhow(e.into()))?
        }
    };
    let mut out = std::io::stdout().lock();
    writeln!(out, "{rendered}")?;
    out.flush()?;
    Ok(())
}

pub fn plan_command(cfg: &AppConfig) -> Result<i32, CliError> {
    let plan = BatchPlan::from_config(&cfg.workload);
    let mut out = std::io::stdout().lock();
    write!(out, "{}", format_plan(&plan, cfg))?;
    Ok(0)
}

pub fn format_plan(plan: &BatchPlan, cfg: &AppConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Batch of {} tasks (workers={}, duration={}s, queue capacity={})",
        plan.batch_len(),
        cfg.workload.workers,
        cfg.workload.duration_secs,
        cfg.workload.effective_queue_capacity()
    );

    for task in &plan.reads {
        let _ = writeln!(out, "\n{}:\n    {}", task.name(), task.statement());
    }
    for rotating in [&plan.update_record, &plan.update_by_predicate] {
        let targets: Vec<String> = rotating
            .targets()
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect();
        let _ = writeln!(
            out,
            "\n{} [${} rotates over {} targets]:\n    {}\n    targets: {}",
            rotating.name(),
            rotating.param(),
            targets.len(),
            rotating.statement(),
            targets.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_and_revalidate() {
        let mut cfg = AppConfig::default();
        let args = RunArgs {
            workers: Some(3),
            duration_secs: Some(5),
            ..RunArgs::default()
        };
        apply_run_overrides(&mut cfg, &args).unwrap();
        assert_eq!(cfg.workload.workers, 3);
        assert_eq!(cfg.workload.duration_secs, 5);

        let zero = RunArgs {
            workers: Some(0),
            ..RunArgs::default()
        };
        let err = apply_run_overrides(&mut cfg, &zero).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn lost_workers_change_the_exit_code() {
        use querymix_core::workload::{build_report, RunMeta, StatsTable};
        use std::time::Duration;

        let mut meta = RunMeta {
            started_at: chrono::Utc::now(),
            workers: 2,
            configured_duration: Duration::from_secs(1),
            dispatched: 0,
            elapsed: Duration::from_secs(1),
            lost_workers: 0,
        };
        let table = StatsTable::new(Vec::new());
        assert_eq!(exit_code_for_report(&build_report(&table, &meta)), 0);
        meta.lost_workers = 1;
        assert_eq!(exit_code_for_report(&build_report(&table, &meta)), 50);
    }

    #[test]
    fn banner_names_workers_and_duration() {
        let mut cfg = AppConfig::default();
        cfg.workload.workers = 12;
        cfg.workload.duration_secs = 30;
        let text = banner(&cfg);
        assert!(text.contains("12 workers for 30s"), "{text}");
        assert!(text.contains("travel-sample.inventory"), "{text}");
    }

    #[test]
    fn plan_lists_every_task_and_rotation_pool() {
        let cfg = AppConfig::default();
        let plan = BatchPlan::from_config(&cfg.workload);
        let text = format_plan(&plan, &cfg);

        let header = "Batch of 6 tasks (workers=10, duration=900s, queue capacity=20)";
        assert!(text.starts_with(header), "{text}");
        for name in plan.task_names() {
            assert!(text.contains(&*name), "missing {name}");
        }
        assert!(text.contains("[$id rotates over 6 targets]"), "{text}");
        assert!(text.contains("targets: London, Paris"), "{text}");
        assert!(!text.contains("{bucket}"), "{text}");
    }
}

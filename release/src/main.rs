//! Database Tools release CLI entrypoint.
//!
//! Each invocation runs one release step for the platform named by the CI
//! variant: building the archive or installer packages, printing the
//! version or library dependencies, or publishing a release.

use camino::Utf8Path;
use clap::Parser;
use std::io::Write;
use tools_release::ci::{EvergreenClient, current_build_is_patch};
use tools_release::cli::{Cli, Command};
use tools_release::config::ReleaseConfig;
use tools_release::download::HttpFetcher;
use tools_release::error::{ReleaseError, Result};
use tools_release::exec::{CommandExecutor, SystemCommandExecutor};
use tools_release::package::archive::build_archive;
use tools_release::package::deps::list_deps;
use tools_release::package::{BuildInputs, PackageContext, build_packages};
use tools_release::platform::{Platform, PlatformMatrix};
use tools_release::publish::{Publisher, upload_release};
use tools_release::reconcile::Reconciler;
use tools_release::storage::AwsCliStore;
use tools_release::version::{Version, VersionResolver};
use tracing_subscriber::EnvFilter;

/// Resolved state shared by every release step.
struct RunContext<'a> {
    source_root: &'a Utf8Path,
    config: &'a ReleaseConfig,
    version: &'a Version,
    executor: &'a dyn CommandExecutor,
}

fn main() {
    let cli = Cli::parse();
    init_logging();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemCommandExecutor, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Logs go to stderr so that `get-version` and `list-deps` output stays
/// parseable. `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, executor: &dyn CommandExecutor, stdout: &mut dyn Write) -> Result<()> {
    let config = ReleaseConfig::load(&cli.source_root)?;
    let version = resolve_version(executor, cli.revision.as_deref())?;

    let context = RunContext {
        source_root: &cli.source_root,
        config: &config,
        version: &version,
        executor,
    };

    match cli.command {
        Command::GetVersion => write_stdout_line(stdout, &version),
        Command::BuildArchive => build_archive_step(&context),
        Command::BuildPackages => build_packages_step(&context),
        Command::ListDeps => list_deps_step(&context, stdout),
        Command::UploadRelease => upload_release_step(&context),
    }
}

fn resolve_version(executor: &dyn CommandExecutor, revision: Option<&str>) -> Result<Version> {
    let resolver = VersionResolver::new(executor);
    match revision {
        Some(rev) => resolver.resolve_at(rev),
        None => resolver.resolve_current(),
    }
}

/// Runs `step` against the platform detected from the CI variant.
fn with_package_context<T>(
    context: &RunContext<'_>,
    step: impl FnOnce(&PackageContext<'_>) -> Result<T>,
) -> Result<T> {
    let matrix = PlatformMatrix::database_tools();
    let platform: &Platform = matrix.from_env()?;
    let inputs = BuildInputs::database_tools(context.source_root);
    let output_dir = context.config.output_dir(context.source_root);

    let ctx = PackageContext {
        inputs: &inputs,
        platform,
        version: context.version,
        output_dir: &output_dir,
    };
    step(&ctx)
}

fn build_archive_step(context: &RunContext<'_>) -> Result<()> {
    with_package_context(context, |ctx| {
        std::fs::create_dir_all(ctx.output_dir)
            .map_err(ReleaseError::io(format!("create {}", ctx.output_dir)))?;
        let archive = build_archive(ctx)?;
        log::info!("built {archive}");
        Ok(())
    })
}

fn build_packages_step(context: &RunContext<'_>) -> Result<()> {
    with_package_context(context, |ctx| {
        for output in build_packages(ctx, context.executor, &context.config.msi)? {
            log::info!("built {output}");
        }
        Ok(())
    })
}

fn list_deps_step(context: &RunContext<'_>, stdout: &mut dyn Write) -> Result<()> {
    let deps = with_package_context(context, |ctx| list_deps(ctx, context.executor))?;
    for dep in deps {
        write_stdout_line(stdout, dep)?;
    }
    Ok(())
}

fn upload_release_step(context: &RunContext<'_>) -> Result<()> {
    if current_build_is_patch() {
        log::info!("current build is a patch; not uploading a release");
        return Ok(());
    }
    let config = context.config;
    let ci = EvergreenClient::from_env(&config.evergreen)?;
    let matrix = PlatformMatrix::database_tools();
    let reconciler = Reconciler::new(&ci, &matrix);

    let store = AwsCliStore::new(context.executor);
    let fetcher = HttpFetcher;
    let publisher = Publisher::new(&store, &fetcher, &config.storage, &config.feed);

    if let Some(report) = upload_release(context.version, &reconciler, &publisher, false)? {
        log::info!(
            "published {} file(s) for {}",
            report.uploaded.len(),
            context.version
        );
    }
    Ok(())
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) -> Result<()> {
    writeln!(stdout, "{message}").map_err(ReleaseError::io("write to stdout"))
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

//! CLI commands

use std::path::Path;

use reckoner_core::{CourseLoader, DEFAULT_COURSE_SCHEMA, LoadedCourse};
use reckoner_kube::{
    GitCli, HelmBinary, KubeCluster, Session, SessionOptions, ShellExecutor, ShellHookRunner,
    load_course,
};
use tracing::debug;

use crate::error::{CliError, Result};
use crate::{SelectionArgs, SessionArgs};

pub mod convert;
pub mod diff;
pub mod import;
pub mod lint;
pub mod manifests;
pub mod plot;
pub mod template;
pub mod update;

/// Load a course, resolving its secrets from the course directory
pub async fn load(path: &Path) -> Result<LoadedCourse> {
    let loader = CourseLoader::new(DEFAULT_COURSE_SCHEMA.as_bytes())?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    debug!(course = %path.display(), "loading course");
    Ok(load_course(path, loader, &ShellExecutor::new(dir)).await?)
}

fn options(args: &SessionArgs) -> SessionOptions {
    let mut options = SessionOptions::new(args.selection.selection())
        .with_create_namespaces(args.create_namespaces)
        .with_helm_args(args.helm_args.clone())
        .with_reckoner_version(env!("CARGO_PKG_VERSION"));
    if args.dry_run {
        options = options.dry_run();
    }
    if args.continue_on_error {
        options = options.continue_on_error();
    }
    options
}

/// Build a session with the real collaborators
///
/// The cluster is only contacted when namespaces will actually be managed.
pub async fn session(loaded: LoadedCourse, args: &SessionArgs) -> Result<Session> {
    build(loaded, options(args)).await
}

/// Build a session for commands that render but never plot
///
/// Namespaces are never managed, so no cluster connection is made.
pub async fn render_session(loaded: LoadedCourse, args: &SessionArgs) -> Result<Session> {
    build(loaded, render_options(args)).await
}

fn render_options(args: &SessionArgs) -> SessionOptions {
    options(args).with_create_namespaces(false)
}

async fn build(loaded: LoadedCourse, options: SessionOptions) -> Result<Session> {
    let context = loaded.course.context.clone();
    let mut builder = Session::builder(loaded, HelmBinary::new())
        .git(GitCli::new())
        .hooks(ShellHookRunner::new());

    if options.create_namespaces && !options.dry_run {
        let cluster = KubeCluster::connect(context.as_deref()).await?;
        builder = builder.cluster(cluster);
    }
    Ok(builder.options(options).build().await?)
}

/// Build a session that only reads from helm
pub async fn read_only_session(loaded: LoadedCourse, selection: &SelectionArgs) -> Result<Session> {
    let options = SessionOptions::new(selection.selection())
        .with_create_namespaces(false)
        .with_reckoner_version(env!("CARGO_PKG_VERSION"));
    Ok(Session::builder(loaded, HelmBinary::new())
        .options(options)
        .build()
        .await?)
}

/// Turn the session error count into the command result
pub fn finish(errors: usize) -> Result<()> {
    if errors > 0 {
        return Err(CliError::ReleaseFailures { count: errors });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(create_namespaces: bool) -> SessionArgs {
        SessionArgs {
            selection: SelectionArgs {
                run_all: true,
                only: Vec::new(),
            },
            dry_run: false,
            create_namespaces,
            continue_on_error: true,
            helm_args: vec!["--atomic".to_string()],
        }
    }

    #[test]
    fn test_render_options_never_manage_namespaces() {
        let options = render_options(&args(true));
        assert!(!options.create_namespaces);
        assert!(options.continue_on_error);
        assert_eq!(options.helm_args, vec!["--atomic".to_string()]);
    }

    #[test]
    fn test_plot_options_follow_the_flag() {
        assert!(options(&args(true)).create_namespaces);
        assert!(!options(&args(false)).create_namespaces);
    }
}

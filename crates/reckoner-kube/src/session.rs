//! Reconciliation session
//!
//! A session owns a resolved course narrowed to the selected releases and the
//! collaborators used to act on it. Releases are processed one at a time in
//! course order. Per-release failures either abort the session or, with
//! continue-on-error, are counted and the next release is attempted.

use std::fmt;
use std::path::{Path, PathBuf};

use console::style;
use reckoner_core::selection::{assign_checkouts, select};
use reckoner_core::version::{DEVELOPMENT_VERSION, check_helm, check_reckoner};
use reckoner_core::{Course, LoadedCourse, Release, Selection};
use tracing::{debug, warn};

use crate::args::{HelmAction, build_helm_args};
use crate::cluster::ClusterClient;
use crate::diff::{DiffEngine, ReleaseDiff};
use crate::error::{KubeError, Result};
use crate::git::{DEFAULT_GIT_REF, GitCli, GitClient};
use crate::helm::HelmClient;
use crate::hooks::{HookPhase, HookRunner, ShellHookRunner};
use crate::namespace::manage_namespaces;

/// How a session treats the course
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Releases to act on
    pub selection: Selection,

    /// Pass `--dry-run` to helm and skip hooks and namespace management
    pub dry_run: bool,

    /// Create and label namespaces before plotting
    pub create_namespaces: bool,

    /// Count per-release failures instead of stopping at the first one
    pub continue_on_error: bool,

    /// Extra helm arguments, appended after the course's own
    pub helm_args: Vec<String>,

    /// Version of the running binary, checked against the course minimum
    pub reckoner_version: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            selection: Selection::All,
            dry_run: false,
            create_namespaces: true,
            continue_on_error: false,
            helm_args: Vec::new(),
            reckoner_version: DEVELOPMENT_VERSION.to_string(),
        }
    }
}

impl SessionOptions {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    pub fn with_create_namespaces(mut self, create: bool) -> Self {
        self.create_namespaces = create;
        self
    }

    pub fn with_helm_args(mut self, args: Vec<String>) -> Self {
        self.helm_args = args;
        self
    }

    pub fn with_reckoner_version(mut self, version: impl Into<String>) -> Self {
        self.reckoner_version = version.into();
        self
    }
}

/// Step of the per-release lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    PreHook,
    SourceResolution,
    Invocation,
    PostHook,
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseStage::PreHook => write!(f, "pre-install hook"),
            ReleaseStage::SourceResolution => write!(f, "source resolution"),
            ReleaseStage::Invocation => write!(f, "helm invocation"),
            ReleaseStage::PostHook => write!(f, "post-install hook"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// helm ran; its stdout is kept
    Deployed { output: String },
    /// Failed and skipped under continue-on-error
    Failed { stage: ReleaseStage, error: String },
}

/// What happened to one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub name: String,
    pub namespace: String,
    pub status: ReleaseStatus,
}

impl ReleaseOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, ReleaseStatus::Deployed { .. })
    }
}

/// Outcome of a plot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub outcomes: Vec<ReleaseOutcome>,
    /// Session error count when the plot finished
    pub errors: usize,
}

impl ReconciliationResult {
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

/// Rendered templates of one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRelease {
    pub name: String,
    pub namespace: String,
    pub manifest: String,
}

/// Outcome of an update: the diffs that were computed and the plot of the
/// releases that had changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub diffs: Vec<ReleaseDiff>,
    pub plot: ReconciliationResult,
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    loaded: LoadedCourse,
    options: SessionOptions,
    helm: Box<dyn HelmClient>,
    git: Box<dyn GitClient>,
    cluster: Option<Box<dyn ClusterClient>>,
    hooks: Box<dyn HookRunner>,
}

impl SessionBuilder {
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn git(mut self, git: impl GitClient + 'static) -> Self {
        self.git = Box::new(git);
        self
    }

    /// Cluster used for namespace management; without one it is skipped
    pub fn cluster(mut self, cluster: impl ClusterClient + 'static) -> Self {
        self.cluster = Some(Box::new(cluster));
        self
    }

    pub fn hooks(mut self, hooks: impl HookRunner + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Check minimum versions, select releases and assign git checkouts
    pub async fn build(self) -> Result<Session> {
        let SessionBuilder {
            loaded,
            options,
            helm,
            git,
            cluster,
            hooks,
        } = self;
        let base_dir = loaded.base_dir().to_path_buf();
        let mut course = loaded.course;

        check_reckoner(
            course.minimum_versions.reckoner.as_deref(),
            &options.reckoner_version,
        )?;
        if let Some(minimum) = course.minimum_versions.helm.as_deref() {
            let installed = helm.version().await?;
            check_helm(Some(minimum), &installed)?;
        }

        let releases = select(std::mem::take(&mut course.releases), &options.selection)?;
        let uses_git = releases.iter().any(|r| {
            course
                .repositories
                .get(r.repository())
                .is_some_and(|repo| repo.is_git())
        });
        course.releases = if uses_git {
            let cache_dir = helm.cache_dir().await?;
            assign_checkouts(releases, &course.repositories, &cache_dir)?
        } else {
            releases
        };

        Ok(Session {
            course,
            base_dir,
            options,
            helm,
            git,
            cluster,
            hooks,
            diff_engine: DiffEngine::new(),
            repositories_registered: false,
            errors: 0,
        })
    }
}

/// A course being reconciled
pub struct Session {
    course: Course,
    base_dir: PathBuf,
    options: SessionOptions,
    helm: Box<dyn HelmClient>,
    git: Box<dyn GitClient>,
    cluster: Option<Box<dyn ClusterClient>>,
    hooks: Box<dyn HookRunner>,
    diff_engine: DiffEngine,
    repositories_registered: bool,
    errors: usize,
}

impl Session {
    /// Start building a session for a loaded course
    pub fn builder(loaded: LoadedCourse, helm: impl HelmClient + 'static) -> SessionBuilder {
        SessionBuilder {
            loaded,
            options: SessionOptions::default(),
            helm: Box::new(helm),
            git: Box::new(GitCli::new()),
            cluster: None,
            hooks: Box::new(ShellHookRunner::new()),
        }
    }

    /// The course, narrowed to the selected releases
    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn releases(&self) -> &[Release] {
        &self.course.releases
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Failures counted under continue-on-error so far
    pub fn errors(&self) -> usize {
        self.errors
    }

    // ========== Plot ==========

    /// Install or upgrade every selected release
    pub async fn plot(&mut self) -> Result<ReconciliationResult> {
        self.prepare_namespaces().await?;
        self.register_repositories().await;

        let course_hooks = self.course.hooks.clone();
        if let Err(e) = self.run_hooks(HookPhase::PreInstall, &course_hooks.pre_install).await {
            self.handle_failure("course pre_install hooks", e)?;
        }

        let mut outcomes = Vec::with_capacity(self.course.releases.len());
        for release in self.course.releases.clone() {
            print_header("Plotting", &release);
            let status = match self.plot_release(&release).await {
                Ok(output) => ReleaseStatus::Deployed { output },
                Err((stage, error)) => {
                    let message = error.to_string();
                    self.handle_release_failure(&release.name, error)?;
                    ReleaseStatus::Failed {
                        stage,
                        error: message,
                    }
                }
            };
            outcomes.push(ReleaseOutcome {
                name: release.name.clone(),
                namespace: release.namespace().to_string(),
                status,
            });
        }

        if let Err(e) = self.run_hooks(HookPhase::PostInstall, &course_hooks.post_install).await {
            self.handle_failure("course post_install hooks", e)?;
        }

        Ok(ReconciliationResult {
            outcomes,
            errors: self.errors,
        })
    }

    async fn plot_release(
        &self,
        release: &Release,
    ) -> std::result::Result<String, (ReleaseStage, KubeError)> {
        self.run_hooks(HookPhase::PreInstall, &release.hooks.pre_install)
            .await
            .map_err(|e| (ReleaseStage::PreHook, e))?;

        self.resolve_source(release)
            .await
            .map_err(|e| (ReleaseStage::SourceResolution, e))?;

        let output = self
            .invoke(HelmAction::Upgrade, release)
            .await
            .map_err(|e| (ReleaseStage::Invocation, e))?;

        self.run_hooks(HookPhase::PostInstall, &release.hooks.post_install)
            .await
            .map_err(|e| (ReleaseStage::PostHook, e))?;

        Ok(output)
    }

    // ========== Template ==========

    /// Render every selected release with `helm template`
    pub async fn template(&mut self) -> Result<Vec<RenderedRelease>> {
        self.register_repositories().await;

        let mut rendered = Vec::new();
        for release in self.course.releases.clone() {
            match self.render(&release).await {
                Ok(manifest) => rendered.push(RenderedRelease {
                    name: release.name.clone(),
                    namespace: release.namespace().to_string(),
                    manifest,
                }),
                Err(e) => self.handle_release_failure(&release.name, e)?,
            }
        }
        Ok(rendered)
    }

    async fn render(&self, release: &Release) -> Result<String> {
        self.resolve_source(release).await?;
        self.invoke(HelmAction::Template, release).await
    }

    // ========== Diff ==========

    /// Compare every selected release's rendered templates with what is installed
    pub async fn diff(&mut self) -> Result<Vec<ReleaseDiff>> {
        self.register_repositories().await;

        let mut diffs = Vec::new();
        for release in self.course.releases.clone() {
            print_header("Running 'diff' on", &release);
            match self.diff_release(&release).await {
                Ok(diff) => {
                    if !diff.has_changes() {
                        eprintln!(
                            "{}",
                            style(format!("There are no differences in release {}", release.name))
                                .green()
                        );
                    }
                    diffs.push(diff);
                }
                Err(e) => self.handle_release_failure(&release.name, e)?,
            }
        }
        Ok(diffs)
    }

    async fn diff_release(&self, release: &Release) -> Result<ReleaseDiff> {
        let live = self
            .helm
            .get_manifest(release.namespace(), &release.name)
            .await?;
        let desired = self.render(release).await?;
        let changes = self
            .diff_engine
            .diff_release(&release.name, &live, &desired)?;
        Ok(ReleaseDiff {
            release: release.name.clone(),
            namespace: release.namespace().to_string(),
            changes,
        })
    }

    // ========== Update ==========

    /// Plot only the releases whose rendered templates differ from the cluster
    pub async fn update(&mut self) -> Result<UpdateResult> {
        let diffs = self.diff().await?;

        let changed: Vec<&str> = diffs
            .iter()
            .filter(|d| d.has_changes())
            .map(|d| d.release.as_str())
            .collect();
        for diff in &diffs {
            if diff.has_changes() {
                eprintln!(
                    "{}",
                    style(format!(
                        "Update available for {} in namespace {}. Added to plot list.",
                        diff.release, diff.namespace
                    ))
                    .yellow()
                );
            } else {
                eprintln!(
                    "{}",
                    style(format!(
                        "No update necessary for {} in namespace {}.",
                        diff.release, diff.namespace
                    ))
                    .green()
                );
            }
        }

        self.course
            .releases
            .retain(|r| changed.contains(&r.name.as_str()));
        let plot = self.plot().await?;
        Ok(UpdateResult { diffs, plot })
    }

    // ========== Manifests ==========

    /// Live manifests of every selected release, concatenated
    pub async fn get_manifests(&self) -> Result<String> {
        let mut output = String::new();
        for release in &self.course.releases {
            let manifest = self
                .helm
                .get_manifest(release.namespace(), &release.name)
                .await?;
            output.push_str(&manifest);
        }
        Ok(output.strip_suffix('\n').unwrap_or(&output).to_string())
    }

    // ========== Steps ==========

    async fn prepare_namespaces(&self) -> Result<()> {
        if !self.options.create_namespaces {
            debug!("namespace management disabled");
            return Ok(());
        }
        if self.options.dry_run {
            eprintln!(
                "{}",
                style("namespace management not run due to --dry-run").yellow()
            );
            return Ok(());
        }
        match &self.cluster {
            Some(cluster) => {
                manage_namespaces(cluster.as_ref(), &self.course, &self.course.releases).await
            }
            None => {
                debug!("no cluster client, skipping namespace management");
                Ok(())
            }
        }
    }

    /// Register every chart repository with helm, once per session
    async fn register_repositories(&mut self) {
        if self.repositories_registered {
            return;
        }
        for (name, repository) in &self.course.repositories {
            if repository.is_git() {
                continue;
            }
            let Some(url) = repository.url.as_deref() else {
                continue;
            };
            if let Err(e) = self.helm.add_repository(name, url).await {
                warn!(repository = %name, url, error = %e, "could not add helm repository");
            }
        }
        self.repositories_registered = true;
    }

    async fn run_hooks(&self, phase: HookPhase, commands: &[String]) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        if self.options.dry_run {
            eprintln!("{}", style(format!("{phase} hook not run due to --dry-run")).yellow());
            return Ok(());
        }
        for command in commands {
            eprintln!("{}", style(format!("Running {phase} hook {command}")).green());
            self.hooks.run(phase, command, &self.base_dir).await?;
        }
        Ok(())
    }

    async fn resolve_source(&self, release: &Release) -> Result<()> {
        let Some(checkout) = release.checkout() else {
            return Ok(());
        };
        let url = self
            .course
            .repositories
            .get(release.repository())
            .and_then(|repo| repo.git.as_deref())
            .unwrap_or_default();

        let reference = match release.version.as_deref() {
            Some(version) => version,
            None => {
                warn!(
                    release = %release.name,
                    "no version given for git release, using {DEFAULT_GIT_REF}"
                );
                DEFAULT_GIT_REF
            }
        };

        self.git
            .checkout(url, checkout.clone_path(), reference)
            .await?;
        self.helm.dependency_build(&checkout.chart_dir()).await
    }

    async fn invoke(&self, action: HelmAction, release: &Release) -> Result<String> {
        let mut extra = self.course.helm_args.clone();
        extra.extend(self.options.helm_args.iter().cloned());

        let mut invocation = build_helm_args(action, release, &self.base_dir, &extra)?;
        if self.options.dry_run && action == HelmAction::Upgrade {
            invocation.push("--dry-run");
        }
        let output = self.helm.exec(invocation.args()).await?;
        Ok(output.stdout)
    }

    /// Course-level steps only continue past failures that are not fatal
    fn handle_failure(&mut self, context: &str, error: KubeError) -> Result<()> {
        if error.is_fatal() || !self.options.continue_on_error {
            return Err(error);
        }
        self.errors += 1;
        eprintln!("{}", style(format!("error with {context}: {error}, continuing.")).red());
        Ok(())
    }

    /// Anything a release's own steps return is scoped to that release
    fn handle_release_failure(&mut self, release: &str, error: KubeError) -> Result<()> {
        if !self.options.continue_on_error {
            return Err(error);
        }
        self.errors += 1;
        eprintln!(
            "{}",
            style(format!("error with release {release}: {error}, continuing.")).red()
        );
        Ok(())
    }
}

fn print_header(action: &str, release: &Release) {
    eprintln!(
        "\n{} {} in {}",
        action,
        style(&release.name).bold(),
        release.namespace()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCluster, MockGit, MockHelm, MockHookRunner};
    use reckoner_core::{CoreError, CourseLoader, DEFAULT_COURSE_SCHEMA, Variables};

    const COURSE: &str = r#"schema: v2
namespace: infra
repository: stable
repositories:
  stable:
    url: https://charts.example.com
  internal:
    git: https://git.example.com/charts.git
    path: charts
hooks:
  pre_install:
    - echo course-pre
  post_install:
    - echo course-post
releases:
  - name: first
    chart: nginx
    version: 1.0.0
  - name: second
    hooks:
      pre_install:
        - fail-second
  - name: third
    repository: internal
    values:
      replicas: 2
"#;

    fn loaded(source: &str) -> LoadedCourse {
        let loader = CourseLoader::new(DEFAULT_COURSE_SCHEMA.as_bytes())
            .unwrap()
            .with_variables(Variables::isolated());
        let (course, converted) = loader.load_str(source, "course.yml").unwrap();
        LoadedCourse {
            course,
            path: PathBuf::from("/work/course.yml"),
            converted,
        }
    }

    async fn session(
        helm: &MockHelm,
        hooks: &MockHookRunner,
        git: &MockGit,
        options: SessionOptions,
    ) -> Session {
        Session::builder(loaded(COURSE), helm.clone())
            .options(options)
            .git(git.clone())
            .hooks(hooks.clone())
            .build()
            .await
            .unwrap()
    }

    fn plotted(helm: &MockHelm) -> Vec<String> {
        helm.calls()
            .into_iter()
            .filter(|args| args.first().map(String::as_str) == Some("upgrade"))
            .map(|args| args[2].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_continue_on_error_counts_and_proceeds() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new().failing_on("fail-second");
        let git = MockGit::new();
        let mut session = session(
            &helm,
            &hooks,
            &git,
            SessionOptions::new(Selection::All).continue_on_error(),
        )
        .await;

        let result = session.plot().await.unwrap();

        assert_eq!(result.errors, 1);
        assert_eq!(session.errors(), 1);
        assert!(!result.is_success());
        assert_eq!(plotted(&helm), vec!["first", "third"]);

        let statuses: Vec<bool> = result.outcomes.iter().map(|o| o.succeeded()).collect();
        assert_eq!(statuses, vec![true, false, true]);
        assert!(matches!(
            result.outcomes[1].status,
            ReleaseStatus::Failed {
                stage: ReleaseStage::PreHook,
                ..
            }
        ));

        assert_eq!(
            hooks.commands(),
            vec!["echo course-pre", "fail-second", "echo course-post"]
        );
        assert!(hooks.dirs().iter().all(|d| d == Path::new("/work")));
    }

    #[tokio::test]
    async fn test_failure_aborts_without_continue() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new().failing_on("fail-second");
        let git = MockGit::new();
        let mut session = session(&helm, &hooks, &git, SessionOptions::default()).await;

        let err = session.plot().await.unwrap_err();

        assert!(matches!(err, KubeError::HookFailed { .. }));
        assert_eq!(plotted(&helm), vec!["first"]);
        assert_eq!(hooks.commands(), vec!["echo course-pre", "fail-second"]);
    }

    #[tokio::test]
    async fn test_git_release_is_checked_out_and_built() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new();
        let git = MockGit::new();
        let mut session = session(
            &helm,
            &hooks,
            &git,
            SessionOptions::new(Selection::Only(vec!["third".into()])),
        )
        .await;

        session.plot().await.unwrap();

        let clone = PathBuf::from("/cache/https_git_example_com_charts_git_goreckoner");
        assert_eq!(
            git.checkouts(),
            vec![(
                "https://git.example.com/charts.git".to_string(),
                clone.clone(),
                DEFAULT_GIT_REF.to_string()
            )]
        );

        let calls = helm.calls();
        let chart_dir = clone.join("charts/third").display().to_string();
        assert!(calls.contains(&vec!["dependency".into(), "build".into(), chart_dir.clone()]));

        let upgrade = calls.iter().find(|c| c[0] == "upgrade").unwrap();
        assert_eq!(upgrade[3], chart_dir);
        assert!(upgrade.iter().any(|a| a.starts_with("--values=")));
        assert!(!upgrade.iter().any(|a| a.starts_with("--version")));
        assert_eq!(helm.values_files(), vec!["replicas: 2\n".to_string()]);
    }

    #[tokio::test]
    async fn test_git_failure_is_per_release() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new();
        let git = MockGit::new().failing();
        let mut session = session(
            &helm,
            &hooks,
            &git,
            SessionOptions::new(Selection::Only(vec!["first".into(), "third".into()]))
                .continue_on_error(),
        )
        .await;

        let result = session.plot().await.unwrap();
        assert_eq!(result.errors, 1);
        assert!(matches!(
            result.outcomes[1].status,
            ReleaseStatus::Failed {
                stage: ReleaseStage::SourceResolution,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_io_failure_in_release_step_is_per_release() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new();
        let git = MockGit::new().unwritable();
        let mut session = session(
            &helm,
            &hooks,
            &git,
            SessionOptions::new(Selection::All).continue_on_error(),
        )
        .await;

        let result = session.plot().await.unwrap();

        assert_eq!(result.errors, 1);
        assert_eq!(plotted(&helm), vec!["first", "second"]);
        assert!(matches!(
            result.outcomes[2].status,
            ReleaseStatus::Failed {
                stage: ReleaseStage::SourceResolution,
                ..
            }
        ));
        assert_eq!(
            hooks.commands(),
            vec!["echo course-pre", "fail-second", "echo course-post"]
        );
    }

    #[tokio::test]
    async fn test_io_failure_aborts_without_continue() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let git = MockGit::new().unwritable();
        let mut session = session(
            &helm,
            &MockHookRunner::new(),
            &git,
            SessionOptions::new(Selection::Only(vec!["third".into()])),
        )
        .await;

        let err = session.plot().await.unwrap_err();
        assert!(matches!(err, KubeError::Io(_)));
    }

    #[tokio::test]
    async fn test_template_continues_past_io_failure() {
        let helm = MockHelm::new()
            .with_cache_dir("/cache")
            .with_template("first", "kind: A\n");
        let mut session = Session::builder(loaded(COURSE), helm)
            .options(
                SessionOptions::new(Selection::Only(vec!["first".into(), "third".into()]))
                    .continue_on_error(),
            )
            .git(MockGit::new().unwritable())
            .build()
            .await
            .unwrap();

        let rendered = session.template().await.unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].name, "first");
        assert_eq!(session.errors(), 1);
    }

    #[tokio::test]
    async fn test_failing_course_hook_continues_to_every_release() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new().failing_on("echo course-pre");
        let git = MockGit::new();
        let mut session = session(
            &helm,
            &hooks,
            &git,
            SessionOptions::new(Selection::Only(vec!["first".into(), "third".into()]))
                .continue_on_error(),
        )
        .await;

        let result = session.plot().await.unwrap();

        assert_eq!(result.errors, 1);
        assert_eq!(plotted(&helm), vec!["first", "third"]);
        assert!(result.outcomes.iter().all(ReleaseOutcome::succeeded));
        assert_eq!(hooks.commands(), vec!["echo course-pre", "echo course-post"]);
    }

    #[tokio::test]
    async fn test_failing_course_hook_aborts_without_continue() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new().failing_on("echo course-pre");
        let mut session = session(&helm, &hooks, &MockGit::new(), SessionOptions::default()).await;

        let err = session.plot().await.unwrap_err();
        assert!(matches!(err, KubeError::HookFailed { .. }));
        assert!(plotted(&helm).is_empty());
    }

    #[tokio::test]
    async fn test_helm_failure_is_per_release() {
        let helm = MockHelm::new().with_cache_dir("/cache").failing_release("first");
        let hooks = MockHookRunner::new();
        let git = MockGit::new();
        let mut session = session(
            &helm,
            &hooks,
            &git,
            SessionOptions::new(Selection::All).continue_on_error(),
        )
        .await;

        let result = session.plot().await.unwrap();
        assert_eq!(result.errors, 1);
        assert!(matches!(
            result.outcomes[0].status,
            ReleaseStatus::Failed {
                stage: ReleaseStage::Invocation,
                ..
            }
        ));
        assert!(result.outcomes[1].succeeded());
        assert!(result.outcomes[2].succeeded());
    }

    #[tokio::test]
    async fn test_dry_run_skips_hooks_and_namespaces() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let hooks = MockHookRunner::new();
        let git = MockGit::new();
        let cluster = MockCluster::new();
        let mut session = Session::builder(loaded(COURSE), helm.clone())
            .options(SessionOptions::new(Selection::Only(vec!["first".into()])).dry_run())
            .git(git)
            .hooks(hooks.clone())
            .cluster(cluster.clone())
            .build()
            .await
            .unwrap();

        session.plot().await.unwrap();

        assert!(hooks.commands().is_empty());
        assert!(cluster.calls().is_empty());
        let upgrade = helm.calls().into_iter().find(|c| c[0] == "upgrade").unwrap();
        assert_eq!(upgrade.last().map(String::as_str), Some("--dry-run"));
    }

    #[tokio::test]
    async fn test_plot_manages_namespaces_and_repositories() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let cluster = MockCluster::new();
        let mut session = Session::builder(loaded(COURSE), helm.clone())
            .options(SessionOptions::new(Selection::Only(vec!["first".into()])))
            .hooks(MockHookRunner::new())
            .cluster(cluster.clone())
            .build()
            .await
            .unwrap();

        session.plot().await.unwrap();

        assert_eq!(cluster.created(), vec!["infra".to_string()]);
        assert_eq!(
            helm.calls()[0],
            vec!["repo", "add", "stable", "https://charts.example.com"]
        );
    }

    #[tokio::test]
    async fn test_selection_keeps_course_order() {
        let helm = MockHelm::new().with_cache_dir("/cache");
        let session = Session::builder(loaded(COURSE), helm)
            .options(SessionOptions::new(Selection::Only(vec![
                "third".into(),
                "first".into(),
                "missing".into(),
            ])))
            .build()
            .await
            .unwrap();

        let names: Vec<&str> = session.releases().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_empty_selection_fails() {
        let err = Session::builder(loaded(COURSE), MockHelm::new())
            .options(SessionOptions::new(Selection::Only(vec!["missing".into()])))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            KubeError::Core(CoreError::NoMatchingReleases { .. })
        ));
    }

    #[tokio::test]
    async fn test_minimum_versions() {
        let source = COURSE.replace(
            "schema: v2\n",
            "schema: v2\nminimum_versions:\n  helm: 3.10.0\n  reckoner: 2.0.0\n",
        );

        let old_helm = MockHelm::new().with_version("v3.9.0");
        let err = Session::builder(loaded(&source), old_helm)
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, KubeError::Core(CoreError::VersionConstraint { .. })));

        let old_reckoner = Session::builder(loaded(&source), MockHelm::new().with_version("v3.14.0"))
            .options(SessionOptions::default().with_reckoner_version("1.5.0"))
            .build()
            .await;
        assert!(old_reckoner.is_err());

        let ok = Session::builder(loaded(&source), MockHelm::new().with_version("v3.14.0"))
            .options(SessionOptions::default().with_reckoner_version("2.1.0"))
            .build()
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_template_concatenates_in_order() {
        let helm = MockHelm::new()
            .with_cache_dir("/cache")
            .with_template("first", "kind: A\n")
            .with_template("third", "kind: C\n");
        let mut session = Session::builder(loaded(COURSE), helm.clone())
            .options(SessionOptions::new(Selection::Only(vec![
                "first".into(),
                "third".into(),
            ])))
            .git(MockGit::new())
            .build()
            .await
            .unwrap();

        let rendered = session.template().await.unwrap();
        let manifests: Vec<&str> = rendered.iter().map(|r| r.manifest.as_str()).collect();
        assert_eq!(manifests, vec!["kind: A\n", "kind: C\n"]);
    }

    const RENDERED: &str = "---\n# Source: nginx/templates/cm.yaml\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: first\n";

    #[tokio::test]
    async fn test_update_plots_only_changed_releases() {
        let helm = MockHelm::new()
            .with_cache_dir("/cache")
            .with_template("first", RENDERED)
            .with_template("second", RENDERED)
            .with_manifest("infra", "first", RENDERED);
        let mut session = Session::builder(loaded(COURSE), helm.clone())
            .options(SessionOptions::new(Selection::Only(vec![
                "first".into(),
                "second".into(),
            ])))
            .hooks(MockHookRunner::new())
            .build()
            .await
            .unwrap();

        let result = session.update().await.unwrap();

        assert!(!result.diffs[0].has_changes());
        assert!(result.diffs[1].has_changes());
        assert!(result.diffs[1].changes[0].new_file);
        assert_eq!(plotted(&helm), vec!["second"]);
    }

    #[tokio::test]
    async fn test_get_manifests_trims_trailing_newline() {
        let helm = MockHelm::new()
            .with_cache_dir("/cache")
            .with_manifest("infra", "first", "kind: A\n")
            .with_manifest("infra", "second", "kind: B\n");
        let session = Session::builder(loaded(COURSE), helm)
            .options(SessionOptions::new(Selection::Only(vec![
                "first".into(),
                "second".into(),
            ])))
            .build()
            .await
            .unwrap();

        assert_eq!(session.get_manifests().await.unwrap(), "kind: A\nkind: B");
    }
}

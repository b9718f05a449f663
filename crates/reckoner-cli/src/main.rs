//! Reckoner CLI - declarative helm release manager

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use reckoner_core::Selection;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "reckoner")]
#[command(version)]
#[command(about = "Declarative helm release manager", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

/// Location of the course file
#[derive(Args, Debug, Clone)]
pub struct CourseArgs {
    /// Course file
    #[arg(env = "RECKONER_COURSE_FILE", default_value = "course.yml")]
    pub course: PathBuf,
}

/// Which releases to act on; exactly one of the two is required
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SelectionArgs {
    /// Act on every release in the course
    #[arg(short = 'a', long)]
    pub run_all: bool,

    /// Only act on these releases (repeatable or comma separated)
    #[arg(short = 'o', long, value_delimiter = ',')]
    pub only: Vec<String>,
}

impl SelectionArgs {
    pub fn selection(&self) -> Selection {
        Selection::from_args(self.run_all, self.only.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Pass --dry-run to helm and skip hooks and namespace management
    #[arg(long)]
    pub dry_run: bool,

    /// Create and label namespaces before plotting
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub create_namespaces: bool,

    /// Keep going when a release fails and exit non-zero at the end
    #[arg(long)]
    pub continue_on_error: bool,

    /// Extra arguments for every helm invocation
    #[arg(long = "helm-args", allow_hyphen_values = true)]
    pub helm_args: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install or upgrade releases
    Plot {
        #[command(flatten)]
        course: CourseArgs,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Render release templates
    Template {
        #[command(flatten)]
        course: CourseArgs,

        #[command(flatten)]
        session: SessionArgs,

        /// Write each rendered resource to <dir>/<release>/<Kind>_<name>.yml
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show what plot would change in the cluster
    Diff {
        #[command(flatten)]
        course: CourseArgs,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Plot only the releases that differ from the cluster
    Update {
        #[command(flatten)]
        course: CourseArgs,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print the live manifests of releases
    GetManifests {
        #[command(flatten)]
        course: CourseArgs,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Validate a course file
    Lint {
        #[command(flatten)]
        course: CourseArgs,
    },

    /// Convert a v1 course file to the current schema
    Convert {
        #[command(flatten)]
        course: CourseArgs,

        /// Rewrite the course file instead of printing
        #[arg(short, long)]
        in_place: bool,
    },

    /// Print a course release entry for a release installed by helm
    Import {
        /// Namespace of the installed release
        #[arg(long)]
        namespace: String,

        /// Name of the installed release
        #[arg(long)]
        release_name: String,

        /// Repository to reference in the generated entry
        #[arg(long)]
        repository: String,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Plot { course, session } => commands::plot::run(&course.course, &session).await,
        Commands::Template {
            course,
            session,
            output_dir,
        } => commands::template::run(&course.course, &session, output_dir.as_deref()).await,
        Commands::Diff { course, session } => commands::diff::run(&course.course, &session).await,
        Commands::Update { course, session } => {
            commands::update::run(&course.course, &session).await
        }
        Commands::GetManifests { course, selection } => {
            commands::manifests::run(&course.course, &selection).await
        }
        Commands::Lint { course } => commands::lint::run(&course.course).await,
        Commands::Convert { course, in_place } => commands::convert::run(&course.course, in_place),
        Commands::Import {
            namespace,
            release_name,
            repository,
        } => commands::import::run(&namespace, &release_name, &repository).await,
    }
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.debug);
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    if let Err(err) = run(cli.command).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

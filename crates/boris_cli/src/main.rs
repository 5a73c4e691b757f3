//! Command line entry point for project inspection.
//!
//! # Responsibility
//! - Open project files through `boris_core` and print the migration outcome.
//! - Run state event pairing checks and subject extraction from a shell.

use anyhow::{Context, Result};
use boris_core::config::parse_time_format;
use boris_core::{
    check_state_events_obs, extract_observed_subjects, init_logging, open_project_with,
    read_project_with, CoreConfig, FfprobeAnalyzer, OpenedProject, Project, TimeFormat,
    NO_FOCAL_SUBJECT,
};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "boris", version, about = "Inspect and upgrade BORIS project files")]
struct Cli {
    /// Log level for the rolling file log (trace|debug|info|warn|error).
    #[arg(long, global = true, default_value_t = boris_core::default_log_level().to_string())]
    log_level: String,

    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a project and upgrade it to the current format.
    ///
    /// Projects with pre-4.0 string modifiers get a `<name>_old_version` copy.
    Open {
        project: PathBuf,
        /// Print the upgraded project document as JSON.
        #[arg(long)]
        print: bool,
    },
    /// Check that state events are paired. Never writes next to the project.
    Check(CheckArgs),
    /// List subjects coded in observations. Never writes next to the project.
    Subjects {
        project: PathBuf,
        /// Observation ids; all observations when omitted.
        #[arg(long = "observation", short = 'o')]
        observations: Vec<String>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Check(_) => "check",
            Self::Subjects { .. } => "subjects",
        }
    }
}

#[derive(Debug, Args)]
struct CheckArgs {
    project: PathBuf,
    /// Observation ids; all observations when omitted.
    #[arg(long = "observation", short = 'o')]
    observations: Vec<String>,
    /// Time format for reports: seconds|hhmmss.
    #[arg(long, value_parser = parse_time_format_arg)]
    time_format: Option<TimeFormat>,
}

fn parse_time_format_arg(raw: &str) -> Result<TimeFormat, String> {
    parse_time_format(raw).ok_or_else(|| format!("unknown time format `{raw}`"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        if let Err(err) = init_logging(&cli.log_level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns `Ok(false)` when a check reports a problem.
fn run(cli: Cli) -> Result<bool> {
    let config = CoreConfig::from_env();
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );

    match cli.command {
        Command::Open { project, print } => {
            let opened = open(&project, &config)?;
            match &opened.path {
                Some(path) => println!("path: {}", path.display()),
                None => println!("path: <save as a new file>"),
            }
            println!("format: {}", opened.project.project_format_version);
            println!("changed: {}", opened.changed);
            if let Some(message) = &opened.message {
                println!("message: {message}");
            }
            if print {
                println!("{}", serde_json::to_string_pretty(&opened.project)?);
            }
            Ok(true)
        }
        Command::Check(args) => {
            let project = read(&args.project, &config)?;
            let time_format = args.time_format.unwrap_or(config.time_format);
            let ids = observation_ids(&project, args.observations);

            let mut all_ok = true;
            for id in &ids {
                let check = check_state_events_obs(&project, id)?;
                let (ok, message) = check.summary(time_format);
                all_ok &= ok;
                println!("[{}] {id}", if ok { "ok" } else { "FAIL" });
                for line in message.lines() {
                    println!("  {line}");
                }
            }
            Ok(all_ok)
        }
        Command::Subjects {
            project,
            observations,
        } => {
            let project = read(&project, &config)?;
            let ids = observation_ids(&project, observations);
            for subject in extract_observed_subjects(&project, &ids) {
                if subject.is_empty() {
                    println!("{NO_FOCAL_SUBJECT}");
                } else {
                    println!("{subject}");
                }
            }
            Ok(true)
        }
    }
}

fn open(path: &Path, config: &CoreConfig) -> Result<OpenedProject> {
    let analyzer = FfprobeAnalyzer::new(config);
    open_project_with(path, &analyzer)
        .with_context(|| format!("failed to open project `{}`", path.display()))
}

fn read(path: &Path, config: &CoreConfig) -> Result<Project> {
    let analyzer = FfprobeAnalyzer::new(config);
    read_project_with(path, &analyzer)
        .with_context(|| format!("failed to read project `{}`", path.display()))
}

fn observation_ids(project: &Project, requested: Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        project.observations.keys().cloned().collect()
    } else {
        requested
    }
}

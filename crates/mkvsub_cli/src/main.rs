//! mkv-subset - batch font subsetting for Matroska subtitles.
//!
//! Usage:
//!   mkv-subset query <dir>
//!   mkv-subset dump <dir> <output> --subset
//!   mkv-subset make <dir> <data> <output>
//!   mkv-subset create <videos> <subtitles> <fonts> <output>
//!
//! Exit status is 0 on success, 1 when any file failed and 2 when the run
//! could not start (bad config, unreadable input directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use mkvsub_core::batch::{BatchOutcome, BatchProcessor, CreateRequest, QueryReport};
use mkvsub_core::check::SubsetCompletenessChecker;
use mkvsub_core::config::{ConfigManager, Settings};
use mkvsub_core::fonts::signature::RandomNames;
use mkvsub_core::fonts::FontTools;
use mkvsub_core::logging::{
    batch_log_name, init_tracing, BatchLogger, BatchLoggerBuilder, LogConfig, LogLevel,
};
use mkvsub_core::models::BatchFlow;
use mkvsub_core::subset::{FontSubsetter, SubsetReport, SubsetRequest};
use mkvsub_core::tools::{SystemRunner, Toolchain};
use mkvsub_core::workspace::WorkspaceFactory;

const DEFAULT_CONFIG: &str = "mkv-subset.toml";

/// Exit status when any file failed.
const EXIT_FAILED: u8 = 1;
/// Exit status when the run could not start.
const EXIT_SETUP: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "mkv-subset")]
#[command(version)]
#[command(about = "Subset the fonts of ASS subtitles in Matroska files")]
struct Cli {
    /// Settings file (created with defaults when missing)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Debug logging, with per-file detail in the batch log
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List containers with ASS subtitles but no subset fonts
    Query {
        dir: PathBuf,
    },

    /// Extract fonts and subtitle tracks into <output>/<relative dir>/<stem>
    Dump {
        dir: PathBuf,
        output: PathBuf,
        /// Subset the extracted ASS tracks into `subsetted/`
        #[arg(long)]
        subset: bool,
    },

    /// Rebuild containers from a `dump --subset` output
    Make {
        dir: PathBuf,
        data: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        track: TrackDefaults,
    },

    /// Wrap videos with their subtitles and subset fonts
    Create {
        videos: PathBuf,
        subtitles: PathBuf,
        fonts: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        track: TrackDefaults,
        /// Drop subtitle tracks and attachments already in the videos
        #[arg(long)]
        clean: bool,
    },

    /// Subset the fonts of ASS files
    Subset {
        #[arg(required = true)]
        ass_files: Vec<PathBuf>,
        /// Font directory (default: `fonts/` next to the first file)
        #[arg(long)]
        fonts: Option<PathBuf>,
        /// Output directory (default: `subsetted/` next to the first file)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write into `subsetted/` under the output directory
        #[arg(long)]
        dir_safe: bool,
    },

    /// Tell whether one container already carries subset fonts
    Check {
        file: PathBuf,
    },

    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the settings file, filling in defaults
    Init,
    /// Print the settings file
    Show,
}

/// Track language and title for tracks whose file name carries none.
#[derive(clap::Args, Debug)]
struct TrackDefaults {
    /// Default track language (overrides `[mux] default_language`)
    #[arg(long)]
    language: Option<String>,
    /// Default track title (overrides `[mux] default_title`)
    #[arg(long)]
    title: Option<String>,
}

impl TrackDefaults {
    fn resolve(&self, settings: &Settings) -> (String, String) {
        (
            self.language
                .clone()
                .unwrap_or_else(|| settings.mux.default_language.clone()),
            self.title
                .clone()
                .unwrap_or_else(|| settings.mux.default_title.clone()),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    if let Err(e) = config.load_or_create() {
        eprintln!("Failed to load {}: {}", cli.config.display(), e);
        return ExitCode::from(EXIT_SETUP);
    }

    let settings = config.settings().clone();
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        settings.logging.level
    };
    let logs_folder = config.logs_folder();
    let _guard = init_tracing(
        level,
        settings.logging.file_log.then_some(logs_folder.as_path()),
    );

    let runner = SystemRunner;
    let toolchain = Toolchain::from_settings(&settings.tools);
    let fonts = FontTools::new(&runner, &toolchain)
        .keep_intermediates(settings.subset.keep_intermediates);
    let names = RandomNames;
    let subsetter = FontSubsetter::new(&fonts, &names)
        .strict(settings.subset.strict_font_match)
        .keep_intermediates(settings.subset.keep_intermediates);

    let app = App {
        settings: &settings,
        logs_folder: &logs_folder,
        verbose: cli.verbose,
        runner: &runner,
        toolchain: &toolchain,
        subsetter,
    };

    match cli.command {
        Command::Query { dir } => app.query(&dir),
        Command::Dump {
            dir,
            output,
            subset,
        } => app.batch(BatchFlow::Dump, |p| p.dump(&dir, &output, subset)),
        Command::Make {
            dir,
            data,
            output,
            track,
        } => {
            let (language, title) = track.resolve(&settings);
            app.batch(BatchFlow::Make, |p| {
                p.make(&dir, &data, &output, &language, &title)
            })
        }
        Command::Create {
            videos,
            subtitles,
            fonts,
            output,
            track,
            clean,
        } => {
            let (language, title) = track.resolve(&settings);
            let request = CreateRequest {
                video_dir: videos,
                subtitle_dir: subtitles,
                fonts_dir: fonts,
                output_dir: output,
                language,
                title,
                clean: clean || settings.mux.clean_source_tracks,
            };
            let workspaces = WorkspaceFactory::from_settings(&settings.paths);
            app.batch(BatchFlow::Create, |p| p.create(&request, &workspaces))
        }
        Command::Subset {
            ass_files,
            fonts,
            output,
            dir_safe,
        } => {
            let mut request = SubsetRequest::new(ass_files).dir_safe(dir_safe);
            if let Some(fonts) = fonts {
                request = request.fonts_dir(fonts);
            }
            if let Some(output) = output {
                request = request.output_dir(output);
            }
            app.subset(&request)
        }
        Command::Check { file } => app.check(&file),
        Command::Config { action } => config_command(&config, action),
    }
}

/// Collaborators shared by every command.
struct App<'a> {
    settings: &'a Settings,
    logs_folder: &'a Path,
    verbose: bool,
    runner: &'a SystemRunner,
    toolchain: &'a Toolchain,
    subsetter: FontSubsetter<'a>,
}

impl App<'_> {
    fn logger(&self, flow: BatchFlow) -> Option<BatchLogger> {
        let config = if self.verbose {
            LogConfig::debug()
        } else {
            LogConfig::from_settings(&self.settings.logging)
        };
        let built = BatchLoggerBuilder::new(batch_log_name(flow.name()))
            .log_dir(self.logs_folder)
            .config(config)
            .build();
        match built {
            Ok(logger) => Some(logger),
            Err(e) => {
                eprintln!(
                    "Failed to open batch log in {}: {}",
                    self.logs_folder.display(),
                    e
                );
                None
            }
        }
    }

    fn query(&self, dir: &Path) -> ExitCode {
        let Some(logger) = self.logger(BatchFlow::Query) else {
            return ExitCode::from(EXIT_SETUP);
        };
        let processor = BatchProcessor::new(self.runner, self.toolchain, self.subsetter, &logger);
        let result = processor.query(dir);
        logger.close();

        match result {
            Ok(report) => print_query(&report),
            Err(e) => {
                eprintln!("Query failed: {}", e);
                ExitCode::from(EXIT_SETUP)
            }
        }
    }

    fn batch(
        &self,
        flow: BatchFlow,
        run: impl FnOnce(&BatchProcessor<'_>) -> mkvsub_core::ProcessResult<BatchOutcome>,
    ) -> ExitCode {
        let Some(logger) = self.logger(flow) else {
            return ExitCode::from(EXIT_SETUP);
        };
        let processor = BatchProcessor::new(self.runner, self.toolchain, self.subsetter, &logger);
        let result = run(&processor);
        logger.close();

        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                eprintln!("{} failed: {}", flow, e);
                ExitCode::from(EXIT_SETUP)
            }
        }
    }

    fn subset(&self, request: &SubsetRequest) -> ExitCode {
        match self.subsetter.run(request) {
            Ok(report) => {
                print_subset(&report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Subset failed: {}", e);
                ExitCode::from(EXIT_FAILED)
            }
        }
    }

    fn check(&self, file: &Path) -> ExitCode {
        let verdict = SubsetCompletenessChecker::new(self.runner, self.toolchain).check(file);
        if verdict.inspection_failed {
            println!("{}: inspection failed", file.display());
            ExitCode::from(EXIT_FAILED)
        } else if verdict.complete {
            println!("{}: complete", file.display());
            ExitCode::SUCCESS
        } else {
            println!("{}: needs subset", file.display());
            ExitCode::SUCCESS
        }
    }
}

fn config_command(config: &ConfigManager, action: ConfigAction) -> ExitCode {
    match action {
        // Loading already wrote the file
        ConfigAction::Init => {
            println!("Settings written to {}", config.path().display());
            ExitCode::SUCCESS
        }
        ConfigAction::Show => match fs::read_to_string(config.path()) {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to read {}: {}", config.path().display(), e);
                ExitCode::from(EXIT_SETUP)
            }
        },
    }
}

fn print_query(report: &QueryReport) -> ExitCode {
    for path in &report.needs_subset {
        println!("{}", path.display());
    }
    for path in &report.inspection_failed {
        eprintln!("inspection failed: {}", path.display());
    }
    println!(
        "{} of {} file(s) need subsetting, {} could not be inspected",
        report.needs_subset.len(),
        report.total,
        report.inspection_failed.len()
    );

    if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}

fn print_outcome(outcome: &BatchOutcome) -> ExitCode {
    for failure in &outcome.failures {
        eprintln!(
            "[{}] {}: {}",
            failure.kind,
            failure.path.display(),
            failure.message
        );
    }
    for path in &outcome.degraded {
        eprintln!("degraded: {}", path.display());
    }
    println!(
        "{}: {} file(s), {} failed",
        outcome.flow,
        outcome.total,
        outcome.failed()
    );

    if outcome.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}

fn print_subset(report: &SubsetReport) {
    for font in &report.fonts {
        println!("font: {}", font.display());
    }
    for ass in &report.ass_files {
        println!("subtitle: {}", ass.display());
    }
    if !report.unmatched.is_empty() {
        eprintln!("no font found for: {}", report.unmatched.join(", "));
    }
    for (family, chars) in &report.missing_glyphs {
        let chars: String = chars.iter().collect();
        eprintln!("{} cannot draw: {}", family, chars);
    }
}

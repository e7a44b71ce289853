use clap::{Parser, Subcommand, ValueEnum};
use robot_properties::{
    Error, PathResolver, TemplateBuilder, TemplateEngine, XacroCommand, XacroProcessor,
    DEFAULT_FAMILY,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "robot-properties")]
#[command(about = "Resolve robot description files and generate URDF from xacro templates", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Quiet operation, suppress warnings
    #[arg(short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Set verbosity level explicitly (0-4)
    #[arg(
        long = "verbosity",
        value_name = "LEVEL",
        global = true,
        conflicts_with = "verbose",
        conflicts_with = "quiet"
    )]
    verbosity_level: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved paths of a robot, generating its URDF if missing
    Paths {
        /// Robot name, e.g. bolt
        robot: String,

        /// Robot family (selects robot_properties_<FAMILY>)
        #[arg(long, default_value = DEFAULT_FAMILY)]
        family: String,

        /// Package root containing robot_properties_<FAMILY>
        #[arg(long, value_name = "DIR")]
        package_dir: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Generate every xacro/**/*.urdf.xacro template of a resource directory
    Build {
        resources_dir: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Expand a single template
    Expand {
        input: PathBuf,

        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum EngineKind {
    /// In-process xacro expansion
    Builtin,
    /// External xacro executable
    Xacro,
}

#[derive(clap::Args, Debug)]
struct EngineArgs {
    /// Templating engine
    #[arg(long, value_enum, default_value_t = EngineKind::Builtin)]
    engine: EngineKind,

    /// External xacro executable used with --engine xacro
    #[arg(long = "xacro-bin", value_name = "PATH", default_value = "xacro")]
    xacro_bin: String,

    /// Template arguments in key:=value format
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    mappings: Vec<String>,
}

impl EngineArgs {
    fn parse_mappings(&self) -> Vec<(String, String)> {
        let mut mappings = Vec::new();
        for arg in &self.mappings {
            match arg.split_once(":=") {
                Some((key, value)) => mappings.push((key.to_string(), value.to_string())),
                None => log::warn!("ignoring argument '{}', expected key:=value", arg),
            }
        }
        mappings
    }

    fn template_engine(&self) -> Box<dyn TemplateEngine> {
        let mappings = self.parse_mappings();
        match self.engine {
            EngineKind::Builtin => Box::new(XacroProcessor::builder().with_args(mappings).build()),
            EngineKind::Xacro => Box::new(
                mappings
                    .into_iter()
                    .fold(XacroCommand::new(&self.xacro_bin), |cmd, (key, value)| {
                        cmd.with_arg(key, value)
                    }),
            ),
        }
    }
}

impl Cli {
    fn get_verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else if let Some(level) = self.verbosity_level {
            level.min(4)
        } else {
            2 + self.verbose.min(2)
        }
    }
}

fn init_logging(verbosity: u8) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new().filter_level(level).init();
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Paths {
            robot,
            family,
            package_dir,
            engine,
        } => {
            let mut builder = PathResolver::builder().engine(engine.template_engine());
            if let Some(dir) = package_dir {
                builder = builder.package_dir(dir);
            }
            let bundle = builder.build().find_paths(&robot, Some(family.as_str()))?;

            let mut stdout = io::stdout().lock();
            for (key, path) in bundle.to_map() {
                writeln!(stdout, "{}: {}", key, path)?;
            }
            stdout.flush()?;
        }
        Command::Build {
            resources_dir,
            engine,
        } => {
            let generated = TemplateBuilder::new(engine.template_engine()).build_all(&resources_dir)?;
            log::info!("generated {} file(s)", generated.len());
        }
        Command::Expand {
            input,
            output,
            engine,
        } => {
            let builder = TemplateBuilder::new(engine.template_engine());
            match output {
                Some(output) => builder.build_single(&input, &output)?,
                None => {
                    let xml = builder.render(&input)?;
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(xml.as_bytes())?;
                    stdout.flush()?;
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.get_verbosity());

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("robot-properties: {:#}", err);
            let expansion_failed = err
                .downcast_ref::<Error>()
                .is_some_and(Error::is_expansion_failure);
            if expansion_failed {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

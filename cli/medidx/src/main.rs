use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use medi_ai::DISCLAIMER;
use medi_diagnose::{
    write_demo_artifacts, DiagnoseConfig, DiagnoseError, Diagnosis, DiagnosisService, Tool,
};
use medi_features::RawInput;
use serde_json::json;

const EXIT_OK: i32 = 0;
const EXIT_INPUT: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "medidx",
    version,
    about = "Run the Medi diagnosis tools from the command line",
    long_about = "medidx runs frozen diagnosis models on form input or chest X-ray images.\n\n\
        Artifacts are read from --artifacts, else $MEDI_ARTIFACT_DIR, else ./artifacts.\n\n\
        EXAMPLES:\n\
        \n  medidx demo ./artifacts                         Write demonstration artifacts\
        \n  medidx schema heart-disease                     Show the form fields\
        \n  medidx predict heart-disease --input form.json  Predict from a JSON object\
        \n  echo '{...}' | medidx predict stroke            Predict from stdin\
        \n  medidx xray chest.png                           Predict pneumonia from an image\
        \n  medidx check                                    Load and cross-check all artifacts",
    after_help = "These tools are not a substitute for professional medical advice."
)]
struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the model artifacts
    #[arg(long = "artifacts", value_name = "DIR", global = true)]
    artifacts: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predict a form-based tool from a JSON object of field values
    Predict(PredictArgs),

    /// Predict pneumonia from a chest X-ray image (PNG or JPEG)
    Xray {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },

    /// Print the form description of a tool as JSON
    Schema {
        #[arg(value_name = "TOOL")]
        tool: Tool,
    },

    /// Load every artifact and verify the pipelines fit together
    Check,

    /// Write synthetic demonstration artifacts into a directory
    Demo {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

#[derive(Debug, Args)]
struct PredictArgs {
    /// breast-cancer, heart-disease or stroke
    #[arg(value_name = "TOOL")]
    tool: Tool,

    /// JSON input file (reads from stdin if not provided)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

fn read_input(input: &Option<PathBuf>) -> Result<String, String> {
    if let Some(path) = input {
        fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {e}", path.display()))
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read from stdin: {e}"))?;
        Ok(buf)
    }
}

fn load_service(cli: &Cli) -> Result<(DiagnoseConfig, DiagnosisService), String> {
    let config = DiagnoseConfig::resolve(cli.artifacts.clone()).map_err(|e| e.to_string())?;
    let service = DiagnosisService::load(&config).map_err(|e| e.to_string())?;
    Ok((config, service))
}

fn render_text(d: &Diagnosis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", d.tool, d.label);
    if let Some(score) = d.score {
        let _ = writeln!(out, "score: {score:.3}");
    }
    let _ = writeln!(out, "{}", d.advisory);
    if let Some(url) = &d.reference {
        let _ = writeln!(out, "more information: {url}");
    }
    if let Some(explanation) = &d.explanation {
        let _ = writeln!(out, "strongest contributions:");
        for c in explanation.top(5) {
            let _ = writeln!(out, "  {:<28} {:+.3}", c.feature, c.contribution);
        }
    }
    let _ = write!(out, "\n{DISCLAIMER}");
    out
}

fn report(result: Result<Diagnosis, DiagnoseError>, json: bool) -> i32 {
    match result {
        Ok(d) => {
            if json {
                match serde_json::to_string_pretty(&d) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("error: {e}");
                        return EXIT_CONFIG;
                    }
                }
            } else {
                println!("{}", render_text(&d));
            }
            EXIT_OK
        }
        Err(e) if e.is_recoverable() => {
            eprintln!("error: {e}");
            EXIT_INPUT
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_CONFIG
        }
    }
}

fn run_predict(cli: &Cli, args: &PredictArgs) -> i32 {
    let text = match read_input(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };
    let input = match RawInput::from_json(&text) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_INPUT;
        }
    };
    let service = match load_service(cli) {
        Ok((_, s)) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };
    report(service.predict(args.tool, &input), cli.json)
}

fn run_xray(cli: &Cli, image: &Path) -> i32 {
    let service = match load_service(cli) {
        Ok((_, s)) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };
    report(service.predict_image_path(image), cli.json)
}

fn schema_json(tool: Tool) -> Result<String, serde_json::Error> {
    match tool.schema() {
        Some(schema) => schema.describe(),
        None => serde_json::to_string_pretty(&json!({
            "name": tool.name(),
            "input": "image",
            "formats": ["png", "jpeg"],
            "shape": medi_features::ImageAssembler::default().shape(),
        })),
    }
}

fn run_check(cli: &Cli) -> i32 {
    let (config, service) = match load_service(cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };
    let models: Vec<(Tool, String)> = service
        .tools()
        .map(|tool| {
            let backend = match service.pipeline(tool) {
                Some(p) => p.model().backend_name().to_string(),
                None => service.image_pipeline().model().backend_name().to_string(),
            };
            (tool, backend)
        })
        .collect();
    if cli.json {
        let tools: Vec<_> = models
            .iter()
            .map(|(tool, backend)| json!({"tool": tool, "backend": backend}))
            .collect();
        println!(
            "{}",
            json!({"artifact_dir": config.artifact_dir, "tools": tools})
        );
    } else {
        println!("artifacts: {}", config.artifact_dir.display());
        for (tool, backend) in &models {
            println!("  ok  {:<14} {backend}", tool.name());
        }
    }
    EXIT_OK
}

fn run_demo(dir: &Path) -> i32 {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("error: cannot create '{}': {e}", dir.display());
        return EXIT_CONFIG;
    }
    match write_demo_artifacts(dir) {
        Ok(config) => {
            println!(
                "wrote demonstration artifacts to {} (synthetic weights, not for clinical use)",
                config.artifact_dir.display()
            );
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_CONFIG
        }
    }
}

fn run_cli() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Predict(args) => run_predict(&cli, args),
        Command::Xray { image } => run_xray(&cli, image),
        Command::Schema { tool } => match schema_json(*tool) {
            Ok(s) => {
                println!("{s}");
                EXIT_OK
            }
            Err(e) => {
                eprintln!("error: {e}");
                EXIT_CONFIG
            }
        },
        Command::Check => run_check(&cli),
        Command::Demo { dir } => run_demo(dir),
    }
}

fn main() {
    std::process::exit(run_cli());
}

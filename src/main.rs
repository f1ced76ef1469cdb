use std::process;

use tracing_subscriber::{fmt, EnvFilter};
use xlsxfilter::cli::{self, Invocation};
use xlsxfilter::{Config, PipelineBuilder, RunLog};

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    process::exit(run());
}

fn run() -> i32 {
    let spec = match cli::parse_args(std::env::args_os()) {
        Ok(Invocation::Run(spec)) => spec,
        Ok(Invocation::Info(text)) => {
            print!("{}", text);
            return 0;
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", cli::USAGE);
            return e.exit_code();
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return e.exit_code();
        }
    };

    let mut log = match RunLog::open(&config.log) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Cannot open log file: {}", e);
            return e.exit_code();
        }
    };
    tracing::debug!(log = ?log.path(), "run log opened");

    let pipeline = match PipelineBuilder::new().with_config(config).build() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log.error(e.to_string());
            return e.exit_code();
        }
    };

    match pipeline.run(&spec, &mut log) {
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record};
use nnchain::{Error, LayerRegistry, NdArray, Predictor, Trainer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Train,
    Infer,
}

/// Trains a network from a trainer configuration, or runs a trained model on an input file.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    #[arg(short, long, value_enum)]
    phase: Mode,
    /// Trainer configuration (train).
    #[arg(short, long, required_if_eq("phase", "train"))]
    config: Option<PathBuf>,
    /// Model to write (train) or read (infer).
    #[arg(short, long, required_if_eq("phase", "infer"))]
    model: Option<PathBuf>,
    /// Raw native-endian f32 values (infer).
    #[arg(short, long, required_if_eq("phase", "infer"))]
    input: Option<PathBuf>,
}

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(
            io::stderr().lock(),
            "{timestamp} {:<5} {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn init_logger() {
    let level = env::var("NNCHAIN_LOG")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn train(config: PathBuf, model: Option<PathBuf>) -> Result<(), Error> {
    let model = model.unwrap_or_else(|| PathBuf::from("model.json"));
    let mut trainer = Trainer::load(&config, &LayerRegistry::default())?;
    trainer.train_to(&model)
}

fn infer(model: PathBuf, input: PathBuf) -> Result<(), Error> {
    let predictor = Predictor::load(&model, &LayerRegistry::default())?;
    let bytes = fs::read(&input).map_err(Error::io(&input))?;
    let width = bytes.len() / size_of::<f32>();
    if width * size_of::<f32>() != bytes.len() {
        log::warn!(
            "{}: ignoring {} trailing bytes",
            input.display(),
            bytes.len() - width * size_of::<f32>()
        );
    }
    let input = NdArray::from_bytes(&bytes[..width * size_of::<f32>()], [1, width]);
    let mut output = NdArray::new();
    predictor.predict(&input, &mut output);
    let mut stdout = io::stdout().lock();
    for value in output.as_slice() {
        writeln!(stdout, "{value}").map_err(Error::io("<stdout>"))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();
    let result = match (cli.phase, cli.config, cli.model, cli.input) {
        (Mode::Train, Some(config), model, _) => train(config, model),
        (Mode::Infer, _, Some(model), Some(input)) => infer(model, input),
        _ => unreachable!("clap enforces the arguments of each phase"),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use termcolor::{self, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use base::prelude::*;
use engine::regs::{
    COND_MASK0, COND_MASK1, CTRL, CTRL_DUAL_COMPARE, CTRL_ENABLE, CTRL_FRACTURE, OUT_MASK0,
    OUT_MASK1,
};
use engine::{BasicClock, Clock, Context, Prism, ShardStatus};

mod program;

#[derive(Debug, Parser)]
#[command(name = "prism", about = "Drive a PRISM state machine from the command line")]
struct Cli {
    /// Program image for the state table, one hex word per line.
    /// Without --program1, rows past the first half spill into
    /// table 1.
    program: PathBuf,

    /// Separate program image for table 1.
    #[arg(long)]
    program1: Option<PathBuf>,

    /// Number of cycles to run.
    #[arg(long, default_value_t = 64)]
    cycles: u64,

    /// Constant input vector, as a hex word.
    #[arg(long, value_parser = parse_hex_word, default_value = "0")]
    input: u32,

    /// File of hex input vectors, one per cycle; the last one is
    /// held for any remaining cycles.
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Run the two table halves as independent shards.
    #[arg(long)]
    fracture: bool,

    /// Enable the second compare lane.
    #[arg(long)]
    dual_compare: bool,

    /// Static/jump output mask for shard 0.
    #[arg(long, value_parser = parse_hex_word, default_value = "ffffffff")]
    out_mask0: u32,

    /// Conditional output mask for shard 0.
    #[arg(long, value_parser = parse_hex_word, default_value = "0")]
    cond_mask0: u32,

    /// Static/jump output mask for shard 1.
    #[arg(long, value_parser = parse_hex_word, default_value = "ffffffff")]
    out_mask1: u32,

    /// Conditional output mask for shard 1.
    #[arg(long, value_parser = parse_hex_word, default_value = "0")]
    cond_mask1: u32,

    /// Print the machine status as JSON when the run ends.
    #[arg(long)]
    status_json: bool,
}

fn parse_hex_word(text: &str) -> Result<u32, String> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|e| format!("{text:?} is not a 32-bit hex word: {e}"))
}

fn get_colour_choice() -> termcolor::ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Writes one line per interesting cycle, in yellow while any shard
/// is halted.
struct TraceWriter {
    stream: StandardStream,
}

impl TraceWriter {
    fn new() -> TraceWriter {
        TraceWriter {
            stream: StandardStream::stdout(get_colour_choice()),
        }
    }

    fn line(
        &mut self,
        cycle: u64,
        inputs: u32,
        outputs: u32,
        shards: &[ShardStatus; 2],
        fracture: bool,
    ) -> Result<(), std::io::Error> {
        let halted = shards.iter().any(|shard| shard.halted);
        if halted {
            let mut spec = ColorSpec::new();
            spec.set_fg(Some(termcolor::Color::Yellow));
            if let Err(e) = self.stream.set_color(&spec) {
                event!(Level::ERROR, "Failed to select colour {:?}: {}", spec, e);
            }
        }
        write!(
            self.stream,
            "{cycle:>6}  in {inputs:#010x}  out {outputs:#010x}  s0@{}",
            shards[0].index
        )?;
        if fracture {
            write!(self.stream, "  s1@{}", shards[1].index)?;
        }
        for shard in shards.iter() {
            if shard.halted {
                write!(self.stream, "  [{} halted]", shard.shard)?;
            }
        }
        writeln!(self.stream)?;
        if halted {
            self.stream.reset()?;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.stream.reset() {
            event!(Level::ERROR, "Failed to reset terminal: {}", e);
        }
    }
}

fn load_programs(
    prism: &mut Prism,
    clock: &mut BasicClock,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let depth0 = prism.geometry().depth(ShardId::Zero);
    let depth1 = prism.geometry().depth(ShardId::One);
    let total = prism.geometry().total_depth();
    let layout = prism.row_layout().clone();
    let words = program::parse_words(&std::fs::read_to_string(&cli.program)?)?;
    match &cli.program1 {
        Some(path) => {
            let rows0 = program::rows_from_words(&words, &layout, depth0)?;
            prism.load_rows(clock, ShardId::Zero, &rows0)?;
            let words1 = program::parse_words(&std::fs::read_to_string(path)?)?;
            let rows1 = program::rows_from_words(&words1, &layout, depth1)?;
            prism.load_rows(clock, ShardId::One, &rows1)?;
        }
        None => {
            // One image for the concatenated table; the tail of it
            // lands in table 1.
            let rows = program::rows_from_words(&words, &layout, total)?;
            let split = rows.len().min(usize::from(depth0));
            prism.load_rows(clock, ShardId::Zero, &rows[..split])?;
            if rows.len() > split {
                prism.load_rows(clock, ShardId::One, &rows[split..])?;
            }
        }
    }
    Ok(())
}

fn input_schedule(cli: &Cli) -> Result<Vec<u32>, Box<dyn std::error::Error>> {
    match &cli.input_file {
        Some(path) => {
            let words = program::parse_words(&std::fs::read_to_string(path)?)?;
            if words.is_empty() {
                Ok(vec![cli.input])
            } else {
                Ok(words)
            }
        }
        None => Ok(vec![cli.input]),
    }
}

fn schedule_value(schedule: &[u32], cycle: u64) -> u32 {
    let position = (cycle as usize).min(schedule.len() - 1);
    schedule[position]
}

fn run_machine() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // See the tracing_subscriber::fmt module documentation for how
    // to select which trace messages get printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Box::new(e));
        }
        Ok(layer) => layer,
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // TODO: take the table shape on the command line instead of
    // assuming the reference build.
    let mut prism = Prism::new(Geometry::default());
    let mut clock = BasicClock::new();

    load_programs(&mut prism, &mut clock, &cli)?;

    prism.write_register(OUT_MASK0, cli.out_mask0)?;
    prism.write_register(COND_MASK0, cli.cond_mask0)?;
    prism.write_register(OUT_MASK1, cli.out_mask1)?;
    prism.write_register(COND_MASK1, cli.cond_mask1)?;

    let mut ctrl = CTRL_ENABLE;
    if cli.fracture {
        ctrl |= CTRL_FRACTURE;
    }
    if cli.dual_compare {
        ctrl |= CTRL_DUAL_COMPARE;
    }
    prism.write_register(CTRL, ctrl)?;

    let inputs = input_schedule(&cli)?;
    let mut writer = TraceWriter::new();
    let mut last_line = None;
    for n in 0..cli.cycles {
        let input = schedule_value(&inputs, n);
        let ctx = Context::new(clock.now());
        let out = prism.tick(&ctx, InputVector::new(input));
        clock.advance(1);
        let status = prism.status();
        let key = (
            input,
            out.bits(),
            status.shards[0].index,
            status.shards[1].index,
            status.shards[0].halted,
            status.shards[1].halted,
        );
        if last_line != Some(key) {
            writer.line(n, input, out.bits(), &status.shards, cli.fracture)?;
            last_line = Some(key);
        }
    }
    writer.disconnect();

    if prism.irq_pending() {
        event!(Level::INFO, "halt interrupt pending at the end of the run");
    }
    if cli.status_json {
        println!("{}", serde_json::to_string_pretty(&prism.status())?);
    }
    Ok(())
}

fn main() {
    match run_machine() {
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

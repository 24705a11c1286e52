use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::ThreadPoolBuilder;
use sbpe::corpus::load_text_corpus;
use sbpe::serialization::load_snapshot;
use sbpe::{BpeTokenizer, IngestConfig, TokenId, TrainerConfig};
use serde_json::json;

const DEFAULT_OUTPUT: &str = "vocab.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Subword BPE toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a new vocabulary from text files
    Train(TrainArgs),
    /// Encode text into token ids
    Encode(EncodeArgs),
    /// Decode token ids back into text
    Decode(DecodeArgs),
    /// Check that text survives an encode/decode round trip
    Validate(ValidateArgs),
    /// Train, encode and validate each input file independently
    Benchmark(BenchmarkArgs),
    /// Inspect vocabulary metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Vocabulary size cap
    #[arg(long, value_name = "SIZE")]
    vocab_size: Option<usize>,

    /// Minimum pair frequency for merges
    #[arg(long, value_name = "COUNT")]
    min_frequency: Option<usize>,

    /// Maximum merge iterations
    #[arg(long, value_name = "COUNT")]
    max_merges: Option<usize>,

    /// Replace the special tokens (repeat flag, order preserved)
    #[arg(long = "special-token", value_name = "TOKEN")]
    special_tokens: Vec<String>,

    /// Special token standing in for unknown symbols
    #[arg(long, value_name = "TOKEN")]
    unknown_token: Option<String>,

    /// End-of-word marker
    #[arg(long, value_name = "MARKER")]
    end_of_word: Option<String>,
}

impl ConfigArgs {
    fn build(&self, show_progress: bool) -> Result<TrainerConfig> {
        let mut cfg = TrainerConfig::builder().show_progress(show_progress);
        if let Some(vocab_size) = self.vocab_size {
            cfg = cfg.vocab_size(vocab_size);
        }
        if let Some(min_frequency) = self.min_frequency {
            cfg = cfg.min_frequency(min_frequency);
        }
        if let Some(max_merges) = self.max_merges {
            cfg = cfg.max_merges(max_merges);
        }
        if !self.special_tokens.is_empty() {
            cfg = cfg.special_tokens(self.special_tokens.clone());
        }
        if let Some(token) = &self.unknown_token {
            cfg = cfg.unknown_token(token.clone());
        }
        if let Some(marker) = &self.end_of_word {
            cfg = cfg.end_of_word(marker.clone());
        }
        Ok(cfg.build()?)
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the vocabulary snapshot
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Disable per-iteration logging/progress
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct TextInput {
    /// Text to process when --input is omitted
    #[arg(value_name = "TEXT", required_unless_present = "input")]
    text: Option<String>,

    /// Read the text from a file instead
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

impl TextInput {
    fn read(&self) -> Result<String> {
        match (&self.input, &self.text) {
            (Some(path), _) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => bail!("either TEXT or --input is required"),
        }
    }
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Vocabulary snapshot to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    #[command(flatten)]
    source: TextInput,

    /// Emit a JSON record instead of space separated ids
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Vocabulary snapshot to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Path to whitespace separated token ids
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Token ids to decode when --input is omitted
    #[arg(value_name = "ID", required_unless_present = "input")]
    tokens: Vec<TokenId>,

    /// Output file for decoded text (defaults to stdout)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Vocabulary snapshot to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    #[command(flatten)]
    source: TextInput,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct BenchmarkArgs {
    /// Files or directories; each file is one sample
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Vocabulary snapshot to inspect
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Benchmark(args) => run_benchmark(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn load_tokenizer(path: &Path) -> Result<BpeTokenizer> {
    BpeTokenizer::load(path)
        .with_context(|| format!("failed to load vocabulary from {}", path.display()))
}

fn run_train(args: TrainArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let cfg = args.config.build(!args.no_progress)?;
    let ingest = IngestConfig {
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
    };
    let documents =
        load_text_corpus(&args.inputs, &ingest).context("failed to load text corpus")?;
    let text = documents.join("\n");
    info!(
        "loaded {} documents totalling {} characters",
        documents.len(),
        text.chars().count()
    );

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} training merges... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let mut tokenizer = BpeTokenizer::new(cfg);
    let start = Instant::now();
    let outcome = tokenizer.train(&text);
    if let Some(pb) = spinner {
        pb.finish_with_message("training complete");
    }
    outcome?;
    let elapsed = start.elapsed();

    tokenizer
        .save(&args.output, args.pretty)
        .with_context(|| format!("failed to save vocabulary to {}", args.output.display()))?;

    let stats = tokenizer
        .training_metrics()
        .ok_or_else(|| anyhow!("training produced no statistics"))?;
    info!(
        "training complete: merges={} vocab={} duration={elapsed:.2?} stop={:?}",
        stats.merge_count, stats.vocab_size, stats.stop_reason
    );
    println!(
        "✅ wrote vocabulary of {} tokens ({} merges) to {}",
        stats.vocab_size,
        stats.merge_count,
        args.output.display()
    );
    println!(
        "   words {} ({} distinct) | compression {:.2} | duration {:.2?}",
        stats.total_words, stats.unique_words, stats.compression_ratio, elapsed
    );

    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.vocab)?;
    let text = args.source.read()?;
    let tokens = tokenizer.tokenize(&text)?;

    if args.json {
        let metrics = tokenizer.last_encode_metrics();
        let record = json!({
            "tokens": tokens,
            "token_count": tokens.len(),
            "compression_ratio": metrics.map(|m| m.compression_ratio),
        });
        println!("{}", serde_json::to_string(&record)?);
    } else {
        let mut stdout = std::io::stdout().lock();
        write_token_sequence(&mut stdout, &tokens)?;
    }
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.vocab)?;

    let tokens = if let Some(input_path) = &args.input {
        let contents = fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?;
        parse_token_list(&contents)?
    } else {
        args.tokens
    };

    let text = tokenizer.detokenize(&tokens);

    if let Some(path) = &args.output {
        let mut file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} characters to {}", text.chars().count(), path.display());
    } else {
        println!("{text}");
    }

    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.vocab)?;
    let text = args.source.read()?;
    let report = tokenizer.validate_round_trip(&text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Valid          : {}", report.valid);
        println!("Ids covered    : {}", report.ids_cover_ok);
        println!("Normalized     : {}", report.normalized_match);
        println!("Tokens         : {}", report.token_count);
        println!("Reconstructed  : {}", report.reconstructed);
        for error in &report.errors {
            println!("  - {error}");
        }
    }
    Ok(())
}

fn run_benchmark(args: BenchmarkArgs) -> Result<()> {
    let cfg = args.config.build(false)?;
    let samples = load_text_corpus(&args.inputs, &IngestConfig::default())
        .context("failed to load benchmark samples")?;
    let tokenizer = BpeTokenizer::new(cfg);
    let report = tokenizer.benchmark(&samples);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Samples            : {}", report.samples);
        println!("Avg training time  : {:.2?}", report.average_training_time);
        println!("Avg encode time    : {:.2?}", report.average_tokenization_time);
        println!("Avg compression    : {:.3}", report.average_compression_ratio);
        println!("Avg chars/token    : {:.3}", report.average_token_compression);
        println!("Round-trip accuracy: {:.1}%", report.round_trip_accuracy);
        for error in &report.errors {
            println!("  - {error}");
        }
    }
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.vocab)
        .with_context(|| format!("failed to read {}", args.vocab.display()))?;

    let special_tokens = snapshot.config.special_tokens.clone().unwrap_or_default();
    let summary = json!({
        "path": args.vocab.display().to_string(),
        "vocab_size": snapshot.id_to_token.len(),
        "merges": snapshot.merges.len(),
        "special_tokens": special_tokens,
        "end_of_word": snapshot.config.end_of_word,
        "stop_reason": snapshot.stats.as_ref().map(|stats| format!("{:?}", stats.stop_reason)),
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Vocab size    : {}", snapshot.id_to_token.len());
        println!("Merges        : {}", snapshot.merges.len());
        if special_tokens.is_empty() {
            println!("Special tokens: (none)");
        } else {
            println!("Special tokens: {}", special_tokens.join(", "));
        }
        if let Some(stats) = &snapshot.stats {
            println!("Stop reason   : {:?}", stats.stop_reason);
            println!("Distinct words: {}", stats.unique_words);
        }
    }

    Ok(())
}

fn write_token_sequence<W: Write>(writer: &mut W, tokens: &[TokenId]) -> Result<()> {
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            writer.write_all(b" ")?;
        }
        write!(writer, "{token}")?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

fn parse_token_list(text: &str) -> Result<Vec<TokenId>> {
    text.split_whitespace()
        .map(|part| {
            part.parse::<TokenId>()
                .map_err(|err| anyhow!("invalid token id `{part}`: {err}"))
        })
        .collect()
}

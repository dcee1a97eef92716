//! MQAR Dataset Export Tool
//!
//! Configuration-driven export of multi-query associative recall datasets.
//!
//! ## Output Format
//!
//! For every split in the configuration:
//!
//! - **Inputs**: `{split}_inputs.npy` - Shape `[N, L]`, int64
//! - **Labels**: `{split}_labels.npy` - Shape `[N, L]`, int64, `-100` = ignore
//! - **Metadata**: `{split}_metadata.json` - Generator config and vocabulary layout
//!
//! plus `dataset_config.toml`, the configuration that produced them.
//!
//! # Usage
//!
//! ```bash
//! # From TOML config
//! cargo run --release --bin export_mqar -- --config configs/mqar.toml
//!
//! # Generate sample config
//! cargo run --release --bin export_mqar -- --generate-config mqar.toml
//!
//! # Print one small example
//! cargo run --release --bin export_mqar -- --preview
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use mqar_dataset::export::{export_dataset, DatasetConfig, ExperimentInfo};
use mqar_dataset::{generate, BatchStats, IGNORE_INDEX};

/// Main entry point for the export tool
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a path argument");
                std::process::exit(1);
            }
            run_from_config(&args[2]);
        }
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--preview" => preview(),
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        _ => {
            eprintln!("Unknown argument: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
MQAR Dataset Export Tool

Usage:
    {program} --config <path.toml>       Export dataset from config file
    {program} --generate-config <path>   Generate sample config file
    {program} --preview                  Print one example (V=12, L=16, K=2)
    {program} --help                     Show this help

Examples:
    # Export the default train/valid splits
    {program} --config configs/mqar.toml

    # Generate sample config
    {program} --generate-config configs/mqar.toml
"#
    );
}

/// Generate a sample configuration file
fn generate_sample_config(path: &str) {
    let sample_config = DatasetConfig::default().with_experiment(ExperimentInfo {
        name: "MQAR".to_string(),
        description: Some("Multi-query associative recall, V=64 L=64 K=8".to_string()),
        version: "1.0.0".to_string(),
        tags: vec!["mqar".to_string(), "synthetic".to_string()],
    });

    match sample_config.save_toml(path) {
        Ok(()) => {
            println!("Generated sample config: {path}");
            println!("\nEdit the following fields before running:");
            println!("  - output_dir: Where the .npy files go");
            println!("  - task.*: Vocabulary size, sequence length, pairs, power_a");
            println!("  - splits: Sizes and seeds per split");
        }
        Err(e) => {
            eprintln!("Error generating config: {e}");
            std::process::exit(1);
        }
    }
}

/// Run export from configuration file
fn run_from_config(config_path: &str) {
    let config = match DatasetConfig::load_toml(config_path) {
        Ok(c) => {
            println!("Loaded configuration: {config_path}");
            c
        }
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    print_config_summary(&config);

    let result = match export_dataset(&config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Export failed: {e}");
            std::process::exit(1);
        }
    };

    println!();
    for split in result.iter() {
        print_split_summary(&split.name, &split.stats, split.elapsed.as_secs_f64());
    }
    println!(
        "\nExported {} examples in {:.2}s to {}",
        result.total_examples(),
        result.elapsed.as_secs_f64(),
        result.output_dir.display()
    );
}

fn print_config_summary(config: &DatasetConfig) {
    println!("┌─ Configuration Summary ───────────────────────────────────────┐");
    println!("│ Experiment:  {}", config.experiment.name);
    println!("│ Vocab size:  {}", config.task.vocab_size);
    println!("│ Seq length:  {}", config.task.input_seq_len);
    println!("│ KV pairs:    {}", config.task.num_kv_pairs);
    println!("│ power_a:     {}", config.task.power_a);
    println!("│ Noise fill:  {}", config.task.fill_noise);
    println!("│ Batch size:  {}", config.batch_size);
    println!("│");
    for split in &config.splits {
        println!(
            "│ {:<8} {:>8} examples (seed {}{})",
            split.name,
            split.rounded_examples(config.batch_size),
            split.seed,
            split
                .power_a
                .map(|a| format!(", power_a {a}"))
                .unwrap_or_default()
        );
    }
    println!("│");
    println!("│ Output:      {}", config.output_dir.display());
    println!("└────────────────────────────────────────────────────────────────┘");
}

fn print_split_summary(name: &str, stats: &BatchStats, seconds: f64) {
    println!(
        "  {name:<8} {:>8} examples  {:>9} queries  mean gap {:>6.2}  blank {:>5.1}%  ({seconds:.2}s)",
        stats.num_examples,
        stats.num_queries,
        stats.mean_gap,
        stats.blank_fraction * 100.0
    );
}

/// Print a single small example with keys, values and queries marked.
fn preview() {
    let (inputs, labels) = match generate(12, 1, 16, 0, 1.0, 2, false) {
        Ok(arrays) => arrays,
        Err(e) => {
            eprintln!("Generation failed: {e}");
            std::process::exit(1);
        }
    };

    let fmt_row = |row: ndarray::ArrayView1<'_, i64>| {
        row.iter()
            .map(|&t| {
                if t == IGNORE_INDEX {
                    "   .".to_string()
                } else {
                    format!("{t:>4}")
                }
            })
            .collect::<String>()
    };

    println!("vocab_size=12 input_seq_len=16 num_kv_pairs=2 power_a=1.0 seed=0");
    println!("inputs: {}", fmt_row(inputs.row(0)));
    println!("labels: {}", fmt_row(labels.row(0)));
}

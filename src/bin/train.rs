//! RBM demo training binary.
//!
//! Trains a small RBM with CD-k on an embedded binary pattern dataset and
//! prints the reconstruction cross-entropy as it falls. Optionally saves the
//! trained parameters as a JSON checkpoint.

use clap::Parser;
use ndarray::{arr2, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rbm::checkpoint::save_checkpoint;
use rbm::{train_step, CdConfig, Rbm, RngSource};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rbm-train", about = "Train a demo RBM with contrastive divergence")]
struct Args {
    /// Number of CD training steps
    #[arg(long, default_value_t = 1000)]
    steps: usize,

    /// Gibbs chain length per step
    #[arg(long, default_value_t = 1)]
    k: usize,

    /// Learning rate
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// Hidden layer size
    #[arg(long, default_value_t = 3)]
    hidden_size: usize,

    /// Weight-gradient momentum coefficient
    #[arg(long, default_value_t = 1.0)]
    momentum: f64,

    /// Weight-decay coefficient (0 disables regularization)
    #[arg(long, default_value_t = 0.0)]
    weight_decay: f64,

    /// RNG seed
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Print metrics every N steps
    #[arg(long, default_value_t = 100)]
    report_every: usize,

    /// Save the trained parameters to this JSON file
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

/// Two-cluster binary dataset: each example activates one half of the
/// visible layer, with a little dropout noise baked in.
fn pattern_dataset() -> Array2<f64> {
    arr2(&[
        [1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        [1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        [1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
        [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
    ])
}

fn main() {
    let args = Args::parse();

    let input = pattern_dataset();
    let n_visible = input.ncols();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut model = Rbm::random(n_visible, args.hidden_size, &mut rng);
    model.params.momentum = args.momentum;
    model.params.weight_decay = args.weight_decay;
    let mut source = RngSource::new(rng);

    let config = CdConfig {
        learning_rate: args.learning_rate,
        k: args.k,
    };

    println!(
        "Training {}x{} RBM: {} steps of CD-{}, lr={}",
        n_visible, args.hidden_size, args.steps, args.k, args.learning_rate
    );

    let mut last_loss = f64::NAN;
    for step in 1..=args.steps {
        let metrics = match train_step(&mut model, &input, &config, &mut source) {
            Ok(metrics) => metrics,
            Err(e) => {
                eprintln!("Training failed at step {step}: {e}");
                std::process::exit(1);
            }
        };
        last_loss = metrics.cross_entropy;

        if step % args.report_every == 0 || step == args.steps {
            println!("step {:>6}  cross-entropy {:.6}", step, last_loss);
        }
    }

    println!("\nReconstructions (visible means):");
    let reconstruction = model.reconstruct(&input);
    for (row, rec) in input.rows().into_iter().zip(reconstruction.rows()) {
        let shown: Vec<String> = rec.iter().map(|p| format!("{p:.2}")).collect();
        println!("  {:?} -> [{}]", row.to_vec(), shown.join(", "));
    }

    if let Some(path) = args.checkpoint {
        if let Err(e) = save_checkpoint(&model.params, &path, args.steps, last_loss) {
            eprintln!("Failed to save checkpoint: {e}");
            std::process::exit(1);
        }
        println!("Saved checkpoint to {}", path.display());
    }
}

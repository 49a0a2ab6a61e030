use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

use warden_rl::export::export_policy;
use warden_rl::nn::TacticalActorCriticConfig;
use warden_rl::sim::observation::OBS_DIM;
use warden_rl::sim::ACTION_DIM;
use warden_rl::train::{evaluate, train, TrainConfig};

#[cfg(not(feature = "wgpu"))]
mod backend {
    pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
    pub type TrainDevice = burn::backend::ndarray::NdArrayDevice;
}

#[cfg(feature = "wgpu")]
mod backend {
    pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
    pub type TrainDevice = burn::backend::wgpu::WgpuDevice;
}

use backend::{TrainBackend, TrainDevice};

static DEVICE: Lazy<TrainDevice> = Lazy::new(TrainDevice::default);

#[derive(Parser)]
#[command(name = "warden")]
#[command(version, about = "Train the exit-guarding tank agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a policy in the simulated arena
    Train {
        #[arg(long, default_value = "10000")]
        episodes: usize,

        #[arg(long, default_value = "1000")]
        max_steps: u32,

        /// Width of the network trunk
        #[arg(long, default_value = "256")]
        hidden_dim: usize,

        #[arg(long, default_value = "0.0003")]
        lr: f64,

        /// Discount factor
        #[arg(long, default_value = "0.99")]
        gamma: f32,

        #[arg(long, default_value = "0.2")]
        clip_epsilon: f32,

        /// Optimization epochs per collected episode
        #[arg(long, default_value = "10")]
        ppo_epochs: usize,

        #[arg(long, default_value = "64")]
        batch_size: usize,

        #[arg(long, default_value = "models")]
        save_dir: PathBuf,

        /// Episodes between periodic checkpoints
        #[arg(long, default_value = "500")]
        save_interval: usize,

        /// Warm-start checkpoint stem
        #[arg(long)]
        load_model: Option<PathBuf>,

        /// Arena RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Evaluate a trained checkpoint deterministically
    Eval {
        /// Checkpoint stem to evaluate
        #[arg(long, default_value = "models/best_model")]
        model: PathBuf,

        #[arg(long, default_value = "100")]
        eval_episodes: usize,

        #[arg(long, default_value = "1000")]
        max_steps: u32,

        #[arg(long, default_value = "256")]
        hidden_dim: usize,

        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Export a checkpoint for the game runtime
    Export {
        /// Checkpoint stem to export
        #[arg(long, default_value = "models/best_model")]
        model: PathBuf,

        /// Output stem; defaults to the checkpoint stem
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = "256")]
        hidden_dim: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            episodes,
            max_steps,
            hidden_dim,
            lr,
            gamma,
            clip_epsilon,
            ppo_epochs,
            batch_size,
            save_dir,
            save_interval,
            load_model,
            seed,
        } => {
            let config = TrainConfig {
                episodes,
                max_steps,
                hidden_dim,
                lr,
                gamma,
                clip_epsilon,
                ppo_epochs,
                mini_batch_size: batch_size,
                save_dir,
                save_interval,
                load_model,
                seed,
                ..Default::default()
            };
            let summary = train::<TrainBackend>(&config, DEVICE.clone())?;
            println!(
                "Training complete: {} episodes, best average reward {:.2}",
                summary.episodes, summary.best_reward
            );
        }

        Commands::Eval {
            model,
            eval_episodes,
            max_steps,
            hidden_dim,
            seed,
        } => {
            let config = TrainConfig {
                eval_episodes,
                max_steps,
                hidden_dim,
                seed,
                ..Default::default()
            };
            let report = evaluate::<TrainBackend>(&model, &config, DEVICE.clone());
            println!("Evaluation over {} episodes:", report.episodes);
            println!(
                "  Average reward: {:.2} ± {:.2}",
                report.mean_reward, report.std_reward
            );
            println!(
                "  Wins: {}, Losses: {}, Escapes: {}, Exit touches: {}, Timeouts: {}",
                report.tally.wins,
                report.tally.losses,
                report.tally.escapes,
                report.tally.exit_touches,
                report.tally.timeouts
            );
            println!(
                "  Win rate: {:.1}%, Exit touch rate: {:.1}%",
                report.tally.wins as f64 / report.episodes as f64 * 100.0,
                report.tally.exit_touches as f64 / report.episodes as f64 * 100.0
            );
        }

        Commands::Export {
            model,
            output,
            hidden_dim,
        } => {
            use warden_rl::algo::{PpoConfig, PpoTrainer};

            let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM)
                .with_hidden_dim(hidden_dim);
            let mut trainer =
                PpoTrainer::<TrainBackend>::new(&net, PpoConfig::default(), DEVICE.clone());
            if let Err(e) = trainer.load_checkpoint(&model) {
                tracing::warn!("checkpoint unusable ({e}); exporting a fresh policy");
            }

            let stem = output.unwrap_or_else(|| model.clone());
            let report = export_policy(trainer.policy(), &stem)?;
            match &report.portable {
                Some(path) => println!("Portable record exported to {}", path.display()),
                None => println!("Portable record export failed (see log)"),
            }
            println!("Weights exported to {}", report.weights.display());
        }
    }

    Ok(())
}

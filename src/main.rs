use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use stratos::prelude::*;

const SAMPLES: usize = 64;
const SLOPE: f32 = 2.5;
const INTERCEPT: f32 = -1.0;

/// Configures the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    Registry::default().with(filter).with(fmt_layer).init();
}

/// Generate noisy samples of `y = SLOPE * x + INTERCEPT` with a fixed seed
fn generate_data(n_samples: usize) -> Result<(Tensor, Tensor)> {
    let mut rng = StdRng::seed_from_u64(7);
    let xs = Uniform::new(0.0_f32, 10.0);
    let noise = Uniform::new(-0.1_f32, 0.1);

    let x: Vec<f32> = (0..n_samples).map(|_| xs.sample(&mut rng)).collect();
    let y: Vec<f32> = x.iter().map(|&v| SLOPE * v + INTERCEPT + noise.sample(&mut rng)).collect();

    let x = Tensor::from_shape_vec([n_samples, 1], x)?;
    let y = Tensor::from_shape_vec([n_samples, 1], y)?;
    Ok((x, y))
}

fn main() -> Result<()> {
    init_tracing();

    println!("=== Linear Regression ===\n");

    let (x_raw, y) = generate_data(SAMPLES)?;
    let x = Constant::new(Scaler::MinMax.scale_columns(&x_raw));
    let y = Constant::new(y);

    let schedule = StepDecay::new(0.1, 0.5, 200)?;
    let mut model = Model::new(GradientDescent::with_schedule(schedule), MeanSquaredError);
    model.add(Dense::new(1, "regressor")?);

    let history = model.fit(&x, &y, &FitConfig::new(1000).log_every(100))?;
    if let Some(loss) = history.final_loss() {
        info!(loss = %loss, "training complete");
    }

    for layer in model.layers() {
        println!("layer '{}' with {} unit(s)", layer.name(), layer.units());
    }
    println!("final evaluation loss: {:.6}", model.evaluate(&x, &y)?);

    let predictions = Constant::new(model.predict(&x)?);
    predictions.print("predictions:");

    Ok(())
}

use std::time::Instant;

use stratos::prelude::*;

#[derive(Clone, Copy)]
enum Pass {
    Forward,
    ForwardBackward,
}

impl Pass {
    fn name(&self) -> &'static str {
        match self {
            Pass::Forward => "Forward",
            Pass::ForwardBackward => "Fwd+Bwd",
        }
    }
}

struct BenchmarkResult {
    pass: String,
    latency_ms: f64,
    overhead: f64,
}

/// One dense layer and an MSE loss: mean((x * w + ones * b - y)^2)
fn run(x: &Constant, y: &Constant, w: &Variable, b: &Variable, pass: Pass) {
    let ones = Tensor::ones(x.value().rows(), 1);
    let pred = x * w + Constant::new(ones) * b;
    let loss = (&pred - y).pow(2.0).mean();
    if let Pass::ForwardBackward = pass {
        loss.backward().unwrap();
    }
}

fn benchmark_pass(x: &Constant, y: &Constant, w: &Variable, b: &Variable, pass: Pass, iterations: usize) -> f64 {
    // Warm-up
    for _ in 0..3 {
        run(x, y, w, b, pass);
    }

    let start = Instant::now();
    for _ in 0..iterations {
        run(x, y, w, b, pass);
    }
    let elapsed = start.elapsed();

    elapsed.as_secs_f64() * 1000.0 / iterations as f64
}

fn benchmark_shape(batch: usize, features: usize, units: usize, iterations: usize) -> Vec<BenchmarkResult> {
    let x = Constant::new(Tensor::randn(batch, features));
    let y = Constant::new(Tensor::randn(batch, units));
    let w = Variable::new(Tensor::randn(features, units));
    let b = Variable::new(Tensor::zeros(1, units));

    let mut results: Vec<BenchmarkResult> = [Pass::Forward, Pass::ForwardBackward]
        .iter()
        .map(|&pass| BenchmarkResult {
            pass: pass.name().to_string(),
            latency_ms: benchmark_pass(&x, &y, &w, &b, pass, iterations),
            overhead: 0.0,
        })
        .collect();

    // Relative to the forward pass alone
    let baseline_latency = results[0].latency_ms;
    for result in &mut results {
        result.overhead = result.latency_ms / baseline_latency;
    }

    results
}

/// A long chain of scalar ops; stresses per-node overhead and recursion depth.
fn benchmark_chain(depth: usize, iterations: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iterations {
        let x = Variable::scalar(0.5_f32);
        let mut y = x.expr();
        for _ in 0..depth {
            y = y.sin() + &x;
        }
        y.backward().unwrap();
    }
    start.elapsed().as_secs_f64() * 1000.0 / iterations as f64
}

fn print_results_table(shape_name: &str, batch: usize, features: usize, units: usize, results: &[BenchmarkResult]) {
    println!("\n{} ({}x{} -> {})", shape_name, batch, features, units);
    println!("{}", "=".repeat(50));
    println!("{:<15} {:>15} {:>15}", "Pass", "Latency (ms)", "Overhead");
    println!("{}", "-".repeat(50));

    for result in results {
        println!("{:<15} {:>15.3} {:>14.2}x", result.pass, result.latency_ms, result.overhead);
    }
}

fn main() {
    println!("Forward / Backward Benchmarks");
    println!("=============================\n");

    // (name, batch, features, units, iterations)
    let benchmarks = vec![
        ("Tiny Regression", 32, 1, 1, 500),
        ("Small Dense", 64, 32, 16, 200),
        ("MNIST Batch (32)", 32, 784, 128, 20),
        ("Tall Batch", 1000, 10, 1, 50),
    ];

    for (name, batch, features, units, iterations) in benchmarks {
        let results = benchmark_shape(batch, features, units, iterations);
        print_results_table(name, batch, features, units, &results);
    }

    println!("\nScalar chain");
    println!("{}", "=".repeat(50));
    for depth in [10, 100, 1000] {
        println!("{:<15} {:>15.3} ms", format!("depth {}", depth), benchmark_chain(depth, 20));
    }

    println!("\n{}", "=".repeat(50));
    println!("Benchmark complete!");
}

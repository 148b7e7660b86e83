//! Runs the marching pipeline once over a box and prints a summary.
//!
//! Usage: cargo run --release --bin march_scene -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>         JSON pipeline config (default: built-in scene)
//!   --resolution <N>        Voxels along the longest box side (8..=128)
//!   --rays <N>              Ray columns; rows follow the camera aspect
//!   --mode <MODE>           classic | planes
//!   --step <F>              Fixed step length
//!   --jitter <F>            Jitter amount in [0, 1]
//!   --jobs <N>              Worker threads (default: all cores)
//!   --write-default <PATH>  Write the built-in config as JSON and exit

use std::path::PathBuf;
use std::process::ExitCode;

use volmarch::core::types::UVec2;
use volmarch::march::MarchMode;
use volmarch::stage::Stage;
use volmarch::{Pipeline, PipelineConfig};

fn main() -> ExitCode {
    volmarch::core::logging::init();

    let args: Vec<String> = std::env::args().collect();

    if let Some(path) = parse_str_arg(&args, "--write-default") {
        let path = PathBuf::from(path);
        return match PipelineConfig::default().save_sync(&path) {
            Ok(()) => {
                println!("Wrote default config to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to write {}: {}", path.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    if let Some(jobs) = parse_usize_arg(&args, "--jobs") {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .expect("Failed to configure thread pool");
    }

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => match PipelineConfig::load_sync(&PathBuf::from(&path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };

    if let Some(resolution) = parse_u32_arg(&args, "--resolution") {
        config.volume.resolution = resolution;
    }
    if let Some(columns) = parse_u32_arg(&args, "--rays") {
        let rows = (columns as f32 / config.camera.aspect).round().max(1.0) as u32;
        config.ray_resolution = UVec2::new(columns, rows);
    }
    if let Some(step) = parse_f32_arg(&args, "--step") {
        config.march.fixed_step = step;
    }
    if let Some(jitter) = parse_f32_arg(&args, "--jitter") {
        config.march.jitter = jitter;
    }
    match parse_str_arg(&args, "--mode").as_deref() {
        None => {}
        Some("classic") => config.march.mode = MarchMode::Classic,
        Some("planes") => config.march.mode = MarchMode::SnapToPlanes,
        Some(other) => {
            log::error!("Unknown mode '{}', expected classic or planes", other);
            return ExitCode::FAILURE;
        }
    }

    println!("=== Volmarch ===");
    println!("Box:    {} .. {}", config.bounds.min, config.bounds.max);
    println!("Rays:   {} x {}", config.ray_resolution.x, config.ray_resolution.y);
    println!("Volume: {} along longest side", config.volume.resolution);
    println!("March:  {:?}, step {}, max {} steps, jitter {}",
        config.march.mode, config.march.fixed_step, config.march.max_steps_per_ray, config.march.jitter);
    println!();

    let mut pipeline = Pipeline::new();
    if let Err(e) = pipeline.configure(&config) {
        log::error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let stats = match pipeline.run() {
        Ok(stats) => stats,
        Err(e) => {
            log::error!("Pipeline failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Hits:    {} of {} rays", stats.hit_count, stats.ray_count);
    println!("Samples: {}", stats.sample_count);
    println!("Voxels:  {}", stats.voxel_count);
    if let Some(plane) = pipeline.marcher().reference_plane() {
        println!("Planes:  normal {}, distance {:.3}", plane.normal, plane.distance);
    }
    match pipeline.integrate_density() {
        Ok(totals) => {
            let max = totals.iter().copied().fold(0.0f32, f32::max);
            let mean = totals.iter().sum::<f32>() / totals.len().max(1) as f32;
            println!("Density: mean {:.4}, max {:.4} per ray", mean, max);
        }
        Err(e) => log::info!("Skipping density integration: {}", e),
    }
    println!("Time:    {:.2}ms", stats.elapsed.as_secs_f64() * 1000.0);

    pipeline.shutdown();
    log::debug!("{} released", volmarch::march::RayMarcher::NAME);
    ExitCode::SUCCESS
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

use std::env;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use soundwatch::{AppConfig, AudioCapture, CpalCaptureEngine, EnergyClassifier, Monitor};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.contains(&"--list-devices".to_string()) {
        match CpalCaptureEngine::list_input_devices() {
            Ok(names) => {
                println!("Available input devices:");
                for name in names {
                    println!("  {name}");
                }
            }
            Err(e) => {
                eprintln!("Failed to list input devices: {e}");
                process::exit(1);
            }
        }
        return;
    }

    // Check for configuration file
    let config_path = Path::new("soundwatch.toml");
    if !config_path.exists() {
        println!("Configuration file not found, creating default at soundwatch.toml");
        let default_config = AppConfig::default();
        if let Err(e) = default_config.create_config_file("soundwatch.toml") {
            eprintln!("Failed to create configuration file: {e}");
        }
    }

    let config = AppConfig::load();

    // Set up signal handling for clean shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    // No capture device is fatal; everything after this is recovered in-loop
    let engine = match CpalCaptureEngine::new(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to initialize audio capture: {e}");
            process::exit(1);
        }
    };

    println!(
        "Monitoring audio: {}s windows at {} Hz, threshold {:.2}",
        config.get_window_secs(),
        engine.sample_rate(),
        config.get_threshold()
    );
    println!("Press Ctrl+C to stop");

    let mut monitor = Monitor::new(engine, EnergyClassifier::new(), &config);
    monitor.run(&running);
}

//! Worker environment self-check.
//!
//! Verifies the configuration surface before a deployment takes real
//! jobs: pipeline tunables, required environment variables for each
//! external collaborator, and (informationally) local engine binaries
//! used when developing against a local sandbox.

use scast_worker::WorkerConfig;

fn check_env(name: &str) -> bool {
    let present = std::env::var(name).is_ok();
    println!(
        "  {} {}",
        if present { "ok " } else { "MISSING" },
        name
    );
    present
}

fn main() {
    dotenvy::dotenv().ok();

    let mut ok = true;

    println!("pipeline config:");
    match WorkerConfig::from_env() {
        Ok(config) => {
            println!("  ok  transition={}s fps={} part_size={} chunk_size={}",
                config.pipeline.transition_secs,
                config.pipeline.fps,
                config.pipeline.storage_part_size,
                config.pipeline.platform_chunk_size,
            );
        }
        Err(e) => {
            println!("  INVALID: {e}");
            ok = false;
        }
    }

    println!("sandbox service:");
    ok &= check_env("SANDBOX_BASE_URL");

    println!("object storage:");
    for name in [
        "R2_ENDPOINT_URL",
        "R2_ACCESS_KEY_ID",
        "R2_SECRET_ACCESS_KEY",
        "R2_BUCKET_NAME",
    ] {
        ok &= check_env(name);
    }

    println!("hosting platform:");
    ok &= check_env("PLATFORM_SESSIONS_URL");
    ok &= check_env("PLATFORM_STATUS_URL");

    println!("local engines (dev only):");
    for bin in ["ffmpeg", "ffprobe"] {
        match which::which(bin) {
            Ok(path) => println!("  ok  {} -> {}", bin, path.display()),
            Err(_) => println!("  --  {} not on PATH (renders run in the sandbox)", bin),
        }
    }

    if ok {
        println!("selfcheck passed");
    } else {
        println!("selfcheck failed");
        std::process::exit(1);
    }
}

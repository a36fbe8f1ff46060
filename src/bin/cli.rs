use anyhow::{anyhow, bail, Context};
use aquacapture::testing::{level_samples, shaking_samples, MockActuator, ScriptedDetector, ScriptedSensor};
use aquacapture::{
    init_logging, CaptureSession, HttpMarkerDetector, MarkerDetector, ReadinessConfig, SessionEvent,
};
use bytes::Bytes;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: aquacapture-cli <config|simulate|check|health> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "config" => cmd_config(&args),
        "simulate" => cmd_simulate(&args).await,
        "check" => cmd_check(&args).await,
        "health" => cmd_health(&args).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn load_config(args: &[String]) -> anyhow::Result<ReadinessConfig> {
    let path = flag_value(args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(ReadinessConfig::default_path);
    let mut config = ReadinessConfig::load_layered(&path)?;
    if let Some(url) = flag_value(args, "--url") {
        config.fiducial.service_url = url.to_string();
    }
    Ok(config)
}

fn cmd_config(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

// simulate [--shake] [--fail-capture] [--no-sensor] [--json]
async fn cmd_simulate(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let json = has_flag(args, "--json");

    let samples = if has_flag(args, "--shake") {
        shaking_samples(64, 0.6)
    } else {
        level_samples(64)
    };
    let sensor = if has_flag(args, "--no-sensor") {
        ScriptedSensor::unavailable()
    } else {
        ScriptedSensor::new(samples)
    };
    let actuator = Arc::new(MockActuator::new());
    if has_flag(args, "--fail-capture") {
        actuator.fail_next_capture("simulated camera fault");
    }
    let detector = Arc::new(ScriptedDetector::always_ready());

    let mut session = CaptureSession::open(config, actuator.clone(), detector.clone(), Some(Box::new(sensor)))?;
    let mut snapshots = session.subscribe();
    let deadline = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                if json {
                    println!("{}", serde_json::to_string(&snap)?);
                } else {
                    println!(
                        "[{}] score={:.2} corners={} remaining={}ms {}",
                        snap.state, snap.alignment_score, snap.fiducial_count, snap.remaining_ms, snap.status_message
                    );
                }
            }
            event = session.next_event() => {
                let Some(event) = event else { break };
                match &event {
                    SessionEvent::Captured(image) => {
                        println!("captured {}x{} ({} bytes, {:?})", image.width, image.height, image.size_bytes(), image.trigger);
                        break;
                    }
                    SessionEvent::CaptureFailed(message) => {
                        println!("capture failed: {}", message);
                        break;
                    }
                    other => println!("event: {:?}", other),
                }
            }
            _ = &mut deadline => {
                println!("no capture within 5s");
                break;
            }
        }
    }

    println!("marker checks: {}, captures: {}", detector.calls(), actuator.captures());
    session.close().await?;
    Ok(())
}

async fn cmd_check(args: &[String]) -> anyhow::Result<()> {
    let path = args
        .get(2)
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow!("Usage: aquacapture-cli check <image> [--url <service>] [--json]"))?;
    let config = load_config(args)?;
    let still = std::fs::read(path).with_context(|| format!("reading {}", path))?;

    let detector = HttpMarkerDetector::new(&config.fiducial)?;
    let result = detector.detect(Bytes::from(still)).await?;

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!(
            "detected={} quality={:.3} ready={}",
            result.detected_count, result.quality, result.ready
        );
        for (label, corner) in &result.corners {
            println!("  {:?}: ({:.1}, {:.1}) size={}", label, corner.cx, corner.cy, corner.size);
        }
    }
    Ok(())
}

async fn cmd_health(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let detector = HttpMarkerDetector::new(&config.fiducial)?;
    match detector.health().await {
        Ok(()) => {
            println!("{}: ok", config.fiducial.service_url);
            Ok(())
        }
        Err(e) => bail!("{} unhealthy: {}", config.fiducial.service_url, e),
    }
}

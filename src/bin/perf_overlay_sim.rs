use perf_overlay::cpu_load::ProcStat;
use perf_overlay::renderer::{HudExtent, RecordingRenderer};
use perf_overlay::{FrameInput, HudConfig, HudElements, TelemetryOverlay};
use std::env;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("perf_overlay_sim - Run the overlay against a simulated frame loop");
    println!();
    println!("Usage:");
    println!("  perf_overlay_sim [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --frames <n>        Number of frames to run (default: until Ctrl+C)");
    println!("  --fps <f>           Simulated frame rate (default: 60)");
    println!("  --gpu-load <p>      GPU load reported to the overlay in percent (default: 0)");
    println!("  --record-secs <s>   Press the logging key at start and again after <s> seconds");
    println!("  --dump              Print the last frame's draw commands as JSON lines");
    println!("  --help              Show this help");
    println!();
    println!("Configuration comes from $PERF_HUD_CONFIG or <config dir>/perf-overlay/config.toml,");
    println!("overridden by PERF_HUD, PERF_HUD_OFFSET_X/Y, PERF_HUD_LOG_FILE and");
    println!("PERF_HUD_LOG_INTERVAL_MS. Session logging needs a log path.");
}

struct Options {
    frames: Option<u64>,
    fps: f64,
    gpu_load: f32,
    record_secs: Option<f64>,
    dump: bool,
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    let Some(raw) = args.get(i + 1) else {
        eprintln!("❌ Error: {flag} requires an argument");
        process::exit(1);
    };
    raw.parse().unwrap_or_else(|_| {
        eprintln!("❌ Error: invalid value for {flag}: {raw}");
        process::exit(1);
    })
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().collect();
    let mut options = Options {
        frames: None,
        fps: 60.0,
        gpu_load: 0.0,
        record_secs: None,
        dump: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--frames" => {
                options.frames = Some(parse_value(&args, i, "--frames"));
                i += 1;
            }
            "--fps" => {
                options.fps = parse_value(&args, i, "--fps");
                i += 1;
            }
            "--gpu-load" => {
                options.gpu_load = parse_value(&args, i, "--gpu-load");
                i += 1;
            }
            "--record-secs" => {
                options.record_secs = Some(parse_value(&args, i, "--record-secs"));
                i += 1;
            }
            "--dump" => options.dump = true,
            _ => {
                eprintln!("❌ Unknown argument: {}", args[i]);
                eprintln!();
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if !(options.fps.is_finite() && options.fps > 0.0) {
        eprintln!("❌ Error: --fps must be positive");
        process::exit(1);
    }
    options
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = parse_args();

    let mut config = HudConfig::load()?;
    if !config.is_enabled() {
        info!("no hud elements configured, showing all of them");
        config.elements = HudElements::all();
    }
    if options.record_secs.is_some() && config.log_base_path.is_none() {
        warn!("--record-secs given but no log path configured, nothing will be recorded");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let frame_time = Duration::from_secs_f64(1.0 / options.fps);
    let start = Instant::now();
    let mut overlay = TelemetryOverlay::new(config, ProcStat::new(), start);
    let mut renderer = RecordingRenderer::new(HudExtent {
        width: 1280,
        height: 720,
    });

    let stop_press = options.record_secs.map(Duration::from_secs_f64);
    let mut stop_pressed = false;
    let mut frame: u64 = 0;
    let mut next_frame = start;

    while running.load(Ordering::SeqCst) && options.frames.is_none_or(|n| frame < n) {
        next_frame += frame_time;
        if let Some(wait) = next_frame.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
        let now = Instant::now();
        frame += 1;

        let log_toggle_pressed = match stop_press {
            Some(_) if frame == 1 => true,
            Some(after) if !stop_pressed && now.duration_since(start) >= after => {
                stop_pressed = true;
                true
            }
            _ => false,
        };

        if let Err(e) = overlay.update(FrameInput {
            now,
            gpu_load: options.gpu_load,
            log_toggle_pressed,
            hud_toggle_pressed: false,
        }) {
            eprintln!("⚠️  {e}");
        }

        renderer.clear();
        overlay.render(&mut renderer);

        if frame % (options.fps.round() as u64).max(1) == 0 {
            let texts: Vec<&str> = renderer.texts().map(|(_, t)| t).collect();
            info!("frame {frame}: {}", texts.join(" | "));
        }
    }

    // a session still open at exit would lose its buffered entries
    overlay.stop_logging(Instant::now())?;

    if options.dump {
        print!("{}", renderer.to_json_lines()?);
    }
    println!("🛑 Stopped after {frame} frames");
    Ok(())
}

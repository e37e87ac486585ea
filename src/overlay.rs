use std::time::Instant;

use tracing::warn;

use crate::constants::*;
use crate::cpu_load::{CounterSource, CpuLoadSampler, format_load_line, truncate_one_decimal};
use crate::cpu_worker::CpuLoadWorker;
use crate::error::Result;
use crate::frame_clock::{Fps, FrameClock};
use crate::frame_history::FrameTimeHistory;
use crate::hotkey::{ToggleKey, ToggleSwitch};
use crate::hud_config::{HudConfig, HudElements};
use crate::logging_session::{LogEntry, LoggingSession};
use crate::renderer::{HudColor, HudLineVertex, HudPos, HudRenderer};

/// Host supplied values for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    pub now: Instant,
    /// GPU load in percent, passed through unchecked
    pub gpu_load: f32,
    pub log_toggle_pressed: bool,
    pub hud_toggle_pressed: bool,
}

impl FrameInput {
    pub fn at(now: Instant) -> Self {
        Self {
            now,
            gpu_load: 0.0,
            log_toggle_pressed: false,
            hud_toggle_pressed: false,
        }
    }
}

/// Frame rate, cpu, gpu and frame time overlay with hotkey session logging
pub struct TelemetryOverlay<S: CounterSource + 'static> {
    config: HudConfig,
    clock: FrameClock,
    history: FrameTimeHistory,
    cpu: CpuLoadWorker<S>,
    session: LoggingSession,
    log_key: ToggleKey,
    visible: ToggleSwitch,

    fps: Option<Fps>,
    cpu_total: Option<f32>,
    gpu_load: f32,
    fps_string: String,
    cpu_string: Option<String>,
    gpu_string: String,
}

impl<S: CounterSource + 'static> TelemetryOverlay<S> {
    pub fn new(config: HudConfig, source: S, start: Instant) -> Self {
        Self::with_sampler(config, CpuLoadSampler::new(source), start)
    }

    pub fn with_sampler(config: HudConfig, sampler: CpuLoadSampler<S>, start: Instant) -> Self {
        let session =
            LoggingSession::with_interval(config.log_base_path.clone(), config.log_interval);
        Self {
            config,
            clock: FrameClock::new(start),
            history: FrameTimeHistory::new(),
            cpu: CpuLoadWorker::new(sampler),
            session,
            log_key: ToggleKey::new(),
            visible: ToggleSwitch::new(true),
            fps: None,
            cpu_total: None,
            gpu_load: 0.0,
            fps_string: "FPS: ".to_string(),
            cpu_string: None,
            gpu_string: format_load_line("GPU:", 0.0),
        }
    }

    pub fn config(&self) -> &HudConfig {
        &self.config
    }

    pub fn history(&self) -> &FrameTimeHistory {
        &self.history
    }

    pub fn session(&self) -> &LoggingSession {
        &self.session
    }

    pub fn fps(&self) -> Option<Fps> {
        self.fps
    }

    pub fn fps_string(&self) -> &str {
        &self.fps_string
    }

    pub fn cpu_string(&self) -> Option<&str> {
        self.cpu_string.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.is_on()
    }

    /// Per frame bookkeeping. Only logging transitions can fail, and they run
    /// last so everything else is already up to date when they do.
    pub fn update(&mut self, input: FrameInput) -> Result<()> {
        let tick = self.clock.tick(input.now);

        if let Some(fps) = tick.fps {
            self.fps = Some(fps);
            self.fps_string = format!("FPS: {fps}");
            // the log needs cpu values even when the line is hidden
            if self.config.elements.contains(HudElements::CPU_LOAD) || self.session.is_enabled() {
                self.cpu.request();
            }
        }

        if let Some(snapshot) = self.cpu.latest() {
            self.cpu_total = snapshot.total();
            self.cpu_string = snapshot.lines().into_iter().next();
        }

        self.history.record(tick.frame_duration_us);

        self.gpu_load = input.gpu_load;
        self.gpu_string = format_load_line("GPU:", gpu_load_tenths(input.gpu_load));

        self.visible.poll(input.hud_toggle_pressed, input.now);

        if !self.session.is_enabled() {
            return Ok(());
        }
        let toggled = if self.log_key.poll(input.log_toggle_pressed, input.now) {
            self.session.toggle(input.now)
        } else {
            Ok(())
        };

        let (fps, cpu, gpu_load) = (self.fps.unwrap_or_default(), self.cpu_total, self.gpu_load);
        self.session.maybe_record(input.now, || LogEntry {
            fps,
            cpu: cpu.unwrap_or(0.0),
            gpu_load,
        });

        toggled.inspect_err(|e| warn!("logging toggle failed: {e}"))
    }

    /// End a running logging session and write its entries, e.g. at shutdown.
    pub fn stop_logging(&mut self, now: Instant) -> Result<()> {
        if self.session.is_recording() {
            self.session.toggle(now)?;
        }
        Ok(())
    }

    /// Draw the enabled elements top to bottom, returns where the next line would go.
    pub fn render(&self, renderer: &mut impl HudRenderer) -> HudPos {
        let mut position = HudPos::new(
            self.config.offset.x + HUD_MARGIN_X,
            self.config.offset.y + HUD_MARGIN_Y,
        );
        if !self.visible.is_on() {
            return position;
        }

        let elements = self.config.elements;

        if elements.contains(HudElements::GPU_LOAD) {
            position = render_text(renderer, position, &self.gpu_string);
        }
        if elements.contains(HudElements::CPU_LOAD) {
            position = match &self.cpu_string {
                Some(cpu) => render_text(renderer, position, cpu),
                None => HudPos::new(position.x, position.y + LINE_HEIGHT),
            };
        }
        if elements.contains(HudElements::FRAMERATE) {
            position = render_text(renderer, position, &self.fps_string);
        }
        if elements.contains(HudElements::FRAMETIMES) {
            position = self.render_frametime_graph(renderer, position);
        }
        if elements.contains(HudElements::LOGGING) && self.session.is_recording() {
            render_logging_indicator(renderer);
        }
        position
    }

    fn render_frametime_graph(&self, renderer: &mut impl HudRenderer, position: HudPos) -> HudPos {
        let baseline = position.y + LINE_HEIGHT;
        let vertices: Vec<HudLineVertex> = self
            .history
            .renderable_series()
            .into_iter()
            .enumerate()
            .flat_map(|(i, (h, color))| {
                let x = position.x + i as f32;
                [
                    HudLineVertex {
                        position: HudPos::new(x, baseline),
                        color,
                    },
                    HudLineVertex {
                        position: HudPos::new(x, baseline - h),
                        color,
                    },
                ]
            })
            .collect();
        renderer.draw_lines(&vertices);

        let (min, max) = self.history.window_min_max();
        let label_y = position.y + GRAPH_LABEL_OFFSET;
        renderer.draw_text(
            GRAPH_LABEL_SIZE,
            HudPos::new(position.x, label_y),
            HudColor::WHITE,
            &format!("min: {}.{}", min / 10, min % 10),
        );
        renderer.draw_text(
            GRAPH_LABEL_SIZE,
            HudPos::new(position.x + GRAPH_MAX_LABEL_X, label_y),
            HudColor::WHITE,
            &format!("max: {}.{}", max / 10, max % 10),
        );

        HudPos::new(position.x, position.y + GRAPH_HEIGHT)
    }
}

/// Cut to one decimal from the shortest decimal form, so 12.3 stays 12.3
fn gpu_load_tenths(load: f32) -> f32 {
    load.to_string().parse::<f64>().map_or(load, truncate_one_decimal)
}

fn render_text(renderer: &mut impl HudRenderer, position: HudPos, text: &str) -> HudPos {
    renderer.draw_text(TEXT_SIZE, position, HudColor::WHITE, text);
    HudPos::new(position.x, position.y + LINE_HEIGHT)
}

fn render_logging_indicator(renderer: &mut impl HudRenderer) {
    let surface = renderer.surface_size();
    let position = HudPos::new(
        surface.width as f32 - LOGGING_INDICATOR_INSET_X,
        surface.height as f32 - LOGGING_INDICATOR_INSET_Y,
    );
    renderer.draw_text(TEXT_SIZE, position, HudColor::WHITE, LOGGING_INDICATOR_TEXT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_load::{CoreCounterSnapshot, parse_proc_stat};
    use crate::renderer::{DrawCommand, HudExtent, RecordingRenderer};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Alternates between two dumps so every sample reads 50% on the aggregate
    struct Alternating(Mutex<bool>);

    impl CounterSource for Alternating {
        fn read_snapshot(&self) -> Result<CoreCounterSnapshot> {
            let mut flip = self.0.lock().unwrap();
            *flip = !*flip;
            parse_proc_stat(if *flip {
                "cpu 0 0 0 0 0 0 0 0 0 0\n"
            } else {
                "cpu 10 0 0 10 0 0 0 0 0 0\n"
            })
        }
    }

    fn overlay(config: HudConfig, start: Instant) -> TelemetryOverlay<Alternating> {
        TelemetryOverlay::with_sampler(
            config,
            CpuLoadSampler::with_window(Alternating(Mutex::new(false)), Duration::ZERO),
            start,
        )
    }

    fn frame_at(start: Instant, i: u64) -> Instant {
        start + Duration::from_nanos(i * 16_666_600)
    }

    fn surface() -> RecordingRenderer {
        RecordingRenderer::new(HudExtent {
            width: 1280,
            height: 720,
        })
    }

    #[test]
    fn test_steady_60_fps() {
        let start = Instant::now();
        let config = HudConfig {
            elements: HudElements::FRAMERATE | HudElements::FRAMETIMES,
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);

        let mut fps_updates = 0;
        for i in 1..=3000 {
            hud.update(FrameInput::at(frame_at(start, i))).unwrap();
            if hud.clock.frames_since_update() == 0 {
                fps_updates += 1;
                assert_eq!(hud.fps_string(), "FPS: 60.0");
            }
        }
        assert!(fps_updates >= 90, "{fps_updates}");

        let series = hud.history().renderable_series();
        assert!(series.iter().all(|s| *s == series[0]));
        assert_eq!(hud.history().window_min_max(), (166, 166));
    }

    #[test]
    fn test_render_stacks_elements() {
        let start = Instant::now();
        let config = HudConfig {
            elements: HudElements::all(),
            offset: HudPos::new(100.0, 50.0),
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);
        hud.update(FrameInput {
            gpu_load: 42.0,
            ..FrameInput::at(start + Duration::from_millis(16))
        })
        .unwrap();

        let mut renderer = surface();
        hud.render(&mut renderer);

        let texts: Vec<(HudPos, &str)> = renderer.texts().collect();
        // no cpu sample yet: the line is skipped but keeps its slot
        assert_eq!(
            texts,
            vec![
                (HudPos::new(108.0, 74.0), "GPU:    42%"),
                (HudPos::new(108.0, 122.0), "FPS: "),
                (HudPos::new(108.0, 190.0), "min: 0.0"),
                (HudPos::new(258.0, 190.0), "max: 16.0"),
            ]
        );

        let DrawCommand::Lines { vertices } = &renderer.commands[2] else {
            panic!("expected the frame time graph");
        };
        assert_eq!(vertices.len(), 600);
        assert_eq!(vertices[0].position, HudPos::new(108.0, 170.0));
        assert_eq!(vertices[599].position.x, 407.0);
    }

    #[test]
    fn test_gpu_line_keeps_alignment() {
        let start = Instant::now();
        let config = HudConfig {
            elements: HudElements::GPU_LOAD,
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);
        hud.update(FrameInput {
            gpu_load: 42.123456,
            ..FrameInput::at(start + Duration::from_millis(16))
        })
        .unwrap();

        let mut renderer = surface();
        hud.render(&mut renderer);
        let texts: Vec<&str> = renderer.texts().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["GPU:  42.1%"]);
        assert_eq!(texts[0].len(), 11);

        assert_eq!(gpu_load_tenths(12.3), 12.3);
        assert_eq!(gpu_load_tenths(99.99), 99.9);
        assert_eq!(gpu_load_tenths(100.0), 100.0);
    }

    #[test]
    fn test_cpu_line_after_first_interval() {
        let start = Instant::now();
        let config = HudConfig {
            elements: HudElements::CPU_LOAD,
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);
        hud.update(FrameInput::at(start + Duration::from_millis(500))).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut i = 0;
        while hud.cpu_string().is_none() && Instant::now() < deadline {
            i += 1;
            hud.update(FrameInput::at(start + Duration::from_millis(500 + i))).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(hud.cpu_string(), Some("CPU:    50%"));

        let mut renderer = surface();
        hud.render(&mut renderer);
        assert_eq!(
            renderer.texts().collect::<Vec<_>>(),
            vec![(HudPos::new(8.0, 24.0), "CPU:    50%")]
        );
    }

    #[test]
    fn test_hud_toggle_hides_everything() {
        let start = Instant::now();
        let config = HudConfig {
            elements: HudElements::all(),
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);
        hud.update(FrameInput {
            hud_toggle_pressed: true,
            ..FrameInput::at(start + Duration::from_millis(16))
        })
        .unwrap();
        assert!(!hud.is_visible());

        let mut renderer = surface();
        hud.render(&mut renderer);
        assert!(renderer.commands.is_empty());
    }

    #[test]
    fn test_logging_session_through_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("perf");
        let start = Instant::now();
        let config = HudConfig {
            elements: HudElements::LOGGING,
            log_base_path: Some(base),
            log_interval: Duration::from_millis(1000),
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);

        let mut path: Option<PathBuf> = None;
        for i in 1..=600u64 {
            let now = frame_at(start, i);
            // press at frame 10, release, second press within the debounce window,
            // then the real stop press near 9 s
            let pressed = matches!(i, 10 | 20 | 540);
            hud.update(FrameInput {
                gpu_load: 75.0,
                log_toggle_pressed: pressed,
                ..FrameInput::at(now)
            })
            .unwrap();
            if i == 20 {
                assert!(hud.session().is_recording());
                path = hud.session().current_path().map(|p| p.to_path_buf());

                let mut renderer = surface();
                hud.render(&mut renderer);
                assert_eq!(
                    renderer.texts().collect::<Vec<_>>(),
                    vec![(HudPos::new(1130.0, 696.0), LOGGING_INDICATOR_TEXT)]
                );
            }
        }
        assert!(!hud.session().is_recording());
        assert!(hud.session().entries().is_empty());

        let contents = std::fs::read_to_string(path.unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        // started at ~0.17 s, stopped at 9 s: one entry per second
        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|l| l.starts_with("60.0,") && l.ends_with(",75")));
    }

    #[test]
    fn test_stop_logging_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let config = HudConfig {
            log_base_path: Some(dir.path().join("perf")),
            log_interval: Duration::from_millis(100),
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);
        hud.update(FrameInput {
            log_toggle_pressed: true,
            gpu_load: 12.0,
            ..FrameInput::at(start + Duration::from_millis(16))
        })
        .unwrap();
        let path = hud.session().current_path().unwrap().to_path_buf();
        hud.update(FrameInput {
            gpu_load: 12.0,
            ..FrameInput::at(start + Duration::from_millis(200))
        })
        .unwrap();
        assert_eq!(hud.session().entries().len(), 1);

        hud.stop_logging(start + Duration::from_millis(210)).unwrap();
        assert!(!hud.session().is_recording());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "0.0,0,12\n");
        // nothing to stop the second time
        hud.stop_logging(start + Duration::from_millis(220)).unwrap();
    }

    #[test]
    fn test_log_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let start = Instant::now();
        let config = HudConfig {
            log_base_path: Some(blocker.join("perf")),
            ..HudConfig::default()
        };
        let mut hud = overlay(config, start);

        let result = hud.update(FrameInput {
            log_toggle_pressed: true,
            ..FrameInput::at(start + Duration::from_millis(16))
        });
        assert!(result.is_err());
        assert!(!hud.session().is_recording());
        // the frame itself was still accounted for
        assert_eq!(hud.history().iter().last(), Some(16_000));
    }
}

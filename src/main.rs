use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use space_scene::{
    app, AssetLoader, Integration, Manifest, Renderer, Simulation, WindowViewport,
};

/// Synthetic frame step for headless runs (roughly 60 Hz).
const HEADLESS_STEP: Duration = Duration::from_millis(16);

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = std::fs::read_to_string(&options.manifest)
        .with_context(|| format!("failed to read manifest {}", options.manifest))?;
    let manifest = Manifest::from_xml(&xml).context("failed to parse asset manifest")?;

    println!("Loaded manifest with {} assets", manifest.assets.len());
    for asset in &manifest.assets {
        println!(" - {} ({})", asset.name, asset.path);
    }

    let root = Path::new(&options.manifest)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let integration = if options.advance_stars {
        Integration::Advance
    } else {
        Integration::Legacy
    };
    let sim = Simulation::new(integration);
    let loader = AssetLoader::spawn(root, manifest.assets);

    if options.summary_only {
        run_headless(sim, loader, options.frames)
    } else {
        match run_interactive(sim, loader) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(init) = err.downcast_ref::<WindowInitError>() {
                    eprintln!("{init}. Falling back to --summary-only mode.");
                    // The loader moved into run_interactive was consumed with
                    // the failed attempt; reload for the headless pass.
                    let xml = std::fs::read_to_string(&options.manifest)?;
                    let manifest = Manifest::from_xml(&xml)?;
                    let root = Path::new(&options.manifest)
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("."));
                    let sim = Simulation::new(integration);
                    let loader = AssetLoader::spawn(root, manifest.assets);
                    run_headless(sim, loader, options.frames)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// Waits for every asset to load, then advances a fixed number of frames
/// with a synthetic clock and prints the final state.
fn run_headless(mut sim: Simulation, loader: AssetLoader, frames: u64) -> Result<()> {
    for completion in loader.wait() {
        sim.absorb(completion, Duration::ZERO);
    }
    for frame in 0..frames {
        sim.advance_frame(HEADLESS_STEP * frame as u32);
    }
    print!("{}", sim.summary());
    Ok(())
}

fn run_interactive(sim: Simulation, loader: AssetLoader) -> Result<()> {
    // EventLoop::new panics on hosts without a display server; capture that
    // so the caller can fall back to headless mode.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title("National Space Day")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let star_count = sim.starfield().len();
    let renderer = block_on(Renderer::new(Arc::clone(&window), star_count))?;
    let viewport = Arc::new(WindowViewport::new(
        window.inner_size().width,
        window.inner_size().height,
    ));

    let mut state = AppState {
        renderer,
        sim,
        loader: Some(loader),
        viewport,
        start: Instant::now(),
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = state.process_event(&event, control_flow) {
            state.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    print!("{}", state.sim.summary());

    if let Some(err) = state.last_error {
        return Err(err);
    }
    Ok(())
}

struct AppState {
    renderer: Renderer,
    sim: Simulation,
    loader: Option<AssetLoader>,
    viewport: Arc<WindowViewport>,
    start: Instant,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                        self.viewport.update(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                        self.viewport
                            .update(new_inner_size.width, new_inner_size.height);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                self.frame()?;
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    /// One frame: drain completions, advance the simulation, draw.
    fn frame(&mut self) -> Result<()> {
        let now = self.start.elapsed();
        if let Some(loader) = &self.loader {
            for completion in loader.drain() {
                self.sim.absorb(completion, now);
            }
        }
        self.sim.advance_frame(now);

        let camera = app::camera_params(self.viewport.aspect());
        self.renderer.update_globals(&camera, &app::light_params());
        if let Err(err) = self.renderer.render(&mut self.sim) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    manifest: String,
    frames: u64,
    summary_only: bool,
    advance_stars: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(manifest) = args.next() else {
            return Err(anyhow!(
                "Usage: space-scene <manifest.xml> [--frames N] [--summary-only] [--advance-stars]"
            ));
        };
        let mut frames = 300u64;
        let mut summary_only = false;
        let mut advance_stars = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--advance-stars" => advance_stars = true,
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames expects a number"))?;
                    frames = value
                        .parse()
                        .map_err(|_| anyhow!("--frames expects a number, got {value:?}"))?;
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --frames, --summary-only or --advance-stars"
                    ));
                }
            }
        }
        Ok(Self {
            manifest,
            frames,
            summary_only,
            advance_stars,
        })
    }
}

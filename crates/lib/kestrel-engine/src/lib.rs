pub mod renderer;
pub mod shader_provider;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kestrel_core::config::{self, IniFile};
use kestrel_core::{console, log as klog};
use kestrel_rg::Executor;
use kestrel_rhi::backend::HeadlessBackend;
use kestrel_rhi::{Device, ShaderResourceSystem};

use crate::renderer::WorldRenderer;

pub use crate::shader_provider::FileShaderSystem;

/// Configuration file living alongside the executable.
pub const ENGINE_INI_FILE_NAME: &str = "Kestrel.ini";

#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub render_extent: [u32; 2],
    /// Frames per second ceiling. None runs uncapped.
    pub frame_rate_limit: Option<f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_extent: [1280, 720],
            frame_rate_limit: None,
        }
    }
}

impl EngineConfig {
    pub fn from_ini(ini: &IniFile) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let width = ini.get_int("Render", "SwapchainWidth")?
            .map(|w| w as u32)
            .unwrap_or(defaults.render_extent[0]);
        let height = ini.get_int("Render", "SwapchainHeight")?
            .map(|h| h as u32)
            .unwrap_or(defaults.render_extent[1]);
        let frame_rate_limit = ini.get_float("Render", "FrameRateLimit")?
            .map(|limit| limit as f32);

        Ok(Self {
            render_extent: [width, height],
            frame_rate_limit,
        })
    }
}

/// Stage of the per-frame update the engine is currently walking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStage {
    FrameStart,
    PrePhysics,
    Physics,
    PostPhysics,
    Paused,
    FrameEnd,
}

pub struct UpdateContext {
    delta_time: Duration,
    stage: UpdateStage,
    min_frame_time: Option<Duration>,
}

impl UpdateContext {
    #[inline]
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    #[inline]
    pub fn stage(&self) -> UpdateStage {
        self.stage
    }

    #[inline]
    pub fn has_frame_rate_limit(&self) -> bool {
        self.min_frame_time.is_some()
    }
}

/// Invoked on unrecoverable errors; returns whether the engine should keep
/// running.
pub type FatalErrorHandler = Box<dyn FnMut(&str) -> bool>;

/// Initialize the process-wide subsystems (console args, logging).
///
/// Call once before constructing an [`Engine`]; the render core depends on
/// them existing but does not manage their lifetime. The parsed console
/// switches are handed back so the host can feed them into [`Engine::new`].
pub fn init() -> console::ConsoleVars {
    let console_vars = console::from_args();

    klog::init_log(klog::LogConfig::with_file(console_vars.level, "kestrel.log"))
        .expect("Failed to initialize the log system!");

    console_vars
}

/// Engine bring-up and the per-frame loop driving the render core.
pub struct Engine {
    device: Arc<Device>,
    executor: Executor,
    shaders: Arc<dyn ShaderResourceSystem>,
    renderer: WorldRenderer,

    update_context: UpdateContext,
    fatal_error_handler: FatalErrorHandler,
    exit_requested: bool,
}

impl Engine {
    /// Full startup: the ini file next to the executable (fatal when
    /// unopenable), then the render core.
    ///
    /// `settings_path` overrides the ini location, typically from the
    /// `--settings` console switch.
    pub fn new(
        settings_path: Option<PathBuf>,
        shaders: Arc<dyn ShaderResourceSystem>,
        mut fatal_error_handler: FatalErrorHandler,
    ) -> anyhow::Result<Self> {
        let ini_path = match settings_path {
            Some(path) => path,
            None => config::exe_adjacent_path(ENGINE_INI_FILE_NAME)?,
        };
        let ini = match IniFile::from_path(&ini_path) {
            Ok(ini) => ini,
            Err(err) => {
                let message = format!("Failed to load settings from ini file: {}", err);
                fatal_error_handler(&message);
                anyhow::bail!(message);
            }
        };

        Self::with_config(EngineConfig::from_ini(&ini)?, shaders, fatal_error_handler)
    }

    /// Startup with an explicit configuration, bypassing the ini file and
    /// logging setup.
    pub fn with_config(
        config: EngineConfig,
        shaders: Arc<dyn ShaderResourceSystem>,
        fatal_error_handler: FatalErrorHandler,
    ) -> anyhow::Result<Self> {
        let backend = HeadlessBackend::new();
        let device = Device::new(backend)?;

        let executor = Executor::new(device.clone());
        let renderer = WorldRenderer::new(&device, config.render_extent)?;

        log::info!("Engine initialized, render extent {:?}.", config.render_extent);

        Ok(Self {
            device,
            executor,
            shaders,
            renderer,

            update_context: UpdateContext {
                delta_time: Duration::ZERO,
                stage: UpdateStage::FrameStart,
                min_frame_time: config.frame_rate_limit
                    .map(|fps| Duration::from_secs_f32(1.0 / fps)),
            },
            fatal_error_handler,
            exit_requested: false,
        })
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    #[inline]
    pub fn update_context(&self) -> &UpdateContext {
        &self.update_context
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Report an unrecoverable error. The handler decides whether the loop
    /// keeps running.
    pub fn report_fatal(&mut self, message: &str) {
        log::error!("FATAL: {}", message);

        if !(self.fatal_error_handler)(message) {
            self.exit_requested = true;
        }
    }

    /// Run one frame. Returns whether the engine should keep running.
    pub fn update(&mut self) -> bool {
        if self.exit_requested {
            return false;
        }

        let frame_start = Instant::now();

        // Frame Start
        self.update_context.stage = UpdateStage::FrameStart;
        self.shaders.update();

        // the world simulation stages live outside the render core; they are
        // walked here so systems observing the stage see the full sequence
        for stage in [
            UpdateStage::PrePhysics,
            UpdateStage::Physics,
            UpdateStage::PostPhysics,
            UpdateStage::Paused,
        ] {
            self.update_context.stage = stage;
        }

        // Frame End
        self.update_context.stage = UpdateStage::FrameEnd;
        if !self.exit_requested {
            self.render_frame();
        }

        // ensure we don't get a crazy time delta when sitting on a breakpoint
        let mut delta_time = frame_start.elapsed();
        if delta_time > Duration::from_secs(1) {
            delta_time = self.update_context.delta_time; // keep last frame delta
        }

        // frame rate limiter
        if let Some(min_frame_time) = self.update_context.min_frame_time {
            if delta_time < min_frame_time {
                std::thread::sleep(min_frame_time - delta_time);
                delta_time = min_frame_time;
            }
        }

        self.update_context.delta_time = delta_time;

        true
    }

    fn render_frame(&mut self) {
        let renderer = &self.renderer;

        self.executor.prepare(|rg| {
            if let Err(err) = renderer.build_graph(rg) {
                log::error!("Failed to build the frame graph: {}", err);
            }
        });

        if !self.executor.update_pipelines(self.shaders.as_ref()) {
            log::warn!("Some pipelines failed to build this frame, they will retry.");
        }

        self.executor.compile();
        self.executor.execute();
    }

    pub fn shutdown(self) {
        let Engine {
            device,
            executor,
            shaders,
            renderer,
            ..
        } = self;

        device.wait_until_idle();

        renderer.shutdown(&device);
        executor.shutdown(shaders.as_ref());

        log::info!("Engine shutdown.");
    }
}

use std::sync::Arc;

use kestrel_engine::{Engine, FatalErrorHandler};
use kestrel_rhi::{MemoryShaderSystem, ShaderReflection, ShaderResourceSystem};

const SANDBOX_FRAME_COUNT: u64 = 240;

fn sandbox_shaders() -> Arc<dyn ShaderResourceSystem> {
    // the sandbox ships its shaders in memory instead of going through the
    // asset pipeline
    let shaders = Arc::new(MemoryShaderSystem::new());

    shaders.add_shader(
        "shaders/ui.vert.spv",
        &b"\x03\x02\x23\x07 sandbox ui vertex stage"[..],
        ShaderReflection::default(),
    );
    shaders.add_shader(
        "shaders/ui.frag.spv",
        &b"\x03\x02\x23\x07 sandbox ui fragment stage"[..],
        ShaderReflection::default(),
    );

    shaders
}

fn main() -> anyhow::Result<()> {
    let console_vars = kestrel_engine::init();

    let shaders = sandbox_shaders();

    let fatal_handler: FatalErrorHandler = Box::new(|message| {
        eprintln!("fatal: {}", message);
        false
    });

    // a missing settings file is fatal; the build script ships Kestrel.ini
    // next to the executable
    let mut engine = Engine::new(console_vars.settings, shaders, fatal_handler)?;

    while engine.update() {
        if engine.device().device_frame_count() >= SANDBOX_FRAME_COUNT {
            engine.request_exit();
        }
    }

    log::info!(
        "Sandbox ran {} frames, exiting.",
        engine.device().device_frame_count()
    );
    engine.shutdown();

    Ok(())
}

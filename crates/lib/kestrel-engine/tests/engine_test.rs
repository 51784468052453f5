use std::sync::Arc;
use std::time::Duration;

use kestrel_engine::renderer::SCENE_COLOR_NAME;
use kestrel_engine::{Engine, EngineConfig};
use kestrel_rhi::{MemoryShaderSystem, ShaderReflection};

fn ui_shaders() -> Arc<MemoryShaderSystem> {
    let shaders = Arc::new(MemoryShaderSystem::new());

    shaders.add_shader("shaders/ui.vert.spv", "ui vertex bytecode", ShaderReflection::default());
    shaders.add_shader("shaders/ui.frag.spv", "ui fragment bytecode", ShaderReflection::default());

    shaders
}

#[test]
fn engine_runs_headless_frames() {
    let shaders = ui_shaders();

    let mut engine = Engine::with_config(
        EngineConfig {
            render_extent: [320, 180],
            frame_rate_limit: None,
        },
        shaders,
        Box::new(|_| false),
    )
    .unwrap();

    for _ in 0..6 {
        assert!(engine.update());
    }

    assert_eq!(engine.device().device_frame_count(), 6);
    // the scene target rendered and retired with its state exported
    assert!(engine.executor().exported_access(SCENE_COLOR_NAME).is_some());

    engine.shutdown();
}

#[test]
fn frame_rate_limiter_enforces_the_minimum_frame_time() {
    let shaders = ui_shaders();

    let mut engine = Engine::with_config(
        EngineConfig {
            render_extent: [64, 64],
            frame_rate_limit: Some(100.0),
        },
        shaders,
        Box::new(|_| false),
    )
    .unwrap();

    assert!(engine.update());
    assert!(engine.update_context().delta_time() >= Duration::from_millis(10));

    engine.shutdown();
}

#[test]
fn requesting_exit_stops_the_loop() {
    let shaders = ui_shaders();

    let mut engine = Engine::with_config(
        EngineConfig::default(),
        shaders,
        Box::new(|_| false),
    )
    .unwrap();

    assert!(engine.update());
    engine.request_exit();
    assert!(!engine.update());

    engine.shutdown();
}

#[test]
fn fatal_reports_route_through_the_handler() {
    let shaders = ui_shaders();

    // the handler refuses to continue
    let mut engine = Engine::with_config(
        EngineConfig::default(),
        shaders,
        Box::new(|message| {
            assert!(message.contains("device lost"));
            false
        }),
    )
    .unwrap();

    engine.report_fatal("device lost");
    assert!(!engine.update());

    engine.shutdown();
}

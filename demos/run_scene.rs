use vetro::MotionConfig;
use vetro::sim::{Script, run_report};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let s = include_str!("../tests/data/glass_scene.json");
    let script: Script = serde_json::from_str(s)?;

    let report = run_report(&script, MotionConfig::default())?;
    println!(
        "{} frames to t={}ms, {} breathing",
        report.frames,
        report.final_time_ms,
        report.snapshot.breathing.len()
    );
    for node in &report.nodes {
        println!(
            "node {}: classes={:?} vars={:?}",
            node.element.0, node.classes, node.vars
        );
    }

    Ok(())
}

//! # Linebot
//!
//! 巡线小车控制核心的仿真宿主：仿真硬件 + 基于 stdin 的链路。
//!
//! ```bash
//! $ linebot --config linebot.toml
//! /robot/config {"nodes":[{"id":"A"},{"id":"B"}],"edges":[{"from":"A","to":"B","distance":5.0,"turn":"straight"}]}
//! /robot/command start
//! !line 0 1
//! !distance 12.5
//! /robot/command stop
//! ```
//!
//! stdin 关闭或 Ctrl+C 时停止控制循环并退出。

use anyhow::{Context, Result};
use clap::Parser;
use linebot_link::{CommandSink, GraphStore, Router, Session, SharedGraph};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod sim;
mod sink;
mod stdin;

use config::AppConfig;
use sim::SimRig;
use sink::RobotSink;
use stdin::StdoutTransport;

/// 会话线程的等待切片
const SESSION_POLL: Duration = Duration::from_millis(100);

/// Linebot - 巡线小车仿真
#[derive(Parser, Debug)]
#[command(name = "linebot")]
#[command(about = "Line-following robot control core on simulated hardware", long_about = None)]
#[command(version)]
struct Args {
    /// TOML 配置文件（不存在时使用默认值）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 退出时把最终导航图写成 JSON 文件
    #[arg(long)]
    dump_graph: Option<PathBuf>,
}

/// 把导航图快照写成 JSON（与配置文档同形）
fn dump_graph(path: &Path, store: &GraphStore) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create graph dump {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), store)
        .with_context(|| format!("Failed to write graph dump {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!("Broker URI: {} (stdin link)", config.link.broker_uri);

    let is_running = Arc::new(AtomicBool::new(true));
    {
        let is_running = is_running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            is_running.store(false, Ordering::Release);
        })
        .context("Failed to set signal handler")?;
    }

    let rig = SimRig::new(&config.sim);
    let graph = Arc::new(SharedGraph::new());
    let mut sink = RobotSink::new(rig.clone(), config.driver.clone());
    if config.sim.autostart {
        sink.start();
    }

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let mut session = Session::new(Router::new(config.link.topics(), graph.clone(), sink));
    session.attach(StdoutTransport::new(events_tx.clone()));

    // stdin 读线程：EOF 后清除运行标志，会话随之退出
    {
        let is_running = is_running.clone();
        let rig = rig.clone();
        thread::Builder::new()
            .name("stdin-link".into())
            .spawn(move || {
                stdin::pump_lines(std::io::stdin().lock(), &events_tx, &rig);
                is_running.store(false, Ordering::Release);
            })
            .context("Failed to spawn stdin reader")?;
    }

    session.run(&events_rx, SESSION_POLL, &is_running);

    let sink = session.router_mut().commands_mut().sink_mut();
    if sink.robot().is_some() {
        sink.stop();
    }

    let snapshot = graph.snapshot();
    info!(
        "Navigation graph: {} nodes, {} edges",
        snapshot.node_count(),
        snapshot.edge_count()
    );
    for edge in snapshot.edges() {
        info!("  {} -> {} ({} cm, {})", edge.from, edge.to, edge.distance, edge.turn);
    }
    info!("Final motor levels: {:?}", rig.motor_levels());

    if let Some(path) = args.dump_graph.as_deref() {
        dump_graph(path, &snapshot)?;
        info!("Navigation graph written to {}", path.display());
    }

    Ok(())
}

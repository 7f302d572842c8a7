use clap::Parser;
use client::game::{Frontend, FrontendConfig};
use client::input::InputManager;
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::*;
use shared::{Role, SessionConfig, DEFAULT_PORT};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host a match instead of choosing on the menu
    #[arg(long)]
    host: bool,

    /// Join a match instead of choosing on the menu
    #[arg(long, conflicts_with = "host")]
    join: bool,

    /// Address to listen on when hosting, or to connect to when joining
    #[arg(short = 'a', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    address: String,

    /// Fixed seed for enemy behaviour when hosting
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Window width
    #[arg(short = 'w', long, default_value = "1280")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "720")]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Maze Duel".to_string(),
        window_width: args.width,
        window_height: args.height,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the network runtime: {}", e);
            return;
        }
    };

    let config = FrontendConfig {
        session: SessionConfig {
            seed: args.seed,
            ..SessionConfig::default()
        },
        address: args.address,
    };
    info!("Starting client, match address {}", config.address);
    info!("Controls: Arrows/WASD to move, Space to attack, Esc to leave");

    let mut frontend = Frontend::new(config, runtime.handle().clone());
    if args.host {
        frontend.preselect(Role::Host);
    } else if args.join {
        frontend.preselect(Role::Guest);
    }

    let mut input_manager = InputManager::new();
    let mut renderer = Renderer::new();
    let started = Instant::now();

    loop {
        let now_ms = started.elapsed().as_millis() as u64;

        let frame = input_manager.sample();
        frontend.update(&frame, now_ms);
        renderer.render(&frontend, now_ms);

        next_frame().await;
    }
}

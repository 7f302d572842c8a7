use clap::Parser;
use log::{error, info};
use server::game::HostGame;
use shared::{InputMessage, Role, Session, SessionConfig, SessionUpdate, DEFAULT_PORT};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// Headless authoritative host: runs the session without a local player and
/// serves it to one guest.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Simulation ticks per second
        #[clap(short, long, default_value = "60")]
        tick_rate: u32,
        /// Fixed seed for enemy behaviour, random when omitted
        #[clap(short, long)]
        seed: Option<u64>,
    }

    let args = Args::parse();

    let config = SessionConfig {
        seed: args.seed,
        ..SessionConfig::default()
    };
    let username = config.username.clone();
    let password = config.password.clone();

    let mut session = Session::new(config);
    session.select_mode(Role::Host)?;
    session.login(&username, &password, 0)?;
    session.skip_intro(0)?;

    let address = format!("{}:{}", args.host, args.port);
    let mut game = HostGame::start(&address, session).await?;
    info!("Waiting for a guest on {}", game.local_addr());

    tokio::select! {
        result = run_game_loop(&mut game, args.tick_rate.max(1)) => {
            if let Err(e) = result {
                error!("Game loop stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    game.stop();
    Ok(())
}

/// Ticks the match at a fixed rate until it ends. The host's own player never
/// moves; gameplay only advances while a guest is connected.
async fn run_game_loop(game: &mut HostGame, tick_rate: u32) -> Result<(), shared::SessionError> {
    let mut interval_timer = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let idle = InputMessage::default();

    loop {
        interval_timer.tick().await;
        let now_ms = started.elapsed().as_millis() as u64;

        match game.step(now_ms, &idle)? {
            SessionUpdate::LevelAdvanced { level } => info!("Level {} reached", level + 1),
            SessionUpdate::GameOver(result) => {
                match result.winner {
                    Some(winner) => info!(
                        "Player {} wins ({} - {})",
                        winner, result.scores[0], result.scores[1]
                    ),
                    None => info!("Match tied at {}", result.scores[0]),
                }
                game.publish();
                // Give the guest a few exchanges to pick up the final state.
                tokio::time::sleep(Duration::from_millis(500)).await;
                return Ok(());
            }
            SessionUpdate::Idle | SessionUpdate::Ticked | SessionUpdate::Halted => {}
        }
    }
}

use chrono::Utc;
use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use mxi_arena::{
    ArenaConfig,
    Direction,
    TickEvent,
};
use mxi_client::{
    balance::{
        self,
        BalanceBreakdown,
        BalanceFeed,
    },
    cache::CachePolicy,
    chart,
    init_tracing,
    poller::{
        PaymentStatusPoller,
        PollerEvent,
    },
    session::{
        ArenaCommand,
        ArenaRunner,
    },
    vesting::{
        self,
        VestingSchedule,
    },
};
use mxi_gateway::{
    GatewayClient,
    Session,
    SessionStore,
    types::{
        BalanceSnapshot,
        UserProfile,
    },
};
use std::sync::Arc;
use tokio::{
    io::{
        AsyncBufReadExt,
        BufReader,
    },
    sync::{
        mpsc,
        watch,
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the hosted backend.
    #[arg(short, long, default_value = "http://localhost:8000")]
    base_url: String,

    /// Bearer token of the authenticated session.
    #[arg(short, long)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll a payment order until it settles.
    WatchPayment {
        #[arg(short, long)]
        order_id: String,
    },
    /// Print the balance chart data and breakdown for a user.
    Balance {
        #[arg(short, long)]
        user_id: String,
        /// Keep running, printing live vesting estimates and history
        /// refreshes until interrupted.
        #[arg(short, long)]
        watch: bool,
    },
    /// Run an arena session headless; commands (up/down/left/right/bomb)
    /// are read line by line from stdin.
    Play {
        #[arg(short, long)]
        session_id: String,
        #[arg(short, long)]
        user_id: String,
    },
    /// Print the web build's service-worker cache manifest.
    CacheManifest {
        /// Host suffix identifying backend API requests.
        #[arg(long, default_value = "supabase.co")]
        api_host: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _tracing_guard = init_tracing();
    let args = Args::parse();

    let gateway = GatewayClient::new(&args.base_url)?;
    let sessions = SessionStore::new();
    if let Some(token) = &args.access_token {
        sessions.set(Session::new(token.clone()));
    }

    match args.command {
        Command::WatchPayment { order_id } => {
            watch_payment(gateway, sessions, order_id).await
        }
        Command::Balance { user_id, watch } => {
            show_balance(gateway, sessions, user_id, watch).await
        }
        Command::Play {
            session_id,
            user_id,
        } => play(gateway, session_id, user_id).await,
        Command::CacheManifest { api_host } => {
            println!("{}", CachePolicy::new(api_host).manifest_json()?);
            Ok(())
        }
    }
}

async fn watch_payment(
    gateway: GatewayClient,
    sessions: SessionStore,
    order_id: String,
) -> Result<()> {
    let (poller, mut events) = PaymentStatusPoller::new(gateway, sessions, order_id);
    let poller = Arc::new(poller);
    let runner = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run().await })
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PollerEvent::Status(status)) => {
                    println!("status: {status} ({})", status.label());
                }
                Some(PollerEvent::Error(message)) => {
                    println!("check failed: {message}");
                }
                Some(PollerEvent::Confirmed) => {
                    println!("payment settled and credited");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping payment watch");
                break;
            }
        }
    }
    runner.abort();
    Ok(())
}

async fn show_balance(
    gateway: GatewayClient,
    sessions: SessionStore,
    user_id: String,
    watch: bool,
) -> Result<()> {
    let session = sessions
        .current()
        .ok_or_else(|| eyre!("the balance command requires --access-token"))?;
    let profile = gateway.auth_user(&session.access_token).await?;
    let schedule = VestingSchedule::from_profile(&profile);
    let now = Utc::now();
    let current_vesting = schedule.estimate_at(now);

    let mut history = gateway.balance_history(&user_id).await?;
    if history.is_empty() {
        history = vec![balance::initial_snapshot(&profile, current_vesting, now)];
    }

    let breakdown = BalanceBreakdown::from_profile(&profile, current_vesting);
    let summary = chart::change_summary(&history);
    println!("total balance: {:.2} MXI", breakdown.total());
    println!(
        "change: {:+.2} ({:+.2}%)",
        summary.change, summary.percentage
    );
    println!(
        "purchased {:.2} ({:.1}%) | commissions {:.2} ({:.1}%) | tournaments {:.2} ({:.1}%) | vesting {:.6} ({:.1}%)",
        breakdown.purchased,
        breakdown.share_percent(breakdown.purchased),
        breakdown.commissions,
        breakdown.share_percent(breakdown.commissions),
        breakdown.tournaments,
        breakdown.share_percent(breakdown.tournaments),
        breakdown.vesting,
        breakdown.share_percent(breakdown.vesting),
    );

    match chart::layout(&history) {
        Some(geometry) => {
            println!("chart width: {} height: {}", geometry.width, geometry.height);
            println!("line path: {}", chart::path_data(&geometry.line));
            println!("area path: {}", chart::path_data(&geometry.area));
        }
        None => println!("no balance history yet"),
    }

    if watch {
        watch_balance(gateway, profile, schedule, user_id, history).await;
    }
    Ok(())
}

async fn watch_balance(
    gateway: GatewayClient,
    profile: UserProfile,
    schedule: VestingSchedule,
    user_id: String,
    history: Vec<BalanceSnapshot>,
) {
    let (history_sender, mut history_receiver) = watch::channel(history);
    let (vesting_sender, mut vesting_receiver) =
        watch::channel(schedule.estimate_at(Utc::now()));

    let feed = BalanceFeed::new(gateway, user_id);
    let feed_task =
        tokio::spawn(async move { feed.run(profile, schedule, history_sender).await });
    let vesting_task =
        tokio::spawn(vesting::publish_estimates(schedule, vesting_sender));

    loop {
        tokio::select! {
            changed = vesting_receiver.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("vesting: {:.6} MXI", *vesting_receiver.borrow());
            }
            changed = history_receiver.changed() => {
                if changed.is_err() {
                    break;
                }
                let history = history_receiver.borrow().clone();
                let summary = chart::change_summary(&history);
                println!(
                    "history refreshed: {} points, change {:+.2} ({:+.2}%)",
                    history.len(),
                    summary.change,
                    summary.percentage
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    feed_task.abort();
    vesting_task.abort();
}

async fn play(gateway: GatewayClient, session_id: String, user_id: String) -> Result<()> {
    let (runner, mut ticks) =
        ArenaRunner::initialize(gateway, session_id, user_id.clone(), ArenaConfig::default())
            .await?;
    let (commands, command_receiver) = mpsc::channel(16);
    let input = tokio::spawn(read_commands(commands));
    let driver = tokio::spawn(runner.run(command_receiver));

    while let Some(event) = ticks.recv().await {
        match event {
            TickEvent::BombExploded { owner, .. } => println!("boom ({owner})"),
            TickEvent::PlayerEliminated { player } => println!("{player} is out"),
            TickEvent::BlockDestroyed { by, .. } => println!("{by} destroyed a block"),
            TickEvent::Ended => println!("match over"),
        }
    }

    let (outcome, report) = driver.await.map_err(|error| eyre!(error))??;
    input.abort();

    if outcome.winner_id == user_id {
        println!("you won!");
    } else {
        println!("winner: {}", outcome.winner_id);
    }
    for standing in &outcome.standings {
        println!(
            "#{} {}: {} blocks, {} damage{}",
            standing.rank,
            standing.player_id,
            standing.blocks_destroyed,
            standing.damage_dealt,
            if standing.alive { "" } else { " (eliminated)" },
        );
    }
    if let Some(amount) = report.prize_credited {
        println!("prize credited: {amount:.2} MXI");
    }
    if !report.is_clean() {
        println!("reconciliation issues: {}", report.failures.join("; "));
    }
    Ok(())
}

async fn read_commands(commands: mpsc::Sender<ArenaCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "up" => Some(ArenaCommand::Move(Direction::Up)),
            "down" => Some(ArenaCommand::Move(Direction::Down)),
            "left" => Some(ArenaCommand::Move(Direction::Left)),
            "right" => Some(ArenaCommand::Move(Direction::Right)),
            "bomb" => Some(ArenaCommand::PlaceBomb),
            _ => None,
        };
        if let Some(command) = command
            && commands.send(command).await.is_err()
        {
            break;
        }
    }
}

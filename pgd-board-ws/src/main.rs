/// pgd-board-watch: follow a board live, or move one task and exit.
use chrono::Local;
use clap::{Parser, Subcommand};
use pgd_board_core::{BoardSession, BoardState, ConnectionState, SessionUpdate, TaskId};
use pgd_board_ws::{default_config_path, load_config, RestClient, WsTransport};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "pgd-board-watch", about = "Live view of a PGD planning board")]
struct Cli {
    /// Config file (defaults to <config dir>/pgd/board.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the sync endpoint from the config file
    #[arg(long, global = true)]
    server_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the board after every change until interrupted
    Watch { board_id: String },
    /// Move a task, emit the intent, persist it, and exit
    Move {
        board_id: String,
        task_id: TaskId,
        lane: String,
        #[arg(default_value_t = 0)]
        index: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }

    let lanes = match config.lane_set() {
        Ok(lanes) => lanes,
        Err(e) => {
            log::error!("Invalid lanes in {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let rest = RestClient::new(&config.api_url);

    let board_id = match &cli.command {
        Command::Watch { board_id } | Command::Move { board_id, .. } => board_id.clone(),
    };

    let mut board = BoardState::new(board_id.clone(), lanes);
    match rest.fetch_snapshot(&board_id).await {
        Ok(tasks) => board.replace_snapshot(tasks),
        Err(e) => log::warn!("Snapshot fetch for board {} failed: {}", board_id, e),
    }

    let (transport, mut rx) = WsTransport::connect(config.server_url.clone(), config.reconnect_delay());
    let closed = transport.closed();
    let mut session = BoardSession::open(board, transport, ConnectionState::default());

    let code = match cli.command {
        Command::Watch { .. } => {
            print_board(&session);
            watch(&mut session, &mut rx, &rest).await;
            ExitCode::SUCCESS
        }
        Command::Move {
            task_id,
            lane,
            index,
            ..
        } => move_once(&mut session, &mut rx, &rest, task_id, &lane, index).await,
    };

    // Leaves the room and closes the socket; wait for the frames to go out.
    drop(session);
    if tokio::time::timeout(CLOSE_TIMEOUT, closed).await.is_err() {
        log::warn!("Sync connection did not close within {:?}", CLOSE_TIMEOUT);
    }
    code
}

async fn watch(
    session: &mut BoardSession<WsTransport>,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<pgd_board_core::TransportEvent>,
    rest: &RestClient,
) {
    loop {
        let update = tokio::select! {
            update = session.next(rx) => update,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, leaving board");
                return;
            }
        };
        match update {
            None => return,
            Some(SessionUpdate::Applied) => print_board(session),
            Some(SessionUpdate::ResyncRequired) => {
                resync(session, rest).await;
                print_board(session);
            }
            Some(SessionUpdate::ConnectionChanged { connected }) => {
                log::info!("Connection {}", if connected { "up" } else { "down" });
            }
            Some(SessionUpdate::Ignored) => {}
        }
    }
}

async fn move_once(
    session: &mut BoardSession<WsTransport>,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<pgd_board_core::TransportEvent>,
    rest: &RestClient,
    task_id: TaskId,
    lane: &str,
    index: usize,
) -> ExitCode {
    let connect = async {
        while !session.is_connected() {
            if session.next(rx).await.is_none() {
                break;
            }
        }
    };
    if tokio::time::timeout(CONNECT_TIMEOUT, connect).await.is_err() {
        log::warn!("Not connected; the move will only be persisted over REST");
    }

    let Some(intent) = session.move_task(task_id, lane, index) else {
        log::error!("Task {} cannot be moved to {:?}[{}]", task_id, lane, index);
        return ExitCode::FAILURE;
    };
    print_board(session);

    match rest.persist_move(&intent).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Could not save move of task {}: {}", task_id, e);
            ExitCode::FAILURE
        }
    }
}

async fn resync(session: &mut BoardSession<WsTransport>, rest: &RestClient) {
    let board_id = session.board().board_id().to_string();
    match rest.fetch_snapshot(&board_id).await {
        Ok(tasks) => session.replace_snapshot(tasks),
        Err(e) => log::warn!("Resync of board {} failed: {}", board_id, e),
    }
}

fn print_board(session: &BoardSession<WsTransport>) {
    let today = Local::now().date_naive();
    let board = session.board();
    let final_lane = board.lanes().final_lane().map(|l| l.id.as_str());
    let view = session.view();

    println!("== board {} ==", board.board_id());
    for lane in view.lanes() {
        let limit = lane
            .lane
            .limit
            .map(|l| format!("/{}", l))
            .unwrap_or_default();
        let warn = if lane.over_capacity() { " !" } else { "" };
        println!("{} ({}{}){}", lane.lane.label, lane.tasks.len(), limit, warn);
        for task in &lane.tasks {
            let overdue = if task.is_overdue(today, final_lane) {
                " [overdue]"
            } else {
                ""
            };
            println!("  #{} {}{}", task.id, task.title, overdue);
        }
    }
}

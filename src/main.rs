mod common;
mod config;
mod network;
mod protocol;
mod storage;
mod ui;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use common::{ContactId, UserId};
use network::{ApiClient, ChatClient};
use storage::HistoryLoader;
use ui::console::{self, ConsoleInput};
use ui::{AppState, ChatApp, UiCommand, UiUpdate};

#[derive(Parser)]
#[command(
    name = "framed_chat",
    version,
    about = "Terminal chat client over a framed binary WebSocket protocol"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Override the local user id from config
    #[arg(long)]
    user_id: Option<UserId>,
    /// Conversation to open on start
    #[arg(long, value_name = "CONTACT_ID")]
    open: Option<ContactId>,
}

// Một luồng xử lý sự kiện duy nhất; I/O mạng chạy trong các task riêng.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::apply_env_overrides(config::load_config(&cli.config), |key| {
        std::env::var(key).ok()
    });
    if let Some(user_id) = cli.user_id {
        app_config.user_id = user_id;
    }

    let api = ApiClient::new(app_config.server_url.clone(), app_config.session_cookie.clone());
    match api.validate_session().await {
        Ok(true) => log::info!("Session valid for user {}", app_config.user_id),
        Ok(false) => {
            log::error!("Session rejected by {}; log in again", app_config.server_url);
            return Ok(());
        }
        Err(err) => {
            log::error!("Could not reach {}: {err}", app_config.server_url);
            return Err(err.into());
        }
    }

    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Network
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Network -> UI
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    // History fetch -> UI
    let (history_tx, mut history_rx) = mpsc::unbounded_channel();

    // 2. Khởi chạy Network task (chạy ngầm)
    let client = ChatClient::new(
        event_tx,
        cmd_rx,
        app_config.ws_url.clone(),
        app_config.session_cookie.clone(),
        app_config.supported_versions.clone(),
    );
    let network = tokio::spawn(async move {
        if let Err(err) = client.run().await {
            log::error!("Network client terminated: {err}");
        }
    });

    // 3. Vòng lặp ứng dụng
    let local_user = app_config.user_id;
    let loader = HistoryLoader::new(Arc::new(api), history_tx);
    let mut app = ChatApp::new(AppState::new(local_user), loader, cmd_tx);
    let show = |updates: Vec<UiUpdate>| {
        for update in &updates {
            println!("{}", console::render(update, local_user));
        }
    };

    if let Some(contact_id) = cli.open {
        show(app.select_contact(contact_id));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match console::read_input(line) {
                    ConsoleInput::Command(UiCommand::Open(contact_id)) => show(app.select_contact(contact_id)),
                    ConsoleInput::Command(UiCommand::Send(content)) => show(app.send_message(content)),
                    ConsoleInput::Command(UiCommand::Log) => println!("{}", console::render_notices(app.state())),
                    ConsoleInput::Command(UiCommand::Quit) | ConsoleInput::Closed => break,
                    ConsoleInput::Nothing => {}
                    ConsoleInput::Invalid(err) => println!("! {err}"),
                }
            }
            Some(event) = event_rx.recv() => show(app.handle_network_event(event)),
            Some(loaded) = history_rx.recv() => show(app.handle_history_loaded(loaded)),
        }
    }

    app.close().await;
    // Dropping the last command sender also ends the network loop.
    drop(app);
    if let Err(err) = network.await {
        log::warn!("Network task panicked: {err}");
    }
    Ok(())
}

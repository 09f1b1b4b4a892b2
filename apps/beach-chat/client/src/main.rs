use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use beach_chat_client::{
    keyboard, print_exit_notice, read_display_name, ChatClient, Cli, ClientError, Connector,
    ExitReason, Notice, RawModeGuard, RawTerminal, Screen, TcpConnector,
};
use beach_chat_core::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(reason) => {
            info!(?reason, "client exited");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "client failed");
            if matches!(err, ClientError::ReconnectTimedOut { .. }) {
                print_exit_notice(io::stdout());
            } else if !matches!(err, ClientError::Unreachable { .. }) {
                eprintln!("beach-chat: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitReason, ClientError> {
    if let Some(config) = cli.log_config() {
        logging::init(&config)?;
    }

    let mut screen = Screen::new(io::stdout());
    let connector = TcpConnector::new(cli.server.clone());
    let mut stream = match connector.connect().await {
        Ok(stream) => stream,
        Err(source) => {
            screen.notice(Notice::Unreachable)?;
            return Err(ClientError::Unreachable {
                addr: cli.server,
                source,
            });
        }
    };
    info!(server = %connector.addr(), "connected");

    let Some(name) = read_display_name(&mut io::stdin().lock(), &mut screen)? else {
        return Ok(ExitReason::Eof);
    };
    stream.write_all(name.as_bytes()).await?;
    stream.flush().await?;

    let mut terminal = RawModeGuard::new(io::stdin().is_terminal());
    terminal.acquire().map_err(ClientError::Terminal)?;
    let keys = keyboard::spawn_stdin_reader()?;

    let mut client = ChatClient::new(connector, stream, name, terminal, screen, keys, cli.policy());
    let result = client.run().await;
    // Dropping the client restores cooked mode before anything else is printed.
    drop(client);
    result
}

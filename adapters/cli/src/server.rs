use anyhow::Context;
use fog_harvest_protocol::{encode_commands, TurnDecoder};
use fog_harvest_system_turn::{Session, SessionConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Accepts connections forever, running one session task per peer.
pub(crate) async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(
        %address,
        grid_sizing = %config.grid_sizing,
        stale_unit_turns = config.stale_unit_turns,
        "server.listening"
    );

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!(%error, "server.accept_failed");
                continue;
            }
        };

        let session_config = config.session_config();
        info!(%peer, seed = session_config.seed, "session.accepted");
        let _ = tokio::spawn(async move {
            match serve_connection(socket, session_config).await {
                Ok(turns) => info!(%peer, turns, "session.closed"),
                Err(error) => warn!(%peer, error = %format!("{error:#}"), "session.failed"),
            }
        });
    }
}

/// Runs the read-plan-write loop until the peer closes the stream.
///
/// Returns the number of turns answered. A malformed line or an I/O error
/// ends the session.
pub(crate) async fn serve_connection<S>(stream: S, config: SessionConfig) -> anyhow::Result<u64>
where
    S: AsyncRead + AsyncWrite,
{
    let mut decoder = TurnDecoder::new(config.grid_sizing);
    let mut session = Session::new(config);
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut turns = 0;

    while let Some(line) = lines.next_line().await.context("failed to read turn")? {
        if line.trim().is_empty() {
            continue;
        }

        let input = decoder.decode(&line)?;
        let commands = session.handle_turn(input);
        let encoded = encode_commands(&commands)?;
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write commands")?;
        writer.flush().await.context("failed to flush commands")?;

        turns += 1;
        debug!(turns, commands = commands.len(), "session.replied");
    }

    Ok(turns)
}

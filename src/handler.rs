//! TCP connection handling
//!
//! Accepts connections, frames each stream into newline-delimited text
//! and bridges it to the ChatHub: inbound lines become
//! [`HubCommand::Line`], outbound lines arrive on a per-session channel.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::hub::HubCommand;
use crate::message::WELCOME;
use crate::types::SessionId;

/// Outbound lines buffered per session before the hub starts dropping
const OUTBOUND_BUFFER_SIZE: usize = 64;

/// Accept connections forever, spawning one handler task per connection
pub async fn accept_loop(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<HubCommand>,
    max_line_length: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, max_line_length).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Writes the welcome banner, registers the session with the hub, then
/// pumps lines both ways until either side closes.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<HubCommand>,
    max_line_length: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let framed = Framed::new(stream, LinesCodec::new_with_max_length(max_line_length));
    let (mut line_sender, mut line_receiver) = framed.split::<String>();

    for line in WELCOME.lines() {
        line_sender.send(line.to_string()).await?;
    }

    let session_id = SessionId::new();
    debug!("Session {} assigned to {}", session_id, peer_addr);

    // Channel for hub -> client lines
    let (msg_tx, mut msg_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER_SIZE);

    if cmd_tx
        .send(HubCommand::Connect {
            session_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register session {} - hub closed", session_id);
        return Err(AppError::ChannelSend);
    }

    let cmd_tx_read = cmd_tx.clone();

    // Read task (socket -> HubCommand)
    let read_task = tokio::spawn(async move {
        while let Some(result) = line_receiver.next().await {
            match result {
                Ok(line) => {
                    let cmd = HubCommand::Line { session_id, line };
                    if cmd_tx_read.send(cmd).await.is_err() {
                        debug!("Hub closed, ending read task for {}", session_id);
                        break;
                    }
                }
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!(
                        "Line from {} exceeds {} bytes, closing",
                        session_id, max_line_length
                    );
                    break;
                }
                Err(LinesCodecError::Io(e)) => {
                    debug!("Read error for {}: {}", session_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", session_id);
    });

    // Write task (hub -> socket)
    let write_task = tokio::spawn(async move {
        while let Some(line) = msg_rx.recv().await {
            if let Err(e) = line_sender.send(line).await {
                debug!("Write failed, ending write task: {}", e);
                break;
            }
        }
        debug!("Write task ended");
        let _ = line_sender.close().await;
    });

    let read_abort = read_task.abort_handle();
    let write_abort = write_task.abort_handle();

    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", session_id);
            write_abort.abort();
        }
        _ = write_task => {
            debug!("Write task completed for {}", session_id);
            read_abort.abort();
        }
    }

    let _ = cmd_tx.send(HubCommand::Disconnect { session_id }).await;

    info!("Session {} ({}) disconnected", session_id, peer_addr);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn connected_pair(
        max_line_length: usize,
    ) -> (TcpStream, mpsc::Receiver<HubCommand>, tokio::task::JoinHandle<Result<(), AppError>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(stream, cmd_tx, max_line_length).await
        });

        let client = TcpStream::connect(addr).await.unwrap();
        (client, cmd_rx, server)
    }

    async fn next_cmd(cmd_rx: &mut mpsc::Receiver<HubCommand>) -> HubCommand {
        timeout(Duration::from_secs(5), cmd_rx.recv())
            .await
            .expect("timed out waiting for hub command")
            .expect("command channel closed")
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let (client, mut cmd_rx, server) = connected_pair(64).await;
        let mut client = Framed::new(client, LinesCodec::new());

        for expected in WELCOME.lines() {
            let line = client.next().await.unwrap().unwrap();
            assert_eq!(line, expected);
        }

        let (session_id, out_tx) = match next_cmd(&mut cmd_rx).await {
            HubCommand::Connect { session_id, sender } => (session_id, sender),
            other => panic!("Wrong command: {:?}", other),
        };

        client.send("/public").await.unwrap();
        match next_cmd(&mut cmd_rx).await {
            HubCommand::Line { session_id: id, line } => {
                assert_eq!(id, session_id);
                assert_eq!(line, "/public");
            }
            other => panic!("Wrong command: {:?}", other),
        }

        out_tx.send("bob: hi".to_string()).await.unwrap();
        assert_eq!(client.next().await.unwrap().unwrap(), "bob: hi");

        drop(client);
        match next_cmd(&mut cmd_rx).await {
            HubCommand::Disconnect { session_id: id } => assert_eq!(id, session_id),
            other => panic!("Wrong command: {:?}", other),
        }
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_over_long_line_closes_session() {
        let (client, mut cmd_rx, server) = connected_pair(16).await;
        let mut client = Framed::new(client, LinesCodec::new());

        // Dropping the sender would end the write task and the session
        let _out_tx = match next_cmd(&mut cmd_rx).await {
            HubCommand::Connect { sender, .. } => sender,
            other => panic!("Wrong command: {:?}", other),
        };

        client.send("short").await.unwrap();
        client.send("x".repeat(100)).await.unwrap();

        match next_cmd(&mut cmd_rx).await {
            HubCommand::Line { line, .. } => assert_eq!(line, "short"),
            other => panic!("Wrong command: {:?}", other),
        }
        assert!(matches!(
            next_cmd(&mut cmd_rx).await,
            HubCommand::Disconnect { .. }
        ));
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_closed_outbound_channel_stops_reading() {
        let (client, mut cmd_rx, server) = connected_pair(64).await;
        let mut client = Framed::new(client, LinesCodec::new());

        let session_id = match next_cmd(&mut cmd_rx).await {
            HubCommand::Connect { session_id, sender } => {
                drop(sender);
                session_id
            }
            other => panic!("Wrong command: {:?}", other),
        };

        match next_cmd(&mut cmd_rx).await {
            HubCommand::Disconnect { session_id: id } => assert_eq!(id, session_id),
            other => panic!("Wrong command: {:?}", other),
        }
        assert!(server.await.unwrap().is_ok());

        // The read task is gone, so later input never reaches the hub
        let _ = client.send("after close").await;
        assert!(
            timeout(Duration::from_millis(200), cmd_rx.recv())
                .await
                .map_or(true, |cmd| cmd.is_none())
        );
    }
}

use std::io::{self, Read};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, trace};

const CHUNK: usize = 64;
const QUEUE_DEPTH: usize = 32;

/// Spawns a thread that forwards raw stdin bytes. The receiver yields `None`
/// once stdin reaches end of file.
pub fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<Vec<u8>>> {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    thread::Builder::new()
        .name("beach-chat-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            pump(stdin.lock(), tx);
        })?;
    Ok(rx)
}

/// Copies `input` into `tx` chunk by chunk until EOF, a read error, or the
/// receiver going away.
pub fn pump<R: Read>(mut input: R, tx: mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; CHUNK];
    loop {
        match input.read(&mut buf) {
            Ok(0) => {
                debug!("stdin closed");
                break;
            }
            Ok(n) => {
                trace!(bytes = n, "stdin chunk");
                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(error = %err, "stdin read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test_timeout::timeout(10)]
    fn pump_forwards_everything_then_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = thread::spawn(move || pump(Cursor::new(b"hello\r".to_vec()), tx));
        handle.join().unwrap();

        let mut seen = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            seen.extend(chunk);
        }
        assert_eq!(seen, b"hello\r");
        assert!(rx.try_recv().is_err());
    }

    #[test_timeout::timeout(10)]
    fn pump_stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // Endless input; only the closed channel can end the loop.
        pump(io::repeat(b'x'), tx);
    }
}

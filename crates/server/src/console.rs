//! Console interativo sobre stdin/stdout, no mesmo processo do servidor.

use bytes::BytesMut;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use redstore_protocol::{Command, Reply};
use redstore_storage::Store;

use crate::execute_command;

const PROMPT: &str = "> ";

/// Lê comandos linha a linha até EOF ou EXIT. EXIT sincroniza o AOF antes
/// de retornar.
pub async fn run<R, W>(input: R, mut output: W, store: &Store) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            info!("console: EOF");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match Command::from_line(&line) {
            Ok(Command::Exit) => {
                store.sync_log().await?;
                info!("console: EXIT");
                break;
            }
            Ok(cmd) => execute_command(&cmd, store).await,
            Err(e) => Reply::error(e),
        };

        let mut buf = BytesMut::new();
        reply.encode(&mut buf);
        output.write_all(&buf).await?;
    }

    output.flush().await
}

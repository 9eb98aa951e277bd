use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use redstore_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, ProtocolError};
use redstore_protocol::{Reply, check_line, decode_line, read_line};

/// Wrapper sobre TcpStream com buffer para leitura de linhas e escrita de respostas.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê uma linha completa do stream. Retorna None no EOF.
    ///
    /// Bytes sem `\n` antes do EOF contam como a última linha.
    pub async fn read_line(&mut self) -> Result<Option<String>, ConnectionError> {
        loop {
            if let Some(line) = self.parse_line()? {
                return Ok(Some(line));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = self.buffer.split();
                return decode_line(&rest).map(Some).map_err(invalid_data);
            }
        }
    }

    /// Escreve uma resposta no stream.
    pub async fn write_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        reply.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn parse_line(&mut self) -> Result<Option<String>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match check_line(&mut cursor) {
            Ok(()) => {
                let len = cursor.position() as usize;
                cursor.set_position(0);
                let line = read_line(&mut cursor).map_err(invalid_data)?;
                self.buffer.advance(len);
                Ok(Some(line))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(invalid_data(e)),
        }
    }
}

fn invalid_data(e: ProtocolError) -> ConnectionError {
    ConnectionError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        e.to_string(),
    ))
}

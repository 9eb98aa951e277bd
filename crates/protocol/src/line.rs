use bytes::{BufMut, BytesMut};
use std::io::Cursor;
use redstore_common::{MAX_LINE_SIZE, ProtocolError};

/// Verifica se uma linha completa está disponível no buffer sem alocar.
/// Retorna Ok(()) se completa, Err(Incomplete) se precisa mais dados.
pub fn check_line(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
    get_line(src).map(|_| ())
}

/// Extrai a próxima linha completa do cursor, sem o terminador.
/// O mesmo enquadramento vale para o socket e para o arquivo AOF.
pub fn read_line(src: &mut Cursor<&[u8]>) -> Result<String, ProtocolError> {
    let line = get_line(src)?;
    decode_line(line)
}

/// Decodifica os bytes de uma linha, removendo um `\r` final (clientes telnet).
pub fn decode_line(line: &[u8]) -> Result<String, ProtocolError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8(line.to_vec()).map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))
}

/// Escreve `text` seguido de `\n`.
pub fn encode_line(text: &str, dst: &mut BytesMut) {
    dst.reserve(text.len() + 1);
    dst.put(text.as_bytes());
    dst.put_u8(b'\n');
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;
    let rest = &buf[start.min(buf.len())..];

    match rest.iter().position(|&b| b == b'\n') {
        Some(len) if len > MAX_LINE_SIZE => Err(ProtocolError::LineTooLong(len)),
        Some(len) => {
            src.set_position((start + len + 1) as u64);
            Ok(&rest[..len])
        }
        None if rest.len() > MAX_LINE_SIZE => Err(ProtocolError::LineTooLong(rest.len())),
        None => Err(ProtocolError::Incomplete),
    }
}

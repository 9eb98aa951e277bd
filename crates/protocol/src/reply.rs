use std::fmt;

use bytes::BytesMut;
use redstore_common::NIL_REPLY;

use crate::encode_line;

/// Resposta de um comando. Cada resposta ocupa exatamente uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Value(String),
    Nil,
    /// Pares campo/valor, na ordem em que foram pedidos.
    Pairs(Vec<(String, String)>),
    Error(String),
}

impl Reply {
    /// Cria um `Reply::Error` com o prefixo `ERR`.
    pub fn error(msg: impl fmt::Display) -> Reply {
        Reply::Error(format!("ERR {msg}"))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Encoda a resposta no buffer de saída, terminada em `\n`.
    pub fn encode(&self, dst: &mut BytesMut) {
        encode_line(&self.to_string(), dst);
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Value(v) => f.write_str(v),
            Reply::Nil => f.write_str(NIL_REPLY),
            Reply::Pairs(pairs) if pairs.is_empty() => f.write_str(NIL_REPLY),
            Reply::Pairs(pairs) => {
                for (i, (field, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{field} {value}")?;
                }
                Ok(())
            }
            Reply::Error(msg) => f.write_str(msg),
        }
    }
}

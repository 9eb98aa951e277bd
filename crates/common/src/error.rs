/// Erros de enquadramento do protocolo de linhas.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("linha incompleta")]
    Incomplete,
    #[error("linha excede tamanho máximo ({0} bytes)")]
    LineTooLong(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros do store in-memory.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("falha ao gravar no AOF: {0}")]
    Aof(#[from] std::io::Error),
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de parsing/validação de comandos.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("comando vazio")]
    Empty,
    #[error("comando desconhecido: {0}")]
    Unknown(String),
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erro de inicialização do store: replay ou abertura do AOF.
#[derive(Debug, thiserror::Error)]
pub enum RedstoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("AOF ilegível em {path}: {source}")]
    Replay {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias.
pub type RedstoreResult<T> = Result<T, RedstoreError>;

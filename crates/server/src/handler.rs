use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tracing::{debug, error};

use redstore_common::{CommandError, ConnectionError, StorageError};
use redstore_protocol::{Command, Reply};
use redstore_storage::Store;

use crate::Connection;

/// Loop principal de tratamento de uma conexão.
pub async fn handle_connection(
    mut conn: Connection,
    store: Store,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let line = tokio::select! {
            result = conn.read_line() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let line = match line {
            Some(l) => l,
            None => return Ok(()), // EOF
        };

        // Entrada malformada nunca chega ao store nem ao AOF
        let reply = match Command::from_line(&line) {
            Ok(cmd) => {
                debug!("comando recebido: {cmd:?}");
                execute_command(&cmd, &store).await
            }
            Err(e) => Reply::error(e),
        };

        conn.write_reply(&reply).await?;
    }
}

/// Executa um comando e retorna a resposta. Erros do store viram `ERR`.
pub async fn execute_command(cmd: &Command, store: &Store) -> Reply {
    match cmd {
        Command::Get(key) => match store.get(key).await {
            Some(value) => Reply::Value(value),
            None => Reply::Nil,
        },
        Command::Set { key, value } => persisted(store.set(key.clone(), value.clone(), None).await),
        Command::Expire {
            key,
            value,
            seconds,
        } => match SystemTime::now().checked_add(Duration::from_secs(*seconds)) {
            Some(at) => persisted(store.set(key.clone(), value.clone(), Some(at)).await),
            None => out_of_range(*seconds),
        },
        Command::ExpireAt { key, value, at_ms } => {
            match UNIX_EPOCH.checked_add(Duration::from_millis(*at_ms)) {
                Some(at) => persisted(store.set(key.clone(), value.clone(), Some(at)).await),
                None => out_of_range(*at_ms),
            }
        }
        Command::Del(key) => persisted(store.delete(key).await),
        Command::RPush { key, value } => persisted(store.list_push(key, value.clone()).await),
        Command::LPop(key) => match store.list_pop(key).await {
            Ok(Some(value)) => Reply::Value(value),
            Ok(None) => Reply::Nil,
            Err(e) => storage_failure(e),
        },
        Command::HMSet { key, pairs } => persisted(store.field_set(key, pairs.clone()).await),
        Command::HMGet { key, fields } => {
            let found = store.field_get(key, fields).await;
            if found.is_empty() {
                Reply::Nil
            } else {
                Reply::Pairs(found)
            }
        }
        Command::Exit => Reply::error("EXIT só é aceito no console local"),
        Command::Unknown(name) => Reply::error(CommandError::Unknown(name.clone())),
    }
}

fn persisted(result: Result<(), StorageError>) -> Reply {
    match result {
        Ok(()) => Reply::Ok,
        Err(e) => storage_failure(e),
    }
}

fn storage_failure(e: StorageError) -> Reply {
    error!("escrita rejeitada: {e}");
    Reply::error(e)
}

fn out_of_range(n: u64) -> Reply {
    Reply::error(CommandError::InvalidArgument(format!(
        "expiração '{n}' fora do intervalo"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use redstore_storage::FsyncPolicy;
    use tempfile::tempdir;

    async fn run(store: &Store, line: &str) -> Reply {
        match Command::from_line(line) {
            Ok(cmd) => execute_command(&cmd, store).await,
            Err(e) => Reply::error(e),
        }
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = Store::new();
        assert_eq!(run(&store, "SET k v").await, Reply::Ok);
        assert_eq!(run(&store, "GET k").await, Reply::Value("v".into()));
    }

    #[tokio::test]
    async fn del_then_get() {
        let store = Store::new();
        run(&store, "SET k v").await;
        assert_eq!(run(&store, "DEL k").await, Reply::Ok);
        assert_eq!(run(&store, "GET k").await, Reply::Nil);
    }

    #[tokio::test]
    async fn expire_zero_is_gone_after_delay() {
        let store = Store::new();
        assert_eq!(run(&store, "EXPIRE k v 0").await, Reply::Ok);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(run(&store, "GET k").await, Reply::Nil);
    }

    #[tokio::test]
    async fn expire_keeps_value_until_deadline() {
        let store = Store::new();
        assert_eq!(run(&store, "EXPIRE k v 60").await, Reply::Ok);
        assert_eq!(run(&store, "GET k").await, Reply::Value("v".into()));
    }

    #[tokio::test]
    async fn expire_invalid_seconds() {
        let store = Store::new();
        assert!(run(&store, "EXPIRE k v abc").await.is_error());
        assert!(run(&store, "EXPIRE k v -1").await.is_error());
        assert!(run(&store, &format!("EXPIRE k v {}", u64::MAX)).await.is_error());
        assert_eq!(run(&store, "GET k").await, Reply::Nil);
    }

    #[tokio::test]
    async fn list_push_pop() {
        let store = Store::new();
        assert_eq!(run(&store, "RPUSH l a").await, Reply::Ok);
        assert_eq!(run(&store, "RPUSH l b").await, Reply::Ok);
        assert_eq!(run(&store, "LPOP l").await, Reply::Value("a".into()));
        assert_eq!(run(&store, "LPOP l").await, Reply::Value("b".into()));
        assert_eq!(run(&store, "LPOP l").await, Reply::Nil);
    }

    #[tokio::test]
    async fn hmset_hmget_omits_missing() {
        let store = Store::new();
        assert_eq!(run(&store, "HMSET h f1 v1 f2 v2").await, Reply::Ok);
        assert_eq!(
            run(&store, "HMGET h f1 f3").await,
            Reply::Pairs(vec![("f1".into(), "v1".into())])
        );
        assert_eq!(run(&store, "HMGET h f3").await, Reply::Nil);
    }

    #[tokio::test]
    async fn unknown_and_exit_are_errors() {
        let store = Store::new();
        assert!(run(&store, "FLUSHALL").await.is_error());
        assert!(run(&store, "EXIT").await.is_error());
        assert!(run(&store, "").await.is_error());
    }

    #[tokio::test]
    async fn malformed_commands_leave_log_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.aof");
        let store = Store::open(&path, FsyncPolicy::Always).await.unwrap();

        for line in [
            "SET onlyonearg",
            "SET k v extra",
            "EXPIRE k v soon",
            "HMSET h f1",
            "DEL",
            "RPUSH l",
            "NOPE a b",
        ] {
            assert!(run(&store, line).await.is_error(), "{line}");
        }
        // Leituras também não são registradas
        run(&store, "GET k").await;
        run(&store, "HMGET h f1").await;

        assert_eq!(run(&store, "GET k").await, Reply::Nil);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn expire_is_logged_as_absolute_deadline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("expire.aof");
        let store = Store::open(&path, FsyncPolicy::Always).await.unwrap();

        run(&store, "EXPIRE k v 60").await;
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("EXPIREAT k v "), "{contents}");
    }

    #[test]
    fn log_failure_becomes_error_reply() {
        let io_err = std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full");
        let reply = persisted(Err(StorageError::Aof(io_err)));
        assert!(reply.is_error());
        assert!(reply.to_string().starts_with("ERR falha ao gravar no AOF"), "{reply}");
        assert_eq!(persisted(Ok(())), Reply::Ok);
    }
}

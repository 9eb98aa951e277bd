use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tracing::{debug, info};

use redstore_common::{RedstoreResult, StorageError};
use redstore_protocol::Command;

use crate::aof::{AofLog, FsyncPolicy, replay_aof};
use crate::entry::{Entry, ListValue};

/// Separador entre chave e campo nas entradas criadas por HMSET.
///
/// O tokenizador não separa em `\x1f`, então `GET h\x1ff` enxerga o campo
/// `f` de `h`. Colisão entre chave escalar e campo é possível.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Estado protegido pelo lock. Escalares e listas são namespaces
/// independentes: a mesma chave pode existir nos dois.
#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    lists: HashMap<String, ListValue>,
    /// `None` durante o replay: nada é registrado de novo.
    aof: Option<AofLog>,
}

impl State {
    fn get(&self, key: &str, now: SystemTime) -> Option<&str> {
        self.strings
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.as_str())
    }

    /// Aplica um registro. Caminho único para escrita ao vivo e replay.
    fn apply(&mut self, cmd: &Command) -> Option<String> {
        match cmd {
            Command::Set { key, value } => {
                self.strings
                    .insert(key.clone(), Entry::new(value.clone(), None));
                None
            }
            Command::ExpireAt { key, value, at_ms } => {
                let expires_at = from_unix_ms(*at_ms);
                self.strings
                    .insert(key.clone(), Entry::new(value.clone(), expires_at));
                None
            }
            Command::Del(key) => {
                self.strings.remove(key);
                None
            }
            Command::RPush { key, value } => {
                self.lists.entry(key.clone()).or_default().push(value.clone());
                None
            }
            Command::LPop(key) => self.lists.get_mut(key).and_then(ListValue::pop),
            Command::HMSet { key, pairs } => {
                for (field, value) in pairs {
                    self.strings
                        .insert(field_key(key, field), Entry::new(value.clone(), None));
                }
                None
            }
            _ => {
                debug!("comando {} não altera o store", cmd.name());
                None
            }
        }
    }
}

/// Handle para o store in-memory. Clonar compartilha o mesmo estado.
#[derive(Clone)]
pub struct Store {
    shared: Arc<RwLock<State>>,
}

impl Store {
    /// Store vazio, sem AOF.
    pub fn new() -> Self {
        Store {
            shared: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Reconstrói o estado a partir do AOF e passa a registrar nele.
    pub async fn open(path: impl AsRef<Path>, policy: FsyncPolicy) -> RedstoreResult<Self> {
        let path = path.as_ref();
        let store = Store::new();

        // Ninguém mais enxerga o store aqui, e sem AOF anexado o replay não grava
        replay_aof(path, &store).await?;

        let log = AofLog::open(path, policy)
            .await
            .map_err(StorageError::Aof)?;
        store.shared.write().await.aof = Some(log);
        Ok(store)
    }

    // --- Escalares ---

    pub async fn get(&self, key: &str) -> Option<String> {
        let state = self.shared.read().await;
        state.get(key, SystemTime::now()).map(str::to_string)
    }

    /// Sobrescreve a entrada. Com `expires_at`, o registro no AOF leva o
    /// prazo absoluto (EXPIREAT), em milissegundos.
    pub async fn set(
        &self,
        key: String,
        value: String,
        expires_at: Option<SystemTime>,
    ) -> Result<(), StorageError> {
        let cmd = match expires_at {
            Some(at) => Command::ExpireAt {
                key,
                value,
                at_ms: to_unix_ms(at),
            },
            None => Command::Set { key, value },
        };
        self.write(cmd).await.map(|_| ())
    }

    /// Remove a entrada. Registrado mesmo se a chave não existia.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.write(Command::Del(key.to_string())).await.map(|_| ())
    }

    // --- Listas ---

    pub async fn list_push(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.write(Command::RPush {
            key: key.to_string(),
            value,
        })
        .await
        .map(|_| ())
    }

    /// `None` se a lista não existe ou está vazia.
    pub async fn list_pop(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.write(Command::LPop(key.to_string())).await
    }

    // --- Campos (hash achatado sobre escalares) ---

    pub async fn field_set(
        &self,
        key: &str,
        pairs: Vec<(String, String)>,
    ) -> Result<(), StorageError> {
        self.write(Command::HMSet {
            key: key.to_string(),
            pairs,
        })
        .await
        .map(|_| ())
    }

    /// Campos sem valor ficam fora do resultado.
    pub async fn field_get(&self, key: &str, fields: &[String]) -> Vec<(String, String)> {
        let state = self.shared.read().await;
        let now = SystemTime::now();
        fields
            .iter()
            .filter_map(|field| {
                state
                    .get(&field_key(key, field), now)
                    .map(|value| (field.clone(), value.to_string()))
            })
            .collect()
    }

    /// Força flush + fsync do AOF, se houver.
    pub async fn sync_log(&self) -> std::io::Result<()> {
        let mut state = self.shared.write().await;
        if let Some(aof) = state.aof.as_mut() {
            aof.sync().await?;
            info!("AOF sincronizado: {:?}", aof.path());
        }
        Ok(())
    }

    pub async fn is_logging(&self) -> bool {
        self.shared.read().await.aof.is_some()
    }

    /// Aplica sem registrar no AOF (replay).
    pub(crate) async fn apply(&self, cmd: &Command) -> Option<String> {
        self.shared.write().await.apply(cmd)
    }

    /// Registro e mutação na mesma seção crítica. O registro vem antes:
    /// se o append falha, a memória não muda.
    async fn write(&self, cmd: Command) -> Result<Option<String>, StorageError> {
        let mut state = self.shared.write().await;
        if let Some(aof) = state.aof.as_mut() {
            aof.append(&cmd).await?;
        }
        Ok(state.apply(&cmd))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn field_key(key: &str, field: &str) -> String {
    let mut composite = String::with_capacity(key.len() + field.len() + 1);
    composite.push_str(key);
    composite.push(FIELD_SEPARATOR);
    composite.push_str(field);
    composite
}

fn to_unix_ms(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn from_unix_ms(ms: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(Duration::from_millis(ms))
}

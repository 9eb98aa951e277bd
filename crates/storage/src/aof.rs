use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use redstore_common::{RedstoreError, RedstoreResult};
use redstore_protocol::{Command, decode_line};

use crate::Store;

/// Política de fsync. Em ambas o registro é entregue ao SO antes do append retornar.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    /// `sync_data` após cada append.
    #[default]
    Always,
    /// Sem fsync explícito (deixa pro OS).
    No,
}

/// Handle de escrita do AOF. Pertence a um único `Store`.
pub struct AofLog {
    writer: BufWriter<File>,
    path: PathBuf,
    policy: FsyncPolicy,
    /// Tamanho do arquivo até o último registro completo.
    committed: u64,
    /// Um append falhou e o arquivo ainda não foi cortado de volta.
    torn: bool,
}

impl AofLog {
    /// Abre (ou cria) o arquivo para append.
    pub async fn open(path: impl Into<PathBuf>, policy: FsyncPolicy) -> std::io::Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await?;

        // Um registro rasgado no final precisa de terminador, senão o
        // próximo append se funde a ele.
        let mut committed = file.metadata().await?.len();
        if committed > 0 {
            file.seek(SeekFrom::End(-1)).await?;
            if file.read_u8().await? != b'\n' {
                warn!("AOF: último registro sem terminador em {path:?}, completando linha");
                file.write_all(b"\n").await?;
                file.sync_data().await?;
                committed += 1;
            }
        }

        info!("AOF aberto para append: {path:?} (fsync {policy:?})");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            policy,
            committed,
            torn: false,
        })
    }

    /// Grava um registro e só retorna depois do flush.
    ///
    /// Se falhar, o que chegou ao disco é cortado de volta ao último registro
    /// completo. Enquanto o corte não der certo, novos appends são recusados.
    pub async fn append(&mut self, cmd: &Command) -> std::io::Result<()> {
        if self.torn {
            self.truncate_torn().await?;
        }

        let mut buf = BytesMut::new();
        cmd.encode(&mut buf);

        if let Err(e) = self.write_record(&buf).await {
            self.torn = true;
            warn!("AOF: falha no append de {}: {e}", cmd.name());
            if let Err(repair) = self.truncate_torn().await {
                warn!("AOF: não foi possível cortar registro parcial: {repair}");
            }
            return Err(e);
        }

        self.committed += buf.len() as u64;
        Ok(())
    }

    async fn write_record(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(buf).await?;
        self.writer.flush().await?;

        if self.policy == FsyncPolicy::Always {
            self.writer.get_ref().sync_data().await?;
        }
        Ok(())
    }

    /// Reabre o arquivo e descarta bytes além de `committed`. O `BufWriter`
    /// antigo é descartado junto com o que ainda tinha em buffer.
    async fn truncate_torn(&mut self) -> std::io::Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.set_len(self.committed).await?;
        file.sync_data().await?;

        self.writer = BufWriter::new(file);
        self.torn = false;
        debug!("AOF cortado de volta para {} bytes", self.committed);
        Ok(())
    }

    /// Flush + fsync completo, independente da política.
    pub async fn sync(&mut self) -> std::io::Result<()> {
        if self.torn {
            self.truncate_torn().await?;
        }
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resultado de um replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Lê o arquivo AOF e re-aplica os registros no Store, sem registrar de novo.
///
/// Arquivo inexistente é um store vazio. Arquivo ilegível é erro fatal.
/// Linhas inválidas são ignoradas: o formato não tem checksum para
/// distinguir registro corrompido de vocabulário antigo.
pub async fn replay_aof(path: &Path, store: &Store) -> RedstoreResult<ReplayStats> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("arquivo AOF não encontrado, iniciando sem dados");
            return Ok(ReplayStats::default());
        }
        Err(source) => {
            return Err(RedstoreError::Replay {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let mut stats = ReplayStats::default();

    // A última linha pode não ter terminador; entra como registro normal.
    for (i, raw) in data.split(|&b| b == b'\n').enumerate() {
        let line_no = i + 1;
        let line = match decode_line(raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("AOF linha {line_no}: {e}, ignorada");
                stats.skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match Command::from_line(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("AOF linha {line_no}: comando inválido ignorado: {e}");
                stats.skipped += 1;
                continue;
            }
        };

        if !is_write_command(&cmd) {
            debug!("AOF linha {line_no}: {} ignorado no replay", cmd.name());
            stats.skipped += 1;
            continue;
        }

        store.apply(&cmd).await;
        stats.applied += 1;
    }

    info!(
        "AOF replay completo: {} comandos restaurados, {} ignorados",
        stats.applied, stats.skipped
    );
    Ok(stats)
}

/// Determina se um comando é gravado no AOF (e portanto re-aplicado no replay).
///
/// EXPIRE relativo não entra: é gravado como EXPIREAT com prazo absoluto.
pub fn is_write_command(cmd: &Command) -> bool {
    matches!(
        cmd,
        Command::Set { .. }
            | Command::ExpireAt { .. }
            | Command::Del(_)
            | Command::RPush { .. }
            | Command::LPop(_)
            | Command::HMSet { .. }
    )
}

#[cfg(test)]
impl AofLog {
    /// Troca o handle de escrita por um somente-leitura: o próximo flush falha.
    pub(crate) async fn make_unwritable(&mut self) -> std::io::Result<()> {
        self.writer = BufWriter::new(File::open(&self.path).await?);
        Ok(())
    }
}

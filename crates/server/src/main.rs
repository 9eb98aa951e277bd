use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use redstore_common::{DEFAULT_AOF_PATH, DEFAULT_HOST, DEFAULT_PORT, MAX_CONNECTIONS};
use redstore_server::{console, serve};
use redstore_storage::{FsyncPolicy, Store};

#[derive(Parser, Debug)]
#[command(name = "redstore-server", about = "redstore — key-value store in-memory com AOF")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
    #[arg(long, value_name = "FILE", default_value = DEFAULT_AOF_PATH)]
    aof: PathBuf,
    #[arg(long, default_value = "always", value_parser = parse_fsync)]
    fsync: FsyncPolicy,
    /// Não abre o console em stdin (modo daemon)
    #[arg(long)]
    no_console: bool,
}

fn parse_fsync(s: &str) -> Result<FsyncPolicy, String> {
    match s.to_lowercase().as_str() {
        "always" => Ok(FsyncPolicy::Always),
        "no" => Ok(FsyncPolicy::No),
        _ => Err(format!("valor inválido: '{s}'. Use: always, no")),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redstore_server=info,redstore_storage=info".into()),
        )
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));

    // A leitura bloqueante de stdin não pode ser cancelada; não esperar por ela
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let addr = format!("{}:{}", args.host, args.port);

    // Falha no replay ou na abertura do AOF impede o servidor de subir
    let store = Store::open(&args.aof, args.fsync).await?;

    let listener = TcpListener::bind(&addr).await?;
    let server = serve(listener, store.clone(), args.max_connections, shutdown_signal());

    if args.no_console {
        server.await?;
    } else {
        let stdin = BufReader::new(tokio::io::stdin());
        tokio::select! {
            result = server => result?,
            result = console::run(stdin, tokio::io::stdout(), &store) => result?,
        }
    }

    store.sync_log().await?;
    info!("redstore encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("falha ao escutar ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal recebido");
}

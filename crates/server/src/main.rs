use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use memorydb_server::{ServerArgs, router};
use memorydb_storage::Db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.default_log_filter().into()),
        )
        .init();

    // Replay do log (se configurado) antes de aceitar conexões
    let db = Db::open(args.store_config()).await?;
    if let Some(ref dir) = args.data_dir {
        info!("persistência ligada em {:?}: {} chaves carregadas", dir, db.len());
    }

    let addr = args.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("MemoryDB escutando em {addr}");

    axum::serve(listener, router(db.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close();
    info!("MemoryDB encerrado");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal recebido"),
        Err(e) => {
            error!("não foi possível escutar o sinal de shutdown: {e}");
            std::future::pending::<()>().await;
        }
    }
}

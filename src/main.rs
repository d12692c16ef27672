use api::{clock::SystemClock, App};
use db::{Config, Database, Memory, NoTls, Store};
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use std::{
    convert::Infallible,
    env,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::{net::TcpListener, runtime::Runtime};

async fn serve<S: Store + 'static>(listener: TcpListener, app: App<S, SystemClock>) -> anyhow::Result<()> {
    let app = Arc::new(app);
    let mut stop = core::pin::pin!(tokio::signal::ctrl_c());
    loop {
        let (stream, peer) = tokio::select! {
            biased;
            _ = &mut stop => break,
            accepted = listener.accept() => accepted?,
        };

        let app = app.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let app = app.clone();
                async move { Ok::<_, Infallible>(api::respond(&app, req).await) }
            });
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::error!("Connection with {peer} failed: {err}");
            }
        });
    }

    log::info!("Shutting down...");
    Ok(())
}

async fn run(port: u16, postgres: Option<Config>) -> anyhow::Result<()> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on {addr}.");

    let Some(config) = postgres else {
        log::warn!("PG_HOSTNAME is not set. Quizzes will only live in memory.");
        return serve(listener, App::new(Memory::default(), SystemClock)).await;
    };

    let (client, conn) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            log::error!("Database connection closed: {err}");
        }
    });

    let db = Database::from(client);
    db.init().await.map_err(|err| anyhow::anyhow!("cannot initialize the schema: {err}"))?;
    log::info!("Connected to the database.");
    serve(listener, App::new(db, SystemClock)).await
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse environment variables
    let port: u16 = env::var("PORT")?.parse()?;
    let postgres = match env::var("PG_HOSTNAME") {
        Ok(host) => {
            let user = env::var("PG_USERNAME")?;
            let pass = env::var("PG_PASSWORD")?;
            let data = env::var("PG_DATABASE")?;
            let mut config = Config::new();
            config.user(&user).password(&pass).host(&host).dbname(&data);
            Some(config)
        }
        _ => None,
    };

    let runtime = Runtime::new()?;
    runtime.block_on(run(port, postgres))
}

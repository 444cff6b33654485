use anyhow::Result;
use dbdesk_config::Config;
use dbdesk_server::DbdeskServer;

pub async fn handle(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    read_only: bool,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.server.read_only |= read_only;

    println!(
        "Starting dbdesk on {}:{}",
        config.server.host, config.server.port
    );
    DbdeskServer::serve(config).await
}

use anyhow::Context;
use pvault::domain::config::ApiConfig;
use pvault::kernel::config::load_config;
use pvault_server::{Server, init_logger};

#[pvault_runtime::main(server)]
async fn main() -> anyhow::Result<()> {
    let cfg: ApiConfig =
        load_config(Some("server")).context("Critical: Configuration is malformed")?;
    let _log = init_logger(&cfg.log)?;

    Server::builder().config(cfg).build().await?.run().await
}

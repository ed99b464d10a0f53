#[macro_use]
extern crate rocket;

mod api;
mod config;
mod db;

use config::Config;
use cryptopoll::{Coordinator, ElGamal};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store = db::open(&config)?;
    let coordinator = Coordinator::new(store, ElGamal::default());

    let _rocket = api::build(coordinator)
        .configure(config.rocket())
        .launch()
        .await?;

    Ok(())
}

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use model::store::Gateway;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod voting;

/// Routes, catchers and the fairings every instance needs, without a store.
fn base(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
}

/// Build a rocket backed by the MongoDB database named in the config.
pub fn build() -> Rocket<Build> {
    base(rocket::Config::figment()).attach(DatabaseFairing)
}

/// Build a rocket over an already constructed store.
pub fn rocket_for_store(figment: Figment, store: Gateway) -> Rocket<Build> {
    base(figment).manage(store)
}

use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    mongodb::ensure_indexes_exist,
    store::{Gateway, MongoStore},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    login_url: String,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Where unauthenticated users are sent to sign in with the identity provider.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Secret shared with the identity provider, used to verify its JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: String,
}

fn default_db_name() -> String {
    "voting".to_string()
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the indexes exist, and places a [`Gateway`] over it into managed
/// state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // The unique vote index is what actually prevents double voting.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(Gateway::new(MongoStore::new(&db)));
        Ok(rocket)
    }
}

#[cfg(test)]
pub const TEST_LOGIN_URL: &str = "https://id.example.test/login";

#[cfg(test)]
const TEST_JWT_SECRET: &str = "test secret shared with the identity provider";

/// Configuration for local test clients.
#[cfg(test)]
pub fn test_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("login_url", TEST_LOGIN_URL))
        .merge(("jwt_secret", TEST_JWT_SECRET))
        .merge(("log_level", "off"))
}

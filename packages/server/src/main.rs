#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Development server for the occurrence API.

use dataplane_server::{ServerSettings, run_server};

#[actix_web::main]
async fn main() -> Result<(), dataplane_server::ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    run_server(ServerSettings::from_env()).await
}

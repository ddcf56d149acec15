pub mod board;
pub mod dispatch;
pub mod ids;
pub mod limits;
pub mod mdns;
pub mod presence;
pub mod protocol;
pub mod rate_limit;
pub mod registry;
pub mod room;
pub mod routes;
pub mod session;

use std::sync::Arc;

use limits::ServerConfig;
use registry::RoomRegistry;
use rocket::figment::Figment;
use rocket_cors::CorsOptions;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    build_rocket(rocket::Config::figment(), ServerConfig::from_env())
}

pub fn rocket_with_config(config: ServerConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(rocket::Config::figment(), config)
}

pub fn rocket_with_figment(figment: Figment, config: ServerConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(figment, config)
}

fn build_rocket(figment: Figment, config: ServerConfig) -> rocket::Rocket<rocket::Build> {
    let registry = Arc::new(RoomRegistry::new(&config));
    let sweeper_registry = registry.clone();
    let mdns_registry = registry.clone();

    let cors = CorsOptions::default()
        .to_cors()
        .expect("Failed to create CORS");

    rocket::custom(figment)
        .manage(config)
        .manage(registry)
        .attach(cors)
        .mount(
            "/",
            rocket::routes![
                routes::health,
                routes::stats,
                routes::list_rooms,
                routes::get_room,
                routes::whiteboard_ws,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Room Sweeper", {
            move |_rocket| {
                Box::pin(async move {
                    registry::spawn_sweeper(sweeper_registry);
                    println!("🧹 Room sweeper started");
                })
            }
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("LAN Discovery", {
            move |rocket| {
                Box::pin(async move {
                    mdns::spawn_advertiser(rocket.config().port, mdns_registry);
                })
            }
        }))
}

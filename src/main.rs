use std::env;

use sketchboard::limits::ServerConfig;

/// Default bind port when neither a CLI argument nor `PORT` is set.
const DEFAULT_PORT: u16 = 8080;

#[rocket::main]
async fn main() {
    let port = match resolve_port() {
        Ok(port) => port,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", port));

    println!("🎨 sketchboard listening on 0.0.0.0:{port}");

    if let Err(e) = sketchboard::rocket_with_figment(figment, ServerConfig::from_env())
        .launch()
        .await
    {
        eprintln!("❌ Server failed: {e}");
        std::process::exit(1);
    }
}

/// First CLI argument wins, then `PORT`, then the default.
fn resolve_port() -> Result<u16, String> {
    if let Some(arg) = env::args().nth(1) {
        return arg
            .parse()
            .map_err(|_| format!("invalid port argument: {arg}"));
    }
    if let Ok(val) = env::var("PORT") {
        return val.parse().map_err(|_| format!("invalid PORT value: {val}"));
    }
    Ok(DEFAULT_PORT)
}

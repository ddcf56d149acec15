use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;

use sketchboard::limits::ServerConfig;

fn test_client() -> Client {
    let rocket = sketchboard::rocket_with_config(ServerConfig::default());
    Client::tracked(rocket).expect("valid rocket instance")
}

// --- Health ---

#[test]
fn test_health() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.content_type(), Some(ContentType::Plain));
    assert_eq!(res.into_string().unwrap(), "OK");
}

// --- Stats ---

#[test]
fn test_stats() {
    let client = test_client();
    let res = client.get("/api/v1/stats").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["service"], "sketchboard");
    assert_eq!(body["rooms"], 0);
    assert_eq!(body["users"], 0);
    assert_eq!(body["strokes"], 0);
}

// --- Room directory ---

#[test]
fn test_list_rooms_empty() {
    let client = test_client();
    let res = client.get("/api/v1/rooms").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let rooms: Vec<serde_json::Value> = res.into_json().unwrap();
    assert!(rooms.is_empty());
}

#[test]
fn test_list_rooms_reflects_registry() {
    let client = test_client();
    {
        use sketchboard::registry::RoomRegistry;
        use std::sync::Arc;

        let registry = client
            .rocket()
            .state::<Arc<RoomRegistry>>()
            .expect("registry managed");
        registry.get_or_create("room-1", Some("p"));
    }

    let res = client.get("/api/v1/rooms").dispatch();
    let rooms: Vec<serde_json::Value> = res.into_json().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["roomId"], "room-1");
    assert_eq!(rooms[0]["hasPassword"], true);
    assert_eq!(rooms[0]["users"], 0);

    let res = client.get("/api/v1/rooms/room-1").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["roomId"], "room-1");
    assert_eq!(body["users"], serde_json::json!([]));
}

#[test]
fn test_get_room_not_found() {
    let client = test_client();
    let res = client.get("/api/v1/rooms/nonexistent-id").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

// --- LAN discovery ---

#[test]
fn test_mdns_txt_carries_live_counters() {
    use sketchboard::registry::RoomRegistry;

    let registry = RoomRegistry::new(&ServerConfig::default());
    registry.get_or_create("room-1", None);
    registry.get_or_create("room-2", None);

    let txt = sketchboard::mdns::txt_properties(&registry);
    assert_eq!(txt.get("path").map(String::as_str), Some("/ws"));
    assert_eq!(txt.get("protocol").map(String::as_str), Some("ws"));
    assert_eq!(txt.get("rooms").map(String::as_str), Some("2"));
    assert_eq!(txt.get("users").map(String::as_str), Some("0"));
    assert!(txt.contains_key("version"));
}

//! LAN discovery. The server announces itself as `_sketchboard._tcp` so
//! clients on the same network can list live boards without typing an
//! address. The TXT record carries the WebSocket path plus current
//! room/user counts, republished on a timer while the server runs.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceInfo};

use crate::registry::RoomRegistry;

const SERVICE_TYPE: &str = "_sketchboard._tcp.local.";

/// Seconds between TXT republishes carrying updated counters.
const REFRESH_INTERVAL_SECS: u64 = 60;

pub fn service_type() -> &'static str {
    SERVICE_TYPE
}

/// False only when `MDNS_ENABLED` is explicitly `0` or `false`.
pub fn enabled() -> bool {
    match env::var("MDNS_ENABLED") {
        Ok(v) => {
            let v = v.to_lowercase();
            v != "0" && v != "false"
        }
        Err(_) => true,
    }
}

/// TXT payload: static service facts plus live registry counters, so a
/// discovery browser can show how busy each board is before connecting.
pub fn txt_properties(registry: &RoomRegistry) -> HashMap<String, String> {
    HashMap::from([
        ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ("path".to_string(), "/ws".to_string()),
        ("protocol".to_string(), "ws".to_string()),
        ("rooms".to_string(), registry.room_count().to_string()),
        ("users".to_string(), registry.total_members().to_string()),
    ])
}

/// One registered advertisement. Publishing again under the same fullname
/// replaces the TXT record in place.
pub struct Advertiser {
    daemon: ServiceDaemon,
    instance_name: String,
    host: String,
    ip: String,
    port: u16,
    fullname: String,
}

impl Advertiser {
    pub fn start(
        port: u16,
        instance_name: &str,
        registry: &RoomRegistry,
    ) -> Result<Self, String> {
        let daemon = ServiceDaemon::new().map_err(|e| format!("mDNS daemon: {e}"))?;

        let ip = local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| "127.0.0.1".to_string());

        let mut advertiser = Self {
            daemon,
            instance_name: instance_name.to_string(),
            host: local_host_fqdn(),
            ip,
            port,
            fullname: String::new(),
        };
        advertiser.fullname = advertiser.publish(registry)?;
        Ok(advertiser)
    }

    /// Republish with fresh counters.
    pub fn refresh(&self, registry: &RoomRegistry) -> Result<(), String> {
        self.publish(registry).map(|_| ())
    }

    fn publish(&self, registry: &RoomRegistry) -> Result<String, String> {
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            &self.instance_name,
            &self.host,
            &self.ip,
            self.port,
            Some(txt_properties(registry)),
        )
        .map_err(|e| format!("mDNS service info: {e}"))?;

        let fullname = info.get_fullname().to_string();
        self.daemon
            .register(info)
            .map_err(|e| format!("mDNS register: {e}"))?;
        Ok(fullname)
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }
}

impl Drop for Advertiser {
    fn drop(&mut self) {
        let _ = self.daemon.unregister(&self.fullname);
        let _ = self.daemon.shutdown();
    }
}

/// Advertise and keep the counters fresh. The spawned task owns the
/// [`Advertiser`], so the registration lives exactly as long as the
/// process serves connections.
pub fn spawn_advertiser(port: u16, registry: Arc<RoomRegistry>) {
    if !enabled() {
        println!("📡 LAN discovery off (MDNS_ENABLED=false)");
        return;
    }

    let instance_name =
        env::var("MDNS_INSTANCE_NAME").unwrap_or_else(|_| "sketchboard".to_string());

    tokio::spawn(async move {
        let advertiser = match Advertiser::start(port, &instance_name, &registry) {
            Ok(a) => {
                println!("📡 LAN discovery: {} on port {port}", a.fullname());
                a
            }
            Err(e) => {
                eprintln!("⚠️  LAN discovery unavailable: {e}; WebSocket serving unaffected");
                return;
            }
        };

        loop {
            tokio::time::sleep(Duration::from_secs(REFRESH_INTERVAL_SECS)).await;
            if let Err(e) = advertiser.refresh(&registry) {
                eprintln!("⚠️  mDNS republish failed: {e}");
            }
        }
    });
}

fn local_host_fqdn() -> String {
    let name = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    let base = name.trim_end_matches('.');
    if base.ends_with(".local") {
        format!("{base}.")
    } else {
        format!("{base}.local.")
    }
}

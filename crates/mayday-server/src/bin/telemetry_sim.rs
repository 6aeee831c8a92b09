//! Loopback jacket telemetry backend for development and demos.
//!
//! Serves `GET /api/location/{jacket_id}` with a random-walk position and
//! jittered vitals per jacket, so a mayday-server pointed at it sees a
//! jacket that wanders and occasionally skips sensor fields, the way real
//! firmware does.
//!
//! Run with: cargo run --bin telemetry-sim -p mayday-server
//!
//! Environment:
//! - `MAYDAY_SIM_PORT` - port to listen on (default 4000)
//! - `MAYDAY_SIM_LAT` / `MAYDAY_SIM_LNG` - starting position
//!   (default 28.6139, 77.2090)

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use mayday_core::TelemetryFrame;
use rand::Rng;
use tokio::net::TcpListener;
use tracing::info;

/// One simulated jacket.
#[derive(Debug, Clone, Copy)]
struct JacketSim {
    lat: f64,
    lng: f64,
    spo2: f64,
    pulse: f64,
    temperature: f64,
}

impl JacketSim {
    const fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            spo2: 97.0,
            pulse: 80.0,
            temperature: 36.8,
        }
    }

    /// Advances the walk one step and emits a frame. Each vitals field is
    /// dropped from the frame roughly one request in five, exercising the
    /// consumer's partial-merge path.
    fn step(&mut self, rng: &mut impl Rng) -> TelemetryFrame {
        // ~±50 m per step
        self.lat += rng.gen_range(-0.000_45..0.000_45);
        self.lng += rng.gen_range(-0.000_45..0.000_45);
        self.spo2 = (self.spo2 + rng.gen_range(-0.5..0.5)).clamp(90.0, 100.0);
        self.pulse = (self.pulse + rng.gen_range(-3.0..3.0)).clamp(50.0, 140.0);
        self.temperature = (self.temperature + rng.gen_range(-0.1..0.1)).clamp(35.0, 40.0);

        TelemetryFrame {
            lat: Some(self.lat),
            lng: Some(self.lng),
            spo2: rng.gen_bool(0.8).then_some(round1(self.spo2)),
            pulse: rng.gen_bool(0.8).then_some(round1(self.pulse)),
            temperature: rng.gen_bool(0.8).then_some(round1(self.temperature)),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Jackets keyed by id, created on first request.
type Jackets = Arc<Mutex<HashMap<String, JacketSim>>>;

#[derive(Clone)]
struct SimState {
    jackets: Jackets,
    start: (f64, f64),
}

async fn serve_frame(
    State(state): State<SimState>,
    Path(jacket_id): Path<String>,
) -> Json<TelemetryFrame> {
    let mut jackets = state
        .jackets
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let jacket = jackets
        .entry(jacket_id)
        .or_insert_with(|| JacketSim::at(state.start.0, state.start.1));
    Json(jacket.step(&mut rand::thread_rng()))
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().compact().init();

    let port: u16 = std::env::var("MAYDAY_SIM_PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(4000);
    let start = (
        env_f64("MAYDAY_SIM_LAT", 28.6139),
        env_f64("MAYDAY_SIM_LNG", 77.2090),
    );

    let state = SimState {
        jackets: Arc::new(Mutex::new(HashMap::new())),
        start,
    };

    let app = Router::new()
        .route("/api/location/{jacket_id}", get(serve_frame))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(lat = start.0, lng = start.1, "telemetry-sim listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_stays_near_start() {
        let mut jacket = JacketSim::at(28.6139, 77.2090);
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let frame = jacket.step(&mut rng);
            assert!(frame.lat.is_some());
            assert!(frame.lng.is_some());
        }

        // 100 steps of ±50 m stay well within a degree
        assert!((jacket.lat - 28.6139).abs() < 0.1);
        assert!((jacket.lng - 77.2090).abs() < 0.1);
        assert!((90.0..=100.0).contains(&jacket.spo2));
        assert!((50.0..=140.0).contains(&jacket.pulse));
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(36.8419), 36.8);
        assert_eq!(round1(97.96), 98.0);
    }
}

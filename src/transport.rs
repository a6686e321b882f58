use log::{info, warn};

use crate::form::Payload;

pub trait Transport {
    fn deliver(&mut self, payload: &Payload);
}

// Stand-in for the server call.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl Transport for ConsoleTransport {
    fn deliver(&mut self, payload: &Payload) {
        info!("Submitting sign-up with {} fields", payload.len());
        match serde_json::to_string_pretty(payload) {
            Ok(json) => println!("JSON: {}", json),
            Err(e) => warn!("Could not print payload: {}", e),
        }
    }
}

use std::{fs, path::Path, path::PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};

pub use cache::Cache;
pub use error::{RunError, ValidationError};
pub use form::{FormField, FormRecord, Payload};
pub use geocode::{AddressHint, Nominatim, ReverseGeocoder};
pub use location::{GeoFix, LocationResolver, LocationService, MonitorConfig, Position};
pub use session::{Alert, SignUpSession};
pub use transport::{ConsoleTransport, Transport};

pub mod cache;
pub mod error;
pub mod form;
pub mod geocode;
pub mod location;
pub mod session;
pub mod transport;

pub struct Options {
    // applied after the location lookup
    pub fields: Vec<(FormField, String)>,
    pub fixes: Vec<Position>,
    pub cache_dir: Option<PathBuf>,
    pub endpoint: String,
    pub user_agent: String,
}

pub fn run(options: Options) -> Result<Alert, RunError> {
    let mut geocoder = Nominatim::new(&options.user_agent).with_endpoint(&options.endpoint);
    if let Some(dir) = &options.cache_dir {
        geocoder = geocoder.with_cache(Cache::new(dir)?);
    }

    let mut session = SignUpSession::new();
    let mut resolver = LocationResolver::new(geocoder, MonitorConfig::default());
    let mut service = location::ReplayLocationService::new(options.fixes);

    let refreshed = fill_from_location(&mut session, &mut resolver, &mut service, Utc::now);
    for field in refreshed {
        println!("{}: {}", field, session.record().get(field).unwrap_or_default());
    }

    for (field, text) in &options.fields {
        session.edit(*field, text);
    }

    Ok(session.submit(&mut ConsoleTransport))
}

/// Drains the location service, pushing every resolved address into the
/// session. Returns the fields that changed, in update order.
pub fn fill_from_location<G, S, F>(
    session: &mut SignUpSession,
    resolver: &mut LocationResolver<G>,
    service: &mut S,
    now: F,
) -> Vec<FormField>
where
    G: ReverseGeocoder,
    S: LocationService,
    F: Fn() -> DateTime<Utc>,
{
    if let Err(e) = resolver.start(service) {
        warn!("Location unavailable: {}", e);
        return Vec::new();
    }

    let mut refreshed = Vec::new();
    while let Some(batch) = service.next_update() {
        let ticket = session.ticket();
        if let Some(fix) = resolver.handle_update(&batch, now()) {
            let updated = session.apply_address(ticket, &fix.address);
            debug!("Address from {:?} updated {:?}", fix.position, updated);
            refreshed.extend(updated);
        }
    }
    resolver.stop(service);
    refreshed
}

/// Reads recorded fixes: a JSON array of `{"lat", "lon", "timestamp"}`.
pub fn read_fixes(path: &Path) -> Result<Vec<Position>, RunError> {
    let contents = fs::read_to_string(path).map_err(|e| RunError::Fixes {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| RunError::Fixes {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

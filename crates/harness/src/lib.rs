pub mod fixture;
pub mod host;
pub mod recording;
pub mod spatial;

pub use fixture::{fixture_config, Fixture, PARCELS, ROADS};
pub use host::{Parcel, Parcels};
pub use recording::{RecordedStatement, RecordingStore, StatementKind};

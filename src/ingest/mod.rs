mod service;

pub use service::{IngestError, IngestOutcome, IngestService, NewActuatorAlert, NewReadings};

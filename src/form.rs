use std::{collections::BTreeMap, fmt};

use crate::error::{CodecError, ValidationError};

pub type Payload = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    FirstName,
    LastName,
    Street,
    City,
    State,
    Zip,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::FirstName,
        FormField::LastName,
        FormField::Street,
        FormField::City,
        FormField::State,
        FormField::Zip,
    ];

    /// Fields filled from a reverse geocoding result.
    pub const ADDRESS: [FormField; 3] = [FormField::City, FormField::State, FormField::Zip];

    pub fn key(self) -> &'static str {
        match self {
            FormField::FirstName => "firstname",
            FormField::LastName => "lastname",
            FormField::Street => "street",
            FormField::City => "city",
            FormField::State => "state",
            FormField::Zip => "zip",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub trait WireCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Payload, CodecError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec_pretty(payload)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The six sign-up fields. `None` means never entered, `Some("")` means
/// entered and left blank; both fail validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl FormRecord {
    pub fn new() -> FormRecord {
        FormRecord::default()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        let slot = match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Street => &self.street,
            FormField::City => &self.city,
            FormField::State => &self.state,
            FormField::Zip => &self.zip,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    pub fn clear(&mut self, field: FormField) {
        *self.slot_mut(field) = None;
    }

    fn slot_mut(&mut self, field: FormField) -> &mut Option<String> {
        match field {
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Street => &mut self.street,
            FormField::City => &mut self.city,
            FormField::State => &mut self.state,
            FormField::Zip => &mut self.zip,
        }
    }

    pub fn missing_fields(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| self.get(*field).map_or(true, str::is_empty))
            .collect()
    }

    pub fn try_serialize(&self) -> Result<Payload, ValidationError> {
        self.try_serialize_with(&JsonCodec)
    }

    // The payload is encoded and decoded again, so what comes back is what
    // the server would read.
    pub fn try_serialize_with<C: WireCodec>(&self, codec: &C) -> Result<Payload, ValidationError> {
        let mut payload = Payload::new();
        for field in FormField::ALL {
            match self.get(field) {
                Some(value) if !value.is_empty() => {
                    payload.insert(field.key().to_string(), value.to_string());
                }
                _ => return Err(ValidationError::IncompleteInput),
            }
        }

        let bytes = codec
            .encode(&payload)
            .map_err(ValidationError::SerializationFailure)?;
        codec
            .decode(&bytes)
            .map_err(ValidationError::SerializationFailure)
    }

    pub fn from_payload(payload: &Payload) -> FormRecord {
        let mut record = FormRecord::new();
        for field in FormField::ALL {
            if let Some(value) = payload.get(field.key()) {
                record.set(field, value.as_str());
            }
        }
        record
    }
}

use log::{debug, info};

use crate::{
    error::ValidationError,
    form::{FormField, FormRecord, JsonCodec, WireCodec},
    geocode::AddressHint,
    transport::Transport,
};

pub const SUCCESS_TITLE: &str = "Thanks!";
pub const FAILURE_TITLE: &str = "Error";

const SAVED_MESSAGE: &str = "Your information has been saved. Please check the console for details.";
const INCOMPLETE_MESSAGE: &str = "All fields are required";
const INVALID_MESSAGE: &str = "Invalid data";

// The address is kept for the next sign-up on the same device.
pub const CLEARED_ON_SUCCESS: [FormField; 3] =
    [FormField::FirstName, FormField::LastName, FormField::Street];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub title: &'static str,
    pub message: &'static str,
}

impl Alert {
    pub fn saved() -> Alert {
        Alert {
            title: SUCCESS_TITLE,
            message: SAVED_MESSAGE,
        }
    }

    pub fn is_success(&self) -> bool {
        self.title == SUCCESS_TITLE
    }
}

impl From<&ValidationError> for Alert {
    fn from(error: &ValidationError) -> Alert {
        let message = match error {
            ValidationError::IncompleteInput => INCOMPLETE_MESSAGE,
            ValidationError::SerializationFailure(_) => INVALID_MESSAGE,
        };
        Alert {
            title: FAILURE_TITLE,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Every successful submission starts a new generation. Address hints
/// carry the ticket taken when their lookup began, and hints from an
/// earlier generation are dropped.
#[derive(Debug, Default)]
pub struct SignUpSession {
    record: FormRecord,
    generation: u64,
}

impl SignUpSession {
    pub fn new() -> SignUpSession {
        SignUpSession::default()
    }

    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    pub fn edit(&mut self, field: FormField, text: &str) {
        self.record.set(field, text);
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    /// Copies the address parts that carry a value into the form and
    /// returns the fields the presentation layer has to refresh.
    pub fn apply_address(&mut self, ticket: Ticket, hint: &AddressHint) -> Vec<FormField> {
        if ticket != self.ticket() {
            debug!("Dropping address for an earlier form: {:?}", hint);
            return Vec::new();
        }
        let mut updated = Vec::new();
        for field in FormField::ADDRESS {
            if let Some(value) = hint.get(field) {
                self.record.set(field, value);
                updated.push(field);
            }
        }
        updated
    }

    pub fn submit<T: Transport>(&mut self, transport: &mut T) -> Alert {
        self.submit_with(&JsonCodec, transport)
    }

    pub fn submit_with<C: WireCodec, T: Transport>(&mut self, codec: &C, transport: &mut T) -> Alert {
        match self.record.try_serialize_with(codec) {
            Ok(payload) => {
                transport.deliver(&payload);
                for field in CLEARED_ON_SUCCESS {
                    self.record.clear(field);
                }
                self.generation += 1;
                Alert::saved()
            }
            Err(e) => {
                info!("Sign-up rejected: {}", e);
                if let ValidationError::IncompleteInput = e {
                    debug!("Missing fields: {:?}", self.record.missing_fields());
                }
                Alert::from(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::CodecError, form::Payload};

    #[derive(Default)]
    struct Outbox {
        sent: Vec<Payload>,
    }

    impl Transport for Outbox {
        fn deliver(&mut self, payload: &Payload) {
            self.sent.push(payload.clone());
        }
    }

    struct BrokenCodec;

    impl WireCodec for BrokenCodec {
        fn encode(&self, _payload: &Payload) -> Result<Vec<u8>, CodecError> {
            Err("encoder refused payload".into())
        }

        fn decode(&self, _bytes: &[u8]) -> Result<Payload, CodecError> {
            unreachable!()
        }
    }

    fn springfield() -> AddressHint {
        AddressHint {
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            zip: Some("62701".to_string()),
        }
    }

    fn jane_doe() -> SignUpSession {
        let mut session = SignUpSession::new();
        session.edit(FormField::FirstName, "Jane");
        session.edit(FormField::LastName, "Doe");
        session.edit(FormField::Street, "1 Main St");
        session.edit(FormField::City, "");
        session.edit(FormField::State, "");
        session.edit(FormField::Zip, "");
        session
    }

    #[test]
    fn hint_fills_address_only() {
        let mut session = jane_doe();
        let ticket = session.ticket();

        let updated = session.apply_address(ticket, &springfield());

        assert_eq!(updated, FormField::ADDRESS.to_vec());
        let record = session.record();
        assert_eq!(record.city.as_deref(), Some("Springfield"));
        assert_eq!(record.state.as_deref(), Some("IL"));
        assert_eq!(record.zip.as_deref(), Some("62701"));
        assert_eq!(record.first_name.as_deref(), Some("Jane"));
        assert_eq!(record.last_name.as_deref(), Some("Doe"));
        assert_eq!(record.street.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn absent_hint_parts_leave_fields_alone() {
        let mut session = jane_doe();
        session.edit(FormField::Zip, "62702");
        let ticket = session.ticket();
        let hint = AddressHint {
            zip: None,
            ..springfield()
        };

        let updated = session.apply_address(ticket, &hint);

        assert_eq!(updated, vec![FormField::City, FormField::State]);
        assert_eq!(session.record().zip.as_deref(), Some("62702"));
    }

    #[test]
    fn geocoded_form_submits() {
        let mut session = jane_doe();
        let ticket = session.ticket();
        session.apply_address(ticket, &springfield());
        let mut outbox = Outbox::default();

        let alert = session.submit(&mut outbox);

        assert_eq!(alert, Alert::saved());
        assert_eq!(alert.title, "Thanks!");
        assert_eq!(
            alert.message,
            "Your information has been saved. Please check the console for details."
        );
        let expected: Payload = [
            ("firstname", "Jane"),
            ("lastname", "Doe"),
            ("street", "1 Main St"),
            ("city", "Springfield"),
            ("state", "IL"),
            ("zip", "62701"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(outbox.sent, vec![expected]);
    }

    #[test]
    fn missing_zip_is_reported_and_form_kept() {
        let mut session = jane_doe();
        let ticket = session.ticket();
        session.apply_address(
            ticket,
            &AddressHint {
                zip: None,
                ..springfield()
            },
        );
        let before = session.record().clone();
        let mut outbox = Outbox::default();

        let alert = session.submit(&mut outbox);

        assert_eq!(alert.title, "Error");
        assert_eq!(alert.message, "All fields are required");
        assert!(!alert.is_success());
        assert!(outbox.sent.is_empty());
        assert_eq!(session.record(), &before);
        assert_eq!(session.ticket(), ticket);
    }

    #[test]
    fn encoding_failure_says_invalid_data() {
        let mut session = jane_doe();
        let ticket = session.ticket();
        session.apply_address(ticket, &springfield());
        let mut outbox = Outbox::default();

        let alert = session.submit_with(&BrokenCodec, &mut outbox);

        assert_eq!(alert.title, "Error");
        assert_eq!(alert.message, "Invalid data");
        assert!(outbox.sent.is_empty());
        assert_eq!(session.record().first_name.as_deref(), Some("Jane"));
    }

    // Only name and street are reset; the geocoded address stays.
    #[test]
    fn success_clears_name_and_street_but_keeps_address() {
        let mut session = jane_doe();
        let ticket = session.ticket();
        session.apply_address(ticket, &springfield());

        session.submit(&mut Outbox::default());

        let record = session.record();
        assert_eq!(record.first_name, None);
        assert_eq!(record.last_name, None);
        assert_eq!(record.street, None);
        assert_eq!(record.city.as_deref(), Some("Springfield"));
        assert_eq!(record.state.as_deref(), Some("IL"));
        assert_eq!(record.zip.as_deref(), Some("62701"));
    }

    #[test]
    fn resubmitting_after_success_needs_new_name() {
        let mut session = jane_doe();
        let ticket = session.ticket();
        session.apply_address(ticket, &springfield());
        let mut outbox = Outbox::default();
        session.submit(&mut outbox);

        let alert = session.submit(&mut outbox);

        assert_eq!(alert.message, "All fields are required");
        assert_eq!(outbox.sent.len(), 1);
    }

    #[test]
    fn late_hint_after_submission_is_dropped() {
        let mut session = jane_doe();
        let ticket = session.ticket();
        session.apply_address(ticket, &springfield());
        let in_flight = session.ticket();
        session.submit(&mut Outbox::default());

        let updated = session.apply_address(
            in_flight,
            &AddressHint {
                city: Some("Chicago".to_string()),
                state: Some("IL".to_string()),
                zip: Some("60601".to_string()),
            },
        );

        assert!(updated.is_empty());
        assert_eq!(session.record().city.as_deref(), Some("Springfield"));
        assert_ne!(session.ticket(), in_flight);
    }

    #[test]
    fn blank_edit_replaces_earlier_text() {
        let mut session = jane_doe();

        session.edit(FormField::FirstName, "");

        assert_eq!(session.record().first_name.as_deref(), Some(""));
        assert_eq!(session.record().missing_fields()[0], FormField::FirstName);
    }
}

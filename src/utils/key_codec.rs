//! Composite record identifiers.
//!
//! A record id is the standard base64 encoding of `"<locationKey>|<category>"`.
//! The category is everything after the last separator, so a key round-trips as
//! long as its category contains no `|`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

use crate::constants::COORDINATE_SEPARATOR;
use crate::constants::KEY_SEPARATOR;
use crate::DecodeError;
use crate::RecordId;

pub struct KeyCodec;

impl KeyCodec {
    /// Location key for one coordinate pair: `"<lat>,<long>"`.
    pub fn location_key(
        lat: &str,
        long: &str,
    ) -> String {
        format!("{lat}{COORDINATE_SEPARATOR}{long}")
    }

    pub fn encode(
        location_key: &str,
        category: &str,
    ) -> RecordId {
        let raw = format!("{location_key}{KEY_SEPARATOR}{category}");
        RecordId::from_encoded(STANDARD.encode(raw.as_bytes()))
    }

    pub fn decode(id: &str) -> Result<(String, String), DecodeError> {
        let bytes = STANDARD.decode(id).map_err(|source| DecodeError::Base64 {
            id: id.to_string(),
            source,
        })?;
        let decoded = String::from_utf8(bytes).map_err(|source| DecodeError::Utf8 {
            id: id.to_string(),
            source,
        })?;

        match decoded.rsplit_once(KEY_SEPARATOR) {
            Some((location_key, category)) => Ok((location_key.to_string(), category.to_string())),
            None => Err(DecodeError::MissingSeparator {
                id: id.to_string(),
                decoded,
            }),
        }
    }

    /// Sum the contributions whose decoded category equals `category`.
    ///
    /// Undecodable keys are skipped and logged.
    pub fn count<'a, I>(
        parts: I,
        category: &str,
    ) -> i64
    where
        I: IntoIterator<Item = (&'a String, &'a i64)>,
    {
        let mut total: i64 = 0;
        for (key, value) in parts {
            match Self::decode(key) {
                Ok((_, category_key)) if category_key == category => total = total.saturating_add(*value),
                Ok(_) => {}
                Err(e) => warn!("skip undecodable part {}: {}", key, e),
            }
        }
        total
    }
}

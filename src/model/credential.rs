use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attendance::AuthMethod;

/// Identity-proving input captured at a kiosk, keyed by `method`.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Credential {
    Rfid {
        #[schema(example = "04A3B2C1")]
        rfid_card_id: String,
    },
    Pin {
        #[schema(example = "EMP-001")]
        employee_id: String,
        #[schema(example = "1234")]
        pin_code: String,
    },
    Facial {
        face_encoding: Vec<f64>,
    },
    Fingerprint {
        fingerprint_template: String,
    },
}

impl Credential {
    pub fn method(&self) -> AuthMethod {
        match self {
            Credential::Rfid { .. } => AuthMethod::Rfid,
            Credential::Pin { .. } => AuthMethod::Pin,
            Credential::Facial { .. } => AuthMethod::Facial,
            Credential::Fingerprint { .. } => AuthMethod::Fingerprint,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Pin { employee_id, .. } => f
                .debug_struct("Pin")
                .field("employee_id", employee_id)
                .finish_non_exhaustive(),
            Credential::Facial { face_encoding } => f
                .debug_struct("Facial")
                .field("dimensions", &face_encoding.len())
                .finish(),
            other => write!(f, "{}", other.method()),
        }
    }
}

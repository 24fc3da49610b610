use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ClockError;
use crate::model::credential::Credential;
use crate::model::employee::Employee;
use crate::store::{CredentialSource, FaceProfile};
use crate::utils::face_cache::FaceCache;

/// Face matching thresholds, all on Euclidean distance.
#[derive(Debug, Clone, Copy)]
pub struct FacePolicy {
    /// A match must be strictly closer than this.
    pub threshold: f64,
    /// Runner-up candidates closer than `best + epsilon` make the match ambiguous.
    pub epsilon: f64,
    /// Expected descriptor length.
    pub dimensions: usize,
}

impl Default for FacePolicy {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            epsilon: 0.05,
            dimensions: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceMatch {
    Matched { employee_id: u64, distance: f64 },
    NoMatch,
    Ambiguous,
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Linear scan for the closest enrolled face. Profiles whose dimension does
/// not match the query are skipped.
pub fn best_face_match(query: &[f64], profiles: &[FaceProfile], policy: &FacePolicy) -> FaceMatch {
    let mut best: Option<(u64, f64)> = None;
    let mut runner_up: Option<f64> = None;

    for profile in profiles.iter().filter(|p| p.encoding.len() == query.len()) {
        let distance = euclidean_distance(query, &profile.encoding);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {
                if runner_up.is_none_or(|r| distance < r) {
                    runner_up = Some(distance);
                }
            }
            _ => {
                runner_up = best.map(|(_, d)| d);
                best = Some((profile.employee_id, distance));
            }
        }
    }

    match best {
        Some((_, distance)) if distance >= policy.threshold => FaceMatch::NoMatch,
        Some((_, distance))
            if runner_up
                .is_some_and(|r| r < policy.threshold && r - distance <= policy.epsilon) =>
        {
            FaceMatch::Ambiguous
        }
        Some((employee_id, distance)) => FaceMatch::Matched {
            employee_id,
            distance,
        },
        None => FaceMatch::NoMatch,
    }
}

fn is_valid_pin(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Maps a kiosk credential to exactly one active employee.
#[derive(Clone)]
pub struct IdentityResolver {
    source: Arc<dyn CredentialSource>,
    faces: FaceCache,
    policy: FacePolicy,
}

impl IdentityResolver {
    pub fn new(source: Arc<dyn CredentialSource>, faces: FaceCache, policy: FacePolicy) -> Self {
        Self {
            source,
            faces,
            policy,
        }
    }

    pub fn source(&self) -> &Arc<dyn CredentialSource> {
        &self.source
    }

    /// Reload the face snapshot now; returns how many profiles it holds.
    pub async fn refresh_faces(&self) -> Result<usize, ClockError> {
        self.faces.invalidate().await;
        let profiles = self.faces.profiles().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to reload face snapshot");
            ClockError::Storage(e.to_string())
        })?;
        info!(profiles = profiles.len(), "Face snapshot reloaded");
        Ok(profiles.len())
    }

    pub async fn resolve(&self, credential: &Credential) -> Result<Employee, ClockError> {
        let employee = match credential {
            Credential::Rfid { rfid_card_id } => self.by_rfid(rfid_card_id).await?,
            Credential::Pin {
                employee_id,
                pin_code,
            } => self.by_pin(employee_id, pin_code).await?,
            Credential::Facial { face_encoding } => self.by_face(face_encoding).await?,
            Credential::Fingerprint {
                fingerprint_template,
            } => self.by_fingerprint(fingerprint_template).await?,
        };

        if !employee.is_active() {
            warn!(
                employee_code = %employee.employee_code,
                status = %employee.status,
                method = %credential.method(),
                "Rejected credential of inactive employee"
            );
            return Err(ClockError::EmployeeInactive(employee.status));
        }

        info!(
            employee_code = %employee.employee_code,
            method = %credential.method(),
            "Credential verified"
        );
        Ok(employee)
    }

    async fn by_rfid(&self, rfid_card_id: &str) -> Result<Employee, ClockError> {
        let card = rfid_card_id.trim();
        if card.is_empty() {
            return Err(ClockError::InvalidCredential("RFID card ID is required".into()));
        }
        self.source
            .find_by_rfid(card)
            .await?
            .ok_or(ClockError::NoMatch)
    }

    async fn by_pin(&self, employee_code: &str, pin_code: &str) -> Result<Employee, ClockError> {
        if !is_valid_pin(pin_code) {
            return Err(ClockError::InvalidCredential("PIN must be 4 to 6 digits".into()));
        }

        let employee = self
            .source
            .find_by_code(employee_code.trim())
            .await?
            .ok_or_else(|| ClockError::NotFound(format!("employee {:?}", employee_code.trim())))?;

        match employee.pin_code.as_deref() {
            Some(stored) if stored == pin_code => Ok(employee),
            _ => Err(ClockError::InvalidCredential("invalid PIN code".into())),
        }
    }

    async fn by_face(&self, query: &[f64]) -> Result<Employee, ClockError> {
        if query.len() != self.policy.dimensions {
            return Err(ClockError::InvalidCredential(format!(
                "face encoding must have {} dimensions, got {}",
                self.policy.dimensions,
                query.len()
            )));
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(ClockError::InvalidCredential(
                "face encoding contains non-finite values".into(),
            ));
        }

        let profiles = self.faces.profiles().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load face snapshot");
            ClockError::Storage(e.to_string())
        })?;

        match best_face_match(query, &profiles, &self.policy) {
            FaceMatch::Matched {
                employee_id,
                distance,
            } => {
                debug!(employee_id, distance, "Face matched");
                // The snapshot may be stale; read the current row.
                self.source
                    .find_by_id(employee_id)
                    .await?
                    .ok_or(ClockError::NoMatch)
            }
            FaceMatch::Ambiguous => Err(ClockError::AmbiguousMatch),
            FaceMatch::NoMatch => Err(ClockError::NoMatch),
        }
    }

    async fn by_fingerprint(&self, template: &str) -> Result<Employee, ClockError> {
        if template.is_empty() {
            return Err(ClockError::InvalidCredential(
                "fingerprint template is required".into(),
            ));
        }
        debug!(template_len = template.len(), "Attempting fingerprint verification");

        // Exact template equality stands in for SDK minutiae matching.
        self.source
            .find_by_fingerprint(template)
            .await?
            .ok_or(ClockError::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::EmploymentStatus;
    use crate::store::memory::MemoryDirectory;
    use std::time::Duration;

    const DIMS: usize = 4;

    fn policy() -> FacePolicy {
        FacePolicy {
            threshold: 0.6,
            epsilon: 0.05,
            dimensions: DIMS,
        }
    }

    fn employee(id: u64, status: EmploymentStatus) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{:03}", id),
            full_name: format!("Employee {}", id),
            department: Some("Operations".to_string()),
            position: None,
            status,
            shift_id: 1,
            rfid_card_id: None,
            pin_code: None,
            face_encoding: None,
            fingerprint_template: None,
        }
    }

    fn with_face(id: u64, encoding: [f64; DIMS]) -> Employee {
        Employee {
            face_encoding: Some(encoding.to_vec()),
            ..employee(id, EmploymentStatus::Active)
        }
    }

    fn resolver(employees: Vec<Employee>) -> IdentityResolver {
        let directory: Arc<dyn CredentialSource> = Arc::new(MemoryDirectory::new(employees));
        let faces = FaceCache::new(directory.clone(), Duration::from_secs(60));
        IdentityResolver::new(directory, faces, policy())
    }

    fn face(encoding: [f64; DIMS]) -> Credential {
        Credential::Facial {
            face_encoding: encoding.to_vec(),
        }
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_best_face_match_prefers_clear_winner() {
        let profiles = vec![
            FaceProfile {
                employee_id: 1,
                encoding: vec![0.1, 0.0, 0.0, 0.0],
            },
            FaceProfile {
                employee_id: 2,
                encoding: vec![0.4, 0.0, 0.0, 0.0],
            },
        ];
        let result = best_face_match(&[0.0; DIMS], &profiles, &policy());
        assert!(matches!(result, FaceMatch::Matched { employee_id: 1, .. }));
    }

    #[test]
    fn test_best_face_match_ambiguous_when_within_epsilon() {
        let profiles = vec![
            FaceProfile {
                employee_id: 1,
                encoding: vec![0.30, 0.0, 0.0, 0.0],
            },
            FaceProfile {
                employee_id: 2,
                encoding: vec![0.0, 0.32, 0.0, 0.0],
            },
        ];
        let result = best_face_match(&[0.0; DIMS], &profiles, &policy());
        assert_eq!(result, FaceMatch::Ambiguous);
    }

    #[test]
    fn test_best_face_match_runner_up_order_does_not_matter() {
        // Closest candidate enumerated last, close runner-up enumerated first.
        let profiles = vec![
            FaceProfile {
                employee_id: 9,
                encoding: vec![0.9, 0.0, 0.0, 0.0],
            },
            FaceProfile {
                employee_id: 2,
                encoding: vec![0.33, 0.0, 0.0, 0.0],
            },
            FaceProfile {
                employee_id: 1,
                encoding: vec![0.30, 0.0, 0.0, 0.0],
            },
        ];
        let result = best_face_match(&[0.0; DIMS], &profiles, &policy());
        assert_eq!(result, FaceMatch::Ambiguous);
    }

    #[test]
    fn test_best_face_match_threshold_is_strict() {
        let profiles = vec![FaceProfile {
            employee_id: 1,
            encoding: vec![0.6, 0.0, 0.0, 0.0],
        }];
        assert_eq!(
            best_face_match(&[0.0; DIMS], &profiles, &policy()),
            FaceMatch::NoMatch
        );
    }

    #[test]
    fn test_best_face_match_runner_up_above_threshold_is_ignored() {
        let profiles = vec![
            FaceProfile {
                employee_id: 1,
                encoding: vec![0.58, 0.0, 0.0, 0.0],
            },
            FaceProfile {
                employee_id: 2,
                encoding: vec![0.61, 0.0, 0.0, 0.0],
            },
        ];
        assert!(matches!(
            best_face_match(&[0.0; DIMS], &profiles, &policy()),
            FaceMatch::Matched { employee_id: 1, .. }
        ));
    }

    #[test]
    fn test_best_face_match_skips_other_dimensions() {
        let profiles = vec![FaceProfile {
            employee_id: 1,
            encoding: vec![0.0, 0.0],
        }];
        assert_eq!(
            best_face_match(&[0.0; DIMS], &profiles, &policy()),
            FaceMatch::NoMatch
        );
        assert_eq!(best_face_match(&[0.0; DIMS], &[], &policy()), FaceMatch::NoMatch);
    }

    #[actix_web::test]
    async fn test_resolve_face_best_match_wins() {
        let resolver = resolver(vec![
            with_face(1, [0.1, 0.0, 0.0, 0.0]),
            with_face(2, [0.0, 0.45, 0.0, 0.0]),
        ]);
        let employee = resolver.resolve(&face([0.0; DIMS])).await.unwrap();
        assert_eq!(employee.id, 1);
    }

    #[actix_web::test]
    async fn test_resolve_face_ambiguous() {
        let resolver = resolver(vec![
            with_face(1, [0.20, 0.0, 0.0, 0.0]),
            with_face(2, [0.0, 0.22, 0.0, 0.0]),
        ]);
        let err = resolver.resolve(&face([0.0; DIMS])).await.unwrap_err();
        assert!(matches!(err, ClockError::AmbiguousMatch));
    }

    #[actix_web::test]
    async fn test_resolve_face_wrong_dimension_is_invalid() {
        let resolver = resolver(vec![with_face(1, [0.0; DIMS])]);
        let err = resolver
            .resolve(&Credential::Facial {
                face_encoding: vec![0.0; DIMS + 1],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClockError::InvalidCredential(_)));
    }

    #[actix_web::test]
    async fn test_resolve_face_ignores_inactive_enrolments() {
        let mut terminated = with_face(1, [0.0; DIMS]);
        terminated.status = EmploymentStatus::Terminated;
        let resolver = resolver(vec![terminated]);
        let err = resolver.resolve(&face([0.0; DIMS])).await.unwrap_err();
        assert!(matches!(err, ClockError::NoMatch));
    }

    #[actix_web::test]
    async fn test_resolve_rfid_is_case_insensitive() {
        let mut active = employee(1, EmploymentStatus::Active);
        active.rfid_card_id = Some("04A3B2C1".to_string());
        let resolver = resolver(vec![active]);

        let employee = resolver
            .resolve(&Credential::Rfid {
                rfid_card_id: " 04a3b2c1 ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(employee.id, 1);
    }

    #[actix_web::test]
    async fn test_resolve_rfid_terminated_employee_is_inactive() {
        let mut terminated = employee(1, EmploymentStatus::Terminated);
        terminated.rfid_card_id = Some("CARD-1".to_string());
        let resolver = resolver(vec![terminated]);

        let err = resolver
            .resolve(&Credential::Rfid {
                rfid_card_id: "CARD-1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClockError::EmployeeInactive(EmploymentStatus::Terminated)
        ));
    }

    #[actix_web::test]
    async fn test_resolve_rfid_unknown_card() {
        let resolver = resolver(vec![employee(1, EmploymentStatus::Active)]);
        let err = resolver
            .resolve(&Credential::Rfid {
                rfid_card_id: "NOPE".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClockError::NoMatch));
    }

    #[actix_web::test]
    async fn test_resolve_pin_checks_employee_and_pin() {
        let mut holder = employee(1, EmploymentStatus::Active);
        holder.pin_code = Some("1234".to_string());
        let resolver = resolver(vec![holder, employee(2, EmploymentStatus::Active)]);

        let ok = resolver
            .resolve(&Credential::Pin {
                employee_id: "emp-001".to_string(),
                pin_code: "1234".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.id, 1);

        let wrong_pin = resolver
            .resolve(&Credential::Pin {
                employee_id: "EMP-001".to_string(),
                pin_code: "4321".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_pin, ClockError::InvalidCredential(_)));

        // Right PIN, wrong employee: EMP-002 has no PIN enrolled.
        let wrong_employee = resolver
            .resolve(&Credential::Pin {
                employee_id: "EMP-002".to_string(),
                pin_code: "1234".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_employee, ClockError::InvalidCredential(_)));

        let unknown = resolver
            .resolve(&Credential::Pin {
                employee_id: "EMP-404".to_string(),
                pin_code: "1234".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, ClockError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_resolve_pin_format() {
        let resolver = resolver(vec![employee(1, EmploymentStatus::Active)]);
        for pin in ["123", "1234567", "12a4", ""] {
            let err = resolver
                .resolve(&Credential::Pin {
                    employee_id: "EMP-001".to_string(),
                    pin_code: pin.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, ClockError::InvalidCredential(_)), "pin {:?}", pin);
        }
    }

    #[actix_web::test]
    async fn test_resolve_fingerprint_exact_template() {
        let mut enrolled = employee(3, EmploymentStatus::Suspended);
        enrolled.fingerprint_template = Some("TPL-abc".to_string());
        let resolver = resolver(vec![enrolled]);

        let suspended = resolver
            .resolve(&Credential::Fingerprint {
                fingerprint_template: "TPL-abc".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            suspended,
            ClockError::EmployeeInactive(EmploymentStatus::Suspended)
        ));

        let unknown = resolver
            .resolve(&Credential::Fingerprint {
                fingerprint_template: "TPL-ABC".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, ClockError::NoMatch));
    }

    #[actix_web::test]
    async fn test_refresh_faces_picks_up_new_enrolment() {
        let directory = Arc::new(MemoryDirectory::new(vec![with_face(1, [0.0; DIMS])]));
        let source: Arc<dyn CredentialSource> = directory.clone();
        let faces = FaceCache::new(source.clone(), Duration::from_secs(3600));
        let resolver = IdentityResolver::new(source, faces, policy());

        let probe = face([0.0, 0.0, 0.0, 2.0]);
        assert!(matches!(
            resolver.resolve(&probe).await.unwrap_err(),
            ClockError::NoMatch
        ));

        directory.upsert(with_face(2, [0.0, 0.0, 0.0, 2.0]));
        assert!(matches!(
            resolver.resolve(&probe).await.unwrap_err(),
            ClockError::NoMatch
        ));

        assert_eq!(resolver.refresh_faces().await.unwrap(), 2);
        assert_eq!(resolver.resolve(&probe).await.unwrap().id, 2);
    }
}

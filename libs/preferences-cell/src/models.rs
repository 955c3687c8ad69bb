use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_backend::ApiError;
use shared_models::error::AppError;

// ==============================================================================
// ORDERED COLLECTION
// ==============================================================================

/// A list whose order is meaningful to the user. The only way to reorder it is
/// `move_item`, so the items are always a permutation of what was loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
}

impl<T> OrderedCollection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Takes the item at `from` out and reinserts it so it ends up at `to`.
    /// Items between the two positions shift by one toward the gap.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), MoveError> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(MoveError::OutOfBounds { index, len });
            }
        }

        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }

        Ok(())
    }
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> FromIterator<T> for OrderedCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Position {index} is outside a list of {len} items")]
    OutOfBounds { index: usize, len: usize },
}

// ==============================================================================
// HOSPITAL PREFERENCES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalPreference {
    pub hospital_id: String,
    pub hospital_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHospital {
    pub rank: usize,
    #[serde(flatten)]
    pub hospital: HospitalPreference,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesResponse {
    pub hospitals: Vec<RankedHospital>,
}

impl From<&OrderedCollection<HospitalPreference>> for PreferencesResponse {
    fn from(collection: &OrderedCollection<HospitalPreference>) -> Self {
        let hospitals = collection
            .iter()
            .enumerate()
            .map(|(index, hospital)| RankedHospital {
                rank: index + 1,
                hospital: hospital.clone(),
            })
            .collect();

        Self { hospitals }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MoveRequest {
    pub from: usize,
    pub to: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("Portal request failed: {0}")]
    Backend(#[from] ApiError),

    #[error("Unexpected preferences response: {0}")]
    Decode(String),
}

impl From<PreferencesError> for AppError {
    fn from(error: PreferencesError) -> Self {
        match error {
            PreferencesError::Move(e) => AppError::ValidationError(e.to_string()),
            PreferencesError::Backend(e) if e.status() == Some(401) => {
                AppError::Auth(e.server_message().unwrap_or("Unauthorized").to_string())
            }
            PreferencesError::Backend(e) => match e.server_message() {
                Some(message) => AppError::ExternalService(message.to_string()),
                None => AppError::ExternalService(e.to_string()),
            },
            PreferencesError::Decode(message) => AppError::ExternalService(message),
        }
    }
}

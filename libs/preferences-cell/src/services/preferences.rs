use serde_json::{json, Map, Value};
use tracing::{debug, info};

use shared_backend::PortalApiClient;
use shared_config::AppConfig;

use crate::models::{HospitalPreference, OrderedCollection, PreferencesError};

const HOSPITAL_PREFERENCES_PATH: &str = "/api/preferences/hospitals";

fn pick(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn rank_of(record: &Map<String, Value>) -> Option<u64> {
    ["rank", "priority", "position"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_u64))
}

fn hospital_preference(record: &Map<String, Value>) -> Option<HospitalPreference> {
    let hospital_id = pick(record, &["hospital_id", "hospitalId", "id", "_id"])?;
    let hospital_name = pick(record, &["hospital_name", "hospitalName", "name"]).unwrap_or_else(|| hospital_id.clone());

    Some(HospitalPreference {
        hospital_id,
        hospital_name,
        city: pick(record, &["city"]),
    })
}

/// Accepts a bare array or one wrapped in `data` / `preferences` / `hospitals`.
/// Entries carrying a rank are ordered by it; the sort is stable, so unranked
/// entries keep the order the server sent.
pub fn parse_preferences(body: Value) -> Result<OrderedCollection<HospitalPreference>, PreferencesError> {
    let list = match body {
        Value::Array(list) => list,
        Value::Object(mut object) => ["data", "preferences", "hospitals"]
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Array(list)) => Some(list),
                _ => None,
            })
            .ok_or_else(|| PreferencesError::Decode("no preference list in response".to_string()))?,
        Value::Null => Vec::new(),
        other => {
            return Err(PreferencesError::Decode(format!("expected a list, got {}", other)));
        }
    };

    let mut ranked: Vec<(Option<u64>, HospitalPreference)> = list
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|record| hospital_preference(record).map(|hospital| (rank_of(record), hospital)))
        .collect();
    ranked.sort_by_key(|(rank, _)| rank.unwrap_or(u64::MAX));

    Ok(ranked.into_iter().map(|(_, hospital)| hospital).collect())
}

/// Body sent when saving; ranks are 1-based positions.
pub fn preferences_payload(collection: &OrderedCollection<HospitalPreference>) -> Value {
    let preferences: Vec<Value> = collection
        .iter()
        .enumerate()
        .map(|(index, hospital)| {
            json!({
                "hospitalId": hospital.hospital_id,
                "rank": index + 1
            })
        })
        .collect();

    json!({ "preferences": preferences })
}

pub struct PreferencesService {
    client: PortalApiClient,
}

impl PreferencesService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: PortalApiClient::new(config),
        }
    }

    pub async fn hospital_preferences(
        &self,
        auth_token: &str,
    ) -> Result<OrderedCollection<HospitalPreference>, PreferencesError> {
        let body: Value = self.client.get(HOSPITAL_PREFERENCES_PATH, Some(auth_token)).await?;
        let preferences = parse_preferences(body)?;

        debug!("Loaded {} hospital preferences", preferences.len());
        Ok(preferences)
    }

    pub async fn save_hospital_preferences(
        &self,
        collection: &OrderedCollection<HospitalPreference>,
        auth_token: &str,
    ) -> Result<(), PreferencesError> {
        let _: Value = self
            .client
            .put(HOSPITAL_PREFERENCES_PATH, Some(auth_token), preferences_payload(collection))
            .await?;
        Ok(())
    }

    /// Loads the current ranking, moves one hospital and saves the result. Nothing
    /// is saved when the positions are out of range.
    pub async fn move_hospital(
        &self,
        from: usize,
        to: usize,
        auth_token: &str,
    ) -> Result<OrderedCollection<HospitalPreference>, PreferencesError> {
        let mut preferences = self.hospital_preferences(auth_token).await?;
        preferences.move_item(from, to)?;

        self.save_hospital_preferences(&preferences, auth_token).await?;
        info!("Moved hospital preference from position {} to {}", from, to);

        Ok(preferences)
    }
}

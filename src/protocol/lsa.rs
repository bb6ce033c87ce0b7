use std::collections::BTreeMap;

use chrono::Utc;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::envelope::DecodeError;
use crate::{NodeName, LINK_COST};

/// Link-state announcement: one node's direct adjacency at a point in time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Lsa {
    pub id: String,
    pub node: NodeName,
    #[serde(default, deserialize_with = "valid_links")]
    pub links: BTreeMap<NodeName, f64>,
}

/// Any negative or non-finite weight rejects the whole announcement.
fn valid_links<'de, D>(deserializer: D) -> Result<BTreeMap<NodeName, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let links = BTreeMap::<NodeName, f64>::deserialize(deserializer)?;
    if let Some((neighbor, weight)) = links.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(D::Error::custom(format!(
            "link to {} has invalid weight {}",
            neighbor, weight
        )));
    }
    Ok(links)
}

impl Lsa {
    /// Fresh self-announcement with every neighbor at the fixed link cost.
    pub fn originate(node: &str, neighbors: &[NodeName]) -> Self {
        Self {
            id: Self::new_id(node),
            node: node.to_string(),
            links: neighbors
                .iter()
                .map(|n| (n.clone(), LINK_COST))
                .collect(),
        }
    }

    /// Originator, wall clock millis and a random part, so ids from
    /// different processes never collide.
    pub fn new_id(node: &str) -> String {
        format!(
            "{}-{}-{}",
            node,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }

    pub fn to_payload(&self) -> Map<String, Value> {
        let links: Map<String, Value> = self
            .links
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();

        let mut payload = Map::new();
        payload.insert("id".to_string(), Value::from(self.id.clone()));
        payload.insert("node".to_string(), Value::from(self.node.clone()));
        payload.insert("links".to_string(), Value::Object(links));
        payload
    }

    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, DecodeError> {
        serde_json::from_value(Value::Object(payload.clone()))
            .map_err(|source| DecodeError::Payload { kind: "lsa", source })
    }
}

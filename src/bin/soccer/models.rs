use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use skue::domain::{Resource, ResourceId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Player {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub age: i32,
    pub position: String,
    pub height: String,
    pub weight: String,
    pub foot: String,
}

impl Resource for Player {
    const COLLECTION: &'static str = "players";
    const ID_FIELD: &'static str = "Id";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn generate_id() -> Option<ResourceId> {
        Some(ObjectId::new().to_hex())
    }
}

/// Teams are keyed by a caller-chosen code such as `FCB`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Team {
    pub team_id: String,
    pub name: String,
    pub complete_name: String,
    pub logo: String,
    pub country: String,
    pub founded: String,
    pub website: String,
    /// Ids of the players on the roster.
    pub players: Vec<String>,
}

impl Resource for Team {
    const COLLECTION: &'static str = "teams";
    const ID_FIELD: &'static str = "TeamId";

    fn id(&self) -> &str {
        &self.team_id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.team_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players_get_object_id_hex_ids() {
        let id = Player::generate_id().expect("players generate ids");
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn teams_require_caller_ids() {
        assert!(Team::generate_id().is_none());
        assert!(!Team::default().has_id());
    }

    #[test]
    fn wire_names_are_pascal_case() {
        let team: Team = serde_json::from_str(r#"{"TeamId":"FCB","CompleteName":"Futbol Club Barcelona","Players":["p1"]}"#)
            .expect("decodes");
        assert_eq!(team.id(), "FCB");
        assert_eq!(team.players, vec!["p1".to_string()]);
        assert!(team.name.is_empty());

        let value = serde_json::to_value(Player {
            first_name: "Lionel".to_string(),
            ..Player::default()
        })
        .expect("encodes");
        assert_eq!(value["FirstName"], "Lionel");
        assert!(value.get("Id").is_some());
    }
}

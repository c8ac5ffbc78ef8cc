//! Spread definitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReadingError;

/// One slot in a spread layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Position name, e.g. "Past".
    pub name: String,
    /// What a card in this position speaks to.
    pub meaning: String,
    /// Layout x coordinate.
    #[serde(default)]
    pub x: f32,
    /// Layout y coordinate.
    #[serde(default)]
    pub y: f32,
}

/// A named layout with a fixed list of positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadDefinition {
    /// Stable identity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Positions in draw order.
    pub positions: Vec<Position>,
}

impl SpreadDefinition {
    /// Number of cards this spread draws.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.positions.len()
    }

    /// Builds a stand-in spread from stored position names when the original
    /// definition is no longer known.
    #[must_use]
    pub fn synthesized(id: &str, position_names: &[String]) -> Self {
        Self {
            id: id.to_owned(),
            name: id.to_owned(),
            description: String::new(),
            positions: position_names
                .iter()
                .map(|name| Position {
                    name: name.clone(),
                    meaning: String::new(),
                    x: 0.0,
                    y: 0.0,
                })
                .collect(),
        }
    }
}

/// The immutable set of known spreads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadCatalog {
    spreads: Vec<SpreadDefinition>,
}

impl SpreadCatalog {
    /// Builds a catalog, rejecting duplicate ids and empty spreads.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Validation` if any spread is malformed.
    pub fn new(spreads: Vec<SpreadDefinition>) -> Result<Self, ReadingError> {
        let mut seen = HashSet::new();
        for spread in &spreads {
            if spread.positions.is_empty() {
                return Err(ReadingError::Validation(format!(
                    "spread {} has no positions",
                    spread.id
                )));
            }
            if !seen.insert(spread.id.as_str()) {
                return Err(ReadingError::Validation(format!(
                    "duplicate spread id: {}",
                    spread.id
                )));
            }
        }
        Ok(Self { spreads })
    }

    /// Parses a catalog from YAML of the form `spreads: [{id, name, description, positions}]`.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Validation` if the document does not parse or a
    /// spread is malformed.
    pub fn from_yaml(source: &str) -> Result<Self, ReadingError> {
        #[derive(Deserialize)]
        struct CatalogFile {
            spreads: Vec<SpreadDefinition>,
        }

        let file: CatalogFile = serde_yaml::from_str(source)
            .map_err(|e| ReadingError::Validation(format!("spread catalog parse failed: {e}")))?;
        Self::new(file.spreads)
    }

    /// Looks up a spread by id.
    #[must_use]
    pub fn find(&self, spread_id: &str) -> Option<&SpreadDefinition> {
        self.spreads.iter().find(|s| s.id == spread_id)
    }

    /// All spreads in catalog order.
    #[must_use]
    pub fn spreads(&self) -> &[SpreadDefinition] {
        &self.spreads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r"
spreads:
  - id: three-card
    name: Three Card
    positions:
      - { name: Past, meaning: what shaped this, x: 0.0, y: 0.0 }
      - { name: Present, meaning: where you stand, x: 1.0, y: 0.0 }
      - { name: Future, meaning: where this leads, x: 2.0, y: 0.0 }
";

    #[test]
    fn test_from_yaml_loads_positions_in_order() {
        let catalog = SpreadCatalog::from_yaml(CATALOG).unwrap();
        let spread = catalog.find("three-card").unwrap();
        assert_eq!(spread.card_count(), 3);
        let names: Vec<&str> = spread.positions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Past", "Present", "Future"]);
    }

    #[test]
    fn test_new_rejects_spread_without_positions() {
        let spread = SpreadDefinition {
            id: "empty".to_owned(),
            name: "Empty".to_owned(),
            description: String::new(),
            positions: vec![],
        };
        assert!(matches!(
            SpreadCatalog::new(vec![spread]),
            Err(ReadingError::Validation(_))
        ));
    }

    #[test]
    fn test_synthesized_spread_keeps_position_names() {
        let names = vec!["Root".to_owned(), "Crown".to_owned()];
        let spread = SpreadDefinition::synthesized("retired-spread", &names);
        assert_eq!(spread.id, "retired-spread");
        assert_eq!(spread.card_count(), 2);
        assert_eq!(spread.positions[1].name, "Crown");
        assert!(spread.positions[1].meaning.is_empty());
    }
}

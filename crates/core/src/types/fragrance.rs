//! Fragrance metadata attached to boutique products.
//!
//! Products carry free-form metadata in the commerce backend; the storefront
//! reads the well-known keys below into a typed view. Unknown or malformed
//! keys are ignored rather than rejected.

use serde::{Deserialize, Serialize};

/// Olfactive family of a fragrance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragranceFamily {
    Floral,
    Woody,
    Oriental,
    Fresh,
    Citrus,
    Aromatic,
}

impl FragranceFamily {
    /// Accent color name used for the family badge.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Floral => "pink",
            Self::Woody => "amber",
            Self::Oriental => "purple",
            Self::Fresh => "cyan",
            Self::Citrus => "yellow",
            Self::Aromatic => "green",
        }
    }
}

/// Perfume oil concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragranceConcentration {
    Parfum,
    #[serde(rename = "EDP")]
    EauDeParfum,
    #[serde(rename = "EDT")]
    EauDeToilette,
    #[serde(rename = "EDC")]
    EauDeCologne,
    Cologne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Men,
    Women,
    Unisex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    #[serde(rename = "All Season")]
    AllSeason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occasion {
    Day,
    Night,
    Office,
    Date,
    Casual,
    Formal,
    Sport,
}

/// Typed view over a product's fragrance metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragranceMetadata {
    #[serde(default, rename = "fragrance_family")]
    pub family: Option<FragranceFamily>,
    #[serde(default)]
    pub concentration: Option<FragranceConcentration>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub top_notes: Vec<String>,
    #[serde(default)]
    pub middle_notes: Vec<String>,
    #[serde(default)]
    pub base_notes: Vec<String>,
    /// 1-10 scale.
    #[serde(default)]
    pub longevity: Option<u8>,
    /// 1-10 scale.
    #[serde(default)]
    pub sillage: Option<u8>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub occasions: Vec<Occasion>,
    #[serde(default)]
    pub year_released: Option<u16>,
    #[serde(default)]
    pub perfumer: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

impl FragranceMetadata {
    /// Read fragrance metadata from a product's raw metadata object.
    ///
    /// Returns `None` when the value is absent or does not match the expected
    /// shape.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Human label for the longevity score.
    #[must_use]
    pub fn longevity_label(&self) -> Option<&'static str> {
        self.longevity.map(|v| match v {
            8.. => "Very Long Lasting",
            6..=7 => "Long Lasting",
            4..=5 => "Moderate",
            2..=3 => "Weak",
            _ => "Very Weak",
        })
    }

    /// Human label for the sillage score.
    #[must_use]
    pub fn sillage_label(&self) -> Option<&'static str> {
        self.sillage.map(|v| match v {
            8.. => "Enormous",
            6..=7 => "Strong",
            4..=5 => "Moderate",
            2..=3 => "Soft",
            _ => "Intimate",
        })
    }
}

/// Join notes for display, or `"N/A"` when there are none.
#[must_use]
pub fn format_notes(notes: &[String]) -> String {
    if notes.is_empty() {
        return "N/A".to_owned();
    }
    notes.join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_known_keys() {
        let meta = FragranceMetadata::from_value(&json!({
            "fragrance_family": "Woody",
            "concentration": "EDP",
            "gender": "Unisex",
            "top_notes": ["Bergamot", "Pink Pepper"],
            "longevity": 8,
            "seasons": ["Fall", "All Season"],
            "brand": "Ilyo",
            "unrelated": true
        }))
        .unwrap();

        assert_eq!(meta.family, Some(FragranceFamily::Woody));
        assert_eq!(
            meta.concentration,
            Some(FragranceConcentration::EauDeParfum)
        );
        assert_eq!(meta.seasons, vec![Season::Fall, Season::AllSeason]);
        assert_eq!(meta.longevity_label(), Some("Very Long Lasting"));
        assert_eq!(meta.sillage_label(), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(FragranceMetadata::from_value(&json!(null)).is_none());
        assert!(FragranceMetadata::from_value(&json!("Woody")).is_none());
    }

    #[test]
    fn test_labels() {
        let meta = FragranceMetadata {
            longevity: Some(1),
            sillage: Some(6),
            ..Default::default()
        };
        assert_eq!(meta.longevity_label(), Some("Very Weak"));
        assert_eq!(meta.sillage_label(), Some("Strong"));
    }

    #[test]
    fn test_format_notes() {
        assert_eq!(format_notes(&[]), "N/A");
        assert_eq!(
            format_notes(&["Iris".to_owned(), "Musk".to_owned()]),
            "Iris, Musk"
        );
    }

    #[test]
    fn test_family_color() {
        assert_eq!(FragranceFamily::Citrus.color(), "yellow");
    }
}

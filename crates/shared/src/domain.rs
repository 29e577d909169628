use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(PodId);

/// One tracked unit and its last known position in dashboard coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub id: PodId,
    pub x: f64,
    pub y: f64,
}

impl Pod {
    pub fn new(id: PodId, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn same_position(&self, other: &Pod) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn distance_to(&self, other: &Pod) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Target arrangement the server steers pods toward.
///
/// Catalog names travel in upper case on the wire; any other text is kept
/// verbatim as a custom command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Formation {
    Circle,
    Star,
    X,
    Line,
    Parabola,
    #[default]
    Random,
    Custom(String),
}

impl Formation {
    pub const CATALOG: [Formation; 6] = [
        Formation::Circle,
        Formation::Star,
        Formation::X,
        Formation::Line,
        Formation::Parabola,
        Formation::Random,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Formation::Circle => "CIRCLE",
            Formation::Star => "STAR",
            Formation::X => "X",
            Formation::Line => "LINE",
            Formation::Parabola => "PARABOLA",
            Formation::Random => "RANDOM",
            Formation::Custom(name) => name,
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Formation::Random)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Formation::Custom(_))
    }
}

impl From<&str> for Formation {
    fn from(value: &str) -> Self {
        match value {
            "CIRCLE" => Formation::Circle,
            "STAR" => Formation::Star,
            "X" => Formation::X,
            "LINE" => Formation::Line,
            "PARABOLA" => Formation::Parabola,
            "RANDOM" => Formation::Random,
            other => Formation::Custom(other.to_string()),
        }
    }
}

impl From<String> for Formation {
    fn from(value: String) -> Self {
        match Formation::from(value.as_str()) {
            Formation::Custom(_) => Formation::Custom(value),
            known => known,
        }
    }
}

impl From<Formation> for String {
    fn from(value: Formation) -> Self {
        match value {
            Formation::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionState {
    #[default]
    Idle,
    Transmitting,
}

impl TransmissionState {
    pub fn is_transmitting(self) -> bool {
        self == TransmissionState::Transmitting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_round_trip_and_unknown_names_stay_custom() {
        for formation in Formation::CATALOG {
            assert_eq!(Formation::from(formation.as_str()), formation);
        }
        assert_eq!(
            Formation::from("HELIX"),
            Formation::Custom("HELIX".to_string())
        );
        assert_eq!(
            Formation::from("circle"),
            Formation::Custom("circle".to_string())
        );
    }

    #[test]
    fn formation_serializes_as_bare_name() {
        let json = serde_json::to_string(&Formation::Parabola).expect("json");
        assert_eq!(json, "\"PARABOLA\"");
        let custom: Formation = serde_json::from_str("\"SPIRAL ARM\"").expect("json");
        assert_eq!(custom, Formation::Custom("SPIRAL ARM".to_string()));
    }

    #[test]
    fn pod_distance_is_euclidean() {
        let a = Pod::new(PodId(1), 0.0, 0.0);
        let b = Pod::new(PodId(2), 30.0, 40.0);
        assert_eq!(a.distance_to(&b), 50.0);
    }
}

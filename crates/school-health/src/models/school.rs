use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{school_classes, schools};

/// School shift a class meets in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Period {
    #[serde(rename = "Manhã")]
    Morning,
    #[serde(rename = "Tarde")]
    Afternoon,
    #[serde(rename = "Integral")]
    FullDay,
    #[serde(rename = "Noite")]
    Evening,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Morning,
        Period::Afternoon,
        Period::FullDay,
        Period::Evening,
    ];

    /// Canonical label, also the stored value
    pub fn as_label(&self) -> &'static str {
        match self {
            Period::Morning => "Manhã",
            Period::Afternoon => "Tarde",
            Period::FullDay => "Integral",
            Period::Evening => "Noite",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    /// Accepts the initial letter or the full word, with or without accent
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "manhã" | "manha" => Ok(Period::Morning),
            "t" | "tarde" => Ok(Period::Afternoon),
            "i" | "integral" => Ok(Period::FullDay),
            "n" | "noite" => Ok(Period::Evening),
            _ => Err(format!("Invalid period: {s}")),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct School {
    pub id: Uuid,
    /// INEP code
    pub code: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<schools::Model> for School {
    fn from(model: schools::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchoolClass {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub period: String,
    pub school_year: i32,
}

impl From<school_classes::Model> for SchoolClass {
    fn from(model: school_classes::Model) -> Self {
        Self {
            id: model.id,
            school_id: model.school_id,
            name: model.name,
            period: model.period,
            school_year: model.school_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_labels_parse_back() {
        for period in Period::ALL {
            assert_eq!(period.as_label().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn test_period_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Period::Morning).unwrap(),
            "\"Manhã\""
        );
    }
}

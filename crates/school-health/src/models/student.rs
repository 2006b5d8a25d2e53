use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::students;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Sex {
    #[serde(rename = "Masculino")]
    Male,
    #[serde(rename = "Feminino")]
    Female,
}

impl Sex {
    /// Label persisted in the database and shown to users
    pub fn as_label(&self) -> &'static str {
        match self {
            Sex::Male => "Masculino",
            Sex::Female => "Feminino",
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "masculino" => Ok(Sex::Male),
            "f" | "feminino" => Ok(Sex::Female),
            _ => Err(format!("Invalid sex: {s}")),
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Brazilian individual taxpayer number, held as eleven digits with valid check digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Cpf(String);

impl Cpf {
    /// Accepts punctuated or bare input; `None` when the number fails the checksum
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: Vec<u32> = raw
            .chars()
            .filter(|c| c.is_ascii_digit())
            .filter_map(|c| c.to_digit(10))
            .collect();

        if digits.len() != 11 {
            return None;
        }
        // Repeated digits pass the arithmetic but are never issued
        if digits.iter().all(|d| *d == digits[0]) {
            return None;
        }

        let check = |len: usize| -> u32 {
            let sum: u32 = digits[..len]
                .iter()
                .enumerate()
                .map(|(i, d)| d * (len as u32 + 1 - i as u32))
                .sum();
            let rest = (sum * 10) % 11;
            if rest == 10 { 0 } else { rest }
        };

        if check(9) != digits[9] || check(10) != digits[10] {
            return None;
        }

        Some(Self(digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub sex: Option<Sex>,
    pub cpf: Option<String>,
    pub nis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<students::Model> for Student {
    fn from(model: students::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            birth_date: model.birth_date,
            sex: model.sex.as_deref().and_then(|s| s.parse().ok()),
            cpf: model.cpf,
            nis: model.nis,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf_accepts_punctuated_and_bare_forms() {
        let bare = Cpf::parse("52998224725").unwrap();
        let punctuated = Cpf::parse("529.982.247-25").unwrap();
        assert_eq!(bare, punctuated);
        assert_eq!(bare.as_str(), "52998224725");
    }

    #[test]
    fn test_cpf_rejects_bad_check_digits() {
        assert!(Cpf::parse("52998224724").is_none());
        assert!(Cpf::parse("111.444.777-36").is_none());
        assert!(Cpf::parse("111.444.777-35").is_some());
    }

    #[test]
    fn test_cpf_rejects_repeated_digits_and_wrong_length() {
        assert!(Cpf::parse("00000000000").is_none());
        assert!(Cpf::parse("99999999999").is_none());
        assert!(Cpf::parse("1234567890").is_none());
        assert!(Cpf::parse("").is_none());
    }

    #[test]
    fn test_sex_label_round_trips_through_parse() {
        for sex in [Sex::Male, Sex::Female] {
            assert_eq!(sex.as_label().parse::<Sex>().unwrap(), sex);
        }
    }
}

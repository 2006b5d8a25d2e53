//! Field normalizers for spreadsheet cells

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::models::{Cpf, Period, Sex};

static DATE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").ok());

/// Header cell to lookup key: lower-cased, trimmed, accents removed and any
/// character outside `[a-z0-9_]` replaced by `_`.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Strict `DD/MM/YYYY` with calendar validation
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let caps = DATE_PATTERN.as_ref()?.captures(value.trim())?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn normalize_sex(value: &str) -> Option<Sex> {
    value.parse().ok()
}

pub fn normalize_period(value: &str) -> Option<Period> {
    value.parse().ok()
}

pub fn validate_cpf(value: &str) -> Option<Cpf> {
    Cpf::parse(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Nome Completo", "nome_completo")]
    #[case("  Data de Nascimento ", "data_de_nascimento")]
    #[case("Período", "periodo")]
    #[case("ANO LETIVO", "ano_letivo")]
    #[case("Código-INEP", "codigo_inep")]
    #[case("nome_escola", "nome_escola")]
    fn test_normalize_header(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_header(raw), expected);
    }

    #[rstest]
    #[case("29/02/2020", Some((2020, 2, 29)))]
    #[case("01/01/2000", Some((2000, 1, 1)))]
    #[case("31/12/2015", Some((2015, 12, 31)))]
    #[case("29/02/2021", None)]
    #[case("31/04/2015", None)]
    #[case("00/01/2015", None)]
    #[case("15/13/2015", None)]
    #[case("2015-03-10", None)]
    #[case("1/3/2015", None)]
    #[case("", None)]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<(i32, u32, u32)>) {
        let expected = expected.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(parse_date(raw), expected);
    }

    #[test]
    fn test_parse_date_round_trips_its_own_format() {
        let date = NaiveDate::from_ymd_opt(2012, 7, 4).unwrap();
        let text = date.format("%d/%m/%Y").to_string();
        assert_eq!(parse_date(&text), Some(date));
    }

    #[rstest]
    #[case("M", Some(Sex::Male))]
    #[case("m", Some(Sex::Male))]
    #[case("Masculino", Some(Sex::Male))]
    #[case("masculino", Some(Sex::Male))]
    #[case("F", Some(Sex::Female))]
    #[case("f", Some(Sex::Female))]
    #[case("Feminino", Some(Sex::Female))]
    #[case("feminino", Some(Sex::Female))]
    #[case("X", None)]
    #[case("", None)]
    fn test_normalize_sex(#[case] raw: &str, #[case] expected: Option<Sex>) {
        assert_eq!(normalize_sex(raw), expected);
    }

    #[test]
    fn test_normalized_sex_labels() {
        assert_eq!(normalize_sex("m").unwrap().as_label(), "Masculino");
        assert_eq!(normalize_sex("F").unwrap().as_label(), "Feminino");
    }

    #[rstest]
    #[case("M", Some(Period::Morning))]
    #[case("m", Some(Period::Morning))]
    #[case("Manhã", Some(Period::Morning))]
    #[case("manha", Some(Period::Morning))]
    #[case("MANHÃ", Some(Period::Morning))]
    #[case("T", Some(Period::Afternoon))]
    #[case("tarde", Some(Period::Afternoon))]
    #[case("I", Some(Period::FullDay))]
    #[case("Integral", Some(Period::FullDay))]
    #[case("N", Some(Period::Evening))]
    #[case("noite", Some(Period::Evening))]
    #[case("Invalido", None)]
    #[case("", None)]
    fn test_normalize_period(#[case] raw: &str, #[case] expected: Option<Period>) {
        assert_eq!(normalize_period(raw), expected);
    }

    #[test]
    fn test_normalized_period_label() {
        assert_eq!(normalize_period("manha").unwrap().as_label(), "Manhã");
    }

    #[test]
    fn test_validate_cpf_strips_punctuation() {
        assert_eq!(
            validate_cpf("529.982.247-25").map(|c| c.as_str().to_string()),
            Some("52998224725".to_string())
        );
        assert!(validate_cpf("529.982.247-26").is_none());
    }
}

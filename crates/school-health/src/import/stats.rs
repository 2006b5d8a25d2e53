use serde::Serialize;
use utoipa::ToSchema;

/// A row that did not make it into the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

/// Per-run import report
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub total_records: usize,
    pub new_students: usize,
    pub updated_students: usize,
    pub new_schools: usize,
    pub new_classes: usize,
    pub new_enrollments: usize,
    pub existing_enrollments: usize,
    pub duration_ms: u64,
    pub errors: Vec<ImportRowError>,
}

impl ImportStats {
    /// Rows that reached the database
    pub fn processed_students(&self) -> usize {
        self.new_students + self.updated_students
    }

    /// Fold a committed batch into the run totals
    pub fn absorb(&mut self, batch: BatchStats) {
        self.new_students += batch.new_students;
        self.updated_students += batch.updated_students;
        self.new_schools += batch.new_schools;
        self.new_classes += batch.new_classes;
        self.new_enrollments += batch.new_enrollments;
        self.existing_enrollments += batch.existing_enrollments;
        self.errors.extend(batch.errors);
    }
}

/// Counts for a single batch, merged only once the batch commits
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub new_students: usize,
    pub updated_students: usize,
    pub new_schools: usize,
    pub new_classes: usize,
    pub new_enrollments: usize,
    pub existing_enrollments: usize,
    pub errors: Vec<ImportRowError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let stats = ImportStats {
            total_records: 3,
            new_students: 2,
            errors: vec![ImportRowError {
                row: 4,
                message: "Invalid CPF".to_string(),
            }],
            ..ImportStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalRecords"], 3);
        assert_eq!(json["newStudents"], 2);
        assert_eq!(json["updatedStudents"], 0);
        assert_eq!(json["newSchools"], 0);
        assert_eq!(json["newClasses"], 0);
        assert_eq!(json["errors"][0]["row"], 4);
        assert_eq!(json["errors"][0]["message"], "Invalid CPF");
    }

    #[test]
    fn test_absorb_adds_counts_and_errors() {
        let mut stats = ImportStats::default();
        stats.absorb(BatchStats {
            new_students: 1,
            updated_students: 2,
            new_schools: 1,
            errors: vec![ImportRowError { row: 9, message: "x".to_string() }],
            ..BatchStats::default()
        });
        assert_eq!(stats.processed_students(), 3);
        assert_eq!(stats.new_schools, 1);
        assert_eq!(stats.errors.len(), 1);
    }
}

pub use super::enrollments::Entity as Enrollments;
pub use super::school_classes::Entity as SchoolClasses;
pub use super::schools::Entity as Schools;
pub use super::students::Entity as Students;

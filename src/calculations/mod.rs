pub mod accumulator;
pub mod projection;

pub use accumulator::{AbsencePolicy, ClassCounter};
pub use projection::{AttendanceInput, SubjectProjection, classes_needed};

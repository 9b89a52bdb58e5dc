pub mod form;
pub mod question;
pub mod step;

pub use form::{FormConfig, SpecError, SpecIssue};
pub use question::{Conditional, Layout, QuestionSpec, QuestionType};
pub use step::StepSpec;

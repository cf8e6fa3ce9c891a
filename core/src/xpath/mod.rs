//! Location paths into complex features, and assigning values along them.

mod step;
mod value;

pub use step::{Step, StepList};
pub use value::{Content, SetRequest, XPathWriter};

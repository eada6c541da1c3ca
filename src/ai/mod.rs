mod interpreter;
mod report;

pub use interpreter::{Interpreter, DEFAULT_MODEL};

pub mod builtin;
pub mod selector;

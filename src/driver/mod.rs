#[cfg(test)]
pub mod fake;
pub mod traits;
pub mod web;

// src/cli/handlers/mod.rs

// One module per command. `unbundle` is not in the registry: it only runs from
// an executable carrying an embedded project.

pub mod bundle;
pub mod commons;
pub mod copy;
pub mod feature;
pub mod make;
pub mod unbundle;

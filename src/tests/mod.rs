//! Binary-side integration tests: startup wiring and the full runtime
//! loop over fake ports.

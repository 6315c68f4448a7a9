#[path = "property/gate_coherence.rs"]
mod gate_coherence;

#[path = "property/lifecycle_fail_closed.rs"]
mod lifecycle_fail_closed;

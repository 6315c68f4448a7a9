#[path = "e2e/revise_to_capsule.rs"]
mod revise_to_capsule;

#[path = "e2e/batch_scope_hold.rs"]
mod batch_scope_hold;

#[path = "e2e/hold_paths.rs"]
mod hold_paths;

use godot::prelude::*;

pub mod api;
pub mod catalog;
pub mod config;
pub mod country;
pub mod crisis;
pub mod error;
pub mod flow;
pub mod mission_state;
pub mod orbit;
pub mod payload;
pub mod rating;
pub mod session;
pub mod store;

mod mission_manager;

struct LeoverseExtension;

#[gdextension]
unsafe impl ExtensionLibrary for LeoverseExtension {}

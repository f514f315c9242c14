pub mod analysis;
pub mod bridge;
pub mod controller;
pub mod delay;
pub mod error;
pub mod estimate;
pub mod events;
pub mod keyboard;
pub mod mistake;
pub mod paragraph;
pub mod recovery;
pub mod session;
pub mod settings;
pub mod sink;
pub mod verify;

pub mod card;
pub mod service;

pub use card::Character;
pub use service::{CharacterEdit, CharacterError, CharacterService};

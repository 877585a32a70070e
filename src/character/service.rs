//! Character creation, editing and lookup.
//!
//! [`CharacterService`] keeps the character list in memory and writes it
//! through to the [`DataStore`] after every change.

use chrono::Utc;

use crate::character::card::{resolve_avatar, AvatarError};
use crate::character::Character;
use crate::core::constants::DEFAULT_PERSONA;
use crate::core::store::{DataStore, StoreError};

/// Errors that can occur during character operations.
#[derive(Debug)]
pub enum CharacterError {
    /// Name was empty or whitespace.
    MissingName,

    /// No character matched the given id or name.
    NotFound(String),

    Avatar(AvatarError),

    Store(StoreError),
}

impl std::fmt::Display for CharacterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharacterError::MissingName => write!(f, "Character name is required"),
            CharacterError::NotFound(key) => write!(f, "Character '{key}' not found"),
            CharacterError::Avatar(err) => write!(f, "{err}"),
            CharacterError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CharacterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CharacterError::Avatar(err) => Some(err),
            CharacterError::Store(err) => Some(err),
            CharacterError::MissingName | CharacterError::NotFound(_) => None,
        }
    }
}

impl From<StoreError> for CharacterError {
    fn from(err: StoreError) -> Self {
        CharacterError::Store(err)
    }
}

impl From<AvatarError> for CharacterError {
    fn from(err: AvatarError) -> Self {
        CharacterError::Avatar(err)
    }
}

/// Fields accepted by [`CharacterService::edit`]; `None` leaves a field as is.
#[derive(Debug, Default, Clone)]
pub struct CharacterEdit {
    pub name: Option<String>,
    pub persona: Option<String>,
    pub avatar: Option<String>,
}

pub struct CharacterService {
    store: DataStore,
    characters: Vec<Character>,
}

impl CharacterService {
    pub fn load(store: DataStore) -> Result<Self, CharacterError> {
        let characters = store.load_characters()?;
        Ok(Self { store, characters })
    }

    pub fn list(&self) -> &[Character] {
        &self.characters
    }

    pub fn into_characters(self) -> Vec<Character> {
        self.characters
    }

    /// Look up by exact id first, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Result<&Character, CharacterError> {
        let key = key.trim();
        self.characters
            .iter()
            .find(|c| c.id == key)
            .or_else(|| {
                self.characters
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| CharacterError::NotFound(key.to_string()))
    }

    pub fn create(
        &mut self,
        name: &str,
        persona: &str,
        avatar: &str,
    ) -> Result<Character, CharacterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CharacterError::MissingName);
        }
        let character = Character {
            id: self.next_id(),
            name: name.to_string(),
            persona: persona_or_default(persona),
            avatar: resolve_avatar(avatar)?,
        };
        self.characters.push(character.clone());
        self.store.save_characters(&self.characters)?;
        Ok(character)
    }

    pub fn edit(&mut self, key: &str, edit: CharacterEdit) -> Result<Character, CharacterError> {
        let id = self.find(key)?.id.clone();

        let name = match edit.name.as_deref().map(str::trim) {
            Some("") => return Err(CharacterError::MissingName),
            Some(name) => Some(name.to_string()),
            None => None,
        };
        let avatar = edit.avatar.as_deref().map(resolve_avatar).transpose()?;

        let character = self
            .characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CharacterError::NotFound(id.clone()))?;
        if let Some(name) = name {
            character.name = name;
        }
        if let Some(persona) = edit.persona {
            character.persona = persona_or_default(&persona);
        }
        if let Some(avatar) = avatar {
            character.avatar = avatar;
        }
        let updated = character.clone();

        self.store.save_characters(&self.characters)?;
        Ok(updated)
    }

    /// Creation-time id in epoch milliseconds, bumped past any collision.
    fn next_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self
            .characters
            .iter()
            .any(|c| c.id == candidate.to_string())
        {
            candidate += 1;
        }
        candidate.to_string()
    }
}

fn persona_or_default(persona: &str) -> String {
    let persona = persona.trim();
    if persona.is_empty() {
        DEFAULT_PERSONA.to_string()
    } else {
        persona.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> CharacterService {
        CharacterService::load(DataStore::new(dir.path())).unwrap()
    }

    #[test]
    fn create_persists_and_defaults_persona() {
        let dir = TempDir::new().unwrap();
        let mut characters = service(&dir);

        let alice = characters.create("  Alice ", "", "").unwrap();
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.persona, DEFAULT_PERSONA);
        assert!(alice.id.parse::<i64>().is_ok());

        let reloaded = service(&dir);
        assert_eq!(reloaded.list(), &[alice]);
    }

    #[test]
    fn ids_stay_unique_within_the_same_millisecond() {
        let dir = TempDir::new().unwrap();
        let mut characters = service(&dir);
        let ids: Vec<_> = (0..5)
            .map(|i| characters.create(&format!("c{i}"), "p", "").unwrap().id)
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn blank_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut characters = service(&dir);
        assert!(matches!(
            characters.create("   ", "p", ""),
            Err(CharacterError::MissingName)
        ));
        assert!(characters.list().is_empty());
    }

    #[test]
    fn find_matches_id_then_name() {
        let dir = TempDir::new().unwrap();
        let mut characters = service(&dir);
        let bob = characters.create("Bob", "grumpy", "").unwrap();

        assert_eq!(characters.find(&bob.id).unwrap().name, "Bob");
        assert_eq!(characters.find("bob").unwrap().id, bob.id);
        assert!(matches!(
            characters.find("carol"),
            Err(CharacterError::NotFound(_))
        ));
    }

    #[test]
    fn edit_updates_only_given_fields() {
        let dir = TempDir::new().unwrap();
        let mut characters = service(&dir);
        let bob = characters.create("Bob", "grumpy", "").unwrap();

        let edited = characters
            .edit(
                "Bob",
                CharacterEdit {
                    persona: Some("cheerful".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.id, bob.id);
        assert_eq!(edited.name, "Bob");
        assert_eq!(edited.persona, "cheerful");

        assert!(matches!(
            characters.edit(
                &bob.id,
                CharacterEdit {
                    name: Some(" ".into()),
                    ..Default::default()
                }
            ),
            Err(CharacterError::MissingName)
        ));

        let reloaded = service(&dir);
        assert_eq!(reloaded.find(&bob.id).unwrap().persona, "cheerful");
    }
}

use std::error::Error;

use crate::character::{Character, CharacterEdit, CharacterService};
use crate::cli::{CharacterCommands, Paths};
use crate::core::config::data::path_display;

pub fn run(paths: &Paths, command: CharacterCommands) -> Result<(), Box<dyn Error>> {
    let mut service = CharacterService::load(paths.store.clone())?;

    match command {
        CharacterCommands::Add {
            name,
            persona,
            avatar,
        } => {
            let character = service.create(&name, &persona, &avatar)?;
            println!("✅ Created {} (id {})", character.name, character.id);
            println!("\n💡 Start chatting with:");
            println!("   liunian chat -c {}", character.id);
        }
        CharacterCommands::Edit {
            character,
            name,
            persona,
            avatar,
        } => {
            let updated = service.edit(
                &character,
                CharacterEdit {
                    name,
                    persona,
                    avatar,
                },
            )?;
            println!("✅ Updated {} (id {})", updated.name, updated.id);
        }
        CharacterCommands::List => list_characters(&service, paths),
    }
    Ok(())
}

fn list_characters(service: &CharacterService, paths: &Paths) {
    println!(
        "Characters (from {}):\n",
        path_display(paths.store.root())
    );
    if service.list().is_empty() {
        println!("  No characters yet.");
        println!("\n💡 Create one with:");
        println!("   liunian character add <name> --persona \"...\"");
        return;
    }
    for character in service.list() {
        println!("{}", describe(character));
    }
}

fn describe(character: &Character) -> String {
    let persona = character.effective_persona().replace('\n', " ");
    let mut chars = persona.chars();
    let head: String = chars.by_ref().take(60).collect();
    let persona = if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    };
    let avatar = if character.has_avatar() { " 🖼" } else { "" };
    format!(
        "  • {} ({}){avatar}\n    {persona}",
        character.name, character.id
    )
}

use factorio_manager::{
    router::{MANUAL_SAVE, START_SERVER, STOP_SERVER},
    saves::SaveFile,
    ServerStatus,
};
use poise::serenity_prelude as serenity;

pub const PICK_SAVE: &str = "pick_save";

const GREEN: u32 = 0x2ecc71;
const RED: u32 = 0xe74c3c;
// embed field values are capped at 1024 characters
const MAX_FIELD_LEN: usize = 1000;

pub fn status<'a>(
    e: &'a mut serenity::CreateEmbed,
    status: &ServerStatus,
) -> &'a mut serenity::CreateEmbed {
    e.title("Factorio Server Control Panel")
        .colour(if status.online { GREEN } else { RED })
        .field(
            "Status",
            format!(
                "{} {}",
                status.status_emoji(),
                if status.online { "Online" } else { "Offline" }
            ),
            true,
        )
        .field("World", &status.world_name, true)
        .field(
            format!("Players ({})", status.player_count()),
            format!("```{}```", player_list(&status.players)),
            false,
        )
        .footer(|f| f.text("Last updated"));
    if let Ok(ts) = serenity::Timestamp::from_unix_timestamp(status.last_updated.timestamp()) {
        e.timestamp(ts);
    }
    e
}

pub fn player_list(players: &[String]) -> String {
    if players.is_empty() {
        return "No players connected".to_owned();
    }
    let mut acc = String::new();
    for (i, player) in players.iter().enumerate() {
        if acc.len() + player.len() + 1 > MAX_FIELD_LEN {
            acc.push_str(&format!("\n... and {} more", players.len() - i));
            break;
        }
        if i > 0 {
            acc.push('\n');
        }
        acc.push_str(player);
    }
    acc
}

pub fn panel_buttons(c: &mut serenity::CreateComponents) -> &mut serenity::CreateComponents {
    c.create_action_row(|row| {
        row.create_button(|b| {
            b.custom_id(START_SERVER)
                .label("Start Server")
                .emoji('🟢')
                .style(serenity::ButtonStyle::Success)
        })
        .create_button(|b| {
            b.custom_id(MANUAL_SAVE)
                .label("Save Game")
                .emoji('💾')
                .style(serenity::ButtonStyle::Primary)
        })
        .create_button(|b| {
            b.custom_id(STOP_SERVER)
                .label("Stop Server")
                .emoji('🛑')
                .style(serenity::ButtonStyle::Danger)
        })
    })
}

pub fn save_menu<'a>(
    c: &'a mut serenity::CreateComponents,
    saves: &[SaveFile],
) -> &'a mut serenity::CreateComponents {
    c.create_action_row(|row| {
        row.create_select_menu(|menu| {
            menu.custom_id(PICK_SAVE)
                .placeholder("Choose a save file")
                .min_values(1)
                .max_values(1)
                .options(|opts| {
                    for save in saves {
                        opts.create_option(|o| o.label(save.world_name()).value(&save.name));
                    }
                    opts
                })
        })
    })
}

pub fn save_list(saves: &[SaveFile]) -> String {
    if saves.is_empty() {
        return "No save files found.".to_owned();
    }
    let mut acc = format!("Available saves:");
    for save in saves {
        acc.push_str("\n- ");
        acc.push_str(save.world_name());
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_player_list() {
        assert_eq!(player_list(&[]), "No players connected");
    }

    #[test]
    fn player_list_is_one_per_line() {
        let players = vec!["Alice".to_owned(), "Bob".to_owned()];
        assert_eq!(player_list(&players), "Alice\nBob");
    }

    #[test]
    fn long_player_list_is_cut() {
        let players: Vec<String> = (0..200).map(|i| format!("engineer_{i:03}")).collect();
        let list = player_list(&players);
        assert!(list.len() <= 1024);
        assert!(list.ends_with("more"));
    }
}

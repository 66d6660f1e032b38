//! Serenity side of the panel: the hosting channel and the save prompt.

use std::{sync::Arc, time::Duration};

use factorio_manager::{
    panel::{ChannelMessage, PanelChannel},
    router::SavePicker,
    saves::SaveFile,
    PanelError, ServerStatus,
};
use poise::serenity_prelude as serenity;

use crate::embed;

const UNKNOWN_CHANNEL: isize = 10003;

pub fn classify(channel_id: u64, err: serenity::SerenityError) -> PanelError {
    if let serenity::SerenityError::Http(http) = &err {
        if let serenity::http::HttpError::UnsuccessfulRequest(resp) = http.as_ref() {
            if resp.error.code == UNKNOWN_CHANNEL {
                return PanelError::ChannelMissing(channel_id);
            }
            if resp.status_code.as_u16() == 404 {
                return PanelError::NotFound;
            }
        }
    }
    PanelError::Platform(err.to_string())
}

/// The configured channel, as seen by the bot user.
pub struct SerenityPanel {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    bot_user: serenity::UserId,
}

impl SerenityPanel {
    pub fn new(http: Arc<serenity::Http>, channel_id: u64, bot_user: serenity::UserId) -> Self {
        Self {
            http,
            channel_id: serenity::ChannelId(channel_id),
            bot_user,
        }
    }

    fn err(&self, e: serenity::SerenityError) -> PanelError {
        classify(self.channel_id.0, e)
    }
}

#[serenity::async_trait]
impl PanelChannel for SerenityPanel {
    fn channel_id(&self) -> u64 {
        self.channel_id.0
    }

    async fn fetch(&self, message_id: u64) -> Result<(), PanelError> {
        self.http
            .get_message(self.channel_id.0, message_id)
            .await
            .map(|_| ())
            .map_err(|e| self.err(e))
    }

    async fn recent_messages(&self, limit: u8) -> Result<Vec<ChannelMessage>, PanelError> {
        let messages = self
            .http
            .get_messages(self.channel_id.0, &format!("?limit={limit}"))
            .await
            .map_err(|e| self.err(e))?;
        Ok(messages
            .iter()
            .map(|m| ChannelMessage {
                id: m.id.0,
                own: m.author.id == self.bot_user,
                has_embed: !m.embeds.is_empty(),
            })
            .collect())
    }

    async fn delete(&self, message_id: u64) -> Result<(), PanelError> {
        self.channel_id
            .delete_message(&self.http, message_id)
            .await
            .map_err(|e| self.err(e))
    }

    async fn create_panel(&self, status: &ServerStatus) -> Result<u64, PanelError> {
        let msg = self
            .channel_id
            .send_message(&self.http, |m| {
                m.embed(|e| embed::status(e, status))
                    .components(embed::panel_buttons)
            })
            .await
            .map_err(|e| self.err(e))?;
        Ok(msg.id.0)
    }

    async fn edit_panel(&self, message_id: u64, status: &ServerStatus) -> Result<(), PanelError> {
        self.channel_id
            .edit_message(&self.http, message_id, |m| {
                m.embed(|e| embed::status(e, status))
                    .components(embed::panel_buttons)
            })
            .await
            .map(|_| ())
            .map_err(|e| self.err(e))
    }

    async fn retire_panel(&self, message_id: u64, status: &ServerStatus) -> Result<(), PanelError> {
        self.channel_id
            .edit_message(&self.http, message_id, |m| {
                m.embed(|e| embed::status(e, status)).components(|c| c)
            })
            .await
            .map(|_| ())
            .map_err(|e| self.err(e))
    }
}

/// Asks the user who pressed a button to pick a save from an ephemeral
/// select menu.
pub struct ComponentPicker<'a> {
    pub ctx: &'a serenity::Context,
    pub interaction: &'a serenity::MessageComponentInteraction,
}

#[serenity::async_trait]
impl<'a> SavePicker for ComponentPicker<'a> {
    async fn pick(&self, saves: &[SaveFile], timeout: Duration) -> Result<Option<String>, PanelError> {
        let channel_id = self.interaction.channel_id.0;
        let prompt = self
            .interaction
            .create_followup_message(&self.ctx.http, |f| {
                f.ephemeral(true)
                    .content("Pick a save to load:")
                    .components(|c| embed::save_menu(c, saves))
            })
            .await
            .map_err(|e| classify(channel_id, e))?;

        let choice = prompt
            .await_component_interaction(self.ctx)
            .author_id(self.interaction.user.id)
            .timeout(timeout)
            .await;

        let Some(choice) = choice else {
            if let Err(e) = self
                .interaction
                .edit_followup_message(&self.ctx.http, prompt.id, |f| {
                    f.content("⌛ Selection timed out.").components(|c| c)
                })
                .await
            {
                tracing::debug!(error = %e, "failed to close save prompt");
            }
            return Ok(None);
        };

        let picked = choice.data.values.first().cloned();
        let label = picked.as_deref().unwrap_or("nothing");
        if let Err(e) = choice
            .create_interaction_response(&self.ctx.http, |r| {
                r.kind(serenity::InteractionResponseType::UpdateMessage)
                    .interaction_response_data(|d| {
                        d.content(format!("Loading `{label}`...")).components(|c| c)
                    })
            })
            .await
        {
            tracing::debug!(error = %e, "failed to acknowledge save selection");
        }
        Ok(picked)
    }
}

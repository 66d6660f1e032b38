use std::sync::Arc;

use factorio_manager::{panel::PanelManager, router::InteractionRouter, status::StatusProbe};

use crate::settings::Settings;

pub struct Data {
    pub settings: Settings,
    pub probe: Arc<StatusProbe>,
    pub panel: Arc<PanelManager>,
    pub router: Arc<InteractionRouter>,
}

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Requests sent from the grid to panels it does not own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalEvent {
    /// Refresh the transformation suggestions for the selection
    UpdateSuggestionPanel { column_scope: bool },
}

/// Notifies panels living outside the grid
pub trait ExternalService {
    fn update_suggestion_panel(&mut self, column_scope: bool);
}

/// Forwards notifications to the application through a channel
#[derive(Debug, Clone)]
pub struct ChannelExternalService {
    sender: UnboundedSender<ExternalEvent>,
}

impl ChannelExternalService {
    pub fn new(sender: UnboundedSender<ExternalEvent>) -> Self {
        Self { sender }
    }
}

impl ExternalService for ChannelExternalService {
    fn update_suggestion_panel(&mut self, column_scope: bool) {
        debug!(column_scope, "requesting suggestion panel update");
        if self
            .sender
            .send(ExternalEvent::UpdateSuggestionPanel { column_scope })
            .is_err()
        {
            warn!("suggestion panel receiver is gone");
        }
    }
}

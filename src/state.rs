use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::types::WidgetState;
use crate::view::Widget;

/// Writer side of the single "current payload" slot.
pub type StateTx = watch::Sender<WidgetState>;
pub type StateRx = watch::Receiver<WidgetState>;

/// The card currently on screen. `None` until the first render.
pub type MountedWidget = Arc<RwLock<Option<Widget>>>;

pub fn create_state() -> (StateTx, StateRx) {
    watch::channel(WidgetState::Loading)
}

pub fn create_mount() -> MountedWidget {
    Arc::new(RwLock::new(None))
}

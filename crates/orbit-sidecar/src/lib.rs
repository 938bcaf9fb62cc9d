//! Orbit AI sidecar: event bus, menu action dispatch and the session controller.

pub mod bus;
pub mod controller;
pub mod error;
pub mod menu;
pub mod page;
pub mod settings;

pub use bus::{EventBus, SubscriptionToken};
pub use controller::SessionController;
pub use error::{DispatchError, SidecarError};
pub use menu::{MenuActionDispatcher, MenuEntry, MenuItem};
pub use page::{StaticPage, StaticPageProvider};
pub use settings::{SettingsError, SidecarSettings};

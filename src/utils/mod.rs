pub mod browser;
pub mod form;
pub mod latest;
pub mod layout;
pub mod path;
pub mod style;
pub mod validation;

pub use browser::{ExternalBrowser, SystemBrowser};
pub use form::{Form, FormField};
pub use latest::{LatestRequest, Ticket};
pub use layout::{center_popup, create_standard_layout};
pub use path::{get_config_dir, get_config_path, get_log_dir, get_state_path};
pub use style::{
    error_style, focused_border_style, hint_style, selected_item_style, success_style,
    unfocused_border_style,
};
pub use validation::ValidationError;

pub mod state;
pub mod view_model;

pub use state::{AddItemState, UiState};
pub use view_model::HomeViewModel;

pub mod models;
pub mod selection;

pub use models::{AppState, HistorySnapshot, Photo, PhotoGroup};
pub use selection::{apply, Action, SelectionStore};

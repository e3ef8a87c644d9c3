// Reusable UI widgets

pub mod dialog;
pub mod step_indicator;
pub mod toast;

pub use dialog::{Dialog, DialogVariant};
pub use step_indicator::StepIndicator;
pub use toast::{Toast, ToastManager, ToastVariant};

pub mod isotonic;
pub mod kfold;
pub mod model;
pub mod platt;

pub use isotonic::IsotonicFitter;
pub use kfold::{fit_kfold, KFoldConfig};
pub use model::{CalibratorModel, Fitter, Knot};
pub use platt::{PlattConfig, PlattFitter};

pub use faer;

pub mod config;
pub mod ops;
pub mod optim;

mod activation;
mod dataset;
mod error;
mod layers;
mod ndarray;
mod network;
mod node;
mod predictor;
mod ptr;
mod scratch;
mod shape;
mod state;
mod trainer;

pub use activation::*;
pub use config::*;
pub use dataset::*;
pub use error::*;
pub use layers::*;
pub use ndarray::*;
pub use network::*;
pub use node::*;
pub use optim::Optimizer;
pub use predictor::*;
pub use ptr::*;
pub use scratch::*;
pub use shape::*;
pub use state::*;
pub use trainer::*;

pub(crate) mod utils;

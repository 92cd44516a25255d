pub mod alignment;
pub mod peak;
pub mod score_matrix;

pub use alignment::{
    Alignment,
    Cell,
};
pub use peak::{
    Experiment,
    Peak,
};
pub use score_matrix::ScoreMatrix;

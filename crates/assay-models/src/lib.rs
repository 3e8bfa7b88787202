//! # assay-models
//!
//! Small reference estimators and the on-disk model handle the CLI scores.
//!
//! The estimators exist so every scoring path can be driven end to end:
//!
//! | estimator          | capability             |
//! |--------------------|------------------------|
//! | `LinearRegression` | regressor              |
//! | `NearestCentroid`  | classifier             |
//! | `KMeans`           | inductive clusterer    |
//! | `Agglomerative`    | transductive clusterer |

pub mod centroid;
pub mod cluster;
pub mod linalg;
pub mod linear;
pub mod store;

pub use centroid::NearestCentroid;
pub use cluster::{Agglomerative, KMeans};
pub use linear::LinearRegression;
pub use store::{
    CONFIG_FILE, DirectoryModel, MODEL_FILE, ModelStoreError, TrainSpec, TrainedState, train,
};

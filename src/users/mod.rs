pub mod model;

pub use model::{AccountCredentials, NewUser, TimedSecret, User};

pub mod instance;

pub use instance::Instance;

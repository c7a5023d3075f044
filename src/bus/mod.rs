pub mod mock;
pub mod shared;

pub use mock::MockBus;
pub use shared::SharedI2c;

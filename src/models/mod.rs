pub mod host;
pub mod event;
pub mod booking;
pub mod payment;

pub use host::Host;
pub use event::Event;
pub use booking::Booking;
pub use payment::Payment;

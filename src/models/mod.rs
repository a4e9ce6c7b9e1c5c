pub mod booking;
pub mod event;

pub use booking::{
    Booking, BookingFilter, BookingStatus, CreateBookingRequest, ListBookingsQuery, PaymentStatus,
    UpdateBookingRequest, Venue,
};
pub use event::{
    CreateEventTypeRequest, EventKind, EventType, NewEventType, Pricing, PricingRequest,
};
